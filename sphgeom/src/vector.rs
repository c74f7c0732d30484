use crate::SphgeomError;

/// A vector in R^3, not necessarily of unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vector3d) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3d) -> Vector3d {
        Vector3d::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn squared_norm(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    pub fn scaled(&self, s: f64) -> Vector3d {
        Vector3d::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn sum(&self, other: &Vector3d) -> Vector3d {
        Vector3d::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn normalized(&self) -> Result<UnitVector3d, SphgeomError> {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return Err(SphgeomError::ZeroVector);
        }
        Ok(UnitVector3d(self.scaled(1.0 / n)))
    }
}

/// A direction on the unit sphere; the constructor normalizes its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitVector3d(Vector3d);

impl UnitVector3d {
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self, SphgeomError> {
        Vector3d::new(x, y, z).normalized()
    }

    pub fn from_lonlat(coords: &LonLat) -> Self {
        let (sin_lon, cos_lon) = coords.lon().sin_cos();
        let (sin_lat, cos_lat) = coords.lat().sin_cos();
        // cos_lat >= 0 for lat in [-pi/2, pi/2], the result is always unit length
        UnitVector3d(Vector3d::new(
            cos_lat * cos_lon,
            cos_lat * sin_lon,
            sin_lat,
        ))
    }

    pub fn as_vector(&self) -> &Vector3d {
        &self.0
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    pub fn dot(&self, other: &UnitVector3d) -> f64 {
        self.0.dot(&other.0)
    }

    pub fn cross(&self, other: &UnitVector3d) -> Vector3d {
        self.0.cross(&other.0)
    }

    /// Angle between two directions in radians, numerically stable for
    /// nearly parallel and nearly antipodal inputs.
    pub fn angle_to(&self, other: &UnitVector3d) -> f64 {
        self.cross(other).norm().atan2(self.dot(other))
    }

    /// Midpoint of the great-circle arc between two non-antipodal directions.
    pub fn midpoint(&self, other: &UnitVector3d) -> Result<UnitVector3d, SphgeomError> {
        self.0.sum(&other.0).normalized()
    }
}

/// Spherical coordinates: longitude (right ascension) and latitude
/// (declination), stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    lon: f64,
    lat: f64,
}

impl LonLat {
    pub fn from_radians(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: lon.to_radians(),
            lat: lat.to_radians(),
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}
