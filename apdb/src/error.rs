use scylla::transport::errors::{NewSessionError, QueryError};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the database engine.
///
/// Nothing is retried internally; every failure propagates to the caller.
/// Writes are keyed by stable identifiers, so replaying a failed `store`
/// call is safe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, including configuration that
    /// disagrees with the state recorded in an existing keyspace.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed input data detected before anything was sent to the
    /// cluster.
    #[error("data error: {0}")]
    Data(String),

    /// An operation this backend does not support.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("failed to connect to cluster: {0}")]
    Session(#[from] NewSessionError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("cannot parse schema file: {0}")]
    SchemaFile(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sphgeom(#[from] apdb_sphgeom::SphgeomError),
}
