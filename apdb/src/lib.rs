//! apdb : the alert production database
//!
//! A write-once / read-many store for difference-image analysis catalogs
//! produced by a wide-field optical survey. Every telescope visit appends
//! three catalogs (DiaObject, DiaSource, DiaForcedSource) and reads back
//! the known objects in the visit region together with their recent source
//! history. Storage is Apache Cassandra, partitioned both spatially (by a
//! sky pixelization index) and temporally (by a fixed-width time window).

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

pub mod apdb;
pub mod cassandra;
pub mod config;
pub mod error;
pub mod schema;
pub mod time;

pub use crate::apdb::{Apdb, make_apdb};
pub use crate::cassandra::ApdbCassandra;
pub use crate::config::ApdbConfig;
pub use crate::error::{Error, Result};
pub use crate::schema::{ApdbSchema, ApdbTable, ColumnDef, ColumnType, IndexDef, TableDef};
