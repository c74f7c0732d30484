//! Cassandra storage engine: spatial/temporal partitioning, fan-out query
//! planning, bounded-concurrency execution and batched ingest.

pub mod apdb;
pub mod cql_arrow_bridge;
pub mod executor;
pub mod ingest;
pub mod partitioner;
pub mod planner;
pub mod schema;
pub mod session;

pub use self::apdb::ApdbCassandra;
pub use self::partitioner::SpatialPartitioner;
pub use self::session::ApdbSession;
