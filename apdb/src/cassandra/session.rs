use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use scylla::batch::Batch;
use scylla::frame::response::result::CqlValue;
use scylla::prepared_statement::PreparedStatement;
use scylla::query::Query;
use scylla::statement::Consistency;
use scylla::transport::execution_profile::{ExecutionProfile, ExecutionProfileHandle};
use scylla::transport::host_filter::AllowListHostFilter;
use scylla::{QueryResult, Session, SessionBuilder};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ApdbConfig;
use crate::error::{Error, Result};

/// Key of the prepared-statement cache: physical table plus the ordered
/// column list of the INSERT.
type PreparedKey = (String, Vec<String>);

/// Owns the cluster session, the read/write execution profiles and the
/// prepared-statement cache. Shared by the planner-driven read path and the
/// ingest pipeline; cheap to clone behind an `Arc`.
pub struct ApdbSession {
    session: Session,
    keyspace: String,
    read_profile: ExecutionProfileHandle,
    write_profile: ExecutionProfileHandle,
    ddl_profile: ExecutionProfileHandle,
    prepared: Mutex<HashMap<PreparedKey, PreparedStatement>>,
}

impl ApdbSession {
    /// Connect to the cluster described by the configuration.
    pub async fn connect(config: &ApdbConfig) -> Result<Self> {
        let read_profile = ExecutionProfile::builder()
            .consistency(parse_consistency(&config.read_consistency)?)
            .request_timeout(Some(Duration::from_secs_f64(config.read_timeout)))
            .build()
            .into_handle();
        let write_profile = ExecutionProfile::builder()
            .consistency(parse_consistency(&config.write_consistency)?)
            .request_timeout(Some(Duration::from_secs_f64(config.write_timeout)))
            .build()
            .into_handle();
        // Schema changes can take far longer than data writes; no timeout.
        let ddl_profile = ExecutionProfile::builder()
            .consistency(parse_consistency(&config.write_consistency)?)
            .request_timeout(None)
            .build()
            .into_handle();

        let mut builder = SessionBuilder::new()
            .known_nodes(&config.contact_points)
            .default_execution_profile_handle(read_profile.clone());

        if !config.private_ips.is_empty() {
            // Nodes behind NAT (container deployments) advertise addresses
            // that are not routable from the client; remap them and restrict
            // connections to the declared contact points.
            info!("installing address translation for private IPs");
            let translator = address_map(&config.contact_points, &config.private_ips)?;
            let allowed: Vec<String> = config
                .contact_points
                .iter()
                .map(|h| with_default_port(h))
                .collect();
            let filter = AllowListHostFilter::new(allowed.iter().map(String::as_str))
                .map_err(|e| Error::Config(format!("bad contact point list: {e}")))?;
            builder = builder
                .address_translator(Arc::new(translator))
                .host_filter(Arc::new(filter));
        }

        let session = builder.build().await?;
        info!(
            "connected to cluster, keyspace {}, contact points {:?}",
            config.keyspace, config.contact_points
        );
        Ok(Self {
            session,
            keyspace: config.keyspace.clone(),
            read_profile,
            write_profile,
            ddl_profile,
            prepared: Mutex::new(HashMap::new()),
        })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Run a single read statement. Paging stays disabled: every statement
    /// produced by the planner is partition-scoped and bounded.
    pub async fn execute_read(&self, cql: &str) -> Result<QueryResult> {
        let mut query = Query::new(cql);
        query.set_execution_profile_handle(Some(self.read_profile.clone()));
        Ok(self.session.query(query, ()).await?)
    }

    /// Run a DDL statement.
    pub async fn execute_ddl(&self, cql: &str) -> Result<()> {
        debug!("ddl: {cql}");
        let mut query = Query::new(cql);
        query.set_execution_profile_handle(Some(self.ddl_profile.clone()));
        self.session.query(query, ()).await?;
        Ok(())
    }

    /// Run a single write statement with bound values.
    pub async fn execute_write(&self, cql: &str, values: Vec<Option<CqlValue>>) -> Result<()> {
        let mut query = Query::new(cql);
        query.set_execution_profile_handle(Some(self.write_profile.clone()));
        self.session.query(query, values).await?;
        Ok(())
    }

    /// Run a batch under the write profile, one value list per statement.
    pub async fn execute_batch(
        &self,
        mut batch: Batch,
        values: Vec<Vec<Option<CqlValue>>>,
    ) -> Result<()> {
        batch.set_execution_profile_handle(Some(self.write_profile.clone()));
        self.session.batch(&batch, values).await?;
        Ok(())
    }

    /// Prepared INSERT for a table and column list, cached per
    /// `(table, columns)`. Insertions are idempotent, a lost race just
    /// prepares the same statement twice.
    pub async fn prepared_insert(
        &self,
        table: &str,
        columns: &[String],
        cql: &str,
    ) -> Result<PreparedStatement> {
        let key = (table.to_string(), columns.to_vec());
        let mut cache = self.prepared.lock().await;
        if let Some(statement) = cache.get(&key) {
            return Ok(statement.clone());
        }
        debug!("preparing: {cql}");
        let statement = self.session.prepare(cql).await?;
        cache.insert(key, statement.clone());
        Ok(statement)
    }
}

impl std::fmt::Debug for ApdbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApdbSession")
            .field("keyspace", &self.keyspace)
            .finish_non_exhaustive()
    }
}

/// Map a consistency level name from configuration to the wire enum.
pub fn parse_consistency(name: &str) -> Result<Consistency> {
    match name.to_ascii_uppercase().as_str() {
        "ANY" => Ok(Consistency::Any),
        "ONE" => Ok(Consistency::One),
        "TWO" => Ok(Consistency::Two),
        "THREE" => Ok(Consistency::Three),
        "QUORUM" => Ok(Consistency::Quorum),
        "ALL" => Ok(Consistency::All),
        "LOCAL_QUORUM" => Ok(Consistency::LocalQuorum),
        "EACH_QUORUM" => Ok(Consistency::EachQuorum),
        "LOCAL_ONE" => Ok(Consistency::LocalOne),
        other => Err(Error::Config(format!(
            "unknown consistency level: {other}"
        ))),
    }
}

fn with_default_port(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:9042")
    }
}

fn resolve(host: &str) -> Result<SocketAddr> {
    with_default_port(host)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Config(format!("cannot resolve address {host}")))
}

/// private -> public address map used as the driver's address translator.
fn address_map(
    contact_points: &[String],
    private_ips: &[String],
) -> Result<HashMap<SocketAddr, SocketAddr>> {
    let mut map = HashMap::new();
    for (private, public) in private_ips.iter().zip(contact_points) {
        map.insert(resolve(private)?, resolve(public)?);
    }
    Ok(map)
}
