//! APDB Admin CLI

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use apdb::cassandra::ApdbSession;
use apdb::time::TimePartitioner;
use apdb::{ApdbConfig, make_apdb};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "APDB Admin")]
#[clap(about = "CLI to administer an alert production database", version, author)]
#[clap(arg_required_else_help(true))]
struct Cli {
    /// YAML configuration file; defaults apply when omitted.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create all database tables
    #[clap(name = "create-schema")]
    CreateSchema {
        /// Drop existing tables first
        #[clap(long)]
        drop: bool,
        /// Create the keyspace before creating tables
        #[clap(long)]
        create_keyspace: bool,
        /// Replication factor used with --create-keyspace
        #[clap(long, default_value_t = 1)]
        replication_factor: u32,
    },

    /// Print the temporal partition of a TAI datetime
    #[clap(name = "time-partition")]
    TimePartition {
        /// Datetime in yyyy-mm-ddThh:mm:ss format
        datetime: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ApdbConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(ApdbConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Commands::CreateSchema {
            drop,
            create_keyspace,
            replication_factor,
        } => {
            if create_keyspace {
                let session = ApdbSession::connect(&config)
                    .await
                    .with_context(|| "connecting to cluster")?;
                let cql = format!(
                    "CREATE KEYSPACE IF NOT EXISTS \"{}\" WITH replication = \
                     {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}",
                    config.keyspace
                );
                session
                    .execute_ddl(&cql)
                    .await
                    .with_context(|| "creating keyspace")?;
                println!("created keyspace {}", config.keyspace);
            }
            let apdb = make_apdb(config).await?;
            apdb.make_schema(drop).await?;
            println!("schema created");
        }
        Commands::TimePartition { datetime } => {
            let time = apdb::time::parse_tai(&datetime)?;
            let partitioner = TimePartitioner::new(config.time_partition_days)?;
            println!("{}", partitioner.partition(time));
        }
    }
    Ok(())
}
