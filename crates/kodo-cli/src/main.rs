//! kodo - command-line front end for the Kodo management facade.
//!
//! Every command prints the operation's result envelope as JSON on stdout
//! and exits with status 1 when the envelope is not `ok`. Logs go to stderr.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kodo_client::batch::renamed_pairs;
use kodo_client::{KodoConfig, ListQuery, StorageFacade};
use kodo_models::Envelope;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Manage Kodo buckets, objects and CDN caches.
///
/// Credentials and endpoints are read from `KODO_*` environment variables
/// (a `.env` file is honored).
#[derive(Parser)]
#[command(name = "kodo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print compact instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List buckets with their bound domains
    Buckets,

    /// List the domains bound to a bucket
    Domains { bucket: String },

    /// Fetch one listing page
    List {
        bucket: String,

        #[arg(long, default_value = "")]
        prefix: String,

        #[arg(long, default_value = "")]
        delimiter: String,

        /// Marker returned by the previous page
        #[arg(long, default_value = "")]
        marker: String,

        #[arg(long)]
        limit: Option<u32>,

        /// Follow markers until the listing is exhausted
        #[arg(long)]
        all: bool,
    },

    /// Count the objects of a bucket
    Count {
        bucket: String,

        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Show object metadata
    Stat { bucket: String, key: String },

    /// Delete one or more objects
    Delete {
        bucket: String,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Move objects to `<prefix>_<key>_<suffix>` in another bucket
    Move(TransferArgs),

    /// Copy objects to `<prefix>_<key>_<suffix>` in another bucket
    Copy(TransferArgs),

    /// Upload a local file
    Upload {
        bucket: String,
        path: PathBuf,

        /// Object key; derived by the service when omitted
        #[arg(long)]
        key: Option<String>,
    },

    /// Issue an upload token
    UploadToken {
        bucket: String,

        #[arg(long)]
        key: Option<String>,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        expires: u64,

        /// Extra put-policy fields as a JSON object
        #[arg(long)]
        policy: Option<String>,

        /// Keep unknown policy fields
        #[arg(long)]
        lenient: bool,
    },

    /// Refresh CDN caches for URLs and/or directories
    Refresh {
        #[arg(long = "url")]
        urls: Vec<String>,

        #[arg(long = "dir")]
        dirs: Vec<String>,
    },

    /// Warm CDN caches for URLs
    PrefetchUrls {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Args)]
struct TransferArgs {
    bucket: String,
    dest_bucket: String,

    #[arg(required = true)]
    keys: Vec<String>,

    #[arg(long, default_value = "")]
    prefix: String,

    #[arg(long, default_value = "")]
    suffix: String,

    /// Fail instead of overwriting existing destination keys
    #[arg(long)]
    no_force: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = match KodoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    debug!("Kodo config: {:?}", config);

    let kodo = match StorageFacade::new(config) {
        Ok(kodo) => kodo,
        Err(e) => {
            error!("Failed to create storage facade: {}", e);
            process::exit(1);
        }
    };

    match run(&kodo, cli.command, cli.compact).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Dispatch a command. Returns whether the envelope was `ok`.
async fn run(kodo: &StorageFacade, command: Commands, compact: bool) -> Result<bool> {
    match command {
        Commands::Buckets => emit(&kodo.buckets().await, compact),
        Commands::Domains { bucket } => emit(&kodo.domains(&bucket).await, compact),
        Commands::List {
            bucket,
            prefix,
            delimiter,
            marker,
            limit,
            all,
        } => {
            let query = ListQuery {
                prefix,
                delimiter,
                marker: marker.into(),
                limit,
            };
            if all {
                emit(&kodo.list_all(&bucket, query).await, compact)
            } else {
                emit(&kodo.list(&bucket, &query).await, compact)
            }
        }
        Commands::Count { bucket, prefix } => {
            emit(&kodo.count(&bucket, ListQuery::with_prefix(prefix)).await, compact)
        }
        Commands::Stat { bucket, key } => emit(&kodo.stat(&bucket, &key).await, compact),
        Commands::Delete { bucket, keys } => {
            if keys.len() == 1 {
                emit(&kodo.delete(&bucket, &keys[0]).await, compact)
            } else {
                emit(&kodo.batch_delete(&bucket, keys).await, compact)
            }
        }
        Commands::Move(args) => {
            let pairs = renamed_pairs(args.keys, &args.prefix, &args.suffix);
            let env = kodo
                .batch_move(&args.bucket, pairs, &args.dest_bucket, !args.no_force)
                .await;
            emit(&env, compact)
        }
        Commands::Copy(args) => {
            let pairs = renamed_pairs(args.keys, &args.prefix, &args.suffix);
            let env = kodo
                .batch_copy(&args.bucket, pairs, &args.dest_bucket, !args.no_force)
                .await;
            emit(&env, compact)
        }
        Commands::Upload { bucket, path, key } => {
            emit(&kodo.upload(&bucket, &path, key.as_deref()).await, compact)
        }
        Commands::UploadToken {
            bucket,
            key,
            expires,
            policy,
            lenient,
        } => {
            let policy = policy
                .map(|raw| {
                    serde_json::from_str::<Map<String, Value>>(&raw)
                        .context("--policy must be a JSON object")
                })
                .transpose()?;
            let env =
                kodo.upload_token(&bucket, key.as_deref(), expires, policy.as_ref(), !lenient);
            emit(&env, compact)
        }
        Commands::Refresh { urls, dirs } => emit(&kodo.refresh(&urls, &dirs).await, compact),
        Commands::PrefetchUrls { urls } => emit(&kodo.prefetch_urls(&urls).await, compact),
    }
}

fn emit<T: Serialize>(envelope: &Envelope<T>, compact: bool) -> Result<bool> {
    let json = if compact {
        serde_json::to_string(envelope)?
    } else {
        serde_json::to_string_pretty(envelope)?
    };
    println!("{}", json);
    Ok(envelope.is_ok())
}

/// Colored text logs by default, JSON when `LOG_FORMAT=json`. Both on stderr.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kodo_client=warn,kodo=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
}
