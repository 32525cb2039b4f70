//! VoltKV - A Sharded In-Memory Key-Value Cache Server
//!
//! This is the main entry point for the VoltKV server. It parses the
//! command-line flags, sets up logging, builds the cache, and serves until
//! a Ctrl+C arrives, at which point in-flight connections are drained
//! before exit.

use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use voltkv::server::Server;
use voltkv::storage::{Cache, CacheConfig, DEFAULT_MAX_ITEMS_PER_SHARD, DEFAULT_SHARD_COUNT};

/// Server configuration
struct Config {
    /// Address to bind to
    listen: String,
    /// Number of cache shards (positive power of two)
    shards: usize,
    /// Max items per shard (0 = unbounded)
    max_items: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: voltkv::DEFAULT_LISTEN_ADDR.to_string(),
            shards: DEFAULT_SHARD_COUNT,
            max_items: DEFAULT_MAX_ITEMS_PER_SHARD,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--listen" | "-l" => {
                    if i + 1 < args.len() {
                        config.listen = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --listen requires a value");
                        std::process::exit(1);
                    }
                }
                "--shards" => {
                    if i + 1 < args.len() {
                        // Signed parse; the cache constructor falls back to
                        // the default for anything that is not a positive
                        // power of two.
                        let parsed: i64 = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid shard count");
                            std::process::exit(1);
                        });
                        config.shards = parsed.max(0) as usize;
                        i += 2;
                    } else {
                        eprintln!("Error: --shards requires a value");
                        std::process::exit(1);
                    }
                }
                "--max-items" => {
                    if i + 1 < args.len() {
                        // Signed parse so a negative input coerces to
                        // unbounded instead of failing.
                        let parsed: i64 = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid max items value");
                            std::process::exit(1);
                        });
                        config.max_items = parsed.max(0) as usize;
                        i += 2;
                    } else {
                        eprintln!("Error: --max-items requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("VoltKV version {}", voltkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"
VoltKV - A Sharded In-Memory Key-Value Cache Server

USAGE:
    voltkv [OPTIONS]

OPTIONS:
    -l, --listen <ADDR>      Address to bind to (default: 127.0.0.1:6380)
        --shards <N>         Number of cache shards, positive power of two
                             (default: 256; invalid values fall back)
        --max-items <N>      Max items per shard, 0 or negative = unbounded
                             (default: 1024)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    voltkv                               # 256 shards of 1024 items on :6380
    voltkv --listen 0.0.0.0:6380         # listen on all interfaces
    voltkv --shards 64 --max-items 0     # 64 unbounded shards
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
        __     __    _ _   _  __ __     __
        \ \   / /__ | | |_| |/ / \ \   / /
         \ \ / / _ \| | __| ' /   \ \ / /
          \ V / (_) | | |_| . \    \ V /
           \_/ \___/|_|\__|_|\_\    \_/

VoltKV v{} - Sharded In-Memory Key-Value Cache
──────────────────────────────────────────────────
Listening on {}
Use Ctrl+C to shut down gracefully.
"#,
        voltkv::VERSION,
        config.listen
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    print_banner(&config);

    let cache = Arc::new(Cache::with_config(CacheConfig {
        shard_count: config.shards,
        max_items_per_shard: config.max_items,
    }));
    info!(
        shards = cache.shard_count(),
        max_items_per_shard = config.max_items,
        "cache initialized"
    );
    if cache.shard_count() != config.shards {
        info!(
            requested = config.shards,
            actual = cache.shard_count(),
            "shard count was not a positive power of two, using default"
        );
    }

    let server = Server::bind(&config.listen, cache).await?;
    info!(addr = %config.listen, "listening");

    server
        .run(async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    info!("server shutdown complete");
    Ok(())
}
