use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use spooltier::cache::{
    AuxiliaryCache, CacheElement, DirectoryStore, ElementAttributes, SpoolSettings,
    TracingEventLogger, WriteBehindCache,
};
use spooltier::config::Config;

/// Spooltier - write-behind cache tier over a directory store
#[derive(Parser, Debug)]
#[command(name = "spooltier")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a value
    Put {
        key: String,
        value: String,
        /// Expire the element after this many seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Print a value
    Get { key: String },
    /// Remove a key
    Remove { key: String },
    /// Remove every key
    Clear,
    /// Print every key/value whose key matches a regular expression
    Match { pattern: String },
    /// List keys
    Keys,
    /// Print tier statistics
    Stats {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Test configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config.validate().map_err(anyhow::Error::msg)?;

    spooltier::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = %args.config.display(),
        cache_name = %config.cache.cache_name,
        store_directory = %config.store.directory,
        "Configuration loaded successfully"
    );

    if let Command::Check = args.command {
        println!("configuration OK");
        return Ok(());
    }

    let settings = SpoolSettings::try_from(&config.cache)?;
    let store = DirectoryStore::open(&config.store.directory)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store.directory))?;
    let cache = WriteBehindCache::with_event_logger(settings, store, Arc::new(TracingEventLogger));

    let outcome = run(&cache, args.command).await;

    // Always drain pending writes, even when the command failed
    cache.dispose().await?;
    outcome
}

async fn run(cache: &WriteBehindCache<DirectoryStore>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Put { key, value, ttl } => {
            let attributes = match ttl {
                Some(secs) => ElementAttributes::with_max_life(Duration::from_secs(secs)),
                None => ElementAttributes::default(),
            };
            let element = CacheElement::new(cache.get_cache_name(), key, value).with_attributes(attributes);
            cache.update(element).await;
        }
        Command::Get { key } => match cache.get(&key).await {
            Some(element) => println!("{}", String::from_utf8_lossy(&element.value)),
            None => anyhow::bail!("key not found: {}", key),
        },
        Command::Remove { key } => {
            let removed = cache.remove(&key).await?;
            println!("{}", if removed { "removed" } else { "not found" });
        }
        Command::Clear => cache.remove_all().await?,
        Command::Match { pattern } => {
            let mut matches: Vec<_> = cache.get_matching(&pattern).await?.into_iter().collect();
            matches.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, element) in matches {
                println!("{}\t{}", key, String::from_utf8_lossy(&element.value));
            }
        }
        Command::Keys => {
            let mut keys: Vec<_> = cache.get_key_set().await?.into_iter().collect();
            keys.sort();
            for key in keys {
                println!("{}", key);
            }
        }
        Command::Stats { json } => {
            let stats = cache.get_statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats);
                println!("  Store Size: {}", cache.get_size().await?);
            }
        }
        Command::Check => {}
    }
    Ok(())
}
