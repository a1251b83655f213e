//! Quarry CLI - resolve projects from a local cache or a package registry.
//!
//! Prints a JSON array of the resolved project values on stdout. Names that
//! cannot be resolved are logged and left out.

use anyhow::{Context, Result};
use clap::Parser;
use quarry_core::{ProjectLookup, QuarryConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Resolve projects from a local cache or a package registry")]
struct Args {
    /// Project names to resolve, in order
    #[arg(required = true)]
    names: Vec<String>,

    /// Base URL of the package registry
    #[arg(short, long)]
    registry: Option<String>,

    /// Root of the local project cache
    #[arg(long)]
    cache_root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Build the effective configuration. Flags win over the config file.
    fn config(&self) -> Result<QuarryConfig> {
        let mut config = match &self.config {
            Some(path) => QuarryConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => QuarryConfig::default(),
        };

        if let Some(registry) = &self.registry {
            config.registry_url = registry.clone();
        }
        if let Some(cache_root) = &self.cache_root {
            config.cache_root = cache_root.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let config = args.config()?;
    info!(
        "Registry: {}, cache: {}",
        config.registry_base(),
        config.cache_root.display()
    );

    let lookup = ProjectLookup::<serde_json::Value>::with_defaults(config)?;
    let projects = lookup.resolve_all(&args.names).await;

    // Results go to stdout, logs to stderr
    println!("{}", serde_json::to_string_pretty(&projects)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("quarry.json");
        std::fs::write(
            &path,
            r#"{ "registry_url": "http://file.example", "cache_root": "from-file" }"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "quarry",
            "--config",
            path.to_str().unwrap(),
            "--registry",
            "http://flag.example",
            "asserter",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.registry_url, "http://flag.example");
        assert_eq!(config.cache_root, PathBuf::from("from-file"));
    }

    #[test]
    fn test_missing_registry_is_rejected() {
        let args = Args::parse_from(["quarry", "asserter"]);
        assert!(args.config().is_err());
    }
}
