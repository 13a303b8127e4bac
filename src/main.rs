mod cli;

use mediasrv::{collector, config, digest::Digest, index, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting mediasrv");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    // Populate the webroot before indexing it
    if config.collector.enabled {
        collector::collect(&config.collector, &config.media.webroot)?;
    }

    // Build the initial index. An unreadable webroot is fatal: there is
    // nothing to serve.
    let media_index = index::MediaIndex::build(&config.media.webroot)?;
    tracing::info!("Number of media files: {}", media_index.len());
    let shared = index::SharedIndex::new(media_index);

    server::start_server(config, shared).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediasrv=trace,tower_http=debug".to_string()
        } else {
            "mediasrv=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Collect => run_collector(cli.config.as_deref()),
        Commands::Hash { file } => hash_file(&file),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediasrv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_collector(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if config.collector.paths.is_empty() {
        anyhow::bail!("No collector source paths configured");
    }

    let stats = collector::collect(&config.collector, &config.media.webroot)?;
    println!(
        "Collected {} files into {:?} ({} linked, {} copied, {} already present)",
        stats.linked + stats.copied,
        config.media.webroot,
        stats.linked,
        stats.copied,
        stats.skipped
    );

    Ok(())
}

fn hash_file(file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let digest = Digest::of_file(file)?;
    println!("{}", digest);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Webroot: {:?}", config.media.webroot);
            println!("  Collector enabled: {}", config.collector.enabled);
            println!("  Collector paths: {}", config.collector.paths.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Webroot: {:?}", config.media.webroot);
        }
    }

    Ok(())
}
