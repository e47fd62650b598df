use std::sync::Arc;

use anyhow::Context;
use cas_server::{CasServer, ServerConfig};
use cas_store::FsBlobStore;
use colored::Colorize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

/// File values first, then any flags given on the command line.
fn resolve_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(key) = args.access_key {
        config.access_key = key;
    }
    if let Some(key) = args.secret_key {
        config.secret_key = key;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let store = FsBlobStore::open(&config.data_dir)
        .await
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;

    println!(
        "{} Serving {} on {}",
        "✓".green().bold(),
        config.data_dir.display().to_string().bold(),
        config.bind_addr.to_string().cyan()
    );
    tracing::debug!(?config, "resolved configuration");

    CasServer::from_config(&config, Arc::new(store))
        .serve(config.bind_addr)
        .await?;
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = ServerConfig::load(&args.config)?;
    config
        .validate()
        .with_context(|| format!("{} is not usable", args.config.display()))?;

    println!("{} {} is valid", "✓".green().bold(), args.config.display());
    println!("  bind:       {}", config.bind_addr.to_string().cyan());
    println!("  data dir:   {}", config.data_dir.display());
    println!("  access key: {}", config.access_key.yellow());
    println!("  secret key: {}", "<redacted>".dimmed());
    Ok(())
}
