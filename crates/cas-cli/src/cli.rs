use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cas",
    about = "CAS: key-addressed blob storage over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve blobs from a directory over HTTP
    Serve(ServeArgs),
    /// Load and validate a configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub access_key: Option<String>,
    #[arg(long)]
    pub secret_key: Option<String>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["cas", "serve"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert!(args.config.is_none());
            assert!(args.bind.is_none());
            assert!(args.access_key.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "cas", "serve",
            "--config", "cas.toml",
            "--bind", "0.0.0.0:9000",
            "--data-dir", "/srv/cas",
            "--access-key", "u",
            "--secret-key", "p",
        ]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("cas.toml")));
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
            assert_eq!(args.data_dir, Some(PathBuf::from("/srv/cas")));
            assert_eq!(args.access_key.as_deref(), Some("u"));
            assert_eq!(args.secret_key.as_deref(), Some("p"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_bad_bind_addr() {
        assert!(Cli::try_parse_from(["cas", "serve", "--bind", "not-an-addr"]).is_err());
    }

    #[test]
    fn parse_check_config() {
        let cli = Cli::try_parse_from(["cas", "check-config", "-c", "cas.toml"]).unwrap();
        if let Command::CheckConfig(args) = cli.command {
            assert_eq!(args.config, PathBuf::from("cas.toml"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn check_config_requires_path() {
        assert!(Cli::try_parse_from(["cas", "check-config"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["cas", "serve", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
