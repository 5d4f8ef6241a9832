use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nest",
    about = "SocialNest feed client simulator",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show cache, fetch, and mutation events
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load feeds, scroll, and submit a post against an in-memory server
    Demo(DemoArgs),
    /// Print the effective client configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    /// Signed-in user id
    #[arg(short, long, default_value = "me")]
    pub user: String,
    /// Text of the post to submit
    #[arg(short, long, default_value = "Hello from the simulator")]
    pub message: String,
    /// Uploaded media ids to attach
    #[arg(long)]
    pub media: Vec<String>,
    /// Posts on the server before the demo starts
    #[arg(long, default_value = "12")]
    pub seed: usize,
    #[arg(long, default_value = "4")]
    pub page_size: usize,
    /// Times to scroll the home feed before submitting
    #[arg(long, default_value = "1")]
    pub scrolls: usize,
    /// Make the server reject the post
    #[arg(long)]
    pub fail: bool,
    /// Server latency in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,
    /// Client config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Config file to load; defaults are shown without one
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_demo_defaults() {
        let cli = Cli::try_parse_from(["nest", "demo"]).unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.user, "me");
            assert_eq!(args.page_size, 4);
            assert!(!args.fail);
            assert!(args.media.is_empty());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_demo_with_media_and_failure() {
        let cli = Cli::try_parse_from([
            "nest", "demo", "-u", "alice", "--media", "m1", "--media", "m2", "--fail",
        ])
        .unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.user, "alice");
            assert_eq!(args.media, vec!["m1", "m2"]);
            assert!(args.fail);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::try_parse_from(["nest", "config", "nest.toml"]).unwrap();
        if let Command::Config(args) = cli.command {
            assert_eq!(args.path, Some(PathBuf::from("nest.toml")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["nest", "--verbose", "demo"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["nest", "--format", "json", "config"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
