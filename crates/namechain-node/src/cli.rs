use crate::commands::tools::Tools;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "namechain", version, about = "Name registry tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Tools,

    /// Sets a custom logging filter (syntax: `<target>=<level>`).
    ///
    /// Overrides `RUST_LOG`, all targets log `info` by default.
    ///
    /// *Example*: `--log info,names=debug`.
    #[arg(short = 'l', long, value_name = "LOG_PATTERN")]
    pub log: Option<String>,
}

fn init_logger(log: Option<&str>) {
    let filter = match log {
        Some(pattern) => EnvFilter::new(pattern),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parse and run command line arguments
pub fn run() -> crate::Result<()> {
    let Cli { command, log } = Cli::parse();

    init_logger(log.as_deref());

    command.run()
}
