use clap::Parser;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "synthw", version = VERSION, about = "Synth build report watcher TUI")]
pub struct Cli {
    /// Base URL of the report host
    #[arg(short, long, env = "SYNTHW_URL", default_value = crate::config::DEFAULT_BASE_URL)]
    pub url: String,

    /// Port of the report host (scheme default when omitted)
    #[arg(short, long, env = "SYNTHW_PORT")]
    pub port: Option<u16>,

    /// Path of the report directory on the host
    #[arg(long, env = "SYNTHW_PATH", default_value = crate::config::DEFAULT_PATH)]
    pub path: String,

    /// Poll interval in milliseconds
    #[arg(
        short,
        long = "interval-ms",
        env = "SYNTHW_INTERVAL_MS",
        default_value_t = crate::config::DEFAULT_POLL_INTERVAL_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,

    /// Title shown in the header
    #[arg(short, long, env = "SYNTHW_TITLE", default_value = crate::config::DEFAULT_TITLE)]
    pub title: String,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/synthw/debug.log
    #[arg(long)]
    pub verbose: bool,
}
