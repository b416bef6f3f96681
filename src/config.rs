use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_UPSTREAM: &str = "https://api.weather.com/v2/pws/history/all";

#[derive(Parser, Debug)]
#[command(
    name = "wu_history",
    version,
    author,
    about = "Fetch personal weather station history from Weather.com"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the history proxy and serve the browser client
    Serve(ServerConfig),
    /// Fetch one day of history through a running proxy
    Fetch(FetchArgs),
}

/// Everything the proxy needs, read once at startup.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Weather.com api key injected into every upstream request
    #[arg(long, env = "WU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory the browser client is served from
    #[arg(long, env = "WU_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// History endpoint of the upstream api
    #[arg(long, env = "WU_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM)]
    pub upstream_url: reqwest::Url,
}

impl ServerConfig {
    /// The api key, treating an empty value as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Station identifier, e.g. IMADRI123
    #[arg(short, long)]
    pub station: String,

    /// Day to fetch as YYYY-MM-DD, today when omitted
    #[arg(short, long)]
    pub date: Option<chrono::NaiveDate>,

    /// Base url of the proxy
    #[arg(long, env = "WU_SERVER", default_value = "http://localhost:3000")]
    pub server: String,

    /// Also export the table as CSV
    #[arg(long)]
    pub csv: bool,

    /// Directory the CSV export is written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}
