use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pagewire::config::EXAMPLE_CONFIG;
use pagewire::history::HistoryEntry;
use pagewire::{
    util, Config, HistoryMode, HttpTransport, MemoryBrowser, Options, Pagewire, RequestData,
    StorageTag,
};
use serde_json::json;
use tracing::info;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "pagewire", version, about = "Drive partial-page requests from the command line")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue one request through the full stack and print the outcome
    Request {
        method: String,
        url: String,
        /// Form field, repeatable
        #[arg(short = 'd', long = "data", value_name = "KEY=VALUE", value_parser = parse_pair)]
        data: Vec<(String, String)>,
        /// push, replace or off
        #[arg(long)]
        history: Option<String>,
        /// history, session or off
        #[arg(long)]
        cache: Option<String>,
        /// Document location relative URLs resolve against
        #[arg(long)]
        base: Option<Url>,
    },
    /// Print the effective configuration
    Config {
        /// Print the bundled example file instead
        #[arg(long)]
        example: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(util::config_path);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command {
        Command::Config { example } => {
            if example {
                print!("{EXAMPLE_CONFIG}");
            } else {
                println!("# {}", config_path.display());
                println!("{config:#?}");
            }
            Ok(())
        }
        Command::Request {
            method,
            url,
            data,
            history,
            cache,
            base,
        } => {
            let location = match base {
                Some(base) => base,
                None => Url::parse(&url)
                    .map_err(|_| anyhow!("`{url}` is relative; pass --base to resolve it"))?,
            };

            let browser = MemoryBrowser::new(location);
            let transport = HttpTransport::new(&config.transport)?;
            let wire = Pagewire::new(browser.collaborators(Arc::new(transport)), &config)?;

            let mut options = Options::new();
            options.history = history.as_deref().map(HistoryMode::parse);
            options.snippet_cache = cache.as_deref().map(StorageTag::parse);
            let data = if data.is_empty() {
                RequestData::Empty
            } else {
                RequestData::from_pairs(data)
            };

            info!(%method, %url, "issuing request");
            let payload = wire.request(&method, &url, data, options).await?;
            wire.settle().await;

            let entry = browser
                .history
                .current()
                .state
                .as_ref()
                .and_then(HistoryEntry::from_state);
            let report = json!({
                "payload": payload,
                "history": entry,
                "location": browser.history.current().url.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
