use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use postcode_core::{ClientConfig, Error, FileCache, PostcodeClient};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Look up Dutch addresses by postcode and house number")]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// API key sent as X-API-Key. Without one the sandbox is always used.
    #[clap(long, env = "POSTCODE_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Use the production endpoint (requires an API key)
    #[clap(long, global = true)]
    production: bool,

    /// Do not read or write cached lookups
    #[clap(long, global = true)]
    no_cache: bool,

    /// Directory holding cached lookups
    #[clap(long, env = "POSTCODE_API_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "POSTCODE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommands {
    /// Look up the address for a postcode and house number
    Lookup(LookupOptions),

    /// Remove all cached lookups
    ClearCache,
}

#[derive(Debug, clap::Args)]
pub struct LookupOptions {
    /// Postcode, e.g. "6545 CA"
    postcode: String,

    /// House number; additions such as "29a" are ignored
    number: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl Global {
    /// Environment values first, then command-line overrides.
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if self.api_key.is_some() {
            config.api_key = self.api_key.clone();
        }
        if self.production {
            config.use_sandbox = false;
        }
        if self.no_cache {
            config.use_cache = false;
        }
        config
    }

    fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs_next::cache_dir()
                .map(|dir| dir.join("postcode-api"))
                .ok_or_else(|| eyre!("Unable to determine cache directory")),
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let app = App::parse();

    let default_filter = if app.global.verbose {
        "postcode_core=debug,postcode=debug"
    } else {
        "postcode_core=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = app.global.client_config();
    let cache_dir = app.global.cache_dir()?;
    debug!(base_url = config.base_url(), cache_dir = %cache_dir.display(), "client configured");
    let client = PostcodeClient::new(&config, Arc::new(FileCache::new(cache_dir)));

    match app.command {
        SubCommands::Lookup(options) => lookup(&client, &options),
        SubCommands::ClearCache => Ok(clear_cache(&client)),
    }
}

fn lookup(client: &PostcodeClient, options: &LookupOptions) -> Result<ExitCode> {
    let address = client.retrieve(&options.postcode, &options.number)?;
    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(address.to_mapping()))?
        );
    } else {
        println!("{address}");
    }
    Ok(ExitCode::SUCCESS)
}

fn clear_cache(client: &PostcodeClient) -> ExitCode {
    match client.clear_cache() {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::CacheClear(message)) => {
            println!("Failed to clear cache: {message}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        App::command().debug_assert();
    }

    #[test]
    fn parses_lookup() {
        let app = App::try_parse_from(["postcode", "lookup", "6545 CA", "29", "--json"]).unwrap();
        match app.command {
            SubCommands::Lookup(options) => {
                assert_eq!(options.postcode, "6545 CA");
                assert_eq!(options.number, "29");
                assert!(options.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let app = App::try_parse_from([
            "postcode",
            "clear-cache",
            "--production",
            "--no-cache",
            "--api-key",
            "secret",
        ])
        .unwrap();
        let config = app.global.client_config();
        assert!(!config.use_sandbox);
        assert!(!config.use_cache);
        assert!(config.uses_production());
    }

    #[test]
    fn clear_cache_without_cache_fails() {
        let config = postcode_core::ClientConfig {
            use_cache: false,
            ..postcode_core::ClientConfig::default()
        };
        let client = PostcodeClient::new(&config, Arc::new(postcode_core::MemoryCache::new()));
        assert_eq!(clear_cache(&client), ExitCode::FAILURE);
    }
}
