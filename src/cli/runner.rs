//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::context::TapContext;
use crate::engine::{SyncConfig, SyncEngine};
use crate::error::{Error, Result, ResultExt};
use crate::http::Transport;
use crate::output::{JsonLinesSink, ParquetSink, RecordSink};
use crate::schema::{stream_ids, Catalog};
use crate::state::StateManager;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Discover => self.discover(),
            Commands::Read {
                streams,
                config_json,
                output,
                continue_on_error,
            } => {
                self.read(
                    streams.as_deref(),
                    config_json.as_deref(),
                    output.as_deref(),
                    *continue_on_error,
                )
                .await
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration
    fn load_config(&self, inline: Option<&str>) -> Result<TapConfig> {
        // Inline config takes precedence
        if let Some(json_str) = inline {
            return TapConfig::from_json(json_str);
        }

        match &self.cli.config {
            Some(path) => TapConfig::from_file(path),
            None => Err(Error::config(
                "Config not specified (use -C or --config-json)",
            )),
        }
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Streams to sync: `--streams`, else the catalog selection, else all
    fn selected_streams(&self, streams: Option<&str>) -> Result<Vec<String>> {
        let requested: Vec<String> = streams
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let mut catalog = match &self.cli.catalog {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::discover(),
        };

        if !requested.is_empty() {
            catalog.select(&requested)?;
        }
        catalog.selected_stream_ids()
    }

    /// Sink for `read`; schema and state always go to stdout
    fn build_sink(&self, output: Option<&Path>) -> Result<Box<dyn RecordSink>> {
        let stdout = JsonLinesSink::new(std::io::stdout());
        match self.cli.format {
            OutputFormat::Json => Ok(Box::new(stdout)),
            OutputFormat::Pretty => Ok(Box::new(stdout.pretty())),
            OutputFormat::Parquet => {
                let dir = output.ok_or_else(|| {
                    Error::config("Parquet output requires an output directory (use -o)")
                })?;
                Ok(Box::new(ParquetSink::new(dir, Box::new(stdout))))
            }
        }
    }

    /// Check connection
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let client = crate::http::FrontClient::from_tap_config(&config)?;

        info!("Checking connection to {}", config.base_url);

        match client.check_credentials().await {
            Ok(_) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": "Connection successful"
                    }
                }));
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": format!("Connection failed: {e}")
                    }
                }));
            }
        }

        Ok(())
    }

    /// Print the catalog
    fn discover(&self) -> Result<()> {
        let catalog = Catalog::discover();
        self.output_message(&serde_json::to_value(&catalog)?);
        Ok(())
    }

    /// List available streams
    fn streams(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "STREAMS",
            "streams": stream_ids(),
        }));
        Ok(())
    }

    /// Sync the selected streams
    async fn read(
        &self,
        streams: Option<&str>,
        config_json: Option<&str>,
        output: Option<&Path>,
        continue_on_error: bool,
    ) -> Result<()> {
        let config = self.load_config(config_json)?;
        let state = self.load_state()?;
        let ctx = TapContext::new(config, state)?;

        let stream_ids = self.selected_streams(streams)?;
        if stream_ids.is_empty() {
            info!("No streams selected");
            return Ok(());
        }

        let client: Arc<dyn Transport> = Arc::new(ctx.client()?);
        let mut engine = SyncEngine::from_context(&ctx, client)?
            .with_config(SyncConfig::new().with_fail_fast(!continue_on_error));
        let mut sink = self.build_sink(output)?;

        let result = engine.run(&stream_ids, sink.as_mut()).await;
        sink.finish().context("Failed to finish output")?;
        let stats = result?;

        info!(
            "Read complete: {} records in {} windows ({} reports skipped, {} errors, {} ms)",
            stats.records_synced,
            stats.windows_synced,
            stats.reports_skipped,
            stats.errors,
            stats.duration_ms
        );

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json | OutputFormat::Parquet => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
