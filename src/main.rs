use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use wayfinder::api::AppContext;
use wayfinder::{
    LanguageModel, LocationExtractor, MapPlanner, MapSession, MapboxGeocoder, MapboxRouter,
    OpenAiCompatibleClient, PlanOutcome, WayfinderConfig, telemetry, web,
};

#[derive(Parser)]
#[command(name = "wayfinder", version, about = "Free-text travel requests to map routes")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for wayfinder
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract locations and preferences from text
    Extract { text: String },
    /// Extract, geocode and route
    Plan { text: String },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WayfinderConfig::load_from_path(cli.config)?;
    telemetry::init(&config.logging, cli.verbose)?;

    let extractor = Arc::new(build_extractor(&config)?);
    let timeout = config.language_model.timeout();

    match cli.command {
        Command::Extract { text } => {
            let result = extractor
                .extract_locations_and_preferences(&text, timeout)
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Plan { text } => {
            let session = build_session(&config, extractor)?
                .context("Planning needs a Mapbox access token (WAYFINDER__MAPBOX__ACCESS_TOKEN)")?;
            match session.submit(&text).await {
                PlanOutcome::Current(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
                PlanOutcome::Superseded => anyhow::bail!("Plan was superseded"),
            }
        }
        Command::Serve { port } => {
            let session = build_session(&config, extractor.clone())?.map(Arc::new);
            if session.is_none() {
                info!("No Mapbox access token configured, /api/plan is disabled");
            }
            let ctx = AppContext {
                extractor,
                session,
                extraction_timeout: timeout,
            };
            web::run(ctx, &config.server.host, port.unwrap_or(config.server.port)).await?;
        }
    }

    Ok(())
}

fn build_extractor(config: &WayfinderConfig) -> Result<LocationExtractor> {
    let llm = &config.language_model;
    if !llm.is_enabled() {
        info!("No language model API key configured, extracting offline");
        return Ok(LocationExtractor::offline());
    }

    let client: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatibleClient::new(llm)?);
    Ok(LocationExtractor::new(Some(client), llm.use_function_calling))
}

fn build_session(
    config: &WayfinderConfig,
    extractor: Arc<LocationExtractor>,
) -> Result<Option<MapSession>> {
    if config.mapbox.access_token.is_none() {
        return Ok(None);
    }

    let planner = MapPlanner::new(
        extractor,
        Arc::new(MapboxGeocoder::new(&config.mapbox)?),
        Arc::new(MapboxRouter::new(&config.mapbox)?),
        config.language_model.timeout(),
    );
    Ok(Some(MapSession::new(planner)))
}
