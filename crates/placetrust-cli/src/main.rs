//! Placetrust CLI - Command-line interface for place trust scores.

use clap::Parser;
use placetrust_cli::commands;
use placetrust_cli::{Cli, Command, Config, Formatter, Profile};
use placetrust_engine::{EngineConfig, ScorePipeline};
use placetrust_sources::{HttpScorer, PlacesClient};
use placetrust_store::SqliteStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    // Log to stderr so table/json output on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

type LivePipeline = ScorePipeline<PlacesClient, HttpScorer, SqliteStore>;

fn build_pipeline(
    client: PlacesClient,
    profile: &Profile,
    database: &str,
    engine: EngineConfig,
) -> placetrust_cli::Result<LivePipeline> {
    let scorer = HttpScorer::new(&profile.scorer_url)?;
    let store = SqliteStore::new(database)?;
    Ok(ScorePipeline::new(client, scorer, store, engine)?)
}

fn run() -> placetrust_cli::Result<()> {
    let cli = Cli::parse();

    // Load config from the given file, or the default location
    let config_path = match &cli.config {
        Some(path) => PathBuf::from(path),
        None => Config::path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    // Override profile if specified
    if let Some(profile_name) = cli.profile.clone() {
        config.switch_profile(profile_name)?;
    }

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    if let Command::Profile(args) = cli.command {
        return commands::execute_profile(args, &mut config, &config_path, &formatter);
    }

    let profile = config.get_active_profile()?.clone();
    let database = cli.database.clone().unwrap_or_else(|| profile.database.clone());
    tracing::debug!(profile = %config.active_profile, database = %database, "using profile");
    if let Some(parent) = PathBuf::from(&database).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Command::Show(args) => {
            let store = SqliteStore::new(&database)?;
            commands::execute_show(args, &store, &formatter)?;
        }
        Command::History(args) => {
            let store = SqliteStore::new(&database)?;
            commands::execute_history(args, &store, &formatter)?;
        }
        Command::Score(args) => {
            let engine = args.preset.map(Into::into).unwrap_or(config.engine);
            let api_key = profile.resolve_api_key(cli.api_key.as_deref())?;
            let client = PlacesClient::with_base_url(&profile.places_url, api_key)?;
            let mut pipeline = build_pipeline(client, &profile, &database, engine)?;
            commands::execute_score(&args.place_ids, &mut pipeline, &formatter)?;
        }
        Command::Nearby(args) => {
            let api_key = profile.resolve_api_key(cli.api_key.as_deref())?;
            let client = PlacesClient::with_base_url(&profile.places_url, api_key)?;
            let places = commands::execute_nearby(&args, &client, &formatter)?;

            if args.score && !places.is_empty() {
                let ids: Vec<String> = places.into_iter().map(|p| p.place_id).collect();
                let mut pipeline = build_pipeline(client, &profile, &database, config.engine)?;
                commands::execute_score(&ids, &mut pipeline, &formatter)?;
            }
        }
        Command::Watch(args) => {
            let mut engine = config.engine;
            if let Some(interval) = args.interval {
                engine.refresh_interval_secs = interval;
            }
            let api_key = profile.resolve_api_key(cli.api_key.as_deref())?;
            let client = PlacesClient::with_base_url(&profile.places_url, api_key)?;
            let pipeline = build_pipeline(client, &profile, &database, engine)?;
            commands::execute_watch(args.place_ids, args.cycles, pipeline, &formatter)?;
        }
        Command::Profile(_) => {}
    }

    Ok(())
}
