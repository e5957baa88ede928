//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use placetrust_engine::EngineConfig;

/// Placetrust CLI - Compute and inspect trust scores for places.
#[derive(Debug, Parser)]
#[command(name = "placetrust")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Places provider API key
    #[arg(long, env = "PLACES_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Database path (overrides the profile)
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (place id and score only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch reviews and compute trust scores
    Score(ScoreArgs),

    /// Show stored aggregates
    Show(ShowArgs),

    /// Show score history for a place
    History(HistoryArgs),

    /// Search for places around a coordinate
    Nearby(NearbyArgs),

    /// Rescore places on a schedule until interrupted
    Watch(WatchArgs),

    /// Manage configuration profiles
    Profile(ProfileArgs),
}

/// Engine configuration presets.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresetArg {
    /// Skip reviews the scorer fails on, clamp output
    Default,
    /// Abort on any scorer failure
    Strict,
    /// Unclamped output, single write attempt, no history
    Lenient,
}

/// Arguments for the score command.
#[derive(Debug, Parser)]
pub struct ScoreArgs {
    /// Place ids to score
    #[arg(required = true)]
    pub place_ids: Vec<String>,

    /// Engine preset (overrides the [engine] config section)
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Place id (all stored places if omitted)
    pub place_id: Option<String>,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Place id
    pub place_id: String,

    /// Maximum number of snapshots
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for the nearby command.
#[derive(Debug, Parser)]
pub struct NearbyArgs {
    /// Latitude
    #[arg(allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude
    #[arg(allow_negative_numbers = true)]
    pub longitude: f64,

    /// Search radius in metres
    #[arg(short, long, default_value = "1500")]
    pub radius: u32,

    /// Also compute trust scores for the results
    #[arg(long)]
    pub score: bool,
}

/// Arguments for the watch command.
#[derive(Debug, Parser)]
pub struct WatchArgs {
    /// Place ids to keep scored
    #[arg(required = true)]
    pub place_ids: Vec<String>,

    /// Seconds between refresh cycles (overrides config)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many cycles instead of waiting for Ctrl+C
    #[arg(long)]
    pub cycles: Option<usize>,
}

/// Arguments for the profile command.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,
        /// Places provider base URL
        #[arg(long)]
        places_url: Option<String>,
        /// Places provider API key
        #[arg(long)]
        api_key: Option<String>,
        /// Sentiment service endpoint
        #[arg(long)]
        scorer_url: Option<String>,
        /// SQLite database path
        #[arg(long)]
        database: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<PresetArg> for EngineConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => EngineConfig::default(),
            PresetArg::Strict => EngineConfig::strict(),
            PresetArg::Lenient => EngineConfig::lenient(),
        }
    }
}
