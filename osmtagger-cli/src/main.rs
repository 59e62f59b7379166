//! osmtagger - tag OpenStreetMap features from the command line.
//!
//! Looks up presets for a set of tags, downloads the features around a
//! point, searches for tagged features through Overpass, and uploads staged
//! edits as a changeset.

mod commands;
mod error;
mod prompt;

use clap::{Parser, Subcommand};
use console::style;
use osmtagger::config::ConfigFile;
use osmtagger::logging::{init_logging, LoggingConfig};
use osmtagger::remote::DEFAULT_SEARCH_HALF_EXTENT;
use tracing::debug;

use commands::config::ConfigCommands;
use commands::pending::PendingCommands;
use commands::presets::PresetCommands;
use commands::search::SearchScope;
use error::CliError;

#[derive(Parser)]
#[command(name = "osmtagger")]
#[command(version, about = "Tag editing for OpenStreetMap", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and change settings in config.ini
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Look up tagging presets
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },

    /// Inspect staged edits
    Pending {
        #[command(subcommand)]
        command: PendingCommands,
    },

    /// Download the features around a point
    Download {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Find features carrying a tag through Overpass
    Search {
        /// Tag to look for, as key or key=value
        filter: String,

        /// Latitude of the search center
        #[arg(long, allow_hyphen_values = true, requires = "lon", conflicts_with = "area")]
        lat: Option<f64>,

        /// Longitude of the search center
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Half size of the search box in degrees
        #[arg(long, default_value_t = DEFAULT_SEARCH_HALF_EXTENT)]
        half_extent: f64,

        /// Search inside the area with this name instead of a box
        #[arg(long)]
        area: Option<String>,
    },

    /// Log in to the OSM server
    Login,

    /// Forget the stored access token
    Logout,

    /// Upload staged edits as one changeset
    Submit {
        /// Changeset comment; generated from the edits when omitted
        #[arg(short, long)]
        comment: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = ConfigFile::load().unwrap_or_default();
    let mut logging = LoggingConfig::from(&config.logging);
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    let _guard = match init_logging(&logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow(), e);
            None
        }
    };
    debug!(version = osmtagger::VERSION, "osmtagger starting");

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Presets { command } => commands::presets::run(command),
        Commands::Pending { command } => commands::pending::run(command),
        Commands::Download { lat, lon } => commands::download::run(lat, lon),
        Commands::Search {
            filter,
            lat,
            lon,
            half_extent,
            area,
        } => commands::search::run(
            &filter,
            SearchScope {
                lat,
                lon,
                half_extent,
                area,
            },
        ),
        Commands::Login => commands::auth::login(),
        Commands::Logout => commands::auth::logout(),
        Commands::Submit { comment } => commands::submit::run(comment),
    }
}
