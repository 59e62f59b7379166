//! Area download command.

use console::style;
use osmtagger::config::ConfigFile;
use osmtagger::coord::GeoPoint;
use osmtagger::remote::DownloadOutcome;

use super::common::start_app;
use crate::error::CliError;

/// Download the features around a point and report what was indexed.
pub fn run(lat: f64, lon: f64) -> Result<(), CliError> {
    let center = GeoPoint::checked(lat, lon).map_err(|e| CliError::Input(e.to_string()))?;

    let config = ConfigFile::load()?;
    let app = start_app(&config)?;

    println!("Downloading around {:.5}, {:.5}...", center.lat, center.lon);
    let outcome = app
        .runtime_handle()
        .block_on(app.downloader().download(center))?;

    match outcome {
        DownloadOutcome::Loaded { bbox, features, .. } => {
            println!(
                "{} {} features in {}",
                style("Loaded").green().bold(),
                features,
                bbox.to_query()
            );
            let staged = app.store().len();
            if staged > 0 {
                println!("{} edits staged locally", staged);
            }
        }
        DownloadOutcome::Stale { generation } => {
            println!("Download {} was superseded", generation);
        }
    }
    Ok(())
}
