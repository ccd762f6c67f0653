// Histogram of the intra-distance difference score for the first 860 pairs,
// written next to the dataset as deltaD_hist.{svg,png} and deltaD_hist_number.png.
// Takes no arguments; every parameter is the built-in default.

use anyhow::{Context, Result};
use distance_report::{generate_report, ReportConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ReportConfig::default();
    generate_report(&config).with_context(|| {
        format!("Failed to generate report from {}", config.input.path.display())
    })?;

    Ok(())
}
