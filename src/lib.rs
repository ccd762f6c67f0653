pub mod config;
pub mod dataset;
pub mod error;
pub mod histogram;
pub mod render;

pub use config::ReportConfig;
pub use dataset::{Dataset, SampleSlice};
pub use error::{ReportError, Result};
pub use histogram::Histogram;

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// The sample and the histogram computed from it.
#[derive(Debug, Clone)]
pub struct HistogramReport {
    pub sample: SampleSlice,
    pub histogram: Histogram,
}

/// An image written by [`generate_report`], with the SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
}

// Loads the sample named by the config and bins it. Nothing is drawn here.
pub fn compute_histogram(config: &ReportConfig) -> Result<HistogramReport> {
    let sample = dataset::load_sample(&config.input)?;
    let histogram = Histogram::from_values(sample.values(), config.histogram.bins)?;

    let (lo, hi) = histogram.range();
    log::info!(
        "Histogram: {} bins over [{}, {}], {} values",
        histogram.n_bins(),
        lo,
        hi,
        histogram.total()
    );

    Ok(HistogramReport { sample, histogram })
}

// Draws the vector, raster and (optionally) annotated raster variants into the
// output directory, overwriting whatever is there.
pub fn write_figures(hist: &Histogram, config: &ReportConfig) -> Result<Vec<WrittenFile>> {
    let fig = &config.figure;
    render::check_fonts(fig)?;

    let clipped = render::clipped_bins(hist, fig);
    if !clipped.is_empty() {
        log::warn!(
            "{} of {} bins fall partly outside the axis window x={:?} y={:?}",
            clipped.len(),
            hist.n_bins(),
            fig.x_limits,
            fig.y_limits
        );
        for bin in &clipped {
            log::debug!("  clipped bin [{}, {}) count {}", bin.lower, bin.upper, bin.count);
        }
    }

    fs::create_dir_all(&config.output.dir)?;

    let mut written = Vec::new();

    let vector = config.output.vector_path();
    render::save_svg(&vector, hist, fig, None)?;
    written.push(digest_file(&vector)?);

    let raster = config.output.raster_path();
    render::save_png(&raster, hist, fig, None)?;
    written.push(digest_file(&raster)?);

    if config.annotations.enabled {
        let annotated = config.output.annotated_path();
        render::save_png(&annotated, hist, fig, Some(&config.annotations))?;
        written.push(digest_file(&annotated)?);
    }

    for file in &written {
        log::info!("Wrote {} (sha256 {})", file.path.display(), file.sha256);
    }
    Ok(written)
}

// The whole run: load, bin, draw, save. Any failure aborts it.
pub fn generate_report(config: &ReportConfig) -> Result<Vec<WrittenFile>> {
    config.validate()?;
    let report = compute_histogram(config)?;
    write_figures(&report.histogram, config)
}

pub fn digest_file(path: &Path) -> Result<WrittenFile> {
    let bytes = fs::read(path)?;
    let hash = Sha256::digest(&bytes);
    Ok(WrittenFile {
        path: path.to_path_buf(),
        sha256: format!("{:x}", hash),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_table(dir: &Path, name: &str, header: &str, values: &[f64], rows: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "{}", header).unwrap();
        for i in 0..rows {
            writeln!(file, "pair_{},{}", i, values[i % values.len()]).unwrap();
        }
        path
    }

    fn config_for(input: PathBuf, out_dir: &Path) -> ReportConfig {
        let mut config = ReportConfig::default();
        config.input.path = input;
        config.output.dir = out_dir.to_path_buf();
        config
    }

    #[test]
    fn test_exact_row_count_sums_to_860() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<f64> = (0..860).map(|i| (i % 57) as f64 * 0.1).collect();
        let input = write_table(dir.path(), "t.csv", "pair,distance", &values, 860);

        let report = compute_histogram(&config_for(input, dir.path())).unwrap();
        assert_eq!(report.sample.len(), 860);
        assert_eq!(report.histogram.total(), 860);
        assert_eq!(report.histogram.n_bins(), 20);
    }

    #[test]
    fn test_longer_table_is_cut_to_row_limit() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_table(dir.path(), "t.csv", "pair,distance", &[0.5, 1.5], 1000);

        let report = compute_histogram(&config_for(input, dir.path())).unwrap();
        assert_eq!(report.sample.len(), 860);
        assert_eq!(report.sample.available(), 1000);
        assert_eq!(report.histogram.total(), 860);
    }

    #[test]
    fn test_short_table_uses_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_table(dir.path(), "t.csv", "pair,distance", &[0.5, 1.5, 2.5], 12);

        let report = compute_histogram(&config_for(input, dir.path())).unwrap();
        assert_eq!(report.sample.len(), 12);
        assert_eq!(report.histogram.total(), 12);
    }

    #[test]
    fn test_missing_column_fails_before_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let input = write_table(dir.path(), "t.csv", "pair,score", &[1.0], 5);

        let result = generate_report(&config_for(input, &out));
        assert!(matches!(result, Err(ReportError::KeyMissing { .. })));
        assert!(!out.exists());
    }

    #[test]
    fn test_end_to_end_writes_three_images() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let values = [1.0, 1.0, 2.5, 2.5, 2.5, 5.9];
        let input = write_table(dir.path(), "t.csv", "pair,distance", &values, 900);
        let config = config_for(input, &out);

        let report = compute_histogram(&config).unwrap();
        assert_eq!(report.histogram.range(), (1.0, 5.9));
        assert_eq!(report.histogram.total(), report.sample.len() as u64);
        assert_eq!(report.histogram.counts()[0], 288);
        assert_eq!(report.histogram.counts()[6], 429);
        assert_eq!(report.histogram.counts()[19], 143);

        if let Err(e) = render::check_fonts(&config.figure) {
            eprintln!("skipping rendering: {}", e);
            return;
        }

        let written = generate_report(&config).unwrap();
        let paths: Vec<PathBuf> = written.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                out.join("deltaD_hist.svg"),
                out.join("deltaD_hist.png"),
                out.join("deltaD_hist_number.png"),
            ]
        );
        for path in &paths {
            assert!(fs::metadata(path).unwrap().len() > 0);
        }

        // Annotations change the pixels
        assert_ne!(written[1].sha256, written[2].sha256);

        let again = generate_report(&config).unwrap();
        assert_eq!(written, again);
    }

    #[test]
    fn test_annotations_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let input = write_table(dir.path(), "t.csv", "pair,distance", &[0.5, 1.0, 4.0], 30);
        let mut config = config_for(input, &out);
        config.annotations.enabled = false;

        if render::check_fonts(&config.figure).is_err() {
            return;
        }

        let written = generate_report(&config).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!out.join("deltaD_hist_number.png").exists());
    }

    #[test]
    fn test_digest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        let file = digest_file(&path).unwrap();
        assert_eq!(
            file.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
