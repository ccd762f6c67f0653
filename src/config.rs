//! Report configuration.
//!
//! Every parameter of a report run lives in [`ReportConfig`]. The defaults
//! reproduce the published deltaD figure (860 rows, 20 bins, a 5x5 inch
//! figure with the axis window fixed to X `[0, 6]` and Y `[0, 280]`), so a
//! run without a config file needs no arguments at all. A TOML file may
//! override any subset of fields.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest canvas, in pixels, a figure may be drawn on.
pub const MAX_CANVAS_PIXELS: u64 = 64_000_000;

/// Most tick positions a single axis may ask for.
pub const MAX_TICKS: f64 = 1000.0;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub input: InputConfig,
    pub histogram: HistogramConfig,
    pub figure: FigureConfig,
    pub annotations: AnnotationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub path: PathBuf,
    pub column: String,
    /// Single-byte field separator.
    pub delimiter: char,
    pub row_limit: usize,
    /// Fail instead of shrinking the sample when the table is shorter than `row_limit`.
    pub strict_row_limit: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            path: PathBuf::from("../output/mostdiff_files_seq_cluster70_merge.csv"),
            column: "distance".to_string(),
            delimiter: ',',
            row_limit: 860,
            strict_row_limit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramConfig {
    pub bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig { bins: 20 }
    }
}

/// Half-open tick sequence `start, start + step, ...` below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TickSpec {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl TickSpec {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        TickSpec { start, stop, step }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite())
            || self.step <= 0.0
        {
            return Err(ReportError::Config(format!(
                "figure.{} must be finite with a positive step, got {:?}",
                name, self
            )));
        }
        if (self.stop - self.start) / self.step > MAX_TICKS {
            return Err(ReportError::Config(format!(
                "figure.{} would place more than {} ticks",
                name, MAX_TICKS
            )));
        }
        Ok(())
    }

    /// Tick positions that fall inside the closed window `[lo, hi]`.
    pub fn points_within(&self, lo: f64, hi: f64) -> Vec<f64> {
        if self.step <= 0.0 || self.stop <= self.start {
            return Vec::new();
        }
        let n = ((self.stop - self.start) / self.step).ceil().min(MAX_TICKS) as usize;
        let eps = self.step * 1e-9;
        (0..n)
            .map(|i| self.start + i as f64 * self.step)
            .filter(|v| *v >= lo - eps && *v <= hi + eps)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FigureConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,
    pub font_family: String,
    pub font_size_pt: f64,
    pub bold: bool,
    /// Fraction of the bin width covered by each bar.
    pub bar_width_ratio: f64,
    /// Bar fill as `#rrggbb`.
    pub bar_color: String,
    pub x_label: String,
    pub y_label: String,
    pub x_limits: [f64; 2],
    pub y_limits: [f64; 2],
    /// Whitespace kept around the drawn content when cropping.
    pub tight_padding_in: f64,
    pub x_ticks: TickSpec,
    pub y_ticks: TickSpec,
}

impl Default for FigureConfig {
    fn default() -> Self {
        FigureConfig {
            width_in: 5.0,
            height_in: 5.0,
            dpi: 100.0,
            font_family: "sans-serif".to_string(),
            font_size_pt: 15.0,
            bold: true,
            bar_width_ratio: 0.8,
            bar_color: "#1f77b4".to_string(),
            x_label: "Intra-distance difference score (Å)".to_string(),
            y_label: "Count".to_string(),
            x_limits: [0.0, 6.0],
            y_limits: [0.0, 280.0],
            tight_padding_in: 0.1,
            x_ticks: TickSpec::new(0.0, 8.0, 2.0),
            y_ticks: TickSpec::new(0.0, 350.0, 70.0),
        }
    }
}

impl FigureConfig {
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    pub fn pt_to_px(&self, pt: f64) -> f64 {
        pt * self.dpi / 72.0
    }

    pub fn padding_px(&self) -> u32 {
        (self.tight_padding_in * self.dpi).round() as u32
    }

    pub fn bar_rgb(&self) -> Result<(u8, u8, u8)> {
        parse_hex_color(&self.bar_color)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationConfig {
    pub enabled: bool,
    pub font_size_pt: f64,
    /// Horizontal offset from the bin's lower edge, in data units.
    pub x_offset: f64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            enabled: true,
            font_size_pt: 8.0,
            x_offset: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub stem: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("../output"),
            stem: "deltaD_hist".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn vector_path(&self) -> PathBuf {
        self.dir.join(format!("{}.svg", self.stem))
    }

    pub fn raster_path(&self) -> PathBuf {
        self.dir.join(format!("{}.png", self.stem))
    }

    pub fn annotated_path(&self) -> PathBuf {
        self.dir.join(format!("{}_number.png", self.stem))
    }
}

impl ReportConfig {
    /// Load a configuration from a TOML file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ReportError::Config(msg) => ReportError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ReportConfig =
            toml::from_str(content).map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReportError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let fig = &self.figure;
        if self.histogram.bins == 0 {
            return Err(ReportError::Config("histogram.bins must be at least 1".into()));
        }
        if !self.input.delimiter.is_ascii() {
            return Err(ReportError::Config(format!(
                "input.delimiter must be a single ASCII character, got {:?}",
                self.input.delimiter
            )));
        }
        if self.input.column.is_empty() {
            return Err(ReportError::Config("input.column must not be empty".into()));
        }
        for (name, [lo, hi]) in [("x_limits", fig.x_limits), ("y_limits", fig.y_limits)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(ReportError::Config(format!(
                    "figure.{} must be finite with lower < upper, got [{}, {}]",
                    name, lo, hi
                )));
            }
        }
        if !(fig.bar_width_ratio > 0.0 && fig.bar_width_ratio <= 1.0) {
            return Err(ReportError::Config(format!(
                "figure.bar_width_ratio must be in (0, 1], got {}",
                fig.bar_width_ratio
            )));
        }
        let (w, h) = fig.pixel_size();
        if w == 0 || h == 0 {
            return Err(ReportError::Config("figure size must be positive".into()));
        }
        let px_w = fig.width_in * fig.dpi;
        let px_h = fig.height_in * fig.dpi;
        if !(px_w.is_finite() && px_h.is_finite()) || px_w * px_h > MAX_CANVAS_PIXELS as f64 {
            return Err(ReportError::Config(format!(
                "figure of {}x{} in at {} dpi exceeds {} pixels",
                fig.width_in, fig.height_in, fig.dpi, MAX_CANVAS_PIXELS
            )));
        }
        for (name, ticks) in [("x_ticks", fig.x_ticks), ("y_ticks", fig.y_ticks)] {
            ticks.validate(name)?;
        }
        if fig.font_size_pt <= 0.0 || self.annotations.font_size_pt <= 0.0 {
            return Err(ReportError::Config("font sizes must be positive".into()));
        }
        if fig.tight_padding_in < 0.0 {
            return Err(ReportError::Config("figure.tight_padding_in must not be negative".into()));
        }
        fig.bar_rgb()?;
        if self.output.stem.is_empty() {
            return Err(ReportError::Config("output.stem must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_hex_color(s: &str) -> Result<(u8, u8, u8)> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let invalid = || ReportError::Config(format!("invalid color '{}', expected #rrggbb", s));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_published_figure() {
        let config = ReportConfig::default();
        assert_eq!(config.input.column, "distance");
        assert_eq!(config.input.row_limit, 860);
        assert_eq!(config.histogram.bins, 20);
        assert_eq!(config.figure.pixel_size(), (500, 500));
        assert_eq!(config.figure.x_limits, [0.0, 6.0]);
        assert_eq!(config.figure.y_limits, [0.0, 280.0]);
        assert!(config.annotations.enabled);
        assert_eq!(config.output.raster_path(), PathBuf::from("../output/deltaD_hist.png"));
        assert_eq!(
            config.output.annotated_path(),
            PathBuf::from("../output/deltaD_hist_number.png")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_content = r#"
            [input]
            path = "data/table.tsv"
            delimiter = "\t"

            [histogram]
            bins = 10
        "#;

        let config = ReportConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input.path, PathBuf::from("data/table.tsv"));
        assert_eq!(config.input.delimiter, '\t');
        assert_eq!(config.input.row_limit, 860);
        assert_eq!(config.histogram.bins, 10);
        assert_eq!(config.figure, FigureConfig::default());
    }

    #[test]
    fn test_default_config_round_trips() {
        let config = ReportConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = ReportConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let result = ReportConfig::from_toml_str("[histogram]\nbinz = 3\n");
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_bins = ReportConfig::from_toml_str("[histogram]\nbins = 0\n");
        assert!(matches!(zero_bins, Err(ReportError::Config(_))));

        let inverted = ReportConfig::from_toml_str("[figure]\nx_limits = [6.0, 0.0]\n");
        assert!(matches!(inverted, Err(ReportError::Config(_))));

        let bad_color = ReportConfig::from_toml_str("[figure]\nbar_color = \"blue\"\n");
        assert!(matches!(bad_color, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_rejects_oversized_figure() {
        let mut config = ReportConfig::default();
        config.figure.dpi = 20000.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
        assert!(err.to_string().contains("exceeds"));

        let huge = ReportConfig::from_toml_str("[figure]\nwidth_in = 1e30\n");
        assert!(matches!(huge, Err(ReportError::Config(_))));

        config.figure.dpi = 1000.0;
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_dense_ticks() {
        let mut config = ReportConfig::default();
        config.figure.x_ticks = TickSpec::new(0.0, 8.0, 1e-12);
        assert!(matches!(config.validate(), Err(ReportError::Config(_))));

        config.figure.x_ticks = TickSpec::new(0.0, 8.0, 0.0);
        assert!(matches!(config.validate(), Err(ReportError::Config(_))));

        config.figure.x_ticks = TickSpec::new(0.0, 8.0, 0.01);
        config.validate().unwrap();
    }

    #[test]
    fn test_tick_points() {
        let x = TickSpec::new(0.0, 8.0, 2.0);
        assert_eq!(x.points_within(0.0, 6.0), vec![0.0, 2.0, 4.0, 6.0]);

        let y = TickSpec::new(0.0, 350.0, 70.0);
        assert_eq!(y.points_within(0.0, 280.0), vec![0.0, 70.0, 140.0, 210.0, 280.0]);

        assert!(TickSpec::new(0.0, 1.0, 0.0).points_within(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1f77b4").unwrap(), (0x1f, 0x77, 0xb4));
        assert_eq!(parse_hex_color("ffffff").unwrap(), (255, 255, 255));
        assert!(parse_hex_color("#12345").is_err());
    }
}
