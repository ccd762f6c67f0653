//! Drawing the histogram figure and writing it to disk.
//!
//! The figure is laid out on a fixed canvas (figure size times dpi), grown
//! only where count labels overflow it, then cropped to the drawn content
//! plus a small pad. Raster output is cropped pixel by pixel. Vector output
//! gets the same crop box applied as its `viewBox`, measured on a raster
//! pass of the identical layout.

use crate::config::{AnnotationConfig, FigureConfig, MAX_CANVAS_PIXELS};
use crate::error::{ReportError, Result};
use crate::histogram::{Bin, Histogram};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fs;
use std::path::Path;

fn render_error<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Byte length of an RGB buffer for a `width` x `height` canvas.
pub fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| {
            ReportError::Config(format!("canvas of {}x{} pixels is too large", width, height))
        })
}

/// Pixel rectangle kept when cropping a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// Bounding box of every non-white pixel in an RGB buffer, grown by
    /// `padding` and clamped to the canvas. A blank canvas is kept whole.
    pub fn of_content(buffer: &[u8], (width, height): (u32, u32), padding: u32) -> CropBox {
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let row_len = (width as usize).max(1);

        for (i, px) in buffer.chunks_exact(3).enumerate() {
            if px == [255, 255, 255] {
                continue;
            }
            let x = i % row_len;
            let y = i / row_len;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if min_x == usize::MAX {
            return CropBox {
                x: 0,
                y: 0,
                width,
                height,
            };
        }

        // Content coordinates come from a canvas at most `width` x `height`
        let (min_x, min_y, max_x, max_y) = (min_x as u32, min_y as u32, max_x as u32, max_y as u32);
        let x0 = min_x.saturating_sub(padding);
        let y0 = min_y.saturating_sub(padding);
        let x1 = max_x.saturating_add(padding).min(width - 1);
        let y1 = max_y.saturating_add(padding).min(height - 1);
        CropBox {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        }
    }

    /// Copies the boxed region out of an RGB buffer `canvas_width` pixels wide.
    pub fn extract(&self, buffer: &[u8], canvas_width: u32) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(rgb_len(self.width, self.height)?);
        let row_bytes = self.width as usize * 3;
        for row in self.y as usize..self.y as usize + self.height as usize {
            let start = (row * canvas_width as usize + self.x as usize) * 3;
            let pixels = buffer.get(start..start + row_bytes).ok_or_else(|| {
                ReportError::Render(format!("crop box {:?} exceeds the canvas", self))
            })?;
            out.extend_from_slice(pixels);
        }
        Ok(out)
    }
}

/// Horizontal extent of the bar drawn for `bin`.
pub fn bar_extent(bin: &Bin, width_ratio: f64) -> (f64, f64) {
    let bin_width = bin.upper - bin.lower;
    let x0 = bin.lower + bin_width * (1.0 - width_ratio) / 2.0;
    (x0, x0 + bin_width * width_ratio)
}

/// Non-empty bins whose bar is not fully inside the figure's axis window.
pub fn clipped_bins(hist: &Histogram, fig: &FigureConfig) -> Vec<Bin> {
    let [x_lo, x_hi] = fig.x_limits;
    let [y_lo, y_hi] = fig.y_limits;
    hist.bins()
        .filter(|bin| bin.count > 0)
        .filter(|bin| {
            let (x0, x1) = bar_extent(bin, fig.bar_width_ratio);
            x0 < x_lo || x1 > x_hi || (bin.count as f64) > y_hi || y_lo > 0.0
        })
        .collect()
}

fn label_font(fig: &FigureConfig, size_pt: f64) -> FontDesc<'_> {
    let style = if fig.bold {
        FontStyle::Bold
    } else {
        FontStyle::Normal
    };
    FontDesc::new(
        FontFamily::from(fig.font_family.as_str()),
        fig.pt_to_px(size_pt),
        style,
    )
}

/// Fails early when the configured font family cannot be loaded.
pub fn check_fonts(fig: &FigureConfig) -> Result<()> {
    label_font(fig, fig.font_size_pt)
        .box_size("0")
        .map(|_| ())
        .map_err(|e| {
            ReportError::Render(format!("cannot load font '{}': {}", fig.font_family, e))
        })
}

fn format_tick(v: &f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

// Space reserved around the plot area of the configured figure, in pixels.
struct Frame {
    margin: u32,
    x_label_area: u32,
    y_label_area: u32,
}

impl Frame {
    fn of(fig: &FigureConfig) -> Frame {
        let font_px = fig.pt_to_px(fig.font_size_pt);
        Frame {
            margin: (font_px * 0.8) as u32,
            x_label_area: (font_px * 3.0) as u32,
            y_label_area: (font_px * 3.6) as u32,
        }
    }

    fn plot_size(&self, fig: &FigureConfig) -> (f64, f64) {
        let (w, h) = fig.pixel_size();
        (
            w as f64 - 2.0 * self.margin as f64 - self.y_label_area as f64,
            h as f64 - 2.0 * self.margin as f64 - self.x_label_area as f64,
        )
    }
}

/// Anchor and text of every count label: one per non-empty bin, at the
/// bin's lower edge plus the configured offset and at the bin's height.
pub fn count_labels<'a>(
    hist: &'a Histogram,
    ann: &'a AnnotationConfig,
) -> impl Iterator<Item = ((f64, f64), String)> + 'a {
    hist.bins()
        .filter(|bin| bin.count > 0)
        .map(move |bin| ((bin.lower + ann.x_offset, bin.count as f64), bin.count.to_string()))
}

/// Canvas for one drawing: the configured figure, plus room on each side
/// for count labels that land outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub canvas: (u32, u32),
    /// Top-left corner of the configured figure inside the canvas.
    pub origin: (u32, u32),
}

impl Layout {
    pub fn new(
        hist: &Histogram,
        fig: &FigureConfig,
        annotations: Option<&AnnotationConfig>,
    ) -> Layout {
        let (w, h) = fig.pixel_size();
        let plain = Layout {
            canvas: (w, h),
            origin: (0, 0),
        };
        let ann = match annotations {
            Some(ann) => ann,
            None => return plain,
        };

        let frame = Frame::of(fig);
        let (pw, ph) = frame.plot_size(fig);
        if pw <= 0.0 || ph <= 0.0 {
            return plain;
        }
        let [x_lo, x_hi] = fig.x_limits;
        let [y_lo, y_hi] = fig.y_limits;
        let m = frame.margin as f64;
        let label_px = fig.pt_to_px(ann.font_size_pt);
        let pad = fig.padding_px() as f64;

        // Overflow past each canvas edge, measured from the plot area's bottom-left corner
        let (mut left, mut right, mut top, mut bottom) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for ((x, y), text) in count_labels(hist, ann) {
            let cx = (x - x_lo) / (x_hi - x_lo) * pw;
            let cy = (y - y_lo) / (y_hi - y_lo) * ph;
            let half_width = text.len() as f64 * label_px * 0.35;
            left = left.max(half_width - cx - m - frame.y_label_area as f64 + pad);
            right = right.max(cx + half_width - pw - m + pad);
            top = top.max(cy + label_px - ph - m + pad);
            bottom = bottom.max(-cy - m - frame.x_label_area as f64 + pad);
        }

        let grow = |overflow: f64, limit: u32| overflow.min(limit as f64).ceil() as u32;
        let (left, right) = (grow(left, w), grow(right, w));
        let (top, bottom) = (grow(top, h), grow(bottom, h));
        let canvas = (w + left + right, h + top + bottom);

        if canvas.0 as u64 * canvas.1 as u64 > MAX_CANVAS_PIXELS {
            log::warn!(
                "Count labels need a {}x{} canvas; drawing on {}x{} and cutting them off",
                canvas.0,
                canvas.1,
                w,
                h
            );
            return plain;
        }
        if canvas != plain.canvas {
            log::debug!("Canvas grown to {:?} to fit count labels", canvas);
        }
        Layout {
            canvas,
            origin: (left, top),
        }
    }
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    hist: &Histogram,
    fig: &FigureConfig,
    annotations: Option<&AnnotationConfig>,
    layout: &Layout,
) -> Result<()> {
    let [x_lo, x_hi] = fig.x_limits;
    let [y_lo, y_hi] = fig.y_limits;
    let (r, g, b) = fig.bar_rgb()?;
    let font = label_font(fig, fig.font_size_pt);
    let frame = Frame::of(fig);

    root.fill(&WHITE).map_err(render_error)?;

    let (w, h) = fig.pixel_size();
    let (ox, oy) = layout.origin;
    let figure = root.margin(
        oy,
        layout.canvas.1 - oy - h,
        ox,
        layout.canvas.0 - ox - w,
    );

    let mut chart = ChartBuilder::on(&figure)
        .margin(frame.margin)
        .x_label_area_size(frame.x_label_area)
        .y_label_area_size(frame.y_label_area)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(render_error)?;

    // Axis descriptions only; tick marks and labels are drawn below at fixed positions
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_labels(0)
        .x_desc(fig.x_label.as_str())
        .y_desc(fig.y_label.as_str())
        .axis_desc_style(font.clone())
        .draw()
        .map_err(render_error)?;

    // Bars are clipped to the axis window; the counts themselves are untouched
    let bar_style = RGBColor(r, g, b).filled();
    let bars = hist
        .bins()
        .filter(|bin| bin.count > 0)
        .filter_map(|bin| {
            let (x0, x1) = bar_extent(&bin, fig.bar_width_ratio);
            let (x0, x1) = (x0.max(x_lo), x1.min(x_hi));
            let (y0, y1) = (y_lo.max(0.0), (bin.count as f64).min(y_hi));
            (x0 < x1 && y0 < y1).then(|| Rectangle::new([(x0, y0), (x1, y1)], bar_style))
        });
    chart.draw_series(bars).map_err(render_error)?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(x_lo, y_lo), (x_hi, y_hi)],
            BLACK.stroke_width(1),
        )))
        .map_err(render_error)?;

    let tick_len = fig.pt_to_px(3.5).round() as i32;
    let tick_pad = fig.pt_to_px(3.5).round() as i32;
    let x_label_style = TextStyle::from(font.clone()).pos(Pos::new(HPos::Center, VPos::Top));
    for x in fig.x_ticks.points_within(x_lo, x_hi) {
        let (px, py) = chart.backend_coord(&(x, y_lo));
        root.draw(&PathElement::new(vec![(px, py), (px, py + tick_len)], BLACK.stroke_width(1)))
            .map_err(render_error)?;
        root.draw(&Text::new(format_tick(&x), (px, py + tick_len + tick_pad), x_label_style.clone()))
            .map_err(render_error)?;
    }
    let y_label_style = TextStyle::from(font.clone()).pos(Pos::new(HPos::Right, VPos::Center));
    for y in fig.y_ticks.points_within(y_lo, y_hi) {
        let (px, py) = chart.backend_coord(&(x_lo, y));
        root.draw(&PathElement::new(vec![(px - tick_len, py), (px, py)], BLACK.stroke_width(1)))
            .map_err(render_error)?;
        root.draw(&Text::new(format_tick(&y), (px - tick_len - tick_pad, py), y_label_style.clone()))
            .map_err(render_error)?;
    }

    // Count labels go on the whole canvas so bins taller or wider than the window keep theirs
    if let Some(ann) = annotations {
        let text_style = TextStyle::from(label_font(fig, ann.font_size_pt))
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        for (anchor, text) in count_labels(hist, ann) {
            let pos = chart.backend_coord(&anchor);
            root.draw(&Text::new(text, pos, text_style.clone()))
                .map_err(render_error)?;
        }
    }

    root.present().map_err(render_error)?;
    Ok(())
}

/// Draws the figure into an in-memory RGB canvas laid out by `layout`.
pub fn rasterize(
    hist: &Histogram,
    fig: &FigureConfig,
    annotations: Option<&AnnotationConfig>,
    layout: &Layout,
) -> Result<Vec<u8>> {
    let (width, height) = layout.canvas;
    let mut buffer = vec![0u8; rgb_len(width, height)?];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_figure(&root, hist, fig, annotations, layout)?;
    }
    Ok(buffer)
}

/// Writes the figure as a PNG cropped to its content.
pub fn save_png(
    path: &Path,
    hist: &Histogram,
    fig: &FigureConfig,
    annotations: Option<&AnnotationConfig>,
) -> Result<CropBox> {
    let layout = Layout::new(hist, fig, annotations);
    let canvas = rasterize(hist, fig, annotations, &layout)?;
    let crop = CropBox::of_content(&canvas, layout.canvas, fig.padding_px());
    let pixels = crop.extract(&canvas, layout.canvas.0)?;

    let mut backend = BitMapBackend::new(path, (crop.width, crop.height));
    backend
        .blit_bitmap((0, 0), (crop.width, crop.height), &pixels)
        .map_err(render_error)?;
    backend.present().map_err(render_error)?;

    log::debug!(
        "Wrote {} ({}x{} cropped from {:?})",
        path.display(),
        crop.width,
        crop.height,
        layout.canvas
    );
    Ok(crop)
}

/// Writes the figure as an SVG whose viewBox is cropped to its content.
pub fn save_svg(
    path: &Path,
    hist: &Histogram,
    fig: &FigureConfig,
    annotations: Option<&AnnotationConfig>,
) -> Result<CropBox> {
    let layout = Layout::new(hist, fig, annotations);
    let canvas = rasterize(hist, fig, annotations, &layout)?;
    let crop = CropBox::of_content(&canvas, layout.canvas, fig.padding_px());

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, layout.canvas).into_drawing_area();
        draw_figure(&root, hist, fig, annotations, &layout)?;
    }
    let svg = crop_svg(&svg, &crop)?;
    fs::write(path, svg)?;

    log::debug!("Wrote {} (viewBox {:?})", path.display(), crop);
    Ok(crop)
}

// Replaces the root element's size attributes so viewers show only the crop box.
fn crop_svg(svg: &str, crop: &CropBox) -> Result<String> {
    let start = svg
        .find("<svg")
        .ok_or_else(|| ReportError::Render("SVG output has no <svg> element".into()))?;
    let end = svg[start..]
        .find('>')
        .map(|i| start + i + 1)
        .ok_or_else(|| ReportError::Render("SVG output has an unterminated <svg> tag".into()))?;

    let root = format!(
        "<svg width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\" xmlns=\"http://www.w3.org/2000/svg\">",
        x = crop.x,
        y = crop.y,
        w = crop.width,
        h = crop.height
    );
    Ok(format!("{}{}{}", &svg[..start], root, &svg[end..]))
}
