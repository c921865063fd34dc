//! Lead-time histogram rendering.
//!
//! Values are binned into [`BIN_COUNT`] equal-width bins and drawn as a PNG
//! bar chart with the plotters bitmap backend. Text needs a TrueType font;
//! when none can be found on the host the chart is drawn without text.

use anyhow::Result;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::{FontStyle, TRANSPARENT, register_font};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const BIN_COUNT: usize = 20;

pub const TITLE: &str = "Distribution of Lead-Time (Cycles Before EOL)";
pub const X_LABEL: &str = "Lead Cycles";
pub const Y_LABEL: &str = "Frequency";

/// 8 x 5 inches at 150 DPI.
pub const IMAGE_SIZE: (u32, u32) = (1200, 750);

const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);
const BAR_OPACITY: f64 = 0.7;
const GRID_OPACITY: f64 = 0.3;
const FONT_FAMILY: &str = "sans-serif";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Equal-width bins over the range of the input values.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBins {
    /// `counts.len() + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl HistogramBins {
    /// Bins `values` over `[min, max]`; the last bin is closed on the right.
    ///
    /// When all values are equal the range is widened to `[v - 0.5, v + 0.5]`.
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let (mut lo, mut hi) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if finite.is_empty() {
            (lo, hi) = (0.0, 1.0);
        } else if lo == hi {
            (lo, hi) = (lo - 0.5, hi + 0.5);
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for v in finite {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self { edges, counts }
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(left edge, right edge, count)` for every bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(edge, count)| (edge[0], edge[1], *count))
    }

    fn x_range(&self) -> std::ops::Range<f64> {
        let lo = self.edges.first().copied().unwrap_or(0.0);
        let hi = self.edges.last().copied().unwrap_or(1.0);
        let pad = (hi - lo) * 0.05;
        (lo - pad)..(hi + pad)
    }

    fn y_range(&self) -> std::ops::Range<f64> {
        0.0..(self.max_count().max(1) as f64 * 1.05)
    }

    /// Heights of the horizontal gridlines drawn when no font is available.
    fn grid_levels(&self) -> Vec<f64> {
        let max = self.max_count().max(1);
        let step = max.div_ceil(5).max(1);
        (0..=max).step_by(step).map(|level| level as f64).collect()
    }
}

/// Renders the lead-time histogram for `values` to `path` as a PNG.
#[tracing::instrument(skip(values), fields(values = values.len(), path = %path.display()))]
pub fn render_histogram(values: &[f64], path: &Path) -> Result<()> {
    let bins = HistogramBins::from_values(values, BIN_COUNT);

    if font_ready() {
        draw_labelled(&bins, path)
    } else {
        warn!("No TrueType font found; drawing histogram without text");
        draw_plain(&bins, path)
    }
}

type HistogramChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_labelled(bins: &HistogramBins, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, (FONT_FAMILY, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(bins.x_range(), bins.y_range())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(BLACK.mix(GRID_OPACITY))
        .light_line_style(TRANSPARENT)
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .axis_desc_style((FONT_FAMILY, 22))
        .label_style((FONT_FAMILY, 16))
        .draw()?;

    draw_bars(&mut chart, bins)?;
    root.present()?;
    Ok(())
}

fn draw_plain(bins: &HistogramBins, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(bins.x_range(), bins.y_range())?;

    let x = bins.x_range();
    chart.draw_series(bins.grid_levels().into_iter().map(|level| {
        PathElement::new(vec![(x.start, level), (x.end, level)], BLACK.mix(GRID_OPACITY))
    }))?;

    draw_bars(&mut chart, bins)?;
    root.present()?;
    Ok(())
}

fn draw_bars(chart: &mut HistogramChart<'_, '_>, bins: &HistogramBins) -> Result<()> {
    chart.draw_series(bins.bars().map(|(lo, hi, count)| {
        Rectangle::new(
            [(lo, 0.0), (hi, count as f64)],
            BAR_COLOR.mix(BAR_OPACITY).filled(),
        )
    }))?;
    chart.draw_series(bins.bars().filter(|(_, _, count)| *count > 0).map(
        |(lo, hi, count)| Rectangle::new([(lo, 0.0), (hi, count as f64)], BLACK.stroke_width(1)),
    ))?;
    Ok(())
}

/// Registers a TrueType font for [`FONT_FAMILY`] once per process.
///
/// `LEADTIME_FONT` is tried before the platform font locations.
fn font_ready() -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = std::env::var_os("LEADTIME_FONT")
            .map(PathBuf::from)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

        for candidate in candidates {
            let Ok(bytes) = std::fs::read(&candidate) else {
                continue;
            };
            // register_font keeps a 'static reference for the life of the process
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => {
                    debug!(font = %candidate.display(), "Registered histogram font");
                    return true;
                }
                Err(_) => debug!(font = %candidate.display(), "Skipping unreadable font"),
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_widens_range() {
        let bins = HistogramBins::from_values(&[50.0], BIN_COUNT);

        assert_eq!(bins.counts.len(), BIN_COUNT);
        assert_eq!(bins.edges.len(), BIN_COUNT + 1);
        assert_eq!(bins.edges[0], 49.5);
        assert_eq!(bins.edges[BIN_COUNT], 50.5);
        assert_eq!(bins.counts.iter().sum::<usize>(), 1);
        assert_eq!(bins.max_count(), 1);
    }

    #[test]
    fn test_max_value_lands_in_last_bin() {
        let bins = HistogramBins::from_values(&[0.0, 10.0, 20.0], 2);

        assert_eq!(bins.edges, vec![0.0, 10.0, 20.0]);
        assert_eq!(bins.counts, vec![1, 2]);
    }

    #[test]
    fn test_every_value_is_counted() {
        let values: Vec<f64> = (1..=97).map(|v| v as f64 * 3.7).collect();
        let bins = HistogramBins::from_values(&values, BIN_COUNT);

        assert_eq!(bins.counts.iter().sum::<usize>(), values.len());
        assert_eq!(bins.bars().count(), BIN_COUNT);
    }

    #[test]
    fn test_grid_levels_start_at_zero() {
        let bins = HistogramBins::from_values(&[1.0, 1.0, 1.0, 2.0], 2);
        let levels = bins.grid_levels();

        assert_eq!(levels[0], 0.0);
        assert!(levels.iter().all(|l| *l <= bins.max_count() as f64));
    }

    #[test]
    fn test_render_histogram_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lead_time_histogram.png");

        render_histogram(&[12.0, 40.0, 40.0, 75.0], &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
