//! Purchase aggregation and pie chart rendering.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Utc};
use plotters::prelude::*;
use segment_enrich_core::EnrichedRecord;
use tracing::{info, instrument};

use crate::pipeline::log::scan_log;

use super::ExportError;

/// Number of products shown in the chart.
pub const TOP_PURCHASES: usize = 10;

const CHART_SIZE: (u32, u32) = (1200, 900);
const PIE_CENTER: (i32, i32) = (430, 520);
const PIE_RADIUS: f64 = 290.0;
const LEGEND_X: i32 = 820;
const LEGEND_Y: i32 = 260;
const LEGEND_ROW: i32 = 34;
const MAX_LABEL_CHARS: usize = 38;
const FONT: &str = "sans-serif";

static PALETTE: [RGBColor; TOP_PURCHASES] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Purchase counts keyed by `title (SKU: sku)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseCounts {
    counts: HashMap<String, usize>,
}

impl PurchaseCounts {
    /// Count the most recent orders of `records`. Records without an order
    /// are not counted.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EnrichedRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.add(record);
        }
        counts
    }

    /// Stream the enriched log at `path` and count its orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or read.
    pub async fn from_log(path: &Path) -> Result<Self, ExportError> {
        let mut counts = Self::default();
        scan_log(path, |record| counts.add(&record)).await?;
        Ok(counts)
    }

    fn add(&mut self, record: &EnrichedRecord) {
        if let Some(order) = &record.most_recent_order {
            *self.counts.entry(order.purchase_key()).or_default() += 1;
        }
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no purchase was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent products, by count descending then key ascending.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

/// Title block shown above the chart.
#[derive(Debug, Clone)]
pub struct ChartSummary {
    pub segment_name: String,
    pub total_profiles: usize,
    pub generated_at: DateTime<Utc>,
}

impl ChartSummary {
    /// Summary stamped with the current time.
    #[must_use]
    pub fn new(segment_name: impl Into<String>, total_profiles: usize) -> Self {
        Self {
            segment_name: segment_name.into(),
            total_profiles,
            generated_at: Utc::now(),
        }
    }

    fn lines(&self) -> [String; 3] {
        [
            format!("Top purchases: {}", self.segment_name),
            format!("Total profiles: {}", self.total_profiles),
            format!(
                "Generated: {}",
                self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        ]
    }
}

fn chart_error(e: impl Display) -> ExportError {
    ExportError::Chart(e.to_string())
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_owned();
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
    short.push_str("...");
    short
}

/// Render the `top` most frequent purchases as a PNG pie chart at `path`.
///
/// An empty aggregate still produces an image with the title block and a
/// "No purchase data" note.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created or drawing
/// fails.
#[instrument(skip(summary, counts), fields(path = %path.display(), products = counts.len()))]
pub fn render_pie_chart(
    summary: &ChartSummary,
    counts: &PurchaseCounts,
    top: usize,
    path: &Path,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let title_style = (FONT, 36).into_font().color(&BLACK);
    let subtitle_style = (FONT, 22).into_font().color(&BLACK);
    for (i, line) in (0i32..).zip(summary.lines()) {
        let style = if i == 0 { &title_style } else { &subtitle_style };
        let y = if i == 0 { 30 } else { 50 + 32 * i };
        root.draw_text(&line, style, (40, y)).map_err(chart_error)?;
    }

    let entries = counts.top(top.min(PALETTE.len()));
    if entries.is_empty() {
        let note_style = (FONT, 30).into_font().color(&RGBColor(90, 90, 90));
        root.draw_text("No purchase data", &note_style, (480, 480))
            .map_err(chart_error)?;
        root.present().map_err(chart_error)?;
        info!("Empty purchase chart written");
        return Ok(());
    }

    #[allow(clippy::cast_precision_loss)]
    let sizes: Vec<f64> = entries.iter().map(|(_, count)| *count as f64).collect();
    let labels: Vec<String> = entries.iter().map(|(_, count)| count.to_string()).collect();
    let colors = PALETTE.get(..entries.len()).unwrap_or(&PALETTE);

    let mut pie = Pie::new(&PIE_CENTER, &PIE_RADIUS, &sizes, colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT, 18).into_font().color(&BLACK));
    pie.percentages((FONT, 16).into_font().color(&WHITE));
    root.draw(&pie).map_err(chart_error)?;

    let legend_style = (FONT, 17).into_font().color(&BLACK);
    for (row, ((key, count), color)) in (0i32..).zip(entries.iter().zip(colors)) {
        let y = LEGEND_Y + row * LEGEND_ROW;
        root.draw(&Rectangle::new(
            [(LEGEND_X, y), (LEGEND_X + 20, y + 20)],
            color.filled(),
        ))
        .map_err(chart_error)?;
        root.draw_text(
            &format!("{} ({count})", truncate_label(key)),
            &legend_style,
            (LEGEND_X + 30, y + 2),
        )
        .map_err(chart_error)?;
    }

    root.present().map_err(chart_error)?;
    info!(slices = entries.len(), "Purchase chart written");
    Ok(())
}
