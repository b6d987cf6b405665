//! Vector bar charts for the statistics section.
//!
//! Static reports draw only the descending bar series of a Pareto ranking;
//! the cumulative-percentage overlay is a UI-only concern. Bars are drawn as
//! filled rectangles directly into the page content stream, so charts cost
//! no rasterization and stay crisp at any zoom.

use roster_core::ParetoSeries;

use crate::error::Result;
use crate::pdf::{truncate_to_width, PageWriter};

const PLOT_HEIGHT: f32 = 170.0;
const AXIS_GUTTER: f32 = 30.0;
const LABEL_AREA: f32 = 16.0;
const COUNT_LABEL_CLEARANCE: f32 = 12.0;
const BAR_FILL: (f32, f32, f32) = (0.53, 0.81, 0.92);

/// Total vertical space one chart block occupies, for page-break planning.
#[must_use]
pub fn block_height() -> f32 {
    PLOT_HEIGHT + LABEL_AREA + COUNT_LABEL_CLEARANCE + 10.0
}

/// Draw the bar series of `series` at the writer's cursor, bars ordered as
/// ranked (descending count). Advances the cursor past the chart.
///
/// # Errors
/// Returns an error when the underlying page cannot be composed.
pub fn draw_bar_chart(writer: &mut PageWriter, series: &ParetoSeries) -> Result<()> {
    let top = writer.cursor() - COUNT_LABEL_CLEARANCE;
    let baseline = top - PLOT_HEIGHT;
    let x0 = writer.content_left() + AXIS_GUTTER;
    let plot_width = writer.content_width() - AXIS_GUTTER;

    // Axes.
    writer.stroke_line(x0, baseline, x0 + plot_width, baseline, 0.8);
    writer.stroke_line(x0, baseline, x0, top, 0.8);

    let max_count = series.max_count().max(1);
    writer.draw_text_right(x0 - 4.0, top - 3.0, 7.0, false, &max_count.to_string());
    writer.draw_text_right(x0 - 4.0, baseline - 2.0, 7.0, false, "0");

    #[allow(clippy::cast_precision_loss)]
    let slot = plot_width / series.len() as f32;
    let bar_width = slot * 0.7;

    for (index, (label, count)) in series.labels.iter().zip(&series.counts).enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = x0 + slot * index as f32 + (slot - bar_width) / 2.0;
        #[allow(clippy::cast_precision_loss)]
        let height = PLOT_HEIGHT * (*count as f32) / (max_count as f32);
        if *count > 0 {
            writer.fill_rect(x, baseline, bar_width, height, BAR_FILL);
        }
        writer.draw_text_centered(
            x + bar_width / 2.0,
            baseline + height + 3.0,
            7.0,
            false,
            &count.to_string(),
        );
        let caption = truncate_to_width(label, 7.0, false, slot - 2.0);
        writer.draw_text_centered(x + bar_width / 2.0, baseline - 10.0, 7.0, false, &caption);
    }

    writer.set_cursor(baseline - LABEL_AREA - 10.0);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::pdf::Orientation;

    #[test]
    fn chart_emits_labels_and_counts_into_the_page() {
        let mut counts = BTreeMap::new();
        counts.insert("Civil".to_string(), 7);
        counts.insert("Electrical".to_string(), 3);
        let series = ParetoSeries::from_counts(&counts).unwrap();

        let mut writer = PageWriter::new(Orientation::Landscape, "stamp");
        draw_bar_chart(&mut writer, &series).unwrap();
        let doc = writer.finish().unwrap();
        let pages: Vec<_> = doc.get_pages().into_values().collect();
        let content = String::from_utf8_lossy(&doc.get_page_content(pages[0]).unwrap()).to_string();
        assert!(content.contains("Civil"));
        assert!(content.contains("Electrical"));
        assert!(content.contains('7'));
    }

    #[test]
    fn chart_block_fits_two_per_landscape_page() {
        // Two stacked chart blocks plus headings must fit the landscape
        // content height, or the statistics section's paired layout breaks.
        let available = 612.0 - 36.0 - 40.0;
        assert!(2.0 * (block_height() + 24.0) < available);
    }
}
