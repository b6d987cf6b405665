//! The text roster: a dense landscape table of every graduate followed by
//! the statistics section, one bar chart per category.

use lopdf::Document;
use roster_core::{
    anniversary_month_tally, birth_month_tally, branch_tally, country_tally, hostel_tally,
    non_empty, state_tally, Graduate, ParetoSeries,
};

use crate::chart;
use crate::error::Result;
use crate::pdf::{wrap_text, Orientation, PageWriter};

const COLUMNS: [(f32, &str); 7] = [
    (144.0, "Name"),
    (72.0, "Roll No"),
    (86.0, "Branch"),
    (72.0, "Hostel"),
    (144.0, "Lives In"),
    (130.0, "Email"),
    (72.0, "Phone"),
];

const BODY_SIZE: f32 = 8.0;
const LEADING: f32 = 10.0;
const CELL_PAD: f32 = 3.0;
const HEADER_ROW_HEIGHT: f32 = 16.0;
const GRID_WIDTH: f32 = 0.5;
const HEADING_SIZE: f32 = 13.0;

/// Build the landscape text roster with its statistics section.
///
/// `stamp` is the footer timestamp; callers substitute an override date when
/// one is configured.
///
/// # Errors
/// Returns an error when page composition fails.
pub fn build_text_roster(records: &[Graduate], title: &str, stamp: &str) -> Result<Document> {
    let mut writer = PageWriter::new(Orientation::Landscape, stamp);

    let center = writer.content_left() + writer.content_width() / 2.0;
    writer.draw_text_centered(center, writer.cursor(), 16.0, true, title);
    writer.advance(26.0);

    draw_table_header(&mut writer);
    for (index, record) in records.iter().enumerate() {
        draw_table_row(&mut writer, record, index)?;
    }

    writer.page_break()?;
    writer.draw_text_centered(center, writer.cursor(), 16.0, true, "Statistics");
    writer.advance(26.0);

    // Paired layout: explicit breaks keep two charts per page and no chart
    // split across a break.
    let sections: [(&str, std::collections::BTreeMap<String, u64>, bool); 6] = [
        ("Graduates by Branch", branch_tally(records), false),
        ("Graduates by Hostel", hostel_tally(records), true),
        ("Graduates by Country", country_tally(records), false),
        ("Graduates by State", state_tally(records), true),
        ("Graduates by Birth Month", birth_month_tally(records), false),
        ("Graduates by Wedding Anniversary Month", anniversary_month_tally(records), false),
    ];

    for (heading, tally, break_after) in sections {
        draw_statistic(&mut writer, heading, &tally)?;
        if break_after {
            writer.page_break()?;
        }
    }

    writer.finish()
}

fn draw_table_header(writer: &mut PageWriter) {
    let top = writer.cursor();
    let left = writer.content_left();
    let total: f32 = COLUMNS.iter().map(|(w, _)| w).sum();
    writer.fill_rect(left, top - HEADER_ROW_HEIGHT, total, HEADER_ROW_HEIGHT, (0.78, 0.78, 0.78));
    let mut x = left;
    for (width, label) in COLUMNS {
        writer.stroke_rect(x, top - HEADER_ROW_HEIGHT, width, HEADER_ROW_HEIGHT, GRID_WIDTH);
        writer.draw_text(x + CELL_PAD, top - 11.0, 9.0, true, label);
        x += width;
    }
    writer.set_cursor(top - HEADER_ROW_HEIGHT);
}

fn draw_table_row(writer: &mut PageWriter, record: &Graduate, index: usize) -> Result<()> {
    let values = [
        record.display_name().to_string(),
        record.roll_no.clone(),
        non_empty(&record.branch).unwrap_or_default().to_string(),
        non_empty(&record.hostel).unwrap_or_default().to_string(),
        record.location_line().unwrap_or_default(),
        non_empty(&record.email).unwrap_or_default().to_string(),
        non_empty(&record.phone).unwrap_or_default().to_string(),
    ];

    // A row must fit one page under its column header; overflow lines are
    // dropped rather than drawn over the footer.
    let max_text = writer.content_height() - HEADER_ROW_HEIGHT - 2.0 * CELL_PAD;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_lines = ((max_text / LEADING) as usize).max(1);
    let cells: Vec<Vec<String>> = values
        .iter()
        .zip(COLUMNS)
        .map(|(value, (width, _))| {
            let mut lines = wrap_text(value, BODY_SIZE, false, width - 2.0 * CELL_PAD);
            lines.truncate(max_lines);
            lines
        })
        .collect();

    let line_count = cells.iter().map(Vec::len).max().unwrap_or(1);
    #[allow(clippy::cast_precision_loss)]
    let row_height = line_count as f32 * LEADING + 2.0 * CELL_PAD;

    if writer.ensure_space(row_height + HEADER_ROW_HEIGHT)? {
        draw_table_header(writer);
    }

    let top = writer.cursor();
    let left = writer.content_left();
    if index % 2 == 1 {
        let total: f32 = COLUMNS.iter().map(|(w, _)| w).sum();
        writer.fill_rect(left, top - row_height, total, row_height, (0.95, 0.95, 0.95));
    }

    let mut x = left;
    for (lines, (width, _)) in cells.iter().zip(COLUMNS) {
        writer.stroke_rect(x, top - row_height, width, row_height, GRID_WIDTH);
        let mut baseline = top - CELL_PAD - BODY_SIZE + 1.0;
        for line in lines {
            if !line.is_empty() {
                writer.draw_text(x + CELL_PAD, baseline, BODY_SIZE, false, line);
            }
            baseline -= LEADING;
        }
        x += width;
    }

    writer.set_cursor(top - row_height);
    Ok(())
}

fn draw_statistic(
    writer: &mut PageWriter,
    heading: &str,
    tally: &std::collections::BTreeMap<String, u64>,
) -> Result<()> {
    writer.ensure_space(24.0 + chart::block_height())?;
    writer.draw_text(writer.content_left(), writer.cursor() - HEADING_SIZE, HEADING_SIZE, true, heading);
    writer.advance(HEADING_SIZE + 10.0);

    match ParetoSeries::from_counts(tally) {
        Some(series) => chart::draw_bar_chart(writer, &series)?,
        None => {
            writer.draw_text(writer.content_left(), writer.cursor() - 10.0, 10.0, false, "No data available");
            writer.advance(24.0);
        }
    }
    writer.advance(8.0);
    Ok(())
}
