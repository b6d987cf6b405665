//! The in-memoriam and missing-contacts documents.
//!
//! Both render the same shape of data (name, roll number, branch, one
//! photo), so they share a single list layout; only titles and the empty
//! notice differ.

use lopdf::Document;
use roster_core::{non_empty, MemoriamEntry, TrackedEntry};

use crate::error::Result;
use crate::fit::{fit_photo, BoundingBox, PhotoCell};
use crate::pdf::{Orientation, PageWriter};

const DETAILS_WIDTH: f32 = 453.6;
const PHOTO_CELL_WIDTH: f32 = 86.4;
const PHOTO_BOX: BoundingBox = BoundingBox::new(78.0, 96.0);
const CELL_PAD: f32 = 4.0;
const LINE_HEIGHT: f32 = 12.0;
const GRID_WIDTH: f32 = 0.5;

struct ListRow {
    name: String,
    roll_no: String,
    branch: Option<String>,
    photo: Option<Vec<u8>>,
}

/// Build the in-memoriam document.
///
/// # Errors
/// Returns an error when page composition fails.
pub fn build_memoriam(entries: &[MemoriamEntry], title: &str, stamp: &str) -> Result<Document> {
    let rows: Vec<ListRow> = entries
        .iter()
        .map(|entry| ListRow {
            name: entry.display_name().to_string(),
            roll_no: entry.roll_no.clone(),
            branch: non_empty(&entry.branch).map(str::to_string),
            photo: entry.photo.clone(),
        })
        .collect();
    build_photo_list(&rows, title, stamp, "No entries recorded.")
}

/// Build the missing-contacts ("lost touch") document.
///
/// # Errors
/// Returns an error when page composition fails.
pub fn build_missing_contacts(
    entries: &[TrackedEntry],
    title: &str,
    stamp: &str,
) -> Result<Document> {
    let rows: Vec<ListRow> = entries
        .iter()
        .map(|entry| ListRow {
            name: entry.display_name().to_string(),
            roll_no: entry.roll_no.clone(),
            branch: non_empty(&entry.branch).map(str::to_string),
            photo: entry.photo.clone(),
        })
        .collect();
    build_photo_list(&rows, title, stamp, "No one is currently being traced.")
}

fn build_photo_list(
    rows: &[ListRow],
    title: &str,
    stamp: &str,
    empty_notice: &str,
) -> Result<Document> {
    let mut writer = PageWriter::new(Orientation::Portrait, stamp);

    let center = writer.content_left() + writer.content_width() / 2.0;
    writer.draw_text_centered(center, writer.cursor(), 16.0, true, title);
    writer.advance(30.0);

    if rows.is_empty() {
        writer.draw_text(writer.content_left(), writer.cursor() - 10.0, 10.0, false, empty_notice);
        return writer.finish();
    }

    for row in rows {
        draw_row(&mut writer, row)?;
    }
    writer.finish()
}

fn draw_row(writer: &mut PageWriter, row: &ListRow) -> Result<()> {
    let photo = fit_photo(row.photo.as_deref(), PHOTO_BOX);
    let photo_height = match &photo {
        PhotoCell::Image(img) => img.height,
        PhotoCell::Absent | PhotoCell::Malformed => LINE_HEIGHT,
    };
    let line_count = if row.branch.is_some() { 3.0 } else { 2.0 };
    let row_height =
        (line_count * LINE_HEIGHT + 2.0 * CELL_PAD).max(photo_height + 2.0 * CELL_PAD);

    writer.ensure_space(row_height)?;

    let top = writer.cursor();
    let left = writer.content_left();
    writer.stroke_rect(left, top - row_height, DETAILS_WIDTH, row_height, GRID_WIDTH);
    writer.stroke_rect(left + DETAILS_WIDTH, top - row_height, PHOTO_CELL_WIDTH, row_height, GRID_WIDTH);

    let mut baseline = top - CELL_PAD - 10.0 + 2.0;
    writer.draw_text(left + CELL_PAD, baseline, 10.0, true, &row.name);
    baseline -= LINE_HEIGHT;
    writer.draw_text(left + CELL_PAD, baseline, 10.0, false, &format!("Roll No: {}", row.roll_no));
    if let Some(branch) = &row.branch {
        baseline -= LINE_HEIGHT;
        writer.draw_text(left + CELL_PAD, baseline, 10.0, false, &format!("Branch: {branch}"));
    }

    match &photo {
        PhotoCell::Image(img) => {
            let ix = left + DETAILS_WIDTH + (PHOTO_CELL_WIDTH - img.width) / 2.0;
            writer.draw_image(img, ix, top - CELL_PAD - img.height);
        }
        cell @ (PhotoCell::Absent | PhotoCell::Malformed) => {
            if let Some(placeholder) = cell.placeholder() {
                writer.draw_text_centered(
                    left + DETAILS_WIDTH + PHOTO_CELL_WIDTH / 2.0,
                    top - row_height / 2.0,
                    8.0,
                    false,
                    placeholder,
                );
            }
        }
    }

    writer.set_cursor(top - row_height);
    Ok(())
}
