//! The photo directory: graduates grouped by branch, one table row per
//! record with a details cell and the 1966/current photo cells.
//!
//! Groups are emitted alphabetically with a forced page break between them
//! (never within one, never before the first). The active group's label is
//! recorded in the writer's header context just before its rows, so every
//! finalized page carries the label of the group that owns it, including
//! pages a long group spills onto.

use lopdf::Document;
use roster_core::{group_by_branch, non_empty, Graduate};

use crate::error::Result;
use crate::fit::{fit_photo, BoundingBox, PhotoCell};
use crate::pdf::{text_width, wrap_text, Orientation, PageWriter};

const DETAILS_WIDTH: f32 = 367.2;
const PHOTO_CELL_WIDTH: f32 = 86.4;
const PHOTO_BOX: BoundingBox = BoundingBox::new(78.0, 96.0);
const CELL_PAD: f32 = 4.0;
const LINE_HEIGHT: f32 = 12.0;
const DETAIL_SIZE: f32 = 10.0;
const HEADER_ROW_HEIGHT: f32 = 18.0;
const GRID_WIDTH: f32 = 0.5;

/// Build the grouped photo roster document.
///
/// # Errors
/// Returns an error when page composition fails; individual photo problems
/// degrade to placeholders and never abort the build.
pub fn build_photo_directory(records: &[Graduate], title: &str, stamp: &str) -> Result<Document> {
    let mut writer = PageWriter::new(Orientation::Portrait, stamp);

    let center = writer.content_left() + writer.content_width() / 2.0;
    writer.draw_text_centered(center, writer.cursor(), 16.0, true, title);
    writer.advance(30.0);

    let groups = group_by_branch(records);
    let mut first = true;
    for (label, rows) in &groups {
        if !first {
            writer.page_break()?;
        }
        first = false;
        writer.set_running_header(label);
        draw_header_row(&mut writer);
        for grad in rows {
            draw_row(&mut writer, grad, label)?;
        }
    }

    writer.finish()
}

/// Repeating column header: details, 1966 photo, current photo.
fn draw_header_row(writer: &mut PageWriter) {
    let top = writer.cursor();
    let left = writer.content_left();
    let total = DETAILS_WIDTH + 2.0 * PHOTO_CELL_WIDTH;
    writer.fill_rect(left, top - HEADER_ROW_HEIGHT, total, HEADER_ROW_HEIGHT, (0.9, 0.9, 0.9));
    for (x, w) in column_spans(left) {
        writer.stroke_rect(x, top - HEADER_ROW_HEIGHT, w, HEADER_ROW_HEIGHT, GRID_WIDTH);
    }
    let baseline = top - 13.0;
    writer.draw_text(left + CELL_PAD, baseline, 10.0, true, "Graduate Details");
    writer.draw_text_centered(left + DETAILS_WIDTH + PHOTO_CELL_WIDTH / 2.0, baseline, 10.0, true, "1966");
    writer.draw_text_centered(
        left + DETAILS_WIDTH + PHOTO_CELL_WIDTH * 1.5,
        baseline,
        10.0,
        true,
        "Current",
    );
    writer.set_cursor(top - HEADER_ROW_HEIGHT);
}

fn column_spans(left: f32) -> [(f32, f32); 3] {
    [
        (left, DETAILS_WIDTH),
        (left + DETAILS_WIDTH, PHOTO_CELL_WIDTH),
        (left + DETAILS_WIDTH + PHOTO_CELL_WIDTH, PHOTO_CELL_WIDTH),
    ]
}

fn draw_row(writer: &mut PageWriter, grad: &Graduate, branch: &str) -> Result<()> {
    let mut lines = detail_lines(grad, branch, DETAILS_WIDTH - 2.0 * CELL_PAD);
    // A row must fit one page under its column header; overflow lines are
    // dropped rather than drawn over the footer.
    let max_text = writer.content_height() - HEADER_ROW_HEIGHT - 2.0 * CELL_PAD;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_lines = ((max_text / LINE_HEIGHT) as usize).max(1);
    lines.truncate(max_lines);
    let photo_1966 = fit_photo(grad.photo_1966.as_deref(), PHOTO_BOX);
    let photo_current = fit_photo(grad.photo_current.as_deref(), PHOTO_BOX);

    #[allow(clippy::cast_precision_loss)]
    let text_height = lines.len() as f32 * LINE_HEIGHT + 2.0 * CELL_PAD;
    let photo_height =
        cell_height(&photo_1966).max(cell_height(&photo_current)) + 2.0 * CELL_PAD;
    let row_height = text_height.max(photo_height);

    if writer.ensure_space(row_height + HEADER_ROW_HEIGHT)? {
        draw_header_row(writer);
    }

    let top = writer.cursor();
    let left = writer.content_left();
    for (x, w) in column_spans(left) {
        writer.stroke_rect(x, top - row_height, w, row_height, GRID_WIDTH);
    }

    let mut baseline = top - CELL_PAD - DETAIL_SIZE + 2.0;
    for (bold, regular) in &lines {
        let mut x = left + CELL_PAD;
        if !bold.is_empty() {
            writer.draw_text(x, baseline, DETAIL_SIZE, true, bold);
            x += text_width(bold, DETAIL_SIZE, true);
        }
        if !regular.is_empty() {
            writer.draw_text(x, baseline, DETAIL_SIZE, false, regular);
        }
        baseline -= LINE_HEIGHT;
    }

    draw_photo_cell(writer, &photo_1966, left + DETAILS_WIDTH, top, row_height);
    draw_photo_cell(writer, &photo_current, left + DETAILS_WIDTH + PHOTO_CELL_WIDTH, top, row_height);

    writer.set_cursor(top - row_height);
    Ok(())
}

fn cell_height(cell: &PhotoCell) -> f32 {
    match cell {
        PhotoCell::Image(img) => img.height,
        PhotoCell::Absent | PhotoCell::Malformed => LINE_HEIGHT,
    }
}

fn draw_photo_cell(writer: &mut PageWriter, cell: &PhotoCell, x: f32, top: f32, row_height: f32) {
    match cell {
        PhotoCell::Image(img) => {
            let ix = x + (PHOTO_CELL_WIDTH - img.width) / 2.0;
            let iy = top - CELL_PAD - img.height;
            writer.draw_image(img, ix, iy);
        }
        PhotoCell::Absent | PhotoCell::Malformed => {
            if let Some(placeholder) = cell.placeholder() {
                writer.draw_text_centered(
                    x + PHOTO_CELL_WIDTH / 2.0,
                    top - row_height / 2.0,
                    8.0,
                    false,
                    placeholder,
                );
            }
        }
    }
}

/// Physical text lines of the details cell: a bold prefix (name or field
/// label) plus regular continuation, pre-wrapped so row height is known
/// before the page-break decision.
fn detail_lines(grad: &Graduate, branch: &str, max_width: f32) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let mut push_field = |bold: String, value: &str| {
        let available = (max_width - text_width(&bold, DETAIL_SIZE, true)).max(40.0);
        let mut bold_slot = Some(bold);
        for line in wrap_text(value, DETAIL_SIZE, false, available) {
            out.push((bold_slot.take().unwrap_or_default(), line));
        }
    };

    push_field(grad.display_name().to_string(), &format!(" ({})", grad.roll_no));
    push_field("Branch: ".to_string(), branch);
    if let Some(hostel) = non_empty(&grad.hostel) {
        push_field("Hostel: ".to_string(), hostel);
    }
    if let Some(dob) = non_empty(&grad.dob) {
        push_field("DOB: ".to_string(), dob);
    }
    if let Some(wad) = non_empty(&grad.wad) {
        push_field("WAD: ".to_string(), wad);
    }
    if let Some(spouse) = non_empty(&grad.spouse_name) {
        push_field("Spouse: ".to_string(), spouse);
    }
    if let Some(location) = grad.location_line() {
        push_field("Lives in: ".to_string(), &location);
    }
    if let Some(email) = non_empty(&grad.email) {
        push_field("Email: ".to_string(), email);
    }
    if let Some(phone) = non_empty(&grad.phone) {
        push_field("Phone: ".to_string(), phone);
    }
    out
}
