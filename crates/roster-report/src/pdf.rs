//! Page-level PDF construction on top of lopdf.
//!
//! `PageWriter` owns one document build: page geometry, a vertical cursor,
//! Helvetica text placement with word wrapping, grid strokes, JPEG photo
//! placement, and page finalization. Headers are deferred: builders record
//! the active group label in the writer's [`HeaderContext`] while emitting
//! content, and the label current at the moment a page is finalized is the
//! one drawn in that page's running header. One writer per document build;
//! never reuse or share across builds.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{ReportError, Result};
use crate::fit::FittedImage;

/// US Letter in points, width x height.
const LETTER: (f32, f32) = (612.0, 792.0);

const FOOTER_Y: f32 = 30.0;
const FOOTER_SIZE: f32 = 9.0;
const HEADER_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Label that should appear in the running header of the page currently
/// being composed. Owned by the [`PageWriter`] for exactly one build.
#[derive(Debug, Default)]
pub struct HeaderContext {
    current_group: Option<String>,
}

impl HeaderContext {
    pub fn set(&mut self, label: &str) {
        self.current_group = Some(label.to_string());
    }

    pub fn clear(&mut self) {
        self.current_group = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current_group.as_deref()
    }
}

pub struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    font_regular: ObjectId,
    font_bold: ObjectId,
    page_ids: Vec<ObjectId>,
    ops: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
    page_size: (f32, f32),
    margins: Margins,
    cursor: f32,
    page_has_content: bool,
    header: HeaderContext,
    footer_stamp: String,
}

impl PageWriter {
    #[must_use]
    pub fn new(orientation: Orientation, footer_stamp: impl Into<String>) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        let (page_size, margins) = match orientation {
            Orientation::Portrait => (
                LETTER,
                Margins { top: 72.0, bottom: 54.0, left: 36.0, right: 36.0 },
            ),
            Orientation::Landscape => (
                (LETTER.1, LETTER.0),
                Margins { top: 36.0, bottom: 40.0, left: 36.0, right: 36.0 },
            ),
        };

        let cursor = page_size.1 - margins.top;
        Self {
            doc,
            pages_id,
            font_regular,
            font_bold,
            page_ids: Vec::new(),
            ops: Vec::new(),
            images: Vec::new(),
            page_size,
            margins,
            cursor,
            page_has_content: false,
            header: HeaderContext::default(),
            footer_stamp: footer_stamp.into(),
        }
    }

    #[must_use]
    pub fn content_left(&self) -> f32 {
        self.margins.left
    }

    #[must_use]
    pub fn content_right(&self) -> f32 {
        self.page_size.0 - self.margins.right
    }

    #[must_use]
    pub fn content_width(&self) -> f32 {
        self.content_right() - self.content_left()
    }

    #[must_use]
    pub fn content_bottom(&self) -> f32 {
        self.margins.bottom
    }

    /// Full vertical extent available to content on a fresh page.
    #[must_use]
    pub fn content_height(&self) -> f32 {
        self.page_size.1 - self.margins.top - self.margins.bottom
    }

    /// Vertical position of the next line of content (top edge).
    #[must_use]
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn set_cursor(&mut self, y: f32) {
        self.cursor = y;
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor -= dy;
    }

    /// 1-based number of the page currently being composed.
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.page_ids.len() + 1
    }

    /// Record the group label that owns the pages composed from here on.
    pub fn set_running_header(&mut self, label: &str) {
        self.header.set(label);
    }

    pub fn clear_running_header(&mut self) {
        self.header.clear();
    }

    /// Finalize the current page and begin a fresh one.
    ///
    /// # Errors
    /// Returns an error when the page content stream cannot be encoded.
    pub fn page_break(&mut self) -> Result<()> {
        self.finalize_page()?;
        self.cursor = self.page_size.1 - self.margins.top;
        self.page_has_content = false;
        Ok(())
    }

    /// Break the page when fewer than `needed` points remain. Returns
    /// whether a break happened so callers can re-emit repeating rows.
    ///
    /// # Errors
    /// Returns an error when finalizing the current page fails.
    pub fn ensure_space(&mut self, needed: f32) -> Result<bool> {
        if self.page_has_content && self.cursor - needed < self.margins.bottom {
            self.page_break()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn draw_text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: &str) {
        let font: Object = if bold { "F2".into() } else { "F1".into() };
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Tf", vec![font, size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(text), lopdf::StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
        self.page_has_content = true;
    }

    pub fn draw_text_centered(&mut self, cx: f32, y: f32, size: f32, bold: bool, text: &str) {
        let x = cx - text_width(text, size, bold) / 2.0;
        self.draw_text(x, y, size, bold, text);
    }

    pub fn draw_text_right(&mut self, right: f32, y: f32, size: f32, bold: bool, text: &str) {
        let x = right - text_width(text, size, bold);
        self.draw_text(x, y, size, bold, text);
    }

    pub fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
        self.page_has_content = true;
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
        self.page_has_content = true;
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: (f32, f32, f32)) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
        self.page_has_content = true;
    }

    /// Place a fitted photo with its bottom-left corner at `(x, y)`.
    pub fn draw_image(&mut self, img: &FittedImage, x: f32, y: f32) {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(img.pixel_width),
                "Height" => i64::from(img.pixel_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            img.jpeg.clone(),
        );
        let id = self.doc.add_object(stream);
        let name = format!("Im{}", self.images.len());
        self.images.push((name.clone(), id));

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                img.width.into(),
                0.into(),
                0.into(),
                img.height.into(),
                x.into(),
                y.into(),
            ],
        ));
        self.ops.push(Operation::new("Do", vec![name.as_str().into()]));
        self.ops.push(Operation::new("Q", vec![]));
        self.page_has_content = true;
    }

    /// Close the build: flush the in-progress page, assemble the page tree
    /// and catalog, and return the finished document.
    ///
    /// # Errors
    /// Returns an error when a content stream cannot be encoded.
    pub fn finish(mut self) -> Result<Document> {
        if self.page_has_content || self.page_ids.is_empty() {
            self.finalize_page()?;
        }

        let kids: Vec<Object> =
            self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = i64::try_from(self.page_ids.len()).unwrap_or(i64::MAX);
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self
            .doc
            .add_object(dictionary! { "Type" => "Catalog", "Pages" => self.pages_id });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        Ok(self.doc)
    }

    /// Flush accumulated operations into a page object, drawing the footer
    /// and the deferred running header for the page being closed.
    fn finalize_page(&mut self) -> Result<()> {
        let footer = format!("Page {} | Generated: {}", self.page_number(), self.footer_stamp);
        let footer_x = self.page_size.0 / 2.0 - text_width(&footer, FOOTER_SIZE, false) / 2.0;
        self.draw_text(footer_x, FOOTER_Y, FOOTER_SIZE, false, &footer);

        if let Some(label) = self.header.current().map(str::to_string) {
            self.draw_text_right(
                self.content_right(),
                self.page_size.1 - self.margins.top + 18.0,
                HEADER_SIZE,
                true,
                &label,
            );
        }

        let ops = std::mem::take(&mut self.ops);
        let content = Content { operations: ops };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut xobjects = Dictionary::new();
        for (name, id) in self.images.drain(..) {
            xobjects.set(name, Object::Reference(id));
        }
        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => Object::Reference(self.font_regular),
                "F2" => Object::Reference(self.font_bold),
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.page_size.0.into(),
                self.page_size.1.into(),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }
}

/// Write a finished document to `path` via a temporary file in the same
/// directory, renaming into place so readers never observe partial output.
///
/// # Errors
/// Returns an error when the temporary file cannot be created, written, or
/// renamed over the destination.
pub fn save_atomic(mut doc: Document, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|err| ReportError::io(path, err))?;
    doc.save_to(&mut tmp).map_err(|err| ReportError::io(path, err))?;
    tmp.persist(path).map_err(|err| ReportError::io(path, err.error))?;
    Ok(())
}

/// Helvetica AFM advance widths for `0x20..=0x7E`, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Estimated rendered width of `text` in points. Helvetica-Bold runs a
/// little wider than regular; the scaled estimate keeps wrapping
/// conservative rather than exact.
#[must_use]
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let index = (c as u32).wrapping_sub(0x20);
            usize::try_from(index)
                .ok()
                .and_then(|i| HELVETICA_WIDTHS.get(i))
                .map_or(600_u32, |w| u32::from(*w))
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let base = units as f32 / 1000.0 * size;
    if bold {
        base * 1.08
    } else {
        base
    }
}

/// Greedy word wrap against the width estimate. A single word longer than
/// the line is hard-split rather than overflowing the column.
#[must_use]
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, bold) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, size, bold) <= max_width {
            current = word.to_string();
        } else {
            // Hard-split an oversized token (long emails, URLs).
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if text_width(&piece, size, bold) > max_width && piece.chars().count() > 1 {
                    let overflow = piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    if let Some(c) = overflow {
                        piece.push(c);
                    }
                }
            }
            current = piece;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Shorten `text` with a trailing ellipsis until it fits `max_width`.
#[must_use]
pub fn truncate_to_width(text: &str, size: f32, bold: bool, max_width: f32) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() {
        out.pop();
        let candidate = format!("{out}...");
        if text_width(&candidate, size, bold) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Map to single-byte text for the base-14 fonts; anything outside Latin-1
/// degrades to `?` rather than corrupting the content stream.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0xFF).contains(&code) {
                #[allow(clippy::cast_possible_truncation)]
                {
                    code as u8
                }
            } else {
                b'?'
            }
        })
        .collect()
}
