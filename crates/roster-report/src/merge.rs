//! Concatenation of already-generated documents into one consolidated file.
//!
//! Every input is loaded fully before a single byte of output exists; a
//! missing or unreadable input aborts the merge with the previous
//! consolidated file left intact. Output goes through a temporary file and
//! an atomic rename so readers never observe a partially written document.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::info;

use crate::error::{ReportError, Result};
use crate::pdf::save_atomic;

/// Merge `inputs` into `out`, preserving every page in input order.
///
/// # Errors
/// Returns an error when any input cannot be loaded or the combined
/// document cannot be assembled or written. On error nothing is written.
pub fn merge_documents(inputs: &[&Path], out: &Path) -> Result<()> {
    let mut loaded = Vec::with_capacity(inputs.len());
    for path in inputs {
        let doc = Document::load(path)
            .map_err(|source| ReportError::MergeInput { path: path.to_path_buf(), source })?;
        loaded.push(doc);
    }

    let mut max_id = 1;
    let mut page_objects: Vec<(ObjectId, Object)> = Vec::new();
    let mut all_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    for mut doc in loaded {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;
        for object_id in doc.get_pages().into_values() {
            if let Ok(object) = doc.get_object(object_id) {
                page_objects.push((object_id, object.clone()));
            }
        }
        all_objects.append(&mut doc.objects);
    }
    if page_objects.is_empty() {
        return Err(ReportError::NothingToMerge);
    }

    // Rebuild a single catalog and page tree over the combined object set.
    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut pages_root: Option<(ObjectId, Dictionary)> = None;

    for (object_id, object) in all_objects {
        let type_name = object
            .as_dict()
            .ok()
            .and_then(|dict| dict.get(b"Type").ok())
            .and_then(|value| value.as_name().ok());
        match type_name {
            Some(name) if name == b"Catalog" => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((object_id, dict.clone()));
                    }
                }
            }
            Some(name) if name == b"Pages" => {
                if let Ok(dict) = object.as_dict() {
                    let mut trimmed = dict.clone();
                    trimmed.remove(b"Kids");
                    trimmed.remove(b"Count");
                    match pages_root.as_mut() {
                        Some((_, acc)) => acc.extend(&trimmed),
                        None => pages_root = Some((object_id, trimmed)),
                    }
                }
            }
            Some(name) if name == b"Page" || name == b"Outlines" || name == b"Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, mut pages_dict) = pages_root.ok_or(ReportError::NothingToMerge)?;
    let (catalog_id, mut catalog_dict) = catalog.ok_or(ReportError::NothingToMerge)?;

    for (object_id, object) in &page_objects {
        if let Ok(dict) = object.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*object_id, Object::Dictionary(dict));
        }
    }

    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", i64::try_from(page_objects.len()).unwrap_or(i64::MAX));
    pages_dict.set(
        "Kids",
        page_objects.iter().map(|(id, _)| Object::Reference(*id)).collect::<Vec<Object>>(),
    );
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog_dict));
    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.keys().map(|id| id.0).max().unwrap_or(max_id);
    merged.renumber_objects();
    merged.compress();

    info!(pages = page_objects.len(), out = %out.display(), "merged consolidated document");
    save_atomic(merged, out)
}
