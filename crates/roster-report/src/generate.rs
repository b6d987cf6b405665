//! The "generate all" entry point.
//!
//! Regenerates every report in sequence — photo directory, text roster,
//! in-memoriam, missing contacts, then the consolidated merge of the first
//! two — persisting each to the artifact store as it completes. One
//! document's failure never prevents attempting the others; persistence is
//! best-effort, with the on-disk file remaining the source of truth.

use std::path::{Path, PathBuf};

use lopdf::Document;
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pdf::save_atomic;
use crate::{directory, memoriam, merge, tabular};
use roster_core::{Graduate, MemoriamEntry, TrackedEntry};

/// Fixed output names, overwritten on each regeneration.
pub const PHOTO_DIRECTORY_FILE: &str = "alumni_photo_directory.pdf";
pub const TEXT_ROSTER_FILE: &str = "alumni_text_roster.pdf";
pub const CONSOLIDATED_FILE: &str = "alumni_complete_report.pdf";
pub const MEMORIAM_FILE: &str = "alumni_in_memoriam.pdf";
pub const MISSING_FILE: &str = "alumni_missing_contacts.pdf";

/// Where each generated document is written. Passed explicitly into the
/// orchestration; there is no ambient output configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub photo_directory: PathBuf,
    pub text_roster: PathBuf,
    pub consolidated: PathBuf,
    pub memoriam: PathBuf,
    pub missing: PathBuf,
}

impl ReportPaths {
    /// The standard file set inside one output directory.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            photo_directory: dir.join(PHOTO_DIRECTORY_FILE),
            text_roster: dir.join(TEXT_ROSTER_FILE),
            consolidated: dir.join(CONSOLIDATED_FILE),
            memoriam: dir.join(MEMORIAM_FILE),
            missing: dir.join(MISSING_FILE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Title prefix shared by all documents.
    pub roster_title: String,
    /// Replaces the wall-clock footer timestamp when set.
    pub date_override: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { roster_title: "Class of 1971 Alumni".to_string(), date_override: None }
    }
}

/// Destination for generated document bytes, keyed by report name.
/// Implemented by the SQLite artifact store; builds treat failures here as
/// log-and-continue.
pub trait ArtifactSink {
    /// Persist `bytes` under `name`, replacing any previous version.
    /// Returns whether the artifact was actually stored, so sinks that
    /// deliberately drop artifacts are not reported as persisted.
    ///
    /// # Errors
    /// Returns an error when the artifact cannot be stored; generation
    /// treats this as non-fatal.
    fn save_artifact(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<bool>;
}

/// Sink that drops every artifact; used when no store is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardArtifacts;

impl ArtifactSink for DiscardArtifacts {
    fn save_artifact(&mut self, _name: &str, _bytes: &[u8]) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum OutcomeStatus {
    Generated { pages: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    pub generated_at: String,
    pub documents: Vec<DocumentOutcome>,
}

impl GenerateSummary {
    #[must_use]
    pub fn all_generated(&self) -> bool {
        self.documents
            .iter()
            .all(|doc| matches!(doc.status, OutcomeStatus::Generated { .. }))
    }
}

/// Regenerate every report and persist each through `sink`.
///
/// Runs start to finish on the calling thread; there is no partial or
/// background rendering. Each document build owns its page state, so the
/// sequence is safe to repeat at will.
pub fn generate_all(
    graduates: &[Graduate],
    memoriam_entries: &[MemoriamEntry],
    tracked_entries: &[TrackedEntry],
    paths: &ReportPaths,
    options: &GenerateOptions,
    sink: &mut dyn ArtifactSink,
) -> GenerateSummary {
    let stamp = options.date_override.clone().unwrap_or_else(now_stamp);
    let title = &options.roster_title;
    let mut documents = Vec::with_capacity(5);

    documents.push(produce(
        PHOTO_DIRECTORY_FILE,
        &paths.photo_directory,
        sink,
        || directory::build_photo_directory(graduates, &format!("{title} - Photo Directory"), &stamp),
    ));
    documents.push(produce(TEXT_ROSTER_FILE, &paths.text_roster, sink, || {
        tabular::build_text_roster(graduates, &format!("{title} - Roster"), &stamp)
    }));
    documents.push(produce(MEMORIAM_FILE, &paths.memoriam, sink, || {
        memoriam::build_memoriam(memoriam_entries, &format!("{title} - In Memoriam"), &stamp)
    }));
    documents.push(produce(MISSING_FILE, &paths.missing, sink, || {
        memoriam::build_missing_contacts(
            tracked_entries,
            &format!("{title} - Missing Contacts"),
            &stamp,
        )
    }));
    documents.push(consolidate(paths, sink));

    GenerateSummary { generated_at: stamp, documents }
}

/// Build one document, write it atomically, and persist it best-effort.
fn produce(
    name: &str,
    path: &Path,
    sink: &mut dyn ArtifactSink,
    build: impl FnOnce() -> Result<Document>,
) -> DocumentOutcome {
    let doc = match build() {
        Ok(doc) => doc,
        Err(err) => {
            error!(report = name, error = %err, "document generation failed");
            return failed(name, path, err.to_string());
        }
    };
    let pages = doc.get_pages().len();
    if let Err(err) = save_atomic(doc, path) {
        error!(report = name, error = %err, "document could not be written");
        return failed(name, path, err.to_string());
    }
    info!(report = name, pages, path = %path.display(), "document generated");

    let persisted = persist(name, path, sink);
    DocumentOutcome {
        name: name.to_string(),
        path: path.to_path_buf(),
        status: OutcomeStatus::Generated { pages },
        persisted,
    }
}

/// Merge the photo directory and text roster into the consolidated report.
fn consolidate(paths: &ReportPaths, sink: &mut dyn ArtifactSink) -> DocumentOutcome {
    let inputs = [paths.photo_directory.as_path(), paths.text_roster.as_path()];
    if let Err(err) = merge::merge_documents(&inputs, &paths.consolidated) {
        error!(error = %err, "consolidated merge failed; previous file left intact");
        return failed(CONSOLIDATED_FILE, &paths.consolidated, err.to_string());
    }
    let pages = Document::load(&paths.consolidated)
        .map(|doc| doc.get_pages().len())
        .unwrap_or_default();
    info!(pages, path = %paths.consolidated.display(), "consolidated report generated");

    let persisted = persist(CONSOLIDATED_FILE, &paths.consolidated, sink);
    DocumentOutcome {
        name: CONSOLIDATED_FILE.to_string(),
        path: paths.consolidated.clone(),
        status: OutcomeStatus::Generated { pages },
        persisted,
    }
}

fn persist(name: &str, path: &Path, sink: &mut dyn ArtifactSink) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(report = name, error = %err, "generated file unreadable for persistence");
            return false;
        }
    };
    match sink.save_artifact(name, &bytes) {
        Ok(stored) => stored,
        Err(err) => {
            // The on-disk file stays authoritative for downloads.
            warn!(report = name, error = %err, "artifact store write failed");
            false
        }
    }
}

fn failed(name: &str, path: &Path, reason: String) -> DocumentOutcome {
    DocumentOutcome {
        name: name.to_string(),
        path: path.to_path_buf(),
        status: OutcomeStatus::Failed { reason },
        persisted: false,
    }
}

fn now_stamp() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::now_utc().format(&format).unwrap_or_else(|_| String::from("unknown"))
}
