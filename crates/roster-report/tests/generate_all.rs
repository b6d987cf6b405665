//! End-to-end generation over an in-memory roster: every document is
//! produced, the consolidated report is the page-wise concatenation of the
//! photo directory and text roster, and missing photos degrade to
//! placeholders instead of failing the build.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::Document;
use roster_core::{Graduate, MemoriamEntry, TrackedEntry};
use roster_report::{
    generate_all, ArtifactSink, DiscardArtifacts, GenerateOptions, OutcomeStatus, ReportPaths,
};

struct MemorySink {
    saved: Vec<(String, usize)>,
}

impl ArtifactSink for MemorySink {
    fn save_artifact(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<bool> {
        self.saved.push((name.to_string(), bytes.len()));
        Ok(true)
    }
}

struct FailingSink;

impl ArtifactSink for FailingSink {
    fn save_artifact(&mut self, _name: &str, _bytes: &[u8]) -> anyhow::Result<bool> {
        anyhow::bail!("store unavailable")
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 90, 160]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn sample_roster() -> Vec<Graduate> {
    let mut a = Graduate {
        id: 1,
        roll_no: "CE101".to_string(),
        name: Some("Anand".to_string()),
        branch: Some("CE".to_string()),
        dob: Some("12-Jun".to_string()),
        ..Graduate::default()
    };
    a.photo_1966 = Some(png_bytes(50, 70));
    a.photo_current = Some(png_bytes(70, 50));

    let b = Graduate {
        id: 2,
        roll_no: "EE202".to_string(),
        name: Some("Bhaskar".to_string()),
        branch: Some("EE".to_string()),
        hostel: Some("Ganga".to_string()),
        ..Graduate::default()
    };

    // No photos at all: both cells must render placeholders.
    let c = Graduate {
        id: 3,
        roll_no: "CE103".to_string(),
        name: Some("Chandran".to_string()),
        branch: Some("CE".to_string()),
        ..Graduate::default()
    };

    vec![a, b, c]
}

fn page_count(path: &std::path::Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

#[test]
fn generate_all_produces_every_document_and_a_sum_page_consolidation() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ReportPaths::in_dir(dir.path());
    let options = GenerateOptions {
        date_override: Some("2026-08-31 10:00".to_string()),
        ..GenerateOptions::default()
    };
    let mut sink = MemorySink { saved: Vec::new() };

    let memoriam = vec![MemoriamEntry {
        roll_no: "ME301".to_string(),
        name: Some("Dinesh".to_string()),
        branch: Some("ME".to_string()),
        photo: None,
    }];
    let tracked = vec![TrackedEntry {
        roll_no: "CH401".to_string(),
        name: Some("Eswar".to_string()),
        branch: None,
        photo: None,
    }];

    let summary =
        generate_all(&sample_roster(), &memoriam, &tracked, &paths, &options, &mut sink);

    assert!(summary.all_generated(), "summary: {summary:?}");
    assert_eq!(summary.documents.len(), 5);
    for doc in &summary.documents {
        assert!(doc.persisted, "{} should persist", doc.name);
    }

    let directory_pages = page_count(&paths.photo_directory);
    let roster_pages = page_count(&paths.text_roster);
    assert_eq!(page_count(&paths.consolidated), directory_pages + roster_pages);
    assert!(paths.memoriam.exists());
    assert!(paths.missing.exists());

    // Two branches means at least two pages in the grouped directory.
    assert!(directory_pages >= 2);

    // One artifact per document, photo directory first.
    let names: Vec<&str> = sink.saved.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        [
            "alumni_photo_directory.pdf",
            "alumni_text_roster.pdf",
            "alumni_in_memoriam.pdf",
            "alumni_missing_contacts.pdf",
            "alumni_complete_report.pdf",
        ]
    );

    // The record with no photos renders placeholder cells, not a failure.
    let doc = Document::load(&paths.photo_directory).unwrap();
    let body: String = doc
        .get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).to_string())
        .collect();
    assert!(body.contains("No Image"));
    assert!(body.contains("Chandran"));
}

#[test]
fn date_override_lands_in_the_footer() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ReportPaths::in_dir(dir.path());
    let options = GenerateOptions {
        date_override: Some("1971-08-15 09:00".to_string()),
        ..GenerateOptions::default()
    };
    generate_all(&sample_roster(), &[], &[], &paths, &options, &mut MemorySink { saved: vec![] });

    let doc = Document::load(&paths.text_roster).unwrap();
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    let first = String::from_utf8_lossy(&doc.get_page_content(pages[0]).unwrap()).to_string();
    assert!(first.contains("Generated: 1971-08-15 09:00"));
}

#[test]
fn discard_sink_reports_documents_as_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ReportPaths::in_dir(dir.path());
    let summary = generate_all(
        &sample_roster(),
        &[],
        &[],
        &paths,
        &GenerateOptions::default(),
        &mut DiscardArtifacts,
    );

    assert!(summary.all_generated());
    for doc in &summary.documents {
        assert!(!doc.persisted, "{} was deliberately dropped", doc.name);
        assert!(doc.path.exists(), "{} stays on disk", doc.name);
    }
}

#[test]
fn artifact_store_failure_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ReportPaths::in_dir(dir.path());
    let summary = generate_all(
        &sample_roster(),
        &[],
        &[],
        &paths,
        &GenerateOptions::default(),
        &mut FailingSink,
    );

    assert!(summary.all_generated(), "persistence failure must not fail generation");
    for doc in &summary.documents {
        assert!(!doc.persisted);
        assert!(doc.path.exists(), "{} stays on disk", doc.name);
    }
}

#[test]
fn one_failed_document_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = ReportPaths::in_dir(dir.path());
    // An unwritable destination directory fails only the photo directory.
    paths.photo_directory = dir.path().join("missing_subdir").join("photo.pdf");

    let summary = generate_all(
        &sample_roster(),
        &[],
        &[],
        &paths,
        &GenerateOptions::default(),
        &mut MemorySink { saved: vec![] },
    );

    let outcome = |name: &str| {
        summary.documents.iter().find(|d| d.name == name).cloned().unwrap()
    };
    assert!(matches!(
        outcome("alumni_photo_directory.pdf").status,
        OutcomeStatus::Failed { .. }
    ));
    assert!(matches!(
        outcome("alumni_text_roster.pdf").status,
        OutcomeStatus::Generated { .. }
    ));
    // The merge depends on the missing constituent and must also fail,
    // without producing output.
    assert!(matches!(
        outcome("alumni_complete_report.pdf").status,
        OutcomeStatus::Failed { .. }
    ));
    assert!(!paths.consolidated.exists());
}
