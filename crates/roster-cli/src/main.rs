use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use roster_core::{Graduate, MemoriamEntry, TrackedEntry};
use roster_report::{generate_all, ArtifactSink, DiscardArtifacts, GenerateOptions, ReportPaths};
use roster_store_sqlite::SqliteStore;
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(about = "Alumni roster report generator")]
struct Cli {
    #[arg(long, default_value = "./alumni_roster.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Regenerate every report document from the current roster.
    Generate(GenerateArgs),
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    SchemaVersion,
    Migrate,
    /// Populate an empty database with a small demonstration roster.
    Seed,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, default_value = "./reports")]
    out_dir: PathBuf,
    #[arg(long, default_value = "Class of 1971 Alumni")]
    title: String,
    /// Fixed footer timestamp, for reproducible output.
    #[arg(long)]
    date_override: Option<String>,
    /// Skip persisting the generated files into the artifact table.
    #[arg(long, default_value_t = false)]
    no_store: bool,
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    List,
    Fetch(ReportFetchArgs),
}

#[derive(Debug, Args)]
struct ReportFetchArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    out: PathBuf,
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut store = SqliteStore::open(&cli.db)?;
    match cli.command {
        Command::Db { command } => run_db(command, &mut store),
        Command::Generate(args) => run_generate(&args, &mut store),
        Command::Report { command } => run_report(command, &mut store),
    }
}

fn run_db(command: DbCommand, store: &mut SqliteStore) -> Result<()> {
    match command {
        DbCommand::SchemaVersion => {
            let version = store.schema_version()?;
            emit_json(serde_json::json!({ "schema_version": version }))
        }
        DbCommand::Migrate => {
            let before = store.schema_version()?;
            store.migrate()?;
            let after = store.schema_version()?;
            emit_json(serde_json::json!({
                "before_version": before,
                "after_version": after
            }))
        }
        DbCommand::Seed => {
            store.migrate()?;
            let counts = seed_demo_roster(store)?;
            emit_json(serde_json::json!({
                "graduates": counts.0,
                "memoriam": counts.1,
                "tracked": counts.2
            }))
        }
    }
}

fn run_generate(args: &GenerateArgs, store: &mut SqliteStore) -> Result<()> {
    store.migrate()?;
    fs::create_dir_all(&args.out_dir).with_context(|| {
        format!("failed to create output directory {}", args.out_dir.display())
    })?;

    let graduates = store.list_graduates()?;
    let memoriam = store.list_memoriam()?;
    let tracked = store.list_tracked()?;
    let paths = ReportPaths::in_dir(&args.out_dir);
    let options = GenerateOptions {
        roster_title: args.title.clone(),
        date_override: args.date_override.clone(),
    };

    let mut discard = DiscardArtifacts;
    let sink: &mut dyn ArtifactSink = if args.no_store { &mut discard } else { store };
    let summary = generate_all(&graduates, &memoriam, &tracked, &paths, &options, sink);

    let all_generated = summary.all_generated();
    emit_json(serde_json::to_value(&summary).context("failed to serialize summary")?)?;
    if all_generated {
        Ok(())
    } else {
        Err(anyhow!("one or more documents failed to generate"))
    }
}

fn run_report(command: ReportCommand, store: &mut SqliteStore) -> Result<()> {
    store.migrate()?;
    match command {
        ReportCommand::List => {
            let reports = store.list_reports()?;
            emit_json(serde_json::json!({ "reports": reports }))
        }
        ReportCommand::Fetch(args) => {
            let Some(bytes) = store.fetch_report(&args.name)? else {
                return Err(anyhow!("no stored report named {}", args.name));
            };
            fs::write(&args.out, &bytes)
                .with_context(|| format!("failed to write {}", args.out.display()))?;
            emit_json(serde_json::json!({
                "name": args.name,
                "out": args.out,
                "size_bytes": bytes.len()
            }))
        }
    }
}

/// A handful of records spanning several branches and hostels, with
/// synthetic portrait photos, enough to exercise every document.
fn seed_demo_roster(store: &SqliteStore) -> Result<(usize, usize, usize)> {
    let rows: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
        ("CE101", "Anand Rao", "CE", "Ganga", "12-Jun", "Chennai", "India"),
        ("CE102", "Chandran Pillai", "CE", "Kaveri", "3-Jun", "Coimbatore", "India"),
        ("EE201", "Bhaskar Menon", "EE", "Ganga", "25-Jan", "Bengaluru", "India"),
        ("EE202", "Ravi Iyer", "EE", "Jamuna", "7-Mar", "Boston", "USA"),
        ("ME301", "Suresh Nair", "ME", "Kaveri", "19-Oct", "Mumbai", "India"),
        ("CH401", "Ganesh Kumar", "CH", "Jamuna", "2-Dec", "Singapore", "Singapore"),
    ];
    for (index, (roll, name, branch, hostel, dob, city, country)) in rows.iter().enumerate() {
        let id = i64::try_from(index).unwrap_or(0) + 1;
        let record = Graduate {
            id,
            roll_no: (*roll).to_string(),
            name: Some((*name).to_string()),
            branch: Some((*branch).to_string()),
            hostel: Some((*hostel).to_string()),
            dob: Some((*dob).to_string()),
            wad: Some("14-Feb".to_string()),
            lives_in: Some((*city).to_string()),
            country: Some((*country).to_string()),
            email: Some(format!("{}@example.org", roll.to_lowercase())),
            phone: Some(format!("+91 98{id:03}00000")),
            photo_1966: Some(demo_photo(60, 80, id)?),
            photo_current: Some(demo_photo(80, 60, id)?),
            ..Graduate::default()
        };
        store.insert_graduate(&record)?;
    }

    store.insert_memoriam(&MemoriamEntry {
        roll_no: "ME302".to_string(),
        name: Some("Dinesh Varma".to_string()),
        branch: Some("ME".to_string()),
        photo: Some(demo_photo(60, 80, 99)?),
    })?;
    store.insert_tracked(&TrackedEntry {
        roll_no: "CE103".to_string(),
        name: Some("Eswar Prasad".to_string()),
        branch: Some("CE".to_string()),
        photo: None,
    })?;

    Ok((rows.len(), 1, 1))
}

fn demo_photo(width: u32, height: u32, seed: i64) -> Result<Vec<u8>> {
    let tint = u8::try_from((seed * 37) % 200).unwrap_or(0);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([tint, u8::try_from(x % 256).unwrap_or(0), u8::try_from(y % 256).unwrap_or(0)])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .context("failed to encode demo photo")?;
    Ok(buf.into_inner())
}
