//! cardforge – command-line deck → PDF exporter.
//!
//! Usage:
//!   cardforge <project.json> [--locale de] [--out export] [--html-only] [--init]
//!
//! Paths in the project file are relative to the directory containing it.

use std::path::{Path, PathBuf};
use std::{env, process};

use card_forge::assets::DataUriAssetResolver;
use card_forge::config::ProjectConfig;
use card_forge::export::export_to_document;
use card_forge::fs::{FileSystem, StdFileSystem};
use card_forge::i18n::load_bundle;
use card_forge::pipeline::CardPipeline;
use card_forge::raster::CommandRasterizer;
use card_forge::render::PdfDocumentWriter;
use card_forge::templates;

struct Options {
    project: PathBuf,
    locale: Option<String>,
    out: Option<PathBuf>,
    html_only: bool,
    init: bool,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    let result = if options.init {
        init_project(&options.project)
    } else {
        run(&options)
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Options {
    let mut project: Option<PathBuf> = None;
    let mut locale = None;
    let mut out = None;
    let mut html_only = false;
    let mut init = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--locale" | "-l" => match iter.next() {
                Some(v) => locale = Some(v.clone()),
                None => usage_error(&args[0], "--locale needs a value"),
            },
            "--out" | "-o" => match iter.next() {
                Some(v) => out = Some(PathBuf::from(v)),
                None => usage_error(&args[0], "--out needs a value"),
            },
            "--html-only" => html_only = true,
            "--init" => init = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                usage_error(&args[0], &format!("Unknown flag: {other}"))
            }
            path => {
                if project.is_some() {
                    usage_error(&args[0], &format!("Unexpected argument: {path}"));
                }
                project = Some(PathBuf::from(path));
            }
        }
    }

    let Some(project) = project else {
        usage_error(&args[0], "no project file specified.");
    };
    Options {
        project,
        locale,
        out,
        html_only,
        init,
    }
}

fn run(options: &Options) -> Result<(), String> {
    let fs = StdFileSystem;
    let root = project_root(&options.project);

    let mut config = ProjectConfig::load(&fs, &options.project).map_err(|e| e.to_string())?;
    if let Some(out) = &options.out {
        config.export.output_dir = out.clone();
    }

    let cards = config.load_deck(&fs, &root).map_err(|e| e.to_string())?;

    let settings = &config.localization;
    let bundle = settings.directory.as_ref().and_then(|dir| {
        let locale = options.locale.as_deref().unwrap_or(&settings.default_locale);
        load_bundle(
            &fs,
            &root.join(dir),
            locale,
            &settings.default_locale,
            settings.available_locales(),
        )
    });

    let mut pipeline = CardPipeline::new();
    pipeline.load_templates(&fs, &root, &cards, &config);
    let assets = DataUriAssetResolver::new(&fs);
    let resolved = pipeline
        .try_resolve_all(&cards, &config.columns, bundle.as_ref(), &root, Some(&assets))
        .map_err(|e| e.to_string())?;

    let output_dir = root.join(&config.export.output_dir);
    if options.html_only {
        fs.ensure_directory(&output_dir).map_err(|e| e.to_string())?;
        for card in &resolved {
            let path = output_dir.join(format!("{}.html", card.index + 1));
            fs.write_binary(&path, card.html.as_bytes())
                .map_err(|e| e.to_string())?;
        }
        eprintln!(
            "Wrote {} card preview{} to '{}'",
            resolved.len(),
            if resolved.len() == 1 { "" } else { "s" },
            output_dir.display()
        );
        return Ok(());
    }

    let mut rasterizer = CommandRasterizer::new(&config.export.rasterizer, &output_dir)?;
    let mut writer = PdfDocumentWriter::new(&config.export.title);
    let mut on_progress = |p: f32| eprint!("\rRendering cards: {:>3.0}%", p * 100.0);

    let report = export_to_document(
        &resolved,
        &config,
        &root,
        &fs,
        &mut rasterizer,
        &mut writer,
        &mut on_progress,
    );
    eprintln!();
    let report = report.map_err(|e| e.to_string())?;

    let pages = report.layout.page_count();
    eprintln!(
        "Wrote '{}' ({} of {} cards, {} page{})",
        report.document_path.display(),
        report.exported.len(),
        report.total,
        pages,
        if pages == 1 { "" } else { "s" }
    );
    for failure in &report.failures {
        eprintln!("  skipped: {failure}");
    }
    Ok(())
}

/// Write a starter project next to `project` without overwriting anything.
fn init_project(project: &Path) -> Result<(), String> {
    let fs = StdFileSystem;
    let root = project_root(project);
    let config = ProjectConfig {
        deck: Some(PathBuf::from("cards.csv")),
        default_template: Some(PathBuf::from("templates/card.html")),
        ..ProjectConfig::default()
    };
    let files: [(PathBuf, String); 3] = [
        (project.to_path_buf(), config.to_json()),
        (
            root.join("cards.csv"),
            "id,Name,Cost,Text\nfire,Fireball,3,Deal 3 damage.\nice,Frost Bolt,2,Freeze a target.\n"
                .to_string(),
        ),
        (
            root.join("templates/card.html"),
            templates::basic_card_template().to_string(),
        ),
    ];

    fs.ensure_directory(&root.join("templates"))
        .map_err(|e| e.to_string())?;
    for (path, content) in files {
        if path.exists() {
            eprintln!("Keeping existing '{}'", path.display());
            continue;
        }
        fs.write_binary(&path, content.as_bytes())
            .map_err(|e| e.to_string())?;
        eprintln!("Created '{}'", path.display());
    }
    Ok(())
}

fn project_root(project: &Path) -> PathBuf {
    match project.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn usage_error(prog: &str, msg: &str) -> ! {
    eprintln!("Error: {msg}");
    print_usage(prog);
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("cardforge – card deck to PDF exporter (card-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <project.json> [--locale de] [--out DIR] [--html-only] [--init]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <project.json>  Project file; deck, templates and bundles are relative to it");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --locale, -l    Locale bundle to use (default: localization.default_locale)");
    eprintln!("  --out, -o       Output directory (default: export.output_dir)");
    eprintln!("  --html-only     Write rendered card HTML instead of rasterizing");
    eprintln!("  --init          Create a starter project at <project.json>");
    eprintln!("  --help          Print this message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-card diagnostics.");
}
