/// Catalog Linter — validates style catalog coverage and quality.
///
/// Usage: catalog_linter [<catalog.ron>] [--vocab <name.md>]
///
/// Without a catalog path the built-in catalog is checked. With a
/// vocabulary, slot categories missing from it are reported too.
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use title_engine::core::catalog::StyleCatalog;
use title_engine::schema::vocabulary::Vocabulary;

#[derive(Parser, Debug)]
#[command(name = "catalog_linter")]
#[command(about = "Check a style catalog for undefined slots and thin variant lists")]
struct Args {
    /// Catalog file (RON); the built-in catalog when omitted
    catalog: Option<PathBuf>,

    /// Vocabulary file to check slot categories against
    #[arg(long)]
    vocab: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "title_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let loaded = match &args.catalog {
        Some(path) => StyleCatalog::load_from_ron(path),
        None => StyleCatalog::builtin(),
    };
    let catalog = match loaded {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("ERROR: Failed to load catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let vocabulary = args
        .vocab
        .as_deref()
        .map(|path| Vocabulary::load(path).value);

    println!("Loaded {} styles", catalog.len());
    for style in catalog.styles() {
        println!("  {}: {} ({} variants)", style.id, style.name, style.variants.len());
    }

    let report = catalog.lint(vocabulary.as_ref());

    println!("\n=== Catalog Lint Report ===\n");

    if report.is_clean() {
        println!("All checks passed!");
    }
    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }
    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
