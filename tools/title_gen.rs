/// Title Gen — command-line front end for the title generator.
///
/// Usage: title_gen [-s <style>] [-c <entity>] [-n <count>] [-a] [-o <file>]
///                  [--batch <n> [--fixed-style] [--fixed-entity]]
///                  [--vocab | --pool | --examples | --add-entity <category> <name>]
///
/// Input file locations default to the working directory and can be
/// overridden with flags or `TITLE_*` environment variables.
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use title_engine::core::generator::{
    save_titles, BatchOptions, CategoryStats, GeneratorError, TitleGenerator,
};
use title_engine::schema::entity_pool::RecoveryPolicy;
use title_engine::schema::style::{GeneratedTitle, StyleId};

#[derive(Parser, Debug)]
#[command(name = "title_gen")]
#[command(about = "Generate randomized titles from a vocabulary and an entity pool")]
struct Args {
    /// Style id (see --all for the full list)
    #[arg(long, short = 's')]
    style: Option<u8>,

    /// Entity name to embed; drawn from the pool when omitted
    #[arg(long, short = 'c')]
    entity: Option<String>,

    /// Number of titles to generate
    #[arg(long, short = 'n', default_value_t = 1)]
    count: usize,

    /// Generate `count` titles for every style
    #[arg(long, short = 'a')]
    all: bool,

    /// Also write the generated titles to this file, one per line
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Show vocabulary categories with counts and samples
    #[arg(long)]
    vocab: bool,

    /// Show entity pool categories with counts and samples
    #[arg(long)]
    pool: bool,

    /// Show rule example counts per style
    #[arg(long)]
    examples: bool,

    /// Add an entity to the pool and save it
    #[arg(long, num_args = 2, value_names = ["CATEGORY", "NAME"])]
    add_entity: Option<Vec<String>>,

    /// Generate a batch of this many titles
    #[arg(long)]
    batch: Option<usize>,

    /// Use one style for the whole batch
    #[arg(long)]
    fixed_style: bool,

    /// Use one entity for the whole batch
    #[arg(long)]
    fixed_entity: bool,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Vocabulary file
    #[arg(long, env = "TITLE_VOCAB_FILE", default_value = "name.md")]
    vocab_file: PathBuf,

    /// Entity pool file (created on first run)
    #[arg(long, env = "TITLE_POOL_FILE", default_value = "characters.json")]
    pool_file: PathBuf,

    /// Rule examples file
    #[arg(long, env = "TITLE_RULES_FILE", default_value = "rules.md")]
    rules_file: PathBuf,

    /// Style catalog (RON) replacing the built-in one
    #[arg(long, env = "TITLE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Replace a malformed pool file without keeping a backup
    #[arg(long)]
    overwrite_malformed_pool: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "title_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), GeneratorError> {
    let mut builder = TitleGenerator::builder()
        .vocabulary_path(&args.vocab_file)
        .pool_path(&args.pool_file)
        .rules_path(&args.rules_file);
    if let Some(path) = &args.catalog {
        builder = builder.catalog_path(path);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if args.overwrite_malformed_pool {
        builder = builder.recovery_policy(RecoveryPolicy::Overwrite);
    }
    let mut generator = builder.build()?;

    let entity = args.entity.as_deref();

    if let Some(pair) = &args.add_entity {
        let (category, name) = (&pair[0], &pair[1]);
        if generator.add_entity(category, name)? {
            println!("Added '{}' to '{}'", name.trim(), category.trim());
        } else {
            println!("'{}' is already in '{}'", name.trim(), category.trim());
        }
        return Ok(());
    }
    if args.vocab {
        print_stats("Vocabulary", &generator.vocabulary_stats());
        return Ok(());
    }
    if args.pool {
        print_stats("Entity pool", &generator.pool_stats());
        return Ok(());
    }
    if args.examples {
        print_stats("Rule examples", &generator.rule_example_stats());
        return Ok(());
    }

    let titles: Vec<String> = if let Some(total) = args.batch {
        let options = BatchOptions {
            total,
            random_style: !args.fixed_style,
            random_entity: !args.fixed_entity,
            fixed_entity: args.entity.clone(),
        };
        let batch = generator.generate_batch(&options)?;
        print_batch(&generator, &batch);
        batch.into_iter().map(String::from).collect()
    } else if args.all {
        let results = generator.generate_all_styles(entity, args.count)?;
        let mut titles = Vec::new();
        for (id, texts) in results {
            println!("=== {} ===", style_label(&generator, id));
            for (i, text) in texts.iter().enumerate() {
                println!("{:>3}. {}", i + 1, text);
            }
            println!();
            titles.extend(texts);
        }
        titles
    } else if let Some(style) = args.style {
        let style = StyleId(style);
        let texts = generator.generate_n(Some(style), entity, args.count)?;
        println!("=== {} ===", style_label(&generator, style));
        for (i, text) in texts.iter().enumerate() {
            println!("{:>3}. {}", i + 1, text);
        }
        texts
    } else {
        let mut options = BatchOptions::new(args.count);
        options.fixed_entity = args.entity.clone();
        let batch = generator.generate_batch(&options)?;
        print_batch(&generator, &batch);
        batch.into_iter().map(String::from).collect()
    };

    if let Some(path) = &args.output {
        write_output(path, &titles)?;
    }
    Ok(())
}

fn style_label(generator: &TitleGenerator, id: StyleId) -> String {
    match generator.style_name(id) {
        Some(name) => format!("Style {}: {}", id, name),
        None => format!("Style {}", id),
    }
}

fn print_batch(generator: &TitleGenerator, batch: &[GeneratedTitle]) {
    for (i, title) in batch.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, style_label(generator, title.style), title);
    }
}

fn print_stats(heading: &str, stats: &[CategoryStats]) {
    println!("=== {} ===\n", heading);
    if stats.is_empty() {
        println!("(empty)");
        return;
    }
    let total: usize = stats.iter().map(|s| s.count).sum();
    for category in stats {
        println!("{} ({})", category.name, category.count);
        if !category.samples.is_empty() {
            println!("    {}", category.samples.join(" / "));
        }
    }
    println!("\nTotal: {} in {} categories", total, stats.len());
}

fn write_output(path: &Path, titles: &[String]) -> Result<(), GeneratorError> {
    if titles.is_empty() {
        println!("No titles generated; nothing saved.");
        return Ok(());
    }
    save_titles(path, titles)?;
    println!("Saved {} titles to {}", titles.len(), path.display());
    Ok(())
}
