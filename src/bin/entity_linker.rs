//! Entity Linker CLI
//!
//! Builds the alias index and resolves questions from the command line.
//!
//! Usage:
//!   cargo run --features cli --bin entity_linker -- build --corpus-dir data/id_maps
//!   cargo run --features cli --bin entity_linker -- stats
//!   cargo run --features cli --bin entity_linker -- resolve "What enzymes does gene eco:b0001 encode?"
//!   cat questions.txt | cargo run --features cli --bin entity_linker -- resolve --no-llm
//!
//! Defaults come from `LinkerConfig::from_env()` (`.env`, `LINKER_*`); flags
//! override them.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bio_entity_linker::config::LinkerConfig;
use bio_entity_linker::entity_linking::{corpus, AliasIndex, EntityResolver, Mention, ResolveOptions};
use bio_entity_linker::telemetry;

#[derive(Parser, Debug)]
#[command(name = "entity_linker")]
#[command(about = "Resolve biomedical entity mentions in questions")]
struct Args {
    /// YAML configuration file (overrides LINKER_CONFIG)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Alias index cache path
    #[arg(long, global = true, env = "LINKER_CACHE_PATH")]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the alias index from ID_map_*.csv tables and write the cache
    Build {
        /// Directory holding the alias tables
        #[arg(long)]
        corpus_dir: Option<PathBuf>,

        /// Minimum normalized alias length
        #[arg(long)]
        min_length: Option<usize>,
    },

    /// Print statistics for the cached index
    Stats,

    /// Resolve questions given as arguments, or one per line on stdin
    Resolve {
        questions: Vec<String>,

        /// Restrict candidates to one species code (e.g. ath)
        #[arg(long, short = 's')]
        species: Option<String>,

        /// Skip the LLM source
        #[arg(long)]
        no_llm: bool,

        /// Skip the ID / enzyme-phrase source
        #[arg(long)]
        no_regex: bool,

        /// Fuzzy acceptance threshold (0-100)
        #[arg(long, short = 't')]
        threshold: Option<f64>,

        /// Questions resolved concurrently
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },
}

#[derive(serde::Serialize)]
struct ResolvedQuestion<'a> {
    question: &'a str,
    mentions: &'a [Mention],
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LinkerConfig::from_yaml_file(path)?,
        None => LinkerConfig::from_env()?,
    };
    if let Some(cache) = args.cache {
        config.cache_path = cache;
    }

    match args.command {
        Command::Build {
            corpus_dir,
            min_length,
        } => {
            let dir = corpus_dir.unwrap_or_else(|| config.corpus_dir.clone());
            let min_length = min_length.unwrap_or(config.min_alias_length);
            let start = Instant::now();
            let index = corpus::build_from_dir(&dir, &config.cache_path, min_length)?;
            println!("{}", index.stats());
            println!(
                "Wrote {} in {:.2}s",
                config.cache_path.display(),
                start.elapsed().as_secs_f64()
            );
        }

        Command::Stats => {
            let index = AliasIndex::load(&config.cache_path)?;
            println!("{}", index.stats());
        }

        Command::Resolve {
            questions,
            species,
            no_llm,
            no_regex,
            threshold,
            concurrency,
        } => {
            if no_llm {
                config.llm.enabled = false;
            }
            if let Some(threshold) = threshold {
                config.fuzzy_threshold = threshold;
            }
            config.validate()?;

            let questions = if questions.is_empty() {
                std::io::stdin()
                    .lock()
                    .lines()
                    .collect::<std::io::Result<Vec<_>>>()
                    .context("reading questions from stdin")?
                    .into_iter()
                    .filter(|q| !q.trim().is_empty())
                    .collect()
            } else {
                questions
            };

            let resolver = EntityResolver::from_config(&config)?;
            let mut options = ResolveOptions::from(&config);
            options.use_regex = !no_regex;
            options.species_hint = species;

            let results = resolver
                .resolve_batch(
                    &questions,
                    &options,
                    concurrency.unwrap_or(config.batch_concurrency),
                )
                .await;

            for (question, mentions) in questions.iter().zip(&results) {
                let line = serde_json::to_string(&ResolvedQuestion { question, mentions })?;
                println!("{}", line);
            }
        }
    }

    Ok(())
}
