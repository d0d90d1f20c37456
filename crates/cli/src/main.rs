//! # worddict
//!
//! Builds, refreshes and queries a flat-file dictionary.
//!
//! ```bash
//! worddict --dir /var/lib/worddict build
//! worddict --dir /var/lib/worddict update
//! worddict --dir /var/lib/worddict query apple banana
//! worddict --dir /var/lib/worddict query --blob dict.dat apple
//! ```
//!
//! `query` exits with status 1 when any word is missing and 2 on failure.

mod archive;
mod config;
mod engine;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use index::ParseMode;
use store::{DirBlobStore, RangeRead, RemoteRangeReader, StoreReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::DictConfig;
use crate::engine::Dictionary;

const DEFAULT_LOG_FILTER: &str = "worddict=info,store=info,wordfile=info,index=warn";

#[derive(Parser, Debug)]
#[command(name = "worddict")]
#[command(about = "Flat-file word dictionary with changelog refreshes")]
struct Args {
    /// Data directory holding the dictionary files
    #[arg(long, default_value = ".", env = "WORDDICT_DIR")]
    dir: PathBuf,

    /// Source file name inside the data directory
    #[arg(long, default_value = "words.dat", env = "WORDDICT_SOURCE")]
    source: String,

    /// Store file name inside the data directory
    #[arg(long, default_value = "dict.dat", env = "WORDDICT_STORE")]
    store: String,

    /// Changelog file name inside the data directory
    #[arg(long, default_value = "changelog.dat", env = "WORDDICT_CHANGELOG")]
    changelog: String,

    /// Number of archived generations to keep (all when unset)
    #[arg(long, env = "WORDDICT_ARCHIVE_RETENTION")]
    keep: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the store from the source file
    Build,
    /// Apply the changelog, archive the old generation and rebuild
    Update,
    /// Look up definitions
    Query {
        /// Words to look up
        #[arg(required = true)]
        words: Vec<String>,

        /// Read through ranged blob fetches of this key under the data directory
        #[arg(long)]
        blob: Option<String>,
    },
    /// Print index statistics for the store
    Stats {
        /// Fail on the first corrupt index record instead of skipping it
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = DictConfig::new(&args.dir)
        .source_file(args.source)
        .store_file(args.store)
        .changelog_file(args.changelog)
        .archive_retention(args.keep);

    match run(config, args.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(config: DictConfig, command: Command) -> Result<ExitCode> {
    match command {
        Command::Build => {
            let summary = engine::build(&config)?;
            println!(
                "built {} ({} words, index {} bytes, data {} bytes)",
                config.store_path().display(),
                summary.records,
                summary.index_size,
                summary.data_size
            );
        }
        Command::Update => {
            let report = engine::update(&config)?;
            println!(
                "updated {} words, {} total; previous generation in {}",
                report.updated,
                report.build.records,
                report.archive_dir.display()
            );
            for dir in &report.pruned {
                println!("pruned {}", dir.display());
            }
        }
        Command::Query { words, blob } => {
            let found = match blob {
                Some(key) => {
                    let blobs = DirBlobStore::new(&config.dir);
                    let reader = StoreReader::open(RemoteRangeReader::new(blobs, key))
                        .context("open remote store")?;
                    print_definitions(&reader, &words)?
                }
                None => {
                    let dict = Dictionary::open(config)?;
                    print_definitions(dict.reader(), &words)?
                }
            };
            if !found {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Stats { strict } => {
            let mode = if strict {
                ParseMode::Strict
            } else {
                ParseMode::Tolerant
            };
            let reader = StoreReader::open_with_mode(
                store::FileRangeReader::open(config.store_path())?,
                mode,
            )?;
            println!("store:      {}", config.store_path().display());
            println!("words:      {}", reader.len());
            println!("index size: {} bytes", reader.index_size());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints each word's definition; returns false if any word was missing.
fn print_definitions<R: RangeRead>(reader: &StoreReader<R>, words: &[String]) -> Result<bool> {
    let mut all_found = true;
    for word in words {
        match reader.query(word)? {
            Some(def) => println!("{}: {}", word, def),
            None => {
                println!("{}: not found", word);
                all_found = false;
            }
        }
    }
    Ok(all_found)
}
