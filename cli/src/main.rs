use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use textret_core::block::Thresholds;
use textret_core::bm25::Bm25Params;
use textret_core::pipeline::{index, run_match, IndexOptions, MatchOptions, TopicOutcome};
use textret_core::run::PostingListSize;
use textret_core::topics::{default_topics, load_topics};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "textret")]
#[command(about = "Blocked sort-based indexing and Okapi BM25 similar-document retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a directory of class sub-directories into blocks, then merge them
    Index {
        /// Source directory for the files to index
        #[arg(short = 's', long, default_value = ".")]
        source: PathBuf,
        /// Target directory for the index file and the temporary block folder
        #[arg(short = 't', long, default_value = ".")]
        target: PathBuf,
        /// Number of documents per block
        #[arg(short = 'b', long = "blockSize", default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        block_size: u32,
        /// Stem tokens with the Snowball English stemmer
        #[arg(short = 'e', long, default_value_t = false, action = ArgAction::Set)]
        stemming: bool,
        /// Upper bound for frequency thresholding (negative disables)
        #[arg(short = 'u', long, default_value_t = -1, allow_negative_numbers = true)]
        upper: i64,
        /// Lower bound for frequency thresholding (negative disables)
        #[arg(short = 'l', long, default_value_t = -1, allow_negative_numbers = true)]
        lower: i64,
    },
    /// Rank the ten documents most similar to each topic document with BM25
    Match {
        /// Index file written by the index command
        #[arg(short = 'i', long = "indexFile", default_value = "index.bin.gz")]
        index_file: PathBuf,
        /// Source directory for the files to score
        #[arg(short = 's', long, default_value = ".")]
        source: PathBuf,
        /// Target directory for the similarity result files
        #[arg(short = 't', long, default_value = ".")]
        target: PathBuf,
        /// Posting list size tag used in run file names and run tags
        #[arg(long, default_value = "medium")]
        size: PostingListSize,
        /// File with one query document id per line (defaults to the packaged topics)
        #[arg(long)]
        topics: Option<PathBuf>,
        /// Analyzer stemming for document lengths; should match the index
        #[arg(short = 'e', long, default_value_t = false, action = ArgAction::Set)]
        stemming: bool,
        #[arg(long, default_value_t = 1.2)]
        k1: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { source, target, block_size, stemming, upper, lower } => {
            let options = IndexOptions {
                source,
                target,
                block_size: block_size as usize,
                stemming,
                thresholds: Thresholds::new(lower, upper),
            };
            let summary = index(&options).context("indexing failed")?;
            tracing::info!(
                blocks = summary.blocks,
                docs = summary.documents,
                terms = summary.terms,
                index = %summary.index_file.display(),
                "index build complete"
            );
            Ok(())
        }
        Commands::Match { index_file, source, target, size, topics, stemming, k1, b } => {
            let topics = match topics {
                Some(path) => load_topics(&path).with_context(|| format!("reading topics from {}", path.display()))?,
                None => default_topics(),
            };
            let options = MatchOptions {
                index_file,
                source,
                target,
                size,
                topics,
                params: Bm25Params { k1, b },
                stemming,
            };
            let summary = run_match(&options).context("matching failed")?;
            for (topic, doc_id, outcome) in &summary.topics {
                if let TopicOutcome::Skipped(reason) = outcome {
                    tracing::warn!(topic, query = %doc_id, reason = %reason, "no run file written");
                }
            }
            Ok(())
        }
    }
}
