use crate::bm25::Rank;
use crate::error::{Error, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Run tag group written into every line and file name.
pub const RUN_GROUP: &str = "groupG";

/// Posting-list size tag of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostingListSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl fmt::Display for PostingListSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostingListSize::Small => "small",
            PostingListSize::Medium => "medium",
            PostingListSize::Large => "large",
        };
        f.write_str(s)
    }
}

impl FromStr for PostingListSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "small" => Ok(PostingListSize::Small),
            "medium" => Ok(PostingListSize::Medium),
            "large" => Ok(PostingListSize::Large),
            other => Err(format!("unknown posting list size {other:?}, expected small, medium or large")),
        }
    }
}

/// `topic{i} Q0 {docID} {rank} {score} groupG_{size}\r\n`
///
/// Scores use Rust's shortest round-trip `f64` form, so very small or very
/// large scores print positionally (`0.00095`, `12345678.0`), not in the
/// `9.5E-4` / `1.2345678E7` form of Java's `Double.toString`. Run files with
/// such scores are not byte-identical to runs formatted that way.
pub fn format_line(topic: usize, rank: usize, entry: &Rank, size: PostingListSize) -> String {
    let doc_id = entry.doc_id.as_deref().unwrap_or("null");
    format!("topic{topic} Q0 {doc_id} {rank} {:?} {RUN_GROUP}_{size}\r\n", entry.score)
}

/// Writes TREC-style run files into one target directory.
pub struct RunWriter {
    target: PathBuf,
    size: PostingListSize,
}

impl RunWriter {
    pub fn new<P: AsRef<Path>>(target: P, size: PostingListSize) -> Self {
        Self { target: target.as_ref().to_path_buf(), size }
    }

    pub fn run_path(&self, topic: usize) -> PathBuf {
        self.target.join(format!("{}_topic{topic}_{RUN_GROUP}.txt", self.size))
    }

    /// Writes `ranks` (best first) for 1-based `topic`, creating the target
    /// directory when needed.
    pub fn write(&self, topic: usize, ranks: &[Rank]) -> Result<PathBuf> {
        let path = self.run_path(topic);
        let output_err = |source: std::io::Error| Error::OutputIo { path: path.clone(), source };

        fs::create_dir_all(&self.target).map_err(output_err)?;
        let mut out = BufWriter::new(File::create(&path).map_err(output_err)?);
        for (i, entry) in ranks.iter().enumerate() {
            out.write_all(format_line(topic, i + 1, entry, self.size).as_bytes()).map_err(output_err)?;
        }
        out.flush().map_err(output_err)?;
        tracing::info!(path = %path.display(), "wrote results");
        Ok(path)
    }
}
