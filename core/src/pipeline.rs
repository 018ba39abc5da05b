use crate::block::{Block, BlockBuilder, Thresholds};
use crate::bm25::{Bm25Engine, Bm25Params};
use crate::error::Result;
use crate::lengths::LengthTable;
use crate::merge::{check_row_count, merge_blocks};
use crate::persist::{
    clear_blocks, index_outputs, load_index, load_meta, meta_path_for, save_meta, save_table, IndexPaths, MetaFile,
    TableKind, INDEX_FILE,
};
use crate::run::{PostingListSize, RunWriter};
use crate::source::TextSource;
use crate::tokenizer::Analyzer;
use crate::topics::default_topics;
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub source: PathBuf,
    pub target: PathBuf,
    pub block_size: usize,
    pub stemming: bool,
    pub thresholds: Thresholds,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            target: PathBuf::from("."),
            block_size: 100,
            stemming: false,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub blocks: usize,
    pub documents: usize,
    pub terms: usize,
    pub index_file: PathBuf,
}

/// Builds the blocks for `options.source`, merges them and writes the
/// global index to `{target}/index.bin.gz`.
pub fn index(options: &IndexOptions) -> Result<IndexSummary> {
    tracing::info!(source = %options.source.display(), target = %options.target.display(), "started indexing");
    let paths = IndexPaths::new(&options.target);
    let source = TextSource::open_excluding(&options.source, &index_outputs(&paths.index_file()))?;
    let analyzer = Analyzer::new(options.stemming);

    let (blocks, documents) = create_blocks(&source, &analyzer, options, &paths)?;
    let index = merge_blocks(&paths)?;
    let index_file = paths.index_file();
    check_row_count(&index, documents, &index_file)?;

    save_table(&index_file, index.table(), TableKind::Index)?;
    tracing::info!(path = %index_file.display(), "wrote index");

    let meta = MetaFile {
        num_docs: index.num_documents(),
        num_terms: index.terms().len(),
        num_blocks: blocks,
        block_size: options.block_size,
        stemming: options.stemming,
        upper: options.thresholds.upper,
        lower: options.thresholds.lower,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: META_VERSION,
    };
    save_meta(&paths.meta(), &meta)?;

    tracing::info!(docs = meta.num_docs, terms = meta.num_terms, blocks, "done indexing");
    Ok(IndexSummary { blocks, documents, terms: meta.num_terms, index_file })
}

/// Streams the source through the block builder, writing each block as it
/// fills. Returns the number of blocks and documents written.
fn create_blocks(
    source: &TextSource,
    analyzer: &Analyzer,
    options: &IndexOptions,
    paths: &IndexPaths,
) -> Result<(usize, usize)> {
    tracing::info!(documents = source.len(), block_size = options.block_size, "started creating blocks");
    let stale = clear_blocks(&paths.blocks_dir())?;
    if stale > 0 {
        tracing::info!(stale, "removed blocks of a previous run");
    }

    let mut builder = BlockBuilder::new(options.block_size, options.thresholds);
    let mut blocks = 0;
    let mut documents = 0;
    for document in source.documents() {
        let document = document?;
        let tokens = analyzer.tokens(&document.text);
        if let Some(block) = builder.add_document(document.doc_id, document.class_name, tokens) {
            documents += write_block(paths, &block)?;
            blocks += 1;
        }
    }
    if let Some(block) = builder.finish() {
        documents += write_block(paths, &block)?;
        blocks += 1;
    }
    tracing::info!(blocks, documents, "done creating blocks");
    Ok((blocks, documents))
}

fn write_block(paths: &IndexPaths, block: &Block) -> Result<usize> {
    let path = paths.block_file(block.id);
    save_table(&path, &block.table, TableKind::Block)?;
    tracing::info!(path = %path.display(), docs = block.doc_count(), "wrote block");
    Ok(block.doc_count())
}

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub index_file: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    pub size: PostingListSize,
    pub topics: Vec<String>,
    pub params: Bm25Params,
    pub stemming: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            index_file: PathBuf::from(INDEX_FILE),
            source: PathBuf::from("."),
            target: PathBuf::from("."),
            size: PostingListSize::default(),
            topics: default_topics(),
            params: Bm25Params::default(),
            stemming: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    Written(PathBuf),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    /// `(topic number, query doc id, outcome)` in topic order.
    pub topics: Vec<(usize, String, TopicOutcome)>,
}

impl MatchSummary {
    pub fn written(&self) -> usize {
        self.topics.iter().filter(|(_, _, o)| matches!(o, TopicOutcome::Written(_))).count()
    }
}

/// Ranks the ten most similar documents for every topic and writes one run
/// file per topic. Topics missing from the index are skipped with a warning.
pub fn run_match(options: &MatchOptions) -> Result<MatchSummary> {
    tracing::info!(index = %options.index_file.display(), "started Okapi BM25 retrieval");
    let index = load_index(&options.index_file)?;
    let analyzer = Analyzer::new(options.stemming);
    warn_on_analyzer_mismatch(&options.index_file, &analyzer);

    let mut excluded = index_outputs(&options.index_file);
    excluded.push(options.target.clone());
    let source = TextSource::open_excluding(&options.source, &excluded)?;
    let lengths = LengthTable::collect(source.documents(), &analyzer)?;
    let engine = Bm25Engine::new(&index, &lengths, options.params);
    let writer = RunWriter::new(&options.target, options.size);

    let mut topics = Vec::with_capacity(options.topics.len());
    for (i, doc_id) in options.topics.iter().enumerate() {
        let topic = i + 1;
        let outcome = match engine.find_similar(doc_id) {
            Ok(ranks) => TopicOutcome::Written(writer.write(topic, &ranks)?),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(topic, query = %doc_id, %err, "skipping query");
                TopicOutcome::Skipped(err.to_string())
            }
            Err(err) => return Err(err),
        };
        topics.push((topic, doc_id.clone(), outcome));
    }
    let summary = MatchSummary { topics };
    tracing::info!(written = summary.written(), topics = options.topics.len(), "done Okapi BM25 retrieval");
    Ok(summary)
}

fn warn_on_analyzer_mismatch(index_file: &Path, analyzer: &Analyzer) {
    let meta_path = meta_path_for(index_file);
    if !meta_path.exists() {
        return;
    }
    match load_meta(&meta_path) {
        Ok(meta) if meta.stemming != analyzer.stemming() => tracing::warn!(
            index_stemming = meta.stemming,
            match_stemming = analyzer.stemming(),
            "document lengths use a different analyzer than the index"
        ),
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "ignoring unreadable index metadata"),
    }
}
