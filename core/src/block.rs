//! In-memory block construction for blocked sort-based indexing.
//!
//! A [`BlockBuilder`] keeps a local dictionary `token -> [count; B]` for at
//! most `B` documents. Once the block is full (or the corpus ends) the
//! dictionary is optionally thresholded, its terms sorted, and the block is
//! turned into a [`Table`] with one row per document.

use crate::index::{Column, Count, Row, Table, RESERVED_ATTRIBUTES};
use std::collections::HashMap;

/// Per-block frequency thresholds. A negative bound is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub lower: i64,
    pub upper: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { lower: -1, upper: -1 }
    }
}

impl Thresholds {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    pub fn is_disabled(&self) -> bool {
        self.lower < 0 && self.upper < 0
    }

    pub fn keeps(&self, count: Count) -> bool {
        let count = i64::from(count);
        count >= self.lower && (self.upper < 0 || count <= self.upper)
    }
}

/// A flushed block: its id in flush order and its table.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: usize,
    pub table: Table,
}

impl Block {
    pub fn doc_count(&self) -> usize {
        self.table.num_rows()
    }
}

pub struct BlockBuilder {
    block_size: usize,
    thresholds: Thresholds,
    dictionary: HashMap<String, Vec<Count>>,
    documents: Vec<(String, String)>,
    next_block: usize,
}

impl BlockBuilder {
    pub fn new(block_size: usize, thresholds: Thresholds) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            thresholds,
            dictionary: HashMap::new(),
            documents: Vec::with_capacity(block_size),
            next_block: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Documents added since the last flush.
    pub fn pending(&self) -> usize {
        self.documents.len()
    }

    /// Adds one document's tokens. Returns the completed block when this
    /// document fills it.
    pub fn add_document<I>(&mut self, doc_id: String, class_name: String, tokens: I) -> Option<Block>
    where
        I: IntoIterator<Item = String>,
    {
        let slot = self.documents.len();
        let block_size = self.block_size;
        for token in tokens {
            let counts = self.dictionary.entry(token).or_insert_with(|| vec![0; block_size]);
            counts[slot] += 1;
        }
        self.documents.push((doc_id, class_name));

        (self.documents.len() == self.block_size).then(|| self.flush())
    }

    /// Flushes the trailing partial block, if any document is pending.
    pub fn finish(mut self) -> Option<Block> {
        (!self.documents.is_empty()).then(|| self.flush())
    }

    fn flush(&mut self) -> Block {
        if !self.thresholds.is_disabled() {
            self.apply_thresholds();
        }

        let mut entries: Vec<(String, Vec<Count>)> = self.dictionary.drain().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let id = self.next_block;
        self.next_block += 1;

        let mut table = Table::new(format!("block{id}"));
        table.attributes.extend(entries.iter().map(|(term, _)| term.clone()));
        for (slot, (name, class)) in self.documents.drain(..).enumerate() {
            let mut row = Row::new(name, class);
            for (j, (_, counts)) in entries.iter().enumerate() {
                if counts[slot] > 0 {
                    row.cells.push(((RESERVED_ATTRIBUTES + j) as Column, counts[slot]));
                }
            }
            table.rows.push(row);
        }
        tracing::debug!(block = id, docs = table.num_rows(), terms = table.terms().len(), "flushed block");
        Block { id, table }
    }

    /// Zeroes counts outside the bounds and drops terms left without any count.
    fn apply_thresholds(&mut self) {
        let thresholds = self.thresholds;
        self.dictionary.retain(|_, counts| {
            let mut keep = false;
            for count in counts.iter_mut().filter(|c| **c > 0) {
                if thresholds.keeps(*count) {
                    keep = true;
                } else {
                    *count = 0;
                }
            }
            keep
        });
    }
}
