//! Folding block tables into the global index.
//!
//! The global schema grows as blocks arrive: each unseen term is inserted at
//! its lexicographic position behind the two reserved attributes. Rows keep
//! their cells against stable term ids while the merge runs, and are
//! rewritten to final column positions by [`Merger::finish`].

use crate::error::{Error, Result};
use crate::index::{Column, Count, GlobalIndex, Row, Table, RESERVED_ATTRIBUTES};
use crate::persist::{list_blocks, load_table, IndexPaths, TableKind};
use std::collections::HashMap;
use std::path::Path;

type TermId = u32;

/// Sorted term schema with stable ids.
#[derive(Debug, Default)]
struct Schema {
    names: Vec<String>,
    ids: HashMap<String, TermId>,
    /// Term ids in attribute order (without the reserved attributes).
    order: Vec<TermId>,
}

impl Schema {
    /// Id of `name`, inserting it when new. A new term lands at attribute
    /// index `2 + (number of existing terms ordered before it)`; the return
    /// value carries that index, `None` when the term was already known.
    fn insert(&mut self, name: &str) -> (TermId, Option<usize>) {
        if let Some(&id) = self.ids.get(name) {
            return (id, None);
        }
        let id = self.names.len() as TermId;
        let at = self.order.partition_point(|&other| self.names[other as usize].as_str() < name);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.order.insert(at, id);
        (id, Some(RESERVED_ATTRIBUTES + at))
    }

    /// Term names in attribute order.
    fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|&id| self.names[id as usize].as_str())
    }
}

struct MergedRow {
    name: String,
    class: String,
    cells: Vec<(TermId, Count)>,
}

/// Accumulates block tables in ingestion order.
#[derive(Default)]
pub struct Merger {
    schema: Schema,
    rows: Vec<MergedRow>,
    blocks: usize,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks
    }

    pub fn ingest(&mut self, block: Table) {
        let mut added = 0usize;
        let local: Vec<TermId> = block
            .terms()
            .iter()
            .map(|term| {
                let (id, inserted_at) = self.schema.insert(term);
                if let Some(column) = inserted_at {
                    tracing::trace!(term = %term, column, "new term");
                    added += 1;
                }
                id
            })
            .collect();
        tracing::debug!(block = %block.relation, added, terms = self.schema.order.len(), "ingested block schema");

        for row in block.rows {
            let cells = row
                .cells
                .into_iter()
                .filter_map(|(column, count)| {
                    let slot = (column as usize).checked_sub(RESERVED_ATTRIBUTES)?;
                    local.get(slot).map(|&id| (id, count))
                })
                .collect();
            self.rows.push(MergedRow { name: row.name, class: row.class, cells });
        }
        self.blocks += 1;
    }

    pub fn finish(self) -> GlobalIndex {
        let Merger { schema, rows, .. } = self;

        let mut columns: Vec<Column> = vec![0; schema.names.len()];
        for (position, &id) in schema.order.iter().enumerate() {
            columns[id as usize] = (RESERVED_ATTRIBUTES + position) as Column;
        }

        let mut table = Table::new("index");
        table.attributes.extend(schema.terms().map(String::from));
        table.rows = rows
            .into_iter()
            .map(|merged| {
                let mut cells: Vec<(Column, Count)> =
                    merged.cells.into_iter().map(|(id, count)| (columns[id as usize], count)).collect();
                cells.sort_unstable_by_key(|&(column, _)| column);
                Row { name: merged.name, class: merged.class, cells }
            })
            .collect();

        debug_assert!(table.validate().is_ok());
        GlobalIndex::from_sorted(table)
    }
}

/// Reads every block under `paths` and merges them into one index. Any
/// unreadable block aborts the merge.
pub fn merge_blocks(paths: &IndexPaths) -> Result<GlobalIndex> {
    tracing::info!(dir = %paths.blocks_dir().display(), "started merging blocks");
    let mut merger = Merger::new();
    for path in list_blocks(&paths.blocks_dir())? {
        tracing::info!(block = %path.display(), "adding block to index");
        let table = load_table(&path, TableKind::Block)?;
        merger.ingest(table);
    }
    if merger.num_blocks() == 0 {
        tracing::warn!(dir = %paths.blocks_dir().display(), "no blocks found to merge");
    }
    let index = merger.finish();
    tracing::info!(docs = index.num_documents(), terms = index.terms().len(), "done merging");
    Ok(index)
}

/// Fails when the merged index does not hold exactly `expected` rows.
pub fn check_row_count(index: &GlobalIndex, expected: usize, index_file: &Path) -> Result<()> {
    if index.num_documents() == expected {
        return Ok(());
    }
    Err(Error::Format {
        path: index_file.to_path_buf(),
        message: format!("merged {} rows but indexed {expected} documents", index.num_documents()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(relation: &str, terms: &[&str], rows: Vec<(&str, Vec<(Column, Count)>)>) -> Table {
        let mut t = Table::new(relation);
        t.attributes.extend(terms.iter().map(|s| s.to_string()));
        for (name, cells) in rows {
            let mut row = Row::new(name, "c");
            row.cells = cells;
            t.rows.push(row);
        }
        t
    }

    #[test]
    fn insertion_index_counts_smaller_terms() {
        let mut schema = Schema::default();
        assert_eq!(schema.insert("cat"), (0, Some(2)));
        assert_eq!(schema.insert("ant"), (1, Some(2)));
        assert_eq!(schema.insert("dog"), (2, Some(4)));
        assert_eq!(schema.insert("bat"), (3, Some(3)));
        assert_eq!(schema.insert("cat"), (0, None));
        assert_eq!(schema.terms().collect::<Vec<_>>(), vec!["ant", "bat", "cat", "dog"]);
    }

    #[test]
    fn merges_schemas_in_lexicographic_order() {
        let mut merger = Merger::new();
        merger.ingest(block("block0", &["ant", "cat"], vec![("c/1", vec![(2, 1), (3, 2)])]));
        merger.ingest(block("block1", &["bat", "cat", "dog"], vec![("c/2", vec![(2, 4), (4, 1)])]));
        let index = merger.finish();

        assert_eq!(
            index.table().attributes,
            vec!["@nameOfTheDocument", "@classOfTheDocument", "ant", "bat", "cat", "dog"]
        );
        assert_eq!(index.num_documents(), 2);
        assert_eq!(index.count("c/1", "ant"), 1);
        assert_eq!(index.count("c/1", "cat"), 2);
        assert_eq!(index.count("c/1", "bat"), 0);
        assert_eq!(index.count("c/2", "bat"), 4);
        assert_eq!(index.count("c/2", "dog"), 1);
        assert_eq!(index.count("c/2", "cat"), 0);
        assert_eq!(index.rows()[1].cells, vec![(3, 4), (5, 1)]);
    }

    #[test]
    fn schema_only_block_still_contributes_rows() {
        let mut merger = Merger::new();
        merger.ingest(block("block0", &[], vec![("c/1", vec![]), ("c/2", vec![])]));
        merger.ingest(block("block1", &["x"], vec![("c/3", vec![(2, 1)])]));
        let index = merger.finish();
        assert_eq!(index.num_documents(), 3);
        assert_eq!(index.terms(), ["x"]);
        assert!(check_row_count(&index, 3, Path::new("index.bin.gz")).is_ok());
        assert!(check_row_count(&index, 4, Path::new("index.bin.gz")).is_err());
    }
}
