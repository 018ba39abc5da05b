//! Okapi BM25 "find similar documents" scoring over the global index.
//!
//! The query is itself an indexed document: every term with a positive
//! count in the query row is a query term. For a candidate row `d`:
//!
//! score(d, q) = Σ idf(t) · f(t,d) · (k1 + 1) / (f(t,d) + k1 · (1 − b + b · |q| · avgdl))
//!
//! with idf(t) = ln((N − n_t + 0.5) / (n_t + 0.5)), where n_t starts at 1 and
//! counts every row (the query included) holding the term. Length
//! normalisation uses the query length `|q|` multiplied by `avgdl`.

use crate::error::{Error, Result};
use crate::index::{Column, GlobalIndex, Row};
use crate::lengths::LengthTable;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of ranks produced per query.
pub const TOP_K: usize = 10;

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64, // term frequency saturation
    pub b: f64,  // length normalisation
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

/// A ranked document. `doc_id` is `None` for a slot no document filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Rank {
    pub score: f64,
    pub doc_id: Option<String>,
}

impl Rank {
    pub fn empty() -> Self {
        Rank { score: 0.0, doc_id: None }
    }

    pub fn is_filled(&self) -> bool {
        self.doc_id.is_some()
    }

    /// Ascending by score; at equal score an empty slot orders first.
    fn ascending(a: &Rank, b: &Rank) -> Ordering {
        a.score.total_cmp(&b.score).then(a.is_filled().cmp(&b.is_filled()))
    }
}

/// Fixed number of rank slots kept in ascending order; slot 0 is the minimum.
#[derive(Debug, Clone)]
pub struct TopK {
    slots: Vec<Rank>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { slots: vec![Rank::empty(); k] }
    }

    /// Offers a candidate. It replaces the minimum when it scores strictly
    /// higher, or ties with a minimum that is still empty. NaN never enters.
    pub fn offer(&mut self, score: f64, doc_id: &str) -> bool {
        let Some(min) = self.slots.first() else {
            return false;
        };
        let admit = score > min.score || (!min.is_filled() && score == min.score);
        if admit {
            self.slots[0] = Rank { score, doc_id: Some(doc_id.to_owned()) };
            // stable: earlier candidates stay ahead of later ones at equal keys
            self.slots.sort_by(Rank::ascending);
        }
        admit
    }

    /// Ranks from best to worst.
    pub fn into_descending(self) -> Vec<Rank> {
        let mut slots = self.slots;
        slots.reverse();
        slots
    }
}

/// Lazily computed IDFs for one query.
struct IdfCache<'a> {
    index: &'a GlobalIndex,
    idfs: HashMap<Column, f64>,
}

impl<'a> IdfCache<'a> {
    fn new(index: &'a GlobalIndex) -> Self {
        Self { index, idfs: HashMap::new() }
    }

    fn get(&mut self, column: Column) -> f64 {
        let index = self.index;
        *self.idfs.entry(column).or_insert_with(|| idf(index, column))
    }
}

/// ln((N − n_t + 0.5) / (n_t + 0.5)) with n_t = 1 + rows holding the term.
pub fn idf(index: &GlobalIndex, column: Column) -> f64 {
    let containing = 1 + index.rows().iter().filter(|row| row.get(column) > 0).count();
    let n = index.num_documents() as f64;
    let containing = containing as f64;
    ((n - containing + 0.5) / (containing + 0.5)).ln()
}

pub struct Bm25Engine<'a> {
    index: &'a GlobalIndex,
    lengths: &'a LengthTable,
    params: Bm25Params,
    top_k: usize,
}

impl<'a> Bm25Engine<'a> {
    pub fn new(index: &'a GlobalIndex, lengths: &'a LengthTable, params: Bm25Params) -> Self {
        Self { index, lengths, params, top_k: TOP_K }
    }

    /// The `TOP_K` documents most similar to `doc_id`, best first. The query
    /// document itself is never ranked.
    pub fn find_similar(&self, doc_id: &str) -> Result<Vec<Rank>> {
        let query_position = self
            .index
            .find_document(doc_id)
            .ok_or_else(|| Error::QueryNotFound(doc_id.to_owned()))?;
        let query_length = self.lengths.get(doc_id).ok_or_else(|| Error::LengthMissing(doc_id.to_owned()))?;
        tracing::info!(query = doc_id, "searching for similar documents");

        let query = &self.index.rows()[query_position];
        let normalizer = self.normalizer(query_length);
        let mut idfs = IdfCache::new(self.index);
        let mut top = TopK::new(self.top_k);

        for (position, row) in self.index.rows().iter().enumerate() {
            if position == query_position {
                continue;
            }
            let score = self.score(query, row, normalizer, &mut idfs);
            top.offer(score, &row.name);
        }
        tracing::debug!(query = doc_id, idfs = idfs.idfs.len(), "scored all candidates");
        Ok(top.into_descending())
    }

    /// k1 · (1 − b + b · |q| · avgdl)
    fn normalizer(&self, query_length: u32) -> f64 {
        let Bm25Params { k1, b } = self.params;
        k1 * (1.0 - b + b * f64::from(query_length) * self.lengths.average())
    }

    fn score(&self, query: &Row, candidate: &Row, normalizer: f64, idfs: &mut IdfCache<'_>) -> f64 {
        let k1 = self.params.k1;
        let mut score = 0.0;
        for &(column, query_count) in &query.cells {
            if query_count == 0 {
                continue;
            }
            let f_td = f64::from(candidate.get(column));
            let idf = idfs.get(column);
            score += idf * f_td * (k1 + 1.0) / (f_td + normalizer);
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Count, Table};

    fn index(terms: &[&str], rows: Vec<(&str, Vec<(Column, Count)>)>) -> GlobalIndex {
        let mut t = Table::new("index");
        t.attributes.extend(terms.iter().map(|s| s.to_string()));
        for (name, cells) in rows {
            let mut row = Row::new(name, "c");
            row.cells = cells;
            t.rows.push(row);
        }
        GlobalIndex::new(t).unwrap()
    }

    #[test]
    fn top_k_keeps_best_in_descending_order() {
        let mut top = TopK::new(3);
        for (score, id) in [(1.0, "a"), (5.0, "b"), (3.0, "c"), (4.0, "d"), (0.5, "e")] {
            top.offer(score, id);
        }
        let ranks = top.into_descending();
        let ids: Vec<_> = ranks.iter().map(|r| r.doc_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
    }

    #[test]
    fn top_k_zero_scores_fill_empty_slots_only() {
        let mut top = TopK::new(2);
        assert!(top.offer(0.0, "a"));
        assert!(top.offer(0.0, "b"));
        assert!(!top.offer(0.0, "c"));
        assert!(!top.offer(-1.0, "d"));
        assert!(!top.offer(f64::NAN, "e"));
        let ids: Vec<_> = top.into_descending().into_iter().map(|r| r.doc_id.unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn top_k_pads_with_empty_ranks() {
        let mut top = TopK::new(3);
        top.offer(2.0, "a");
        let ranks = top.into_descending();
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[0].doc_id.as_deref(), Some("a"));
        assert_eq!(ranks[1], Rank::empty());
        assert_eq!(ranks[2], Rank::empty());
    }

    #[test]
    fn idf_counts_query_and_starts_at_one() {
        // 4 rows, term at column 2 held by 1 row -> n_t = 2
        let idx = index(&["t"], vec![("a", vec![(2, 1)]), ("b", vec![]), ("c", vec![]), ("d", vec![])]);
        let expected = ((4.0 - 2.0 + 0.5) / (2.0 + 0.5f64)).ln();
        assert_eq!(idf(&idx, 2), expected);
    }

    #[test]
    fn scores_match_formula() {
        let mut rows = vec![("q", vec![(2, 1), (3, 1)]), ("d1", vec![(2, 2)]), ("d2", vec![(4, 1)])];
        for i in 0..6 {
            rows.push((["f0", "f1", "f2", "f3", "f4", "f5"][i], vec![(5, 1)]));
        }
        let idx = index(&["alpha", "beta", "gamma", "zeta"], rows);
        let lengths = LengthTable::from_lengths(
            idx.rows().iter().map(|r| (r.name.clone(), r.cells.iter().map(|c| c.1).sum())),
        )
        .unwrap();
        let engine = Bm25Engine::new(&idx, &lengths, Bm25Params::default());
        let ranks = engine.find_similar("q").unwrap();

        let n = 9.0f64;
        let avgdl = lengths.average();
        let idf_alpha = ((n - 3.0 + 0.5) / 3.5f64).ln();
        let norm = 1.2 * (1.0 - 0.75 + 0.75 * 2.0 * avgdl);
        let expected = idf_alpha * 2.0 * 2.2 / (2.0 + norm);

        assert_eq!(ranks.len(), TOP_K);
        assert_eq!(ranks[0].doc_id.as_deref(), Some("d1"));
        assert!((ranks[0].score - expected).abs() < 1e-12);
        assert_eq!(ranks[1].doc_id.as_deref(), Some("d2"));
        assert_eq!(ranks[1].score, 0.0);
        assert!(ranks.iter().all(|r| r.doc_id.as_deref() != Some("q")));
        assert!(ranks.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn unknown_query_is_recoverable() {
        let idx = index(&["t"], vec![("a", vec![(2, 1)])]);
        let lengths = LengthTable::from_lengths([("a".to_string(), 1)]).unwrap();
        let engine = Bm25Engine::new(&idx, &lengths, Bm25Params::default());
        let err = engine.find_similar("zzz").unwrap_err();
        assert!(matches!(err, Error::QueryNotFound(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn query_without_length_is_recoverable() {
        let idx = index(&["t"], vec![("a", vec![(2, 1)]), ("b", vec![(2, 1)])]);
        let lengths = LengthTable::from_lengths([("b".to_string(), 1)]).unwrap();
        let engine = Bm25Engine::new(&idx, &lengths, Bm25Params::default());
        assert!(matches!(engine.find_similar("a"), Err(Error::LengthMissing(_))));
    }
}
