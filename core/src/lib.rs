//! Blocked sort-based indexing of a local text collection and
//! "find similar documents" retrieval with Okapi BM25.
//!
//! The `index` side streams a [`source::TextSource`] through the
//! [`tokenizer::Analyzer`], flushes fixed-size blocks with
//! [`block::BlockBuilder`] and folds them into one [`index::GlobalIndex`]
//! with [`merge::Merger`]. The `match` side collects document lengths with
//! [`lengths::LengthTable`], ranks with [`bm25::Bm25Engine`] and writes TREC
//! run files with [`run::RunWriter`].

pub mod block;
pub mod bm25;
pub mod error;
pub mod index;
pub mod lengths;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod run;
pub mod source;
pub mod tokenizer;
pub mod topics;

pub use error::{Error, Result};
pub use index::{Column, Count, GlobalIndex, Row, Table, CLASS_ATTRIBUTE, NAME_ATTRIBUTE};
