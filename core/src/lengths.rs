use crate::error::{Error, Result};
use crate::source::Document;
use crate::tokenizer::Analyzer;
use std::collections::HashMap;

/// Document lengths in analyzer tokens and their collection mean.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthTable {
    lengths: HashMap<String, u32>,
    average: f64,
}

impl LengthTable {
    /// Second pass over the collection: counts tokens per document without
    /// building postings.
    pub fn collect<I>(documents: I, analyzer: &Analyzer) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        tracing::info!("started computing document lengths");
        let mut lengths = Vec::new();
        for document in documents {
            let document = document?;
            let count = analyzer.count_tokens(&document.text) as u32;
            lengths.push((document.doc_id, count));
        }
        let table = Self::from_lengths(lengths)?;
        tracing::info!(docs = table.len(), avgdl = table.average(), "computed average document length");
        Ok(table)
    }

    pub fn from_lengths<I>(lengths: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let lengths: HashMap<String, u32> = lengths.into_iter().collect();
        if lengths.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let total: u64 = lengths.values().map(|&l| u64::from(l)).sum();
        let average = total as f64 / lengths.len() as f64;
        Ok(Self { lengths, average })
    }

    pub fn get(&self, doc_id: &str) -> Option<u32> {
        self.lengths.get(doc_id).copied()
    }

    /// avgdl
    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Result<Document> {
        Ok(Document { doc_id: id.into(), class_name: "c".into(), text: text.into() })
    }

    #[test]
    fn counts_tokens_and_averages() {
        let docs = vec![doc("c/a", "the cat sat"), doc("c/b", "dogs bark"), doc("c/c", "")];
        let table = LengthTable::collect(docs, &Analyzer::new(false)).unwrap();
        assert_eq!(table.get("c/a"), Some(3));
        assert_eq!(table.get("c/b"), Some(2));
        assert_eq!(table.get("c/c"), Some(0));
        assert_eq!(table.get("c/zzz"), None);
        assert!((table.average() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_collection_is_rejected() {
        let err = LengthTable::collect(Vec::<Result<Document>>::new(), &Analyzer::new(false)).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[test]
    fn source_errors_propagate() {
        let docs = vec![
            doc("c/a", "x"),
            Err(Error::Input { path: "c/b".into(), source: std::io::Error::from(std::io::ErrorKind::PermissionDenied) }),
        ];
        assert!(matches!(LengthTable::collect(docs, &Analyzer::new(false)), Err(Error::Input { .. })));
    }
}
