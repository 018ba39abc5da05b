use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const NAME_ATTRIBUTE: &str = "@nameOfTheDocument";
pub const CLASS_ATTRIBUTE: &str = "@classOfTheDocument";
/// Number of reserved string attributes leading every table.
pub const RESERVED_ATTRIBUTES: usize = 2;

/// Attribute position inside a table; term columns start at [`RESERVED_ATTRIBUTES`].
pub type Column = u32;
pub type Count = u32;

/// One document row. Term cells are sparse: zero counts are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub name: String,
    pub class: String,
    /// `(column, count)` with columns strictly ascending.
    pub cells: Vec<(Column, Count)>,
}

impl Row {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self { name: name.into(), class: class.into(), cells: Vec::new() }
    }

    /// Count at `column`, 0 when absent.
    pub fn get(&self, column: Column) -> Count {
        match self.cells.binary_search_by_key(&column, |&(c, _)| c) {
            Ok(i) => self.cells[i].1,
            Err(_) => 0,
        }
    }
}

/// Named-attribute table shared by block files and the global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub relation: String,
    /// Reserved attributes at 0 and 1, then term attributes in ascending order.
    pub attributes: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            attributes: vec![NAME_ATTRIBUTE.to_string(), CLASS_ATTRIBUTE.to_string()],
            rows: Vec::new(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.attributes[RESERVED_ATTRIBUTES.min(self.attributes.len())..]
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Column of the term attribute `name`.
    pub fn column(&self, name: &str) -> Option<Column> {
        self.terms()
            .binary_search_by(|t| t.as_str().cmp(name))
            .ok()
            .map(|i| (i + RESERVED_ATTRIBUTES) as Column)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.attributes.len() < RESERVED_ATTRIBUTES
            || self.attributes[0] != NAME_ATTRIBUTE
            || self.attributes[1] != CLASS_ATTRIBUTE
        {
            return Err("reserved attributes missing at positions 0 and 1".into());
        }
        if let Some(pair) = self.terms().windows(2).find(|w| w[0] >= w[1]) {
            return Err(format!("term attributes out of order at {:?} / {:?}", pair[0], pair[1]));
        }
        let width = self.attributes.len() as Column;
        for row in &self.rows {
            let mut previous: Option<Column> = None;
            for &(column, _) in &row.cells {
                if column < RESERVED_ATTRIBUTES as Column || column >= width {
                    return Err(format!("row {} has cell outside term columns: {column}", row.name));
                }
                if previous.is_some_and(|p| p >= column) {
                    return Err(format!("row {} has unordered cells", row.name));
                }
                previous = Some(column);
            }
        }
        Ok(())
    }
}

/// The merged index: one row per document in corpus order, term columns in
/// lexicographic order, lookup of rows by document id and columns by name.
#[derive(Debug, Clone)]
pub struct GlobalIndex {
    table: Table,
    positions: HashMap<String, usize>,
}

impl GlobalIndex {
    pub fn new(table: Table) -> std::result::Result<Self, String> {
        table.validate()?;
        Ok(Self::from_sorted(table))
    }

    /// Wraps a table already known to be well-formed.
    pub(crate) fn from_sorted(table: Table) -> Self {
        let mut positions = HashMap::with_capacity(table.rows.len());
        for (i, row) in table.rows.iter().enumerate() {
            positions.entry(row.name.clone()).or_insert(i);
        }
        Self { table, positions }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn num_documents(&self) -> usize {
        self.table.rows.len()
    }

    pub fn terms(&self) -> &[String] {
        self.table.terms()
    }

    pub fn rows(&self) -> &[Row] {
        &self.table.rows
    }

    pub fn column(&self, term: &str) -> Option<Column> {
        self.table.column(term)
    }

    /// Position of the first row whose document id is `doc_id`.
    pub fn find_document(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }

    pub fn document(&self, doc_id: &str) -> Option<&Row> {
        self.find_document(doc_id).map(|i| &self.table.rows[i])
    }

    /// Count of `term` in `doc_id`, 0 when either is unknown.
    pub fn count(&self, doc_id: &str, term: &str) -> Count {
        match (self.document(doc_id), self.column(term)) {
            (Some(row), Some(column)) => row.get(column),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut t = Table::new("index");
        t.attributes.extend(["ant", "bat", "cat"].map(String::from));
        let mut a = Row::new("x/a", "x");
        a.cells = vec![(2, 3), (4, 1)];
        t.rows.push(a);
        t.rows.push(Row::new("x/b", "x"));
        t
    }

    #[test]
    fn column_lookup_by_name() {
        let index = GlobalIndex::new(table()).unwrap();
        assert_eq!(index.column("ant"), Some(2));
        assert_eq!(index.column("cat"), Some(4));
        assert_eq!(index.column("dog"), None);
        assert_eq!(index.count("x/a", "ant"), 3);
        assert_eq!(index.count("x/a", "bat"), 0);
        assert_eq!(index.count("x/b", "cat"), 0);
        assert_eq!(index.find_document("x/b"), Some(1));
    }

    #[test]
    fn rejects_unsorted_terms() {
        let mut t = table();
        t.attributes.swap(2, 3);
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_cells_in_reserved_columns() {
        let mut t = table();
        t.rows[1].cells = vec![(1, 1)];
        assert!(t.validate().is_err());
        t.rows[1].cells = vec![(3, 1), (3, 2)];
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_missing_reserved_attributes() {
        let mut t = table();
        t.attributes.remove(0);
        assert!(GlobalIndex::new(t).is_err());
    }
}
