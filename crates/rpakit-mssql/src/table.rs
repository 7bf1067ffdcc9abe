use std::collections::BTreeMap;

/// A single result cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Text view of the cell, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Column-named rows returned by both connector variants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as column-name → cell maps.
    pub fn records(&self) -> Vec<BTreeMap<&str, &Cell>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec![Cell::Int(1), Cell::Text("alpha".to_string())],
                vec![Cell::Int(2), Cell::Null],
            ],
        }
    }

    #[test]
    fn len_counts_rows() {
        let t = sample();
        assert_eq!(t.len(), 2);
        assert!(!t.is_empty());
        assert!(Table::default().is_empty());
    }

    #[test]
    fn records_key_cells_by_column() {
        let t = sample();
        let records = t.records();
        assert_eq!(records[0]["id"], &Cell::Int(1));
        assert_eq!(records[0]["name"].as_text(), Some("alpha"));
        assert!(records[1]["name"].is_null());
    }
}
