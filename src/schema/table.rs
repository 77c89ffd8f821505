//! Table, column, and index definitions.
//!
//! Columns get 1-based ids in declaration order; index ids are allocated
//! by the catalog. `row_count` is the statistics snapshot the heuristic
//! what-if costing reads.

use super::{ColumnId, IndexId, TableId};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    id: ColumnId,
    name: String,
}

impl ColumnDef {
    pub fn new(id: ColumnId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct IndexDef {
    id: IndexId,
    name: String,
    column_ids: Vec<ColumnId>,
}

impl IndexDef {
    pub fn new(id: IndexId, name: impl Into<String>, column_ids: Vec<ColumnId>) -> Self {
        Self {
            id,
            name: name.into(),
            column_ids,
        }
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_ids(&self) -> &[ColumnId] {
        &self.column_ids
    }
}

#[derive(Debug, Clone)]
pub struct TableDef {
    id: TableId,
    name: String,
    columns: Vec<ColumnDef>,
    indexes: Vec<IndexDef>,
    row_count: u64,
}

impl TableDef {
    /// Default cardinality assumed until statistics are loaded.
    pub const DEFAULT_ROW_COUNT: u64 = 1000;

    pub fn new(id: TableId, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            id,
            name: name.into(),
            columns,
            indexes: Vec::new(),
            row_count: Self::DEFAULT_ROW_COUNT,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    pub fn add_index(&mut self, index: IndexDef) {
        self.indexes.push(index);
    }

    pub fn remove_index(&mut self, index_id: IndexId) -> Option<IndexDef> {
        let pos = self.indexes.iter().position(|i| i.id == index_id)?;
        Some(self.indexes.remove(pos))
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn set_row_count(&mut self, rows: u64) {
        self.row_count = rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> TableDef {
        TableDef::new(
            7,
            "users",
            vec![ColumnDef::new(1, "id"), ColumnDef::new(2, "name")],
        )
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let table = users_table();
        assert_eq!(table.column("ID").unwrap().id(), 1);
        assert_eq!(table.column("Name").unwrap().id(), 2);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn index_add_and_remove() {
        let mut table = users_table();
        table.add_index(IndexDef::new(3, "users_id", vec![1]));
        assert_eq!(table.indexes().len(), 1);
        assert!(table.remove_index(3).is_some());
        assert!(table.remove_index(3).is_none());
        assert!(table.indexes().is_empty());
    }
}
