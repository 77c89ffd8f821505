//! # Catalog Module
//!
//! The catalog manages the tables of one database and hands out the
//! numeric ids that identify every column the advisor can index.

use super::table::{ColumnDef, IndexDef, TableDef};
use super::{ColumnId, DbId, IndexId, TableId};
use eyre::{bail, ensure, Result};
use std::collections::HashMap;

#[derive(Debug)]
pub struct Catalog {
    db_id: DbId,
    db_name: String,
    tables: HashMap<String, TableDef>,
    next_table_id: TableId,
    next_index_id: IndexId,
}

impl Catalog {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_id: 1,
            db_name: db_name.into(),
            tables: HashMap::new(),
            next_table_id: 1,
            next_index_id: 1,
        }
    }

    pub fn db_id(&self) -> DbId {
        self.db_id
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> Result<TableId> {
        let key = name.to_ascii_lowercase();

        ensure!(
            !self.tables.contains_key(&key),
            "table '{}' already exists",
            name
        );

        let column_defs = columns
            .iter()
            .enumerate()
            .map(|(i, col)| ColumnDef::new(i as ColumnId + 1, *col))
            .collect();

        let id = self.next_table_id;
        self.next_table_id += 1;

        self.tables.insert(key, TableDef::new(id, name, column_defs));
        Ok(id)
    }

    pub fn resolve_table(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| eyre::eyre!("table '{}' not found", name))
    }

    pub fn table_by_id(&self, table_id: TableId) -> Option<&TableDef> {
        self.tables.values().find(|t| t.id() == table_id)
    }

    pub fn set_row_count(&mut self, name: &str, rows: u64) -> Result<()> {
        let table = self
            .tables
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| eyre::eyre!("table '{}' not found", name))?;
        table.set_row_count(rows);
        Ok(())
    }

    pub fn create_index(
        &mut self,
        table_name: &str,
        index_name: &str,
        columns: &[ColumnId],
    ) -> Result<IndexId> {
        ensure!(!columns.is_empty(), "index must cover at least one column");

        let table = self
            .tables
            .get_mut(&table_name.to_ascii_lowercase())
            .ok_or_else(|| eyre::eyre!("table '{}' not found", table_name))?;

        for col in columns {
            ensure!(
                table.column_by_id(*col).is_some(),
                "column id {} not found in table '{}'",
                col,
                table_name
            );
        }

        let id = self.next_index_id;
        self.next_index_id += 1;

        table.add_index(IndexDef::new(id, index_name, columns.to_vec()));
        Ok(id)
    }

    pub fn drop_index(&mut self, index_id: IndexId) -> Result<()> {
        for table in self.tables.values_mut() {
            if table.remove_index(index_id).is_some() {
                return Ok(());
            }
        }
        bail!("index {} not found", index_id)
    }

    /// Every physical index in the database, with its owning table.
    pub fn all_indexes(&self) -> Vec<(TableId, &IndexDef)> {
        let mut result: Vec<(TableId, &IndexDef)> = self
            .tables
            .values()
            .flat_map(|t| t.indexes().iter().map(move |i| (t.id(), i)))
            .collect();
        result.sort_by_key(|(_, i)| i.id());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_rejects_duplicates() {
        let mut catalog = Catalog::new("tuning_db");
        catalog.create_table("t", &["a"]).unwrap();
        assert!(catalog.create_table("T", &["a"]).is_err());
    }

    #[test]
    fn column_ids_are_one_based_in_declaration_order() {
        let mut catalog = Catalog::new("tuning_db");
        catalog.create_table("t", &["a", "b", "c"]).unwrap();
        let table = catalog.resolve_table("t").unwrap();
        assert_eq!(table.column("a").unwrap().id(), 1);
        assert_eq!(table.column("c").unwrap().id(), 3);
    }

    #[test]
    fn create_index_validates_columns() {
        let mut catalog = Catalog::new("tuning_db");
        catalog.create_table("t", &["a"]).unwrap();
        assert!(catalog.create_index("t", "t_a", &[1]).is_ok());
        assert!(catalog.create_index("t", "t_bad", &[9]).is_err());
        assert!(catalog.create_index("t", "t_empty", &[]).is_err());
    }

    #[test]
    fn drop_index_by_id() {
        let mut catalog = Catalog::new("tuning_db");
        catalog.create_table("t", &["a", "b"]).unwrap();
        let idx = catalog.create_index("t", "t_a", &[1]).unwrap();
        assert_eq!(catalog.all_indexes().len(), 1);
        catalog.drop_index(idx).unwrap();
        assert!(catalog.all_indexes().is_empty());
        assert!(catalog.drop_index(idx).is_err());
    }
}
