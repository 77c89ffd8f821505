//! # Schema Module
//!
//! Table, column, and index definitions with the numeric ids the advisor
//! keys its hypothetical indexes by, plus the [`Catalog`] that resolves
//! names and tracks existing physical indexes.
//!
//! Every column reference the binder resolves becomes a
//! `(db_id, table_id, column_id)` triple; those triples are the identity
//! of every hypothetical index the advisor reasons about.

pub mod catalog;
pub mod table;

pub use catalog::Catalog;
pub use table::{ColumnDef, IndexDef, TableDef};

pub type DbId = u32;
pub type TableId = u32;
pub type ColumnId = u32;
pub type IndexId = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_assigns_monotonic_table_ids() {
        let mut catalog = Catalog::new("tuning_db");
        let t1 = catalog.create_table("a", &["x"]).unwrap();
        let t2 = catalog.create_table("b", &["x"]).unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn table_resolution_is_case_insensitive() {
        let mut catalog = Catalog::new("tuning_db");
        catalog.create_table("Users", &["id", "name"]).unwrap();
        assert!(catalog.resolve_table("users").is_ok());
        assert!(catalog.resolve_table("USERS").is_ok());
    }
}
