//! # Hypothetical Indexes, Configurations, and the Object Pool
//!
//! The identity model of the whole advisor lives here. A hypothetical
//! index is a `(db_id, table_id, column-set)` triple; a configuration is
//! a set of such indexes evaluated as a unit; the pool canonicalizes
//! every triple to one shared reference so that identity comparisons
//! downstream are pointer comparisons.
//!
//! ## Canonical keys
//!
//! Every [`IndexObject`] carries its canonical string form, built once at
//! interning time. Hashing and ordering go through that key, never
//! through pointers: hashing a set of references would be order and
//! address dependent, while the key form is byte-stable across runs.
//! [`IndexConfiguration`] keeps its members sorted by key, so set
//! equality, stable serialization, and deterministic iteration all fall
//! out of the representation.
//!
//! ## Ownership
//!
//! The pool owns every `IndexObject` inside a bump arena and hands out
//! `&'a` borrows. All internals are arena-allocated slices, so nothing in
//! the pool needs a destructor; the whole object graph is released when
//! the arena backing an advisor run drops.

use crate::schema::{ColumnId, DbId, TableId};
use crate::sql::BoundStatement;
use bumpalo::Bump;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A hypothetical index over a set of columns of one table. Column order
/// is irrelevant to identity; the column slice is kept sorted.
#[derive(Debug, Clone, Copy)]
pub struct IndexObject<'a> {
    db_id: DbId,
    table_id: TableId,
    columns: &'a [ColumnId],
    key: &'a str,
}

impl<'a> IndexObject<'a> {
    pub fn db_id(&self) -> DbId {
        self.db_id
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Member columns, sorted ascending.
    pub fn columns(&self) -> &'a [ColumnId] {
        self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Canonical string form; the hash key and tie-break token.
    pub fn stable_key(&self) -> &'a str {
        self.key
    }

    pub fn contains_column(&self, column: ColumnId) -> bool {
        self.columns.binary_search(&column).is_ok()
    }

    /// True iff the two indexes live on the same table of the same
    /// database and merging them stays within `max_index_cols`.
    pub fn is_compatible(&self, other: &IndexObject<'a>, max_index_cols: usize) -> bool {
        if self.db_id != other.db_id || self.table_id != other.table_id {
            return false;
        }
        self.merged_columns(other).len() <= max_index_cols
    }

    /// Union of the two column sets, sorted. The merged index itself is
    /// produced by interning the result through the pool.
    pub fn merged_columns(&self, other: &IndexObject<'a>) -> SmallVec<[ColumnId; 4]> {
        let mut merged: SmallVec<[ColumnId; 4]> = SmallVec::new();
        merged.extend_from_slice(self.columns);
        for col in other.columns {
            if !self.contains_column(*col) {
                merged.push(*col);
            }
        }
        merged.sort_unstable();
        merged
    }
}

impl PartialEq for IndexObject<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.db_id == other.db_id
            && self.table_id == other.table_id
            && self.columns == other.columns
    }
}

impl Eq for IndexObject<'_> {}

impl Hash for IndexObject<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for IndexObject<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexObject<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(other.key)
    }
}

impl fmt::Display for IndexObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)
    }
}

fn build_key(db_id: DbId, table_id: TableId, columns: &[ColumnId]) -> String {
    let mut key = format!("{}.{}.(", db_id, table_id);
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            key.push('_');
        }
        key.push_str(&col.to_string());
    }
    key.push(')');
    key
}

/// Interning table mapping index values to their one canonical arena
/// reference. Value-equal puts always return the identical reference.
/// Not thread-safe; an advisor run is single-threaded.
pub struct IndexObjectPool<'a> {
    arena: &'a Bump,
    map: HashMap<String, &'a IndexObject<'a>>,
}

impl<'a> IndexObjectPool<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            map: HashMap::new(),
        }
    }

    /// Pure lookup; `None` when the value has never been interned.
    pub fn get(
        &self,
        db_id: DbId,
        table_id: TableId,
        columns: &[ColumnId],
    ) -> Option<&'a IndexObject<'a>> {
        let mut sorted: SmallVec<[ColumnId; 4]> = SmallVec::from_slice(columns);
        sorted.sort_unstable();
        sorted.dedup();
        self.map.get(&build_key(db_id, table_id, &sorted)).copied()
    }

    /// Interns the value, returning its canonical reference.
    pub fn put(
        &mut self,
        db_id: DbId,
        table_id: TableId,
        columns: &[ColumnId],
    ) -> &'a IndexObject<'a> {
        debug_assert!(!columns.is_empty(), "hypothetical index needs a column");

        let mut sorted: SmallVec<[ColumnId; 4]> = SmallVec::from_slice(columns);
        sorted.sort_unstable();
        sorted.dedup();

        let key = build_key(db_id, table_id, &sorted);
        if let Some(&existing) = self.map.get(&key) {
            return existing;
        }

        let columns: &'a [ColumnId] = self.arena.alloc_slice_copy(&sorted);
        let key_str: &'a str = self.arena.alloc_str(&key);
        let object: &'a IndexObject<'a> = self.arena.alloc(IndexObject {
            db_id,
            table_id,
            columns,
            key: key_str,
        });

        self.map.insert(key, object);
        object
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// An unordered set of pooled hypothetical indexes, stored sorted by
/// canonical key. Equality is set equality by value; hashing and the
/// memo key go through [`IndexConfiguration::stable_key`].
#[derive(Debug, Clone, Default)]
pub struct IndexConfiguration<'a> {
    indexes: SmallVec<[&'a IndexObject<'a>; 8]>,
}

impl<'a> IndexConfiguration<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: &'a IndexObject<'a>) -> Self {
        let mut config = Self::new();
        config.add(index);
        config
    }

    fn position(&self, index: &IndexObject<'a>) -> Result<usize, usize> {
        self.indexes
            .binary_search_by(|probe| probe.stable_key().cmp(index.stable_key()))
    }

    /// Adds an index; returns false when it was already present.
    pub fn add(&mut self, index: &'a IndexObject<'a>) -> bool {
        match self.position(index) {
            Ok(_) => false,
            Err(slot) => {
                self.indexes.insert(slot, index);
                true
            }
        }
    }

    /// Removes an index; returns false when it was not present.
    pub fn remove(&mut self, index: &IndexObject<'a>) -> bool {
        match self.position(index) {
            Ok(slot) => {
                self.indexes.remove(slot);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, index: &IndexObject<'a>) -> bool {
        self.position(index).is_ok()
    }

    /// Set union with `other`.
    pub fn merge(&mut self, other: &IndexConfiguration<'a>) {
        for index in other.indexes.iter().copied() {
            self.add(index);
        }
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &IndexConfiguration<'a>) -> IndexConfiguration<'a> {
        let mut result = IndexConfiguration::new();
        for index in self.indexes.iter().copied() {
            if !other.contains(index) {
                result.add(index);
            }
        }
        result
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Members sorted by canonical key.
    pub fn indexes(&self) -> &[&'a IndexObject<'a>] {
        &self.indexes
    }

    /// The single-column members, as their own configuration.
    pub fn single_column_indexes(&self) -> IndexConfiguration<'a> {
        let mut result = IndexConfiguration::new();
        for index in self.indexes.iter().copied() {
            if index.column_count() == 1 {
                result.add(index);
            }
        }
        result
    }

    /// Canonical serialization: member keys joined in sorted order. Two
    /// set-equal configurations always produce byte-identical strings.
    pub fn stable_key(&self) -> String {
        let mut key = String::new();
        for (i, index) in self.indexes.iter().enumerate() {
            if i > 0 {
                key.push(';');
            }
            key.push_str(index.stable_key());
        }
        key
    }
}

impl PartialEq for IndexConfiguration<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.indexes.len() == other.indexes.len()
            && self
                .indexes
                .iter()
                .zip(other.indexes.iter())
                .all(|(a, b)| a == b)
    }
}

impl Eq for IndexConfiguration<'_> {}

impl fmt::Display for IndexConfiguration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stable_key())
    }
}

/// The ordered statement sequence a configuration is judged against.
/// Order carries no advisor semantics but is preserved for deterministic
/// iteration.
#[derive(Debug, Clone, Default)]
pub struct Workload<'a> {
    queries: Vec<BoundStatement<'a>>,
}

impl<'a> Workload<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(query: BoundStatement<'a>) -> Self {
        Self { queries: vec![query] }
    }

    pub fn add_query(&mut self, query: BoundStatement<'a>) {
        self.queries.push(query);
    }

    pub fn queries(&self) -> &[BoundStatement<'a>] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
