//! Shared context of one advisor run: the object pool, the what-if memo,
//! and the search knobs. Created at the start of `get_best_indexes` and
//! dropped at return.
//!
//! The memo is keyed by `(configuration stable key, statement stable
//! key)`. Keying by the canonical strings rather than references means
//! two independently constructed but equal configurations, or two copies
//! of the same SQL, hit the same slot. Optimizer failures are stored as
//! `f64::INFINITY` so the failing branch is treated as non-improving
//! instead of being retried.

use super::index_object::IndexObjectPool;
use crate::config::IndexSelectionKnobs;
use bumpalo::Bump;
use hashbrown::HashMap;

/// Joins the two key halves; the unit separator cannot appear in either
/// a canonical index key or normalized SQL text.
const KEY_SEPARATOR: char = '\u{1f}';

pub struct IndexSelectionContext<'a> {
    pub(crate) pool: IndexObjectPool<'a>,
    memo: HashMap<String, f64>,
    knobs: IndexSelectionKnobs,
}

impl<'a> IndexSelectionContext<'a> {
    pub fn new(arena: &'a Bump, knobs: IndexSelectionKnobs) -> Self {
        Self {
            pool: IndexObjectPool::new(arena),
            memo: HashMap::new(),
            knobs,
        }
    }

    pub fn knobs(&self) -> IndexSelectionKnobs {
        self.knobs
    }

    pub fn pool(&self) -> &IndexObjectPool<'a> {
        &self.pool
    }

    pub fn memo_lookup(&self, config_key: &str, statement_key: &str) -> Option<f64> {
        self.memo
            .get(&memo_key(config_key, statement_key))
            .copied()
    }

    /// Records a cost. A key that is already present keeps its original
    /// value; costs are pure within a run, so a second store can only
    /// ever carry the same number.
    pub fn memo_store(&mut self, config_key: &str, statement_key: &str, cost: f64) {
        self.memo
            .entry(memo_key(config_key, statement_key))
            .or_insert(cost);
    }

    pub fn memo_entries(&self) -> usize {
        self.memo.len()
    }
}

fn memo_key(config_key: &str, statement_key: &str) -> String {
    let mut key = String::with_capacity(config_key.len() + statement_key.len() + 1);
    key.push_str(config_key);
    key.push(KEY_SEPARATOR);
    key.push_str(statement_key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_round_trip() {
        let arena = Bump::new();
        let mut context = IndexSelectionContext::new(&arena, IndexSelectionKnobs::default());

        assert!(context.memo_lookup("cfg", "q").is_none());
        context.memo_store("cfg", "q", 42.0);
        assert_eq!(context.memo_lookup("cfg", "q"), Some(42.0));
        assert_eq!(context.memo_entries(), 1);
    }

    #[test]
    fn memo_never_overwrites_a_recorded_cost() {
        let arena = Bump::new();
        let mut context = IndexSelectionContext::new(&arena, IndexSelectionKnobs::default());

        context.memo_store("", "q", 7.0);
        context.memo_store("", "q", 9.0);
        assert_eq!(context.memo_lookup("", "q"), Some(7.0));
    }

    #[test]
    fn key_halves_do_not_bleed_into_each_other() {
        let arena = Bump::new();
        let mut context = IndexSelectionContext::new(&arena, IndexSelectionKnobs::default());

        context.memo_store("a", "b", 1.0);
        assert!(context.memo_lookup("ab", "").is_none());
        assert!(context.memo_lookup("", "ab").is_none());
    }

    #[test]
    fn infinity_sentinel_is_representable() {
        let arena = Bump::new();
        let mut context = IndexSelectionContext::new(&arena, IndexSelectionKnobs::default());

        context.memo_store("cfg", "q", f64::INFINITY);
        assert_eq!(context.memo_lookup("cfg", "q"), Some(f64::INFINITY));
    }
}
