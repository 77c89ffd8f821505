//! # Integration Tests for the Index Advisor
//!
//! End-to-end coverage of the advisor through its public API: workloads
//! go in as SQL text, recommendations come out as index configurations.
//! Expected outcomes are derived from the advisor's contracts, not from
//! running the implementation:
//!
//! 1. Single-predicate workloads recommend the predicate's index
//! 2. Disjoint predicates fill the index budget, ties break
//!    lexicographically
//! 3. Candidates no plan ever uses are pruned
//! 4. Conjunctions widen into multi-column indexes when the composite
//!    costs less
//! 5. The periodic driver gates on the query threshold and advances the
//!    high-water timestamp only when it tunes
//!
//! Cross-cutting invariants: the recommendation never exceeds
//! `num_indexes`, no index exceeds `max_index_cols`, every recommended
//! column is admissible somewhere in the workload, and byte-identical
//! inputs produce byte-identical recommendations.

use bumpalo::Bump;
use turtune::advisor::{
    AdvisorStorage, AdvisorTxn, HeuristicWhatIf, IndexObject, IndexRpc, IndexSelection,
    IndexSelectionJob, JobOutcome, Workload,
};
use turtune::config::IndexSelectionKnobs;
use turtune::history::{QueryHistory, QueryLogger, QueryRecord};
use turtune::schema::{Catalog, ColumnId, IndexId, TableId};
use turtune::sql::Binder;
use turtune::AdvisorSettings;

fn test_catalog() -> Catalog {
    let mut catalog = Catalog::new("tuning_db");
    catalog.create_table("t", &["a", "b", "c"]).unwrap();
    catalog
}

/// Runs a full selection over `statements` and returns the recommended
/// indexes as owned `(table_id, columns)` pairs, sorted.
fn recommend(
    catalog: &Catalog,
    statements: &[&str],
    knobs: IndexSelectionKnobs,
) -> Vec<(TableId, Vec<ColumnId>)> {
    let arena = Bump::new();
    let binder = Binder::new(catalog, &arena);
    let optimizer = HeuristicWhatIf::new(catalog);

    let mut workload = Workload::new();
    for sql in statements {
        workload.add_query(binder.bind_sql(sql).unwrap());
    }

    let mut selection =
        IndexSelection::new(&arena, workload, knobs, &optimizer, catalog.db_name());
    let best = selection.get_best_indexes().unwrap();

    let mut result: Vec<(TableId, Vec<ColumnId>)> = best
        .indexes()
        .iter()
        .map(|index| (index.table_id(), index.columns().to_vec()))
        .collect();
    result.sort();
    result
}

/// Same run, but returning the configuration's canonical serialization.
fn recommend_key(catalog: &Catalog, statements: &[&str], knobs: IndexSelectionKnobs) -> String {
    let arena = Bump::new();
    let binder = Binder::new(catalog, &arena);
    let optimizer = HeuristicWhatIf::new(catalog);

    let mut workload = Workload::new();
    for sql in statements {
        workload.add_query(binder.bind_sql(sql).unwrap());
    }

    let mut selection =
        IndexSelection::new(&arena, workload, knobs, &optimizer, catalog.db_name());
    let key = selection.get_best_indexes().unwrap().stable_key();
    key
}

mod recommendation_tests {
    use super::*;

    #[test]
    fn single_equality_recommends_the_predicate_index() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &["SELECT * FROM t WHERE a = 1;"],
            IndexSelectionKnobs {
                num_indexes: 1,
                ..IndexSelectionKnobs::default()
            },
        );

        assert_eq!(result, vec![(table_id, vec![1])]);
    }

    #[test]
    fn disjoint_predicates_fill_the_budget() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &[
                "SELECT * FROM t WHERE a = 1;",
                "SELECT * FROM t WHERE b = 2;",
            ],
            IndexSelectionKnobs {
                num_indexes: 2,
                ..IndexSelectionKnobs::default()
            },
        );

        assert_eq!(result, vec![(table_id, vec![1]), (table_id, vec![2])]);
    }

    #[test]
    fn disjoint_predicates_with_budget_one_break_ties_lexicographically() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &[
                "SELECT * FROM t WHERE a = 1;",
                "SELECT * FROM t WHERE b = 2;",
            ],
            IndexSelectionKnobs {
                num_indexes: 1,
                ..IndexSelectionKnobs::default()
            },
        );

        // Both singletons cost the same; the tie goes to t.a.
        assert_eq!(result, vec![(table_id, vec![1])]);
    }

    #[test]
    fn unused_candidates_are_pruned() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        // Column c is admissible as an UPDATE target but no plan ever
        // chooses an index on it.
        let result = recommend(
            &catalog,
            &[
                "SELECT * FROM t WHERE a = 1;",
                "UPDATE t SET c = 7 WHERE a = 1;",
            ],
            IndexSelectionKnobs::default(),
        );

        assert_eq!(result, vec![(table_id, vec![1])]);
    }

    #[test]
    fn conjunction_widens_into_a_composite_index() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &["SELECT * FROM t WHERE a = 1 AND b = 2;"],
            IndexSelectionKnobs {
                max_index_cols: 2,
                ..IndexSelectionKnobs::default()
            },
        );

        assert_eq!(result, vec![(table_id, vec![1, 2])]);
    }

    #[test]
    fn order_by_workload_recommends_the_sort_index() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &["SELECT * FROM t ORDER BY b;"],
            IndexSelectionKnobs {
                num_indexes: 1,
                ..IndexSelectionKnobs::default()
            },
        );

        assert_eq!(result, vec![(table_id, vec![2])]);
    }

    #[test]
    fn statements_with_unsupported_predicates_are_skipped() {
        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();

        let result = recommend(
            &catalog,
            &[
                "SELECT * FROM t WHERE a = 1;",
                "SELECT * FROM t WHERE b BETWEEN 1 AND 2;",
            ],
            IndexSelectionKnobs::default(),
        );

        // The BETWEEN statement contributes no candidates but does not
        // poison the run.
        assert_eq!(result, vec![(table_id, vec![1])]);
    }

    #[test]
    fn empty_workload_recommends_nothing() {
        let catalog = test_catalog();
        let result = recommend(&catalog, &[], IndexSelectionKnobs::default());
        assert!(result.is_empty());
    }
}

mod invariant_tests {
    use super::*;

    const WORKLOAD: &[&str] = &[
        "SELECT * FROM t WHERE a = 1;",
        "SELECT * FROM t WHERE b = 2 AND c = 3;",
        "SELECT a FROM t WHERE c > 10 ORDER BY a;",
        "UPDATE t SET b = 0 WHERE a = 5;",
        "DELETE FROM t WHERE c = 9;",
    ];

    #[test]
    fn recommendation_respects_num_indexes() {
        let catalog = test_catalog();
        for num_indexes in 1..=4 {
            let result = recommend(
                &catalog,
                WORKLOAD,
                IndexSelectionKnobs {
                    num_indexes,
                    ..IndexSelectionKnobs::default()
                },
            );
            assert!(
                result.len() <= num_indexes as usize,
                "budget {} produced {} indexes",
                num_indexes,
                result.len()
            );
        }
    }

    #[test]
    fn recommendation_respects_max_index_cols() {
        let catalog = test_catalog();
        for max_index_cols in 1..=3 {
            let result = recommend(
                &catalog,
                WORKLOAD,
                IndexSelectionKnobs {
                    max_index_cols,
                    ..IndexSelectionKnobs::default()
                },
            );
            for (_, columns) in &result {
                assert!(columns.len() <= max_index_cols as usize);
            }
        }
    }

    #[test]
    fn recommended_columns_are_admissible() {
        let catalog = test_catalog();
        let result = recommend(&catalog, WORKLOAD, IndexSelectionKnobs::default());

        // Every column of every recommended index appears in an
        // indexable position of the workload: a, b, c all qualify here,
        // but nothing else exists to recommend.
        for (_, columns) in &result {
            for column in columns {
                assert!((1..=3).contains(column));
            }
        }
        assert!(!result.is_empty());
    }

    #[test]
    fn recommendations_are_deterministic() {
        let catalog = test_catalog();
        let first = recommend_key(&catalog, WORKLOAD, IndexSelectionKnobs::default());
        let second = recommend_key(&catalog, WORKLOAD, IndexSelectionKnobs::default());
        assert_eq!(first, second, "same inputs SHOULD give byte-identical output");
    }
}

mod driver_tests {
    use super::*;
    use eyre::Result;

    struct MemoryStorage<'h> {
        history: &'h QueryHistory,
    }

    impl AdvisorStorage for MemoryStorage<'_> {
        fn begin(&self) -> Result<Box<dyn AdvisorTxn + '_>> {
            Ok(Box::new(MemoryTxn { history: self.history }))
        }
    }

    struct MemoryTxn<'h> {
        history: &'h QueryHistory,
    }

    impl AdvisorTxn for MemoryTxn<'_> {
        fn queries_after(&mut self, timestamp: u64) -> Result<Vec<QueryRecord>> {
            Ok(self.history.queries_after(timestamp))
        }

        fn existing_indexes(&mut self) -> Result<Vec<IndexId>> {
            Ok(Vec::new())
        }

        fn commit(self: Box<Self>) -> Result<()> {
            Ok(())
        }

        fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRpc {
        created: Vec<(TableId, Vec<ColumnId>)>,
    }

    impl IndexRpc for RecordingRpc {
        fn create_index(&mut self, index: &IndexObject<'_>) -> Result<()> {
            self.created
                .push((index.table_id(), index.columns().to_vec()));
            Ok(())
        }

        fn drop_index(&mut self, _index_id: IndexId) -> Result<()> {
            Ok(())
        }
    }

    fn settings() -> AdvisorSettings {
        AdvisorSettings {
            num_queries_threshold: 10,
            ..AdvisorSettings::default()
        }
    }

    #[test]
    fn below_threshold_neither_tunes_nor_advances() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);
        for _ in 0..9 {
            logger.log_statement("SELECT * FROM t WHERE a = 1;");
        }

        let catalog = test_catalog();
        let optimizer = HeuristicWhatIf::new(&catalog);
        let storage = MemoryStorage { history: &history };
        let mut rpc = RecordingRpc::default();
        let mut job = IndexSelectionJob::new(settings());

        let outcome = job
            .run_once(&storage, &catalog, &optimizer, &mut rpc)
            .unwrap();

        assert_eq!(outcome, JobOutcome::BelowThreshold { pending: 9 });
        assert_eq!(job.last_timestamp(), 0);
        assert!(rpc.created.is_empty());
    }

    #[test]
    fn crossing_the_threshold_creates_the_recommendation() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);
        for _ in 0..11 {
            logger.log_statement("SELECT * FROM t WHERE a = 1;");
        }

        let catalog = test_catalog();
        let table_id = catalog.resolve_table("t").unwrap().id();
        let optimizer = HeuristicWhatIf::new(&catalog);
        let storage = MemoryStorage { history: &history };
        let mut rpc = RecordingRpc::default();
        let mut job = IndexSelectionJob::new(settings());

        let outcome = job
            .run_once(&storage, &catalog, &optimizer, &mut rpc)
            .unwrap();

        assert!(matches!(outcome, JobOutcome::Tuned { recommended: 1, created: 1, .. }));
        assert_eq!(rpc.created, vec![(table_id, vec![1])]);
        assert_eq!(job.last_timestamp(), history.latest_timestamp());

        // With no new queries the next tick stays below the threshold.
        let next = job
            .run_once(&storage, &catalog, &optimizer, &mut rpc)
            .unwrap();
        assert_eq!(next, JobOutcome::BelowThreshold { pending: 0 });
    }
}
