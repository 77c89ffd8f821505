//! # Automatic Index Advisor
//!
//! Recommends the index configuration with the lowest estimated what-if
//! cost for a recent query workload, subject to a cap on the number of
//! indexes. The design is the interplay of four pieces:
//!
//! 1. **Canonical identity** ([`index_object`]): every hypothetical
//!    index is interned to one shared reference per distinct
//!    `(db, table, column-set)` value.
//! 2. **Memoized costing** ([`context`], [`what_if`]): canonical
//!    identity makes the `(configuration, statement) → cost` memo
//!    correct, and the memo makes enumeration affordable.
//! 3. **Two-stage enumeration** ([`selection`]): a bounded exhaustive
//!    stage seeds a greedy extension, with total lexicographic
//!    tie-breaking for reproducible output.
//! 4. **Admissible extraction** ([`selection`]): candidates come only
//!    from columns in indexable positions of the workload, so the
//!    search space stays grounded in the statements that pay for it.
//!
//! The periodic driver ([`job`]) wires the engine to the host: query
//! history in, create/drop index commands out.
//!
//! ## One Run
//!
//! A run owns a bump arena, an object pool, and a memo, all dropped at
//! return. Runs are single-threaded; the only concurrency is the host
//! setting the cancellation flag.

pub mod context;
pub mod error;
pub mod index_object;
pub mod job;
pub mod selection;
pub mod what_if;

pub use context::IndexSelectionContext;
pub use error::AdvisorError;
pub use index_object::{IndexConfiguration, IndexObject, IndexObjectPool, Workload};
pub use job::{AdvisorStorage, AdvisorTxn, IndexRpc, IndexSelectionJob, JobOutcome};
pub use selection::IndexSelection;
pub use what_if::{HeuristicWhatIf, WhatIfOptimizer, WhatIfResult};
