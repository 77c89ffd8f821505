//! # TurTune - Automatic Index Advisor
//!
//! TurTune is an automatic index advisor engine for embedded SQL
//! databases. Given the recent query workload, it recommends the index
//! configuration with the lowest estimated cost under a bound on the
//! number of indexes, asking an optimizer what each statement *would*
//! cost if a hypothetical set of indexes existed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bumpalo::Bump;
//! use turtune::advisor::{HeuristicWhatIf, IndexSelection, Workload};
//! use turtune::config::IndexSelectionKnobs;
//! use turtune::schema::Catalog;
//! use turtune::sql::Binder;
//!
//! let mut catalog = Catalog::new("app_db");
//! catalog.create_table("users", &["id", "email"])?;
//!
//! let arena = Bump::new();
//! let binder = Binder::new(&catalog, &arena);
//! let mut workload = Workload::new();
//! workload.add_query(binder.bind_sql("SELECT * FROM users WHERE email = 'a@b'")?);
//!
//! let optimizer = HeuristicWhatIf::new(&catalog);
//! let mut selection = IndexSelection::new(
//!     &arena,
//!     workload,
//!     IndexSelectionKnobs::default(),
//!     &optimizer,
//!     catalog.db_name(),
//! );
//! let best = selection.get_best_indexes()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │    Periodic Driver (IndexSelectionJob)    │
//! ├──────────────────────────────────────────┤
//! │  SQL Front-End (Lexer/Parser/Binder)      │
//! ├──────────────────────────────────────────┤
//! │  Selection Engine (admissible → prune →   │
//! │  exhaustive+greedy enumerate → widen)     │
//! ├───────────────────┬──────────────────────┤
//! │  Object Pool      │  What-If Memo        │
//! ├───────────────────┴──────────────────────┤
//! │  What-If Optimizer (trait)                │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`advisor`]: the selection engine, object pool, memo, what-if
//!   interface, and periodic driver
//! - [`sql`]: zero-copy lexer, arena-allocated AST, parser, and the
//!   catalog binder producing bound statement trees
//! - [`schema`]: table/column/index definitions and the catalog
//! - [`history`]: the `pg_query_history` advisory table and the
//!   transactional query logger that feeds it
//! - [`config`]: the settings record, search knobs, and cost constants
//!
//! ## Determinism
//!
//! Given the same inputs and the same optimizer responses, a run
//! produces a byte-identical recommendation: all candidate iteration is
//! over canonically sorted sets and every tie-break is a total order.

pub mod advisor;
pub mod config;
pub mod history;
pub mod schema;
pub mod sql;

pub use advisor::{
    AdvisorError, HeuristicWhatIf, IndexConfiguration, IndexObject, IndexSelection,
    IndexSelectionJob, JobOutcome, WhatIfOptimizer, Workload,
};
pub use config::{AdvisorSettings, IndexSelectionKnobs};
pub use schema::Catalog;
