//! # Index Selection Engine
//!
//! The search core of the advisor. Given a workload of bound statements,
//! it extracts admissible single-column indexes, prunes the ones no
//! what-if plan ever chooses, runs a two-stage enumeration (bounded
//! exhaustive seeding plus greedy extension), and widens candidates into
//! multi-column indexes by constrained cross product.
//!
//! ## Search Outline
//!
//! ```text
//! for q in workload:            divide and conquer per query
//!     A_q = admissible(q)
//!     C  ∪= enumerate(prune(A_q, {q}), {q}, m)
//! C = prune(C, W)
//! for width in 2..=max_index_cols:
//!     C ∪= cross(C, single_columns(C))
//!     C = prune(C, W)
//! return enumerate(C, W, k)
//! ```
//!
//! The per-query enumeration up front shrinks the candidate universe
//! before the quadratic greedy sweeps over the full workload.
//!
//! ## Tie-Breaking
//!
//! Configurations with equal cost are ordered by fewer indexes first,
//! then by smaller stable key. This is a total lexicographic order, so
//! the same inputs and optimizer responses always produce the same
//! recommendation, byte for byte.
//!
//! ## Admissible Columns
//!
//! A column is admissible when it appears as the lone column side of a
//! comparison (`=`, `<>`, `<`, `>`, `<=`, `>=`, `LIKE`, `NOT LIKE`,
//! `IN`) in the WHERE clause, as a GROUP BY or ORDER BY term, or as an
//! UPDATE assignment target. Conjunctions recurse; every other predicate
//! shape fails the statement with `UnsupportedExpression`, and a column
//! the binder could not resolve fails it with `UnboundColumn`.

use super::context::IndexSelectionContext;
use super::error::AdvisorError;
use super::index_object::{IndexConfiguration, IndexObject, Workload};
use super::what_if::WhatIfOptimizer;
use crate::config::IndexSelectionKnobs;
use crate::sql::{BoundColumnRef, BoundExpr, BoundStatement};
use bumpalo::Bump;
use eyre::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub struct IndexSelection<'a> {
    workload: Workload<'a>,
    context: IndexSelectionContext<'a>,
    optimizer: &'a dyn WhatIfOptimizer,
    db_name: &'a str,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> IndexSelection<'a> {
    pub fn new(
        arena: &'a Bump,
        workload: Workload<'a>,
        knobs: IndexSelectionKnobs,
        optimizer: &'a dyn WhatIfOptimizer,
        db_name: &'a str,
    ) -> Self {
        Self {
            workload,
            context: IndexSelectionContext::new(arena, knobs),
            optimizer,
            db_name,
            cancel: None,
        }
    }

    /// Installs a cancellation flag, polled between per-query iterations
    /// and between the two enumeration stages.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn context(&self) -> &IndexSelectionContext<'a> {
        &self.context
    }

    /// The main entry point: the best configuration of at most
    /// `num_indexes` hypothetical indexes for the workload.
    pub fn get_best_indexes(&mut self) -> Result<IndexConfiguration<'a>> {
        let workload = self.workload.clone();
        let knobs = self.context.knobs();

        let mut candidates = IndexConfiguration::new();
        for query in workload.queries() {
            self.check_cancelled()?;

            let admissible = match self.get_admissible_indexes(query) {
                Ok(config) => config,
                Err(report) => {
                    let local = AdvisorError::classify(&report)
                        .is_some_and(AdvisorError::is_statement_local);
                    if !local {
                        return Err(report);
                    }
                    warn!(
                        statement = query.stable_key(),
                        error = %report,
                        "skipping statement in index selection"
                    );
                    continue;
                }
            };

            let single = Workload::single(*query);
            let pruned = self.prune_useless_indexes(&admissible, &single);
            let per_query =
                self.enumerate(&pruned, &single, knobs.enumeration_threshold as usize)?;
            candidates.merge(&per_query);
        }

        let mut candidates = self.prune_useless_indexes(&candidates, &workload);

        for width in 2..=knobs.max_index_cols as usize {
            let singles = candidates.single_column_indexes();
            let widened = self.gen_multi_column_indexes(&candidates, &singles);
            candidates.merge(&widened);
            candidates = self.prune_useless_indexes(&candidates, &workload);
            debug!(width, candidates = candidates.index_count(), "widened candidate set");
        }

        self.enumerate(&candidates, &workload, knobs.num_indexes as usize)
    }

    /// The indexable columns of one statement, as single-column
    /// hypothetical indexes interned through the pool.
    pub fn get_admissible_indexes(
        &mut self,
        query: &BoundStatement<'a>,
    ) -> Result<IndexConfiguration<'a>> {
        let mut config = IndexConfiguration::new();

        if let Some(where_clause) = query.where_clause {
            self.collect_where_indexes(where_clause, &mut config)?;
        }

        for term in query.group_by.iter().chain(query.order_by.iter()) {
            self.collect_term_index(term, &mut config)?;
        }

        for target in query.update_columns {
            self.intern_column(target, &mut config)?;
        }

        Ok(config)
    }

    fn collect_where_indexes(
        &mut self,
        expr: &BoundExpr<'a>,
        config: &mut IndexConfiguration<'a>,
    ) -> Result<()> {
        match expr {
            BoundExpr::Compare { left, right, .. } => match (left, right) {
                (BoundExpr::Column(_), BoundExpr::Column(_)) => {
                    bail!(AdvisorError::UnsupportedExpression(
                        "column-to-column comparison"
                    ))
                }
                (BoundExpr::Column(col), _) => self.intern_column(col, config),
                (_, BoundExpr::Column(col)) => self.intern_column(col, config),
                _ => bail!(AdvisorError::UnsupportedExpression(
                    "comparison without a column operand"
                )),
            },
            BoundExpr::Conjunction { left, right, .. } => {
                self.collect_where_indexes(left, config)?;
                self.collect_where_indexes(right, config)
            }
            BoundExpr::Unsupported(kind) => bail!(AdvisorError::UnsupportedExpression(kind)),
            BoundExpr::Column(_) | BoundExpr::Value => bail!(
                AdvisorError::UnsupportedExpression("non-predicate expression")
            ),
        }
    }

    fn collect_term_index(
        &mut self,
        term: &BoundExpr<'a>,
        config: &mut IndexConfiguration<'a>,
    ) -> Result<()> {
        match term {
            BoundExpr::Column(col) => self.intern_column(col, config),
            BoundExpr::Unsupported(kind) => bail!(AdvisorError::UnsupportedExpression(kind)),
            _ => bail!(AdvisorError::UnsupportedExpression("non-column term")),
        }
    }

    fn intern_column(
        &mut self,
        col: &BoundColumnRef<'a>,
        config: &mut IndexConfiguration<'a>,
    ) -> Result<()> {
        let Some(binding) = col.binding else {
            bail!(AdvisorError::UnboundColumn(col.column.to_string()));
        };

        let index = self
            .context
            .pool
            .put(binding.db_id, binding.table_id, &[binding.column_id]);
        config.add(index);
        Ok(())
    }

    /// Estimated cost of the workload under `config`, through the memo.
    /// A statement the optimizer cannot plan contributes `+INFINITY`,
    /// recorded so the branch is never retried.
    pub fn compute_cost(
        &mut self,
        config: &IndexConfiguration<'a>,
        workload: &Workload<'a>,
    ) -> f64 {
        let config_key = config.stable_key();
        let mut total = 0.0;

        for query in workload.queries() {
            let statement_key = query.stable_key();
            if let Some(cost) = self.context.memo_lookup(&config_key, statement_key) {
                total += cost;
                continue;
            }

            let cost = match self.optimizer.what_if_cost(query, config, self.db_name) {
                Ok(result) => result.cost,
                Err(report) => {
                    warn!(
                        statement = statement_key,
                        error = %report,
                        "what-if costing failed; treating branch as non-improving"
                    );
                    f64::INFINITY
                }
            };

            self.context.memo_store(&config_key, statement_key, cost);
            total += cost;
        }

        total
    }

    /// Drops every index that no workload statement's what-if plan
    /// chooses. Probes are made over singleton configurations and their
    /// costs are recorded in the memo as a side effect.
    pub fn prune_useless_indexes(
        &mut self,
        config: &IndexConfiguration<'a>,
        workload: &Workload<'a>,
    ) -> IndexConfiguration<'a> {
        let mut kept = IndexConfiguration::new();
        for index in config.indexes().iter().copied() {
            if self.is_index_useful(index, workload) {
                kept.add(index);
            }
        }
        kept
    }

    fn is_index_useful(&mut self, index: &'a IndexObject<'a>, workload: &Workload<'a>) -> bool {
        let singleton = IndexConfiguration::from_index(index);
        let config_key = singleton.stable_key();
        let mut useful = false;

        for query in workload.queries() {
            match self.optimizer.what_if_cost(query, &singleton, self.db_name) {
                Ok(result) => {
                    self.context
                        .memo_store(&config_key, query.stable_key(), result.cost);
                    if result.plan_indexes.contains(index) {
                        useful = true;
                    }
                }
                Err(report) => {
                    warn!(
                        statement = query.stable_key(),
                        error = %report,
                        "what-if probe failed during pruning"
                    );
                    self.context
                        .memo_store(&config_key, query.stable_key(), f64::INFINITY);
                }
            }
        }

        useful
    }

    /// Top-k enumeration: bounded exhaustive seeding, then greedy
    /// extension while an added index still strictly improves the
    /// workload cost.
    pub fn enumerate(
        &mut self,
        indexes: &IndexConfiguration<'a>,
        workload: &Workload<'a>,
        k: usize,
    ) -> Result<IndexConfiguration<'a>> {
        if k == 0 || indexes.is_empty() {
            return Ok(IndexConfiguration::new());
        }

        let m = (self.context.knobs().enumeration_threshold as usize).min(indexes.index_count());
        let seed_width = m.min(k);

        let seed = self.exhaustive_enumeration(indexes, workload, seed_width);
        self.check_cancelled()?;

        if k <= m {
            return Ok(seed);
        }

        let remaining = indexes.difference(&seed);
        Ok(self.greedy_search(seed, remaining, workload, k))
    }

    /// Costs every non-empty subset of up to `width` indexes and keeps
    /// the cheapest under the total (cost, count, key) order. Realized as
    /// a breadth-first expansion over subsets of growing size; members
    /// only extend past their largest element, so each combination is
    /// generated exactly once.
    fn exhaustive_enumeration(
        &mut self,
        indexes: &IndexConfiguration<'a>,
        workload: &Workload<'a>,
        width: usize,
    ) -> IndexConfiguration<'a> {
        let members: Vec<&'a IndexObject<'a>> = indexes.indexes().to_vec();
        let mut best: Option<(f64, IndexConfiguration<'a>)> = None;

        let mut frontier: Vec<IndexConfiguration<'a>> = vec![IndexConfiguration::new()];
        for _size in 1..=width {
            let mut next_level: Vec<IndexConfiguration<'a>> = Vec::new();

            for subset in &frontier {
                let last_key = subset.indexes().last().map(|i| i.stable_key());

                for member in members.iter().copied() {
                    if let Some(last) = last_key {
                        if member.stable_key() <= last {
                            continue;
                        }
                    }

                    let mut extended = subset.clone();
                    extended.add(member);
                    let cost = self.compute_cost(&extended, workload);

                    best = Some(match best.take() {
                        None => (cost, extended.clone()),
                        Some(current) => pick_better(current, (cost, extended.clone())),
                    });
                    next_level.push(extended);
                }
            }

            if next_level.is_empty() {
                break;
            }
            frontier = next_level;
        }

        best.map(|(_, config)| config).unwrap_or_default()
    }

    /// Extends the exhaustive seed one index at a time, always taking
    /// the cheapest extension, until the cap is reached or no extension
    /// strictly improves the workload cost.
    fn greedy_search(
        &mut self,
        seed: IndexConfiguration<'a>,
        remaining: IndexConfiguration<'a>,
        workload: &Workload<'a>,
        k: usize,
    ) -> IndexConfiguration<'a> {
        let mut current = seed;
        let mut remaining = remaining;
        let mut best_cost = self.compute_cost(&current, workload);

        while current.index_count() < k && !remaining.is_empty() {
            let mut best_extension: Option<(&'a IndexObject<'a>, f64)> = None;

            for index in remaining.indexes().iter().copied() {
                let mut trial = current.clone();
                trial.add(index);
                let cost = self.compute_cost(&trial, workload);

                // Strict < keeps the first-seen candidate on ties, and
                // candidates arrive in stable-key order.
                match best_extension {
                    None => best_extension = Some((index, cost)),
                    Some((_, best)) if cost < best => best_extension = Some((index, cost)),
                    _ => {}
                }
            }

            let Some((index, cost)) = best_extension else {
                break;
            };

            if cost < best_cost {
                current.add(index);
                remaining.remove(index);
                best_cost = cost;
            } else {
                break;
            }
        }

        current
    }

    /// Cross product of a configuration with single-column candidates,
    /// filtered by merge compatibility; results are interned through the
    /// pool.
    pub fn cross_product(
        &mut self,
        config: &IndexConfiguration<'a>,
        single_columns: &IndexConfiguration<'a>,
    ) -> IndexConfiguration<'a> {
        let max_index_cols = self.context.knobs().max_index_cols as usize;
        let mut result = IndexConfiguration::new();

        for index in config.indexes().iter().copied() {
            for column in single_columns.indexes().iter().copied() {
                if !index.is_compatible(column, max_index_cols) {
                    continue;
                }
                let merged_columns = index.merged_columns(column);
                let merged =
                    self.context
                        .pool
                        .put(index.db_id(), index.table_id(), &merged_columns);
                result.add(merged);
            }
        }

        result
    }

    pub fn gen_multi_column_indexes(
        &mut self,
        config: &IndexConfiguration<'a>,
        single_columns: &IndexConfiguration<'a>,
    ) -> IndexConfiguration<'a> {
        self.cross_product(config, single_columns)
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(flag) = self.cancel {
            if flag.load(Ordering::Relaxed) {
                bail!(AdvisorError::Cancelled);
            }
        }
        Ok(())
    }
}

/// Total order over (cost, configuration): lower cost, then fewer
/// indexes, then smaller stable key. Returns the better of the two.
fn pick_better<'a>(
    current: (f64, IndexConfiguration<'a>),
    candidate: (f64, IndexConfiguration<'a>),
) -> (f64, IndexConfiguration<'a>) {
    use std::cmp::Ordering::Less;

    let ordering = candidate
        .0
        .partial_cmp(&current.0)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| candidate.1.index_count().cmp(&current.1.index_count()))
        .then_with(|| candidate.1.stable_key().cmp(&current.1.stable_key()));

    if ordering == Less {
        candidate
    } else {
        current
    }
}
