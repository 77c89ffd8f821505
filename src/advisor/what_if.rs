//! # What-If Costing Interface
//!
//! The advisor never does its own cost modelling; it asks a
//! [`WhatIfOptimizer`] what a statement would cost *as if* a given
//! configuration of hypothetical indexes existed. The returned plan
//! membership feeds useless-index pruning.
//!
//! [`HeuristicWhatIf`] is the built-in implementation: a selectivity
//! model over the catalog's row-count statistics. An embedding database
//! replaces it with a bridge to its real optimizer; the advisor only
//! depends on the trait.

use super::index_object::{IndexConfiguration, IndexObject};
use crate::config::{
    COST_AVG_ROW_SIZE, COST_CPU_PER_ROW, COST_IO_PER_PAGE, COST_PAGE_SIZE, EQUALITY_SELECTIVITY,
    INDEX_HEIGHT_IO, UNIQUE_SELECTIVITY,
};
use crate::schema::{Catalog, ColumnId, TableId};
use crate::sql::{BoundExpr, BoundStatement, ConjunctionOp, StatementKind};
use eyre::Result;
use smallvec::SmallVec;

/// Outcome of one what-if probe.
#[derive(Debug, Clone)]
pub struct WhatIfResult<'a> {
    /// Estimated cost of the statement under the probed configuration.
    pub cost: f64,
    /// The subset of the probed configuration the chosen plan actually
    /// used.
    pub plan_indexes: IndexConfiguration<'a>,
}

pub trait WhatIfOptimizer {
    /// Costs `query` as if `config` existed. A statement the optimizer
    /// cannot plan is an error; the caller records it as `+INFINITY`.
    fn what_if_cost<'a>(
        &self,
        query: &BoundStatement<'a>,
        config: &IndexConfiguration<'a>,
        db_name: &str,
    ) -> Result<WhatIfResult<'a>>;
}

/// Selectivity-based what-if costing over catalog statistics.
///
/// A hypothetical index is applicable to a statement when every one of
/// its columns is referenced by the statement's predicates or sort
/// terms. Plans are built greedily: starting from a full scan, the
/// cheapest strictly-improving index is added; pure-AND predicates may
/// intersect several indexes, anything containing OR uses at most one.
/// Predicate matches narrow the estimate by `EQUALITY_SELECTIVITY` per
/// matched column with a `UNIQUE_SELECTIVITY` floor; row fetches through
/// an index are charged as random page reads, capped by the table size;
/// a lone index covering every sort term spares the sort.
pub struct HeuristicWhatIf<'c> {
    catalog: &'c Catalog,
}

impl<'c> HeuristicWhatIf<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    fn table_rows(&self, table_id: TableId) -> f64 {
        self.catalog
            .table_by_id(table_id)
            .map(|t| t.row_count())
            .unwrap_or(crate::schema::TableDef::DEFAULT_ROW_COUNT) as f64
    }
}

impl WhatIfOptimizer for HeuristicWhatIf<'_> {
    fn what_if_cost<'a>(
        &self,
        query: &BoundStatement<'a>,
        config: &IndexConfiguration<'a>,
        _db_name: &str,
    ) -> Result<WhatIfResult<'a>> {
        let Some(table_id) = query.table_id else {
            return Ok(WhatIfResult {
                cost: COST_CPU_PER_ROW,
                plan_indexes: IndexConfiguration::new(),
            });
        };

        // A predicate-free write never scans; it is charged a constant.
        if query.kind == StatementKind::Insert && query.where_clause.is_none() {
            return Ok(WhatIfResult {
                cost: COST_CPU_PER_ROW,
                plan_indexes: IndexConfiguration::new(),
            });
        }

        let rows = self.table_rows(table_id);

        let mut where_columns: SmallVec<[ColumnId; 8]> = SmallVec::new();
        if let Some(where_clause) = query.where_clause {
            collect_predicate_columns(where_clause, table_id, &mut where_columns);
        }
        where_columns.sort_unstable();
        where_columns.dedup();

        let mut sort_columns: SmallVec<[ColumnId; 8]> = SmallVec::new();
        for term in query.group_by.iter().chain(query.order_by.iter()) {
            if let BoundExpr::Column(col) = term {
                if let Some(binding) = col.binding {
                    if binding.table_id == table_id {
                        sort_columns.push(binding.column_id);
                    }
                }
            }
        }
        sort_columns.sort_unstable();
        sort_columns.dedup();

        let shape = PlanShape {
            rows,
            where_columns,
            sort_columns,
        };

        // Intersecting several indexes is only sound for conjunctions;
        // a disjunction needs an index union covering every disjunct.
        let pure_and = query
            .where_clause
            .map(|expr| !has_disjunction(expr))
            .unwrap_or(true);

        let applicable: Vec<&'a IndexObject<'a>> = config
            .indexes()
            .iter()
            .copied()
            .filter(|index| {
                index.db_id() == self.catalog.db_id()
                    && index.table_id() == table_id
                    && index.columns().iter().all(|col| {
                        shape.where_columns.binary_search(col).is_ok()
                            || shape.sort_columns.binary_search(col).is_ok()
                    })
            })
            .collect();

        let (chosen, best_cost) = if pure_and {
            intersection_plan(&applicable, &shape)
        } else {
            union_plan(&applicable, &shape)
        };

        let mut plan_indexes = IndexConfiguration::new();
        for index in chosen {
            plan_indexes.add(index);
        }

        Ok(WhatIfResult {
            cost: best_cost,
            plan_indexes,
        })
    }
}

/// Greedy plan construction for pure-AND predicates: keep adding the
/// cheapest index while it strictly improves the plan. Candidates arrive
/// in stable-key order, so ties are deterministic.
fn intersection_plan<'a>(
    applicable: &[&'a IndexObject<'a>],
    shape: &PlanShape,
) -> (Vec<&'a IndexObject<'a>>, f64) {
    let mut chosen: Vec<&'a IndexObject<'a>> = Vec::new();
    let mut best_cost = plan_cost(&chosen, shape);

    loop {
        let mut best_extension: Option<(&'a IndexObject<'a>, f64)> = None;
        for index in applicable.iter().copied() {
            if chosen.iter().any(|c| std::ptr::eq(*c, index)) {
                continue;
            }

            let mut trial = chosen.clone();
            trial.push(index);
            let cost = plan_cost(&trial, shape);

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
            chosen.push(index);
            best_cost = cost;
        } else {
            break;
        }
    }

    (chosen, best_cost)
}

/// Plan construction when the predicate contains OR: every predicate
/// column must be reachable through some index or the union plan would
/// miss rows, so either a covering set of indexes is assembled or the
/// plan falls back to a scan.
fn union_plan<'a>(
    applicable: &[&'a IndexObject<'a>],
    shape: &PlanShape,
) -> (Vec<&'a IndexObject<'a>>, f64) {
    let scan_cost = plan_cost(&[], shape);
    if shape.where_columns.is_empty() {
        return (Vec::new(), scan_cost);
    }

    let mut chosen: Vec<&'a IndexObject<'a>> = Vec::new();
    let mut covered: SmallVec<[ColumnId; 8]> = SmallVec::new();
    for index in applicable.iter().copied() {
        let adds_coverage = index.columns().iter().any(|col| {
            shape.where_columns.binary_search(col).is_ok() && !covered.contains(col)
        });
        if adds_coverage {
            for col in index.columns() {
                if shape.where_columns.binary_search(col).is_ok() && !covered.contains(col) {
                    covered.push(*col);
                }
            }
            chosen.push(index);
        }
    }

    if covered.len() < shape.where_columns.len() {
        return (Vec::new(), scan_cost);
    }

    let cost = union_cost(&chosen, shape);
    if cost < scan_cost {
        (chosen, cost)
    } else {
        (Vec::new(), scan_cost)
    }
}

/// Cost of unioning the rows of several index scans: a descent and
/// posting read per index, a random fetch per surviving row with the
/// per-index selectivities summed, and the sort if one is required.
fn union_cost(indexes: &[&IndexObject<'_>], shape: &PlanShape) -> f64 {
    let table_pages = data_pages(shape.rows);
    let mut cost = 0.0;
    let mut combined_selectivity = 0.0;

    for index in indexes {
        let matched = index
            .columns()
            .iter()
            .filter(|col| shape.where_columns.binary_search(*col).is_ok())
            .count();
        let branch_selectivity = selectivity(matched);
        combined_selectivity += branch_selectivity;

        let posting_rows = (shape.rows * branch_selectivity).max(1.0);
        cost += INDEX_HEIGHT_IO * COST_IO_PER_PAGE + data_pages(posting_rows) * COST_IO_PER_PAGE;
    }

    let estimated_rows = (shape.rows * combined_selectivity.min(1.0)).max(1.0);
    cost += estimated_rows.min(table_pages) * COST_IO_PER_PAGE;
    cost += estimated_rows * COST_CPU_PER_ROW;

    if !shape.sort_columns.is_empty() {
        cost += sort_cost(estimated_rows);
    }

    cost
}

struct PlanShape {
    rows: f64,
    where_columns: SmallVec<[ColumnId; 8]>,
    sort_columns: SmallVec<[ColumnId; 8]>,
}

/// Cost of scanning through `indexes` (a full table scan when empty):
/// one descent plus posting pages per index, a random page fetch per
/// surviving row capped by the table size, CPU per row, and a sort
/// unless a lone index already delivers the required order.
fn plan_cost(indexes: &[&IndexObject<'_>], shape: &PlanShape) -> f64 {
    let needs_sort = !shape.sort_columns.is_empty();
    let table_pages = data_pages(shape.rows);

    if indexes.is_empty() {
        let mut cost = table_pages * COST_IO_PER_PAGE + shape.rows * COST_CPU_PER_ROW;
        if needs_sort {
            cost += sort_cost(shape.rows);
        }
        return cost;
    }

    let mut covered: SmallVec<[ColumnId; 8]> = SmallVec::new();
    let mut cost = 0.0;

    for index in indexes {
        let matched = index
            .columns()
            .iter()
            .filter(|col| shape.where_columns.binary_search(*col).is_ok())
            .count();
        for col in index.columns() {
            if shape.where_columns.binary_search(col).is_ok() && !covered.contains(col) {
                covered.push(*col);
            }
        }

        let posting_rows = (shape.rows * selectivity(matched)).max(1.0);
        cost += INDEX_HEIGHT_IO * COST_IO_PER_PAGE + data_pages(posting_rows) * COST_IO_PER_PAGE;
    }

    let estimated_rows = (shape.rows * selectivity(covered.len())).max(1.0);
    cost += estimated_rows.min(table_pages) * COST_IO_PER_PAGE;
    cost += estimated_rows * COST_CPU_PER_ROW;

    let sort_covered = indexes.len() == 1
        && shape
            .sort_columns
            .iter()
            .all(|col| indexes[0].contains_column(*col));
    if needs_sort && !sort_covered {
        cost += sort_cost(estimated_rows);
    }

    cost
}

fn selectivity(matched_columns: usize) -> f64 {
    if matched_columns == 0 {
        1.0
    } else {
        EQUALITY_SELECTIVITY
            .powi(matched_columns as i32)
            .max(UNIQUE_SELECTIVITY)
    }
}

fn has_disjunction(expr: &BoundExpr<'_>) -> bool {
    match expr {
        BoundExpr::Conjunction { op: ConjunctionOp::Or, .. } => true,
        BoundExpr::Conjunction { op: ConjunctionOp::And, left, right } => {
            has_disjunction(left) || has_disjunction(right)
        }
        _ => false,
    }
}

fn collect_predicate_columns(
    expr: &BoundExpr<'_>,
    table_id: TableId,
    out: &mut SmallVec<[ColumnId; 8]>,
) {
    match expr {
        BoundExpr::Compare { left, right, .. } => {
            for side in [left, right] {
                if let BoundExpr::Column(col) = side {
                    if let Some(binding) = col.binding {
                        if binding.table_id == table_id {
                            out.push(binding.column_id);
                        }
                    }
                }
            }
        }
        BoundExpr::Conjunction { left, right, .. } => {
            collect_predicate_columns(left, table_id, out);
            collect_predicate_columns(right, table_id, out);
        }
        _ => {}
    }
}

fn data_pages(rows: f64) -> f64 {
    let rows_per_page = (COST_PAGE_SIZE / COST_AVG_ROW_SIZE).max(1.0);
    (rows / rows_per_page).ceil().max(1.0)
}

fn sort_cost(rows: f64) -> f64 {
    rows * rows.max(2.0).log2() * COST_CPU_PER_ROW
}
