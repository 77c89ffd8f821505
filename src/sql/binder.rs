//! # Statement Binder
//!
//! Resolves the column references of a parsed DML statement against the
//! catalog, producing a [`BoundStatement`] whose column nodes carry
//! `(db_id, table_id, column_id)` bindings. The advisor only ever works
//! on bound trees.
//!
//! Binding is deliberately forgiving: an unknown table or column does not
//! fail the bind, it leaves the reference unbound. The admissible-index
//! extractor is the layer that turns an unbound reference into a hard
//! `UnboundColumn` error, because only there is it known whether the
//! column actually matters for index selection.
//!
//! The bound tree collapses expressions to what index selection needs:
//! comparisons with a column on exactly one side, AND/OR conjunctions,
//! and an `Unsupported` marker for everything else. The original
//! statement text (whitespace-normalized) is retained as the statement's
//! stable key for what-if memoization.

use super::ast::{
    BinaryOperator, ColumnRef, Expr, InsertSource, SelectStmt, Statement,
};
use super::parser::Parser;
use crate::schema::{Catalog, ColumnId, DbId, TableDef, TableId};
use bumpalo::Bump;
use eyre::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnBinding {
    pub db_id: DbId,
    pub table_id: TableId,
    pub column_id: ColumnId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundColumnRef<'a> {
    pub table: Option<&'a str>,
    pub column: &'a str,
    pub binding: Option<ColumnBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjunctionOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundExpr<'a> {
    /// A non-column operand of a comparison; the advisor never inspects
    /// the value itself.
    Value,
    Column(BoundColumnRef<'a>),
    Compare {
        op: CompareOp,
        left: &'a BoundExpr<'a>,
        right: &'a BoundExpr<'a>,
    },
    Conjunction {
        op: ConjunctionOp,
        left: &'a BoundExpr<'a>,
        right: &'a BoundExpr<'a>,
    },
    /// A predicate shape index selection cannot use, tagged with the node
    /// kind for the eventual error message.
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct BoundStatement<'a> {
    pub kind: StatementKind,
    /// Whitespace-normalized statement text; the stable key for what-if
    /// memoization.
    pub text: &'a str,
    /// Table the statement scans (the inner SELECT's table for
    /// INSERT .. SELECT); `None` for INSERT .. VALUES and FROM-less
    /// SELECTs.
    pub table_id: Option<TableId>,
    pub where_clause: Option<&'a BoundExpr<'a>>,
    pub group_by: &'a [&'a BoundExpr<'a>],
    pub order_by: &'a [&'a BoundExpr<'a>],
    /// Assignment targets of an UPDATE.
    pub update_columns: &'a [BoundColumnRef<'a>],
}

impl<'a> BoundStatement<'a> {
    /// Stable textual form used as the memo key.
    pub fn stable_key(&self) -> &'a str {
        self.text
    }
}

pub struct Binder<'a> {
    catalog: &'a Catalog,
    arena: &'a Bump,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a Catalog, arena: &'a Bump) -> Self {
        Self { catalog, arena }
    }

    /// Copies `sql` into the arena, parses it, and binds the result.
    pub fn bind_sql(&self, sql: &str) -> Result<BoundStatement<'a>> {
        let text: &'a str = self.arena.alloc_str(sql);
        let mut parser = Parser::new(text, self.arena);
        let stmt = parser.parse_statement()?;
        self.bind(&stmt, text)
    }

    pub fn bind(&self, stmt: &Statement<'a>, text: &'a str) -> Result<BoundStatement<'a>> {
        let normalized = normalize_sql(text, self.arena);

        match stmt {
            Statement::Select(select) => self.bind_select(select, normalized),
            Statement::Insert(insert) => {
                match insert.source {
                    InsertSource::Select(select) => {
                        let inner = self.bind_select(select, normalized)?;
                        Ok(BoundStatement {
                            kind: StatementKind::Insert,
                            text: normalized,
                            table_id: inner.table_id,
                            // Only the inner SELECT's WHERE matters for
                            // index selection.
                            where_clause: inner.where_clause,
                            group_by: &[],
                            order_by: &[],
                            update_columns: &[],
                        })
                    }
                    InsertSource::Values(_) => Ok(BoundStatement {
                        kind: StatementKind::Insert,
                        text: normalized,
                        table_id: self.lookup_table(insert.table.name).map(TableDef::id),
                        where_clause: None,
                        group_by: &[],
                        order_by: &[],
                        update_columns: &[],
                    }),
                }
            }
            Statement::Update(update) => {
                let table = self.lookup_table(update.table.name);
                let alias = update.table.alias;

                let where_clause = update
                    .where_clause
                    .map(|expr| self.bind_predicate(expr, table, update.table.name, alias));

                let mut targets = Vec::new();
                for assignment in update.assignments {
                    targets.push(self.bind_column(&assignment.column, table, update.table.name, alias));
                }

                Ok(BoundStatement {
                    kind: StatementKind::Update,
                    text: normalized,
                    table_id: table.map(TableDef::id),
                    where_clause,
                    group_by: &[],
                    order_by: &[],
                    update_columns: self.arena.alloc_slice_copy(&targets),
                })
            }
            Statement::Delete(delete) => {
                let table = self.lookup_table(delete.table.name);
                let alias = delete.table.alias;

                let where_clause = delete
                    .where_clause
                    .map(|expr| self.bind_predicate(expr, table, delete.table.name, alias));

                Ok(BoundStatement {
                    kind: StatementKind::Delete,
                    text: normalized,
                    table_id: table.map(TableDef::id),
                    where_clause,
                    group_by: &[],
                    order_by: &[],
                    update_columns: &[],
                })
            }
            Statement::Begin | Statement::Commit | Statement::Rollback => {
                bail!("transaction control statement carries no bindings")
            }
        }
    }

    fn bind_select(
        &self,
        select: &SelectStmt<'a>,
        normalized: &'a str,
    ) -> Result<BoundStatement<'a>> {
        let (table, table_name, alias) = match select.from {
            Some(from) => (self.lookup_table(from.name), from.name, from.alias),
            None => (None, "", None),
        };

        let where_clause = select
            .where_clause
            .map(|expr| self.bind_predicate(expr, table, table_name, alias));

        let mut group_by: Vec<&BoundExpr<'a>> = Vec::new();
        for expr in select.group_by {
            group_by.push(self.bind_term(expr, table, table_name, alias));
        }

        let mut order_by: Vec<&BoundExpr<'a>> = Vec::new();
        for item in select.order_by {
            order_by.push(self.bind_term(item.expr, table, table_name, alias));
        }

        Ok(BoundStatement {
            kind: StatementKind::Select,
            text: normalized,
            table_id: table.map(TableDef::id),
            where_clause,
            group_by: self.arena.alloc_slice_copy(&group_by),
            order_by: self.arena.alloc_slice_copy(&order_by),
            update_columns: &[],
        })
    }

    fn lookup_table(&self, name: &str) -> Option<&'a TableDef> {
        self.catalog.resolve_table(name).ok()
    }

    fn bind_column(
        &self,
        col: &ColumnRef<'a>,
        table: Option<&TableDef>,
        table_name: &str,
        alias: Option<&str>,
    ) -> BoundColumnRef<'a> {
        let qualifier_matches = match col.table {
            None => true,
            Some(qualifier) => {
                qualifier.eq_ignore_ascii_case(table_name)
                    || alias.is_some_and(|a| qualifier.eq_ignore_ascii_case(a))
            }
        };

        let binding = if qualifier_matches {
            table.and_then(|t| {
                t.column(col.column).map(|c| ColumnBinding {
                    db_id: self.catalog.db_id(),
                    table_id: t.id(),
                    column_id: c.id(),
                })
            })
        } else {
            None
        };

        BoundColumnRef {
            table: col.table,
            column: col.column,
            binding,
        }
    }

    /// Binds one GROUP BY / ORDER BY term. Only bare column references
    /// are usable; anything else is marked unsupported.
    fn bind_term(
        &self,
        expr: &Expr<'a>,
        table: Option<&TableDef>,
        table_name: &str,
        alias: Option<&str>,
    ) -> &'a BoundExpr<'a> {
        match expr {
            Expr::Column(col) => self
                .arena
                .alloc(BoundExpr::Column(self.bind_column(col, table, table_name, alias))),
            _ => self.arena.alloc(BoundExpr::Unsupported("non-column term")),
        }
    }

    fn bind_predicate(
        &self,
        expr: &Expr<'a>,
        table: Option<&TableDef>,
        table_name: &str,
        alias: Option<&str>,
    ) -> &'a BoundExpr<'a> {
        let bound = match expr {
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    let conj = if *op == BinaryOperator::And {
                        ConjunctionOp::And
                    } else {
                        ConjunctionOp::Or
                    };
                    BoundExpr::Conjunction {
                        op: conj,
                        left: self.bind_predicate(left, table, table_name, alias),
                        right: self.bind_predicate(right, table, table_name, alias),
                    }
                }
                _ if op.is_comparison() => BoundExpr::Compare {
                    op: compare_op(*op),
                    left: self.bind_operand(left, table, table_name, alias),
                    right: self.bind_operand(right, table, table_name, alias),
                },
                _ => BoundExpr::Unsupported("arithmetic predicate"),
            },
            Expr::Like { expr, negated, pattern } => BoundExpr::Compare {
                op: if *negated { CompareOp::NotLike } else { CompareOp::Like },
                left: self.bind_operand(expr, table, table_name, alias),
                right: self.bind_operand(pattern, table, table_name, alias),
            },
            Expr::InList { expr, negated, .. } => {
                if *negated {
                    BoundExpr::Unsupported("NOT IN predicate")
                } else {
                    BoundExpr::Compare {
                        op: CompareOp::In,
                        left: self.bind_operand(expr, table, table_name, alias),
                        right: self.arena.alloc(BoundExpr::Value),
                    }
                }
            }
            Expr::Between { .. } => BoundExpr::Unsupported("BETWEEN predicate"),
            Expr::IsNull { .. } => BoundExpr::Unsupported("IS NULL predicate"),
            Expr::UnaryOp { .. } => BoundExpr::Unsupported("unary predicate"),
            Expr::Column(_) => BoundExpr::Unsupported("bare column predicate"),
            Expr::Literal(_) => BoundExpr::Unsupported("constant predicate"),
            Expr::Parameter(_) => BoundExpr::Unsupported("parameter predicate"),
        };

        self.arena.alloc(bound)
    }

    fn bind_operand(
        &self,
        expr: &Expr<'a>,
        table: Option<&TableDef>,
        table_name: &str,
        alias: Option<&str>,
    ) -> &'a BoundExpr<'a> {
        match expr {
            Expr::Column(col) => self
                .arena
                .alloc(BoundExpr::Column(self.bind_column(col, table, table_name, alias))),
            _ => self.arena.alloc(BoundExpr::Value),
        }
    }
}

fn compare_op(op: BinaryOperator) -> CompareOp {
    match op {
        BinaryOperator::Eq => CompareOp::Eq,
        BinaryOperator::NotEq => CompareOp::NotEq,
        BinaryOperator::Lt => CompareOp::Lt,
        BinaryOperator::LtEq => CompareOp::LtEq,
        BinaryOperator::Gt => CompareOp::Gt,
        BinaryOperator::GtEq => CompareOp::GtEq,
        other => unreachable!("not a comparison operator: {:?}", other),
    }
}

/// Collapses runs of whitespace and strips the trailing semicolon so two
/// textually-equivalent statements share one memo key.
pub fn normalize_sql<'a>(sql: &str, arena: &'a Bump) -> &'a str {
    let mut normalized = String::with_capacity(sql.len());
    let mut last_was_space = false;

    for ch in sql.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
            }
            last_was_space = true;
        } else {
            normalized.push(ch);
            last_was_space = false;
        }
    }

    let trimmed = normalized.trim_end_matches(';').trim_end();
    arena.alloc_str(trimmed)
}
