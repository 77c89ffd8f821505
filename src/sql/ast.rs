//! # SQL Abstract Syntax Tree
//!
//! AST types produced by the SQL parser. All nodes are arena-allocated
//! using bumpalo, with string slices borrowing directly from the original
//! input for zero-copy parsing.
//!
//! The statement set is the DML subset the index advisor accepts —
//! SELECT, INSERT, UPDATE, DELETE — plus bare transaction-control markers
//! (BEGIN, COMMIT, ROLLBACK) so that replayed query history can be
//! classified without a parse failure.
//!
//! ## Memory Layout
//!
//! Arena-allocated types use `&'a T` for child nodes:
//!
//! ```text
//! Statement<'a>
//!     └── SelectStmt<'a>
//!             ├── columns: &'a [SelectColumn<'a>]
//!             ├── from: Option<TableRef<'a>>
//!             ├── where_clause: Option<&'a Expr<'a>>
//!             └── ...
//! ```

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Select(&'a SelectStmt<'a>),
    Insert(&'a InsertStmt<'a>),
    Update(&'a UpdateStmt<'a>),
    Delete(&'a DeleteStmt<'a>),
    Begin,
    Commit,
    Rollback,
}

impl Statement<'_> {
    pub fn is_transaction_control(&self) -> bool {
        matches!(self, Statement::Begin | Statement::Commit | Statement::Rollback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectStmt<'a> {
    pub distinct: Distinct,
    pub columns: &'a [SelectColumn<'a>],
    pub from: Option<TableRef<'a>>,
    pub where_clause: Option<&'a Expr<'a>>,
    pub group_by: &'a [&'a Expr<'a>],
    pub having: Option<&'a Expr<'a>>,
    pub order_by: &'a [OrderByItem<'a>],
    pub limit: Option<&'a Expr<'a>>,
    pub offset: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distinct {
    All,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectColumn<'a> {
    AllColumns,
    Expr {
        expr: &'a Expr<'a>,
        alias: Option<&'a str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
    pub alias: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderByItem<'a> {
    pub expr: &'a Expr<'a>,
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertStmt<'a> {
    pub table: TableRef<'a>,
    pub columns: Option<&'a [&'a str]>,
    pub source: InsertSource<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertSource<'a> {
    Values(&'a [&'a [&'a Expr<'a>]]),
    Select(&'a SelectStmt<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment<'a> {
    pub column: ColumnRef<'a>,
    pub value: &'a Expr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStmt<'a> {
    pub table: TableRef<'a>,
    pub assignments: &'a [Assignment<'a>],
    pub where_clause: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteStmt<'a> {
    pub table: TableRef<'a>,
    pub where_clause: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    Column(ColumnRef<'a>),
    Parameter(ParameterRef),
    BinaryOp {
        left: &'a Expr<'a>,
        op: BinaryOperator,
        right: &'a Expr<'a>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: &'a Expr<'a>,
    },
    Like {
        expr: &'a Expr<'a>,
        negated: bool,
        pattern: &'a Expr<'a>,
    },
    InList {
        expr: &'a Expr<'a>,
        negated: bool,
        list: &'a [&'a Expr<'a>],
    },
    Between {
        expr: &'a Expr<'a>,
        negated: bool,
        low: &'a Expr<'a>,
        high: &'a Expr<'a>,
    },
    IsNull {
        expr: &'a Expr<'a>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Null,
    Boolean(bool),
    Integer(&'a str),
    Float(&'a str),
    String(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRef<'a> {
    pub table: Option<&'a str>,
    pub column: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterRef {
    Positional(u32),
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    /// True for the comparison operators that can sit directly above a
    /// column reference in an indexable predicate.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_classification() {
        assert!(BinaryOperator::Eq.is_comparison());
        assert!(BinaryOperator::GtEq.is_comparison());
        assert!(!BinaryOperator::And.is_comparison());
        assert!(!BinaryOperator::Plus.is_comparison());
    }

    #[test]
    fn transaction_control_classification() {
        assert!(Statement::Begin.is_transaction_control());
        assert!(Statement::Commit.is_transaction_control());
        assert!(Statement::Rollback.is_transaction_control());
    }
}
