//! # SQL Front-End
//!
//! Lexing, parsing, and catalog binding for the DML subset the index
//! advisor consumes. The implementation follows a zero-copy design:
//! tokens and AST nodes borrow from the original input string, and all
//! tree nodes live in a bump arena whose lifetime is one advisor run.
//!
//! ## Module Structure
//!
//! - `token`: token and keyword definitions
//! - `lexer`: zero-copy SQL tokenizer
//! - `ast`: arena-allocated statement and expression types
//! - `parser`: recursive descent parser with Pratt expressions
//! - `binder`: name resolution producing bound statement trees
//!
//! ## Pipeline
//!
//! ```text
//! SQL text → Lexer → Parser → Statement → Binder → BoundStatement
//! ```
//!
//! The advisor never touches raw AST nodes; everything downstream of the
//! binder works on [`binder::BoundStatement`] trees whose column
//! references carry `(db_id, table_id, column_id)` triples.

pub mod ast;
pub mod binder;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use binder::{
    Binder, BoundColumnRef, BoundExpr, BoundStatement, ColumnBinding, CompareOp, ConjunctionOp,
    StatementKind,
};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Keyword, Parameter, Span, Token};
