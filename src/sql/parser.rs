//! # SQL Parser - Arena-Allocated AST Builder
//!
//! Recursive descent parser producing an arena-allocated AST for the DML
//! subset the advisor consumes. Statement-level parsing is plain recursive
//! descent; expressions use Pratt parsing with binding powers.
//!
//! ```text
//! Input SQL → Lexer → Parser → AST (arena-allocated)
//! ```
//!
//! ## Expression Precedence
//!
//! | Precedence | Operators |
//! |------------|-----------|
//! | 1 (lowest) | OR |
//! | 2 | AND |
//! | 3 | NOT (prefix) |
//! | 4 | =, <>, <, >, <=, >=, IS, LIKE, IN, BETWEEN |
//! | 5 | +, - (binary) |
//! | 6 | *, /, % |
//! | 7 (highest) | - (unary) |
//!
//! ## Memory Management
//!
//! All AST nodes are allocated in the provided arena; identifiers and
//! literals are borrowed slices of the input. The arena is expected to
//! outlive the statement, which in the advisor's case means one run.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Keyword, Parameter, Token};
use bumpalo::Bump;
use eyre::{bail, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_select() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT 1", &arena);
        let stmt = parser.parse_statement().unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn parse_select_star_from_table() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT * FROM t WHERE a = 1;", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            assert_eq!(select.from.unwrap().name, "t");
            assert!(select.where_clause.is_some());
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_select_where_conjunction() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT * FROM t WHERE a = 1 AND b = 2", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            assert!(matches!(
                select.where_clause,
                Some(Expr::BinaryOp { op: BinaryOperator::And, .. })
            ));
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_select_group_order() {
        let arena = Bump::new();
        let mut parser =
            Parser::new("SELECT a FROM t GROUP BY a, b ORDER BY a DESC, b", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            assert_eq!(select.group_by.len(), 2);
            assert_eq!(select.order_by.len(), 2);
            assert!(!select.order_by[0].ascending);
            assert!(select.order_by[1].ascending);
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_insert_values() {
        let arena = Bump::new();
        let mut parser = Parser::new("INSERT INTO t (a, b) VALUES (1, 2), (3, 4)", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Insert(insert) = stmt {
            assert_eq!(insert.table.name, "t");
            assert_eq!(insert.columns.unwrap().len(), 2);
            assert!(matches!(insert.source, InsertSource::Values(rows) if rows.len() == 2));
        } else {
            panic!("Expected Insert statement");
        }
    }

    #[test]
    fn parse_insert_select() {
        let arena = Bump::new();
        let mut parser =
            Parser::new("INSERT INTO backup SELECT * FROM t WHERE a > 10", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Insert(insert) = stmt {
            assert!(matches!(insert.source, InsertSource::Select(_)));
        } else {
            panic!("Expected Insert statement");
        }
    }

    #[test]
    fn parse_update() {
        let arena = Bump::new();
        let mut parser = Parser::new("UPDATE t SET a = 1, b = b + 1 WHERE c = 3", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Update(update) = stmt {
            assert_eq!(update.table.name, "t");
            assert_eq!(update.assignments.len(), 2);
            assert!(update.where_clause.is_some());
        } else {
            panic!("Expected Update statement");
        }
    }

    #[test]
    fn parse_delete() {
        let arena = Bump::new();
        let mut parser = Parser::new("DELETE FROM t WHERE a <> 5", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Delete(delete) = stmt {
            assert_eq!(delete.table.name, "t");
            assert!(matches!(
                delete.where_clause,
                Some(Expr::BinaryOp { op: BinaryOperator::NotEq, .. })
            ));
        } else {
            panic!("Expected Delete statement");
        }
    }

    #[test]
    fn parse_transaction_control() {
        let arena = Bump::new();
        for (sql, expected) in [
            ("BEGIN;", Statement::Begin),
            ("COMMIT;", Statement::Commit),
            ("ROLLBACK", Statement::Rollback),
        ] {
            let mut parser = Parser::new(sql, &arena);
            assert_eq!(parser.parse_statement().unwrap(), expected);
        }
    }

    #[test]
    fn parse_like_and_in() {
        let arena = Bump::new();
        let mut parser = Parser::new(
            "SELECT * FROM t WHERE name LIKE 'a%' AND id IN (1, 2, 3)",
            &arena,
        );
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            if let Some(Expr::BinaryOp { left, op: BinaryOperator::And, right }) =
                select.where_clause
            {
                assert!(matches!(left, Expr::Like { negated: false, .. }));
                assert!(matches!(right, Expr::InList { list, .. } if list.len() == 3));
            } else {
                panic!("Expected AND at top of WHERE");
            }
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_not_like() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT * FROM t WHERE name NOT LIKE 'a%'", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            assert!(matches!(
                select.where_clause,
                Some(Expr::Like { negated: true, .. })
            ));
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_between_and_is_null() {
        let arena = Bump::new();
        let mut parser = Parser::new(
            "SELECT * FROM t WHERE a BETWEEN 1 AND 10 OR b IS NOT NULL",
            &arena,
        );
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            if let Some(Expr::BinaryOp { left, op: BinaryOperator::Or, right }) =
                select.where_clause
            {
                assert!(matches!(left, Expr::Between { negated: false, .. }));
                assert!(matches!(right, Expr::IsNull { negated: true, .. }));
            } else {
                panic!("Expected OR at top of WHERE");
            }
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_precedence_arithmetic_under_comparison() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT * FROM t WHERE a + 1 * 2 < 7", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            if let Some(Expr::BinaryOp { left, op: BinaryOperator::Lt, .. }) =
                select.where_clause
            {
                assert!(matches!(left, Expr::BinaryOp { op: BinaryOperator::Plus, .. }));
            } else {
                panic!("Expected < at top of WHERE");
            }
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_qualified_column() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT t.a FROM t", &arena);
        let stmt = parser.parse_statement().unwrap();
        if let Statement::Select(select) = stmt {
            if let SelectColumn::Expr { expr: Expr::Column(col), .. } = select.columns[0] {
                assert_eq!(col.table, Some("t"));
                assert_eq!(col.column, "a");
            } else {
                panic!("Expected qualified column");
            }
        } else {
            panic!("Expected Select statement");
        }
    }

    #[test]
    fn parse_rejects_ddl() {
        let arena = Bump::new();
        let mut parser = Parser::new("CREATE TABLE t (a INT)", &arena);
        assert!(parser.parse_statement().is_err());
    }

    #[test]
    fn parse_rejects_dangling_not() {
        let arena = Bump::new();
        let mut parser = Parser::new("SELECT * FROM t WHERE a NOT 1", &arena);
        assert!(parser.parse_statement().is_err());
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self { lexer, arena, current }
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current, Token::Eof)
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current
    }

    pub fn advance(&mut self) -> Token<'a> {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Token::Keyword(k) if *k == keyword)
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected keyword {:?}, found {:?} at line {} column {}",
                keyword,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    pub fn check_token(&self, expected: &Token<'_>) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(expected)
    }

    pub fn consume_token(&mut self, expected: &Token<'_>) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_token(&mut self, expected: &Token<'_>) -> Result<()> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            bail!(
                "expected {:?}, found {:?} at line {} column {}",
                expected,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    /// Parses one statement, consuming an optional trailing semicolon.
    pub fn parse_statement(&mut self) -> Result<Statement<'a>> {
        let stmt = match self.peek() {
            Token::Keyword(Keyword::Select) => {
                let select = self.parse_select()?;
                Statement::Select(self.arena.alloc(select))
            }
            Token::Keyword(Keyword::Insert) => {
                let insert = self.parse_insert()?;
                Statement::Insert(self.arena.alloc(insert))
            }
            Token::Keyword(Keyword::Update) => {
                let update = self.parse_update()?;
                Statement::Update(self.arena.alloc(update))
            }
            Token::Keyword(Keyword::Delete) => {
                let delete = self.parse_delete()?;
                Statement::Delete(self.arena.alloc(delete))
            }
            Token::Keyword(Keyword::Begin) => {
                self.advance();
                Statement::Begin
            }
            Token::Keyword(Keyword::Commit) => {
                self.advance();
                Statement::Commit
            }
            Token::Keyword(Keyword::Rollback) => {
                self.advance();
                Statement::Rollback
            }
            _ => bail!("unexpected token {:?} at start of statement", self.current),
        };

        self.consume_token(&Token::Semicolon);
        Ok(stmt)
    }

    fn parse_select(&mut self) -> Result<SelectStmt<'a>> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.consume_keyword(Keyword::Distinct) {
            Distinct::Distinct
        } else {
            self.consume_keyword(Keyword::All);
            Distinct::All
        };

        let columns = self.parse_select_columns()?;

        let from = if self.consume_keyword(Keyword::From) {
            Some(self.parse_table_ref()?)
        } else {
            None
        };

        let where_clause: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Where) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let group_by = if self.consume_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_expr_list()?
        } else {
            &[]
        };

        let having: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Having) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let order_by = if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            &[]
        };

        let limit: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Limit) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        let offset: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Offset) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        Ok(SelectStmt {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select_columns(&mut self) -> Result<&'a [SelectColumn<'a>]> {
        let mut columns = Vec::new();
        loop {
            if self.consume_token(&Token::Star) {
                columns.push(SelectColumn::AllColumns);
            } else {
                let expr = self.parse_expr(0)?;
                let alias = self.parse_optional_alias()?;
                columns.push(SelectColumn::Expr {
                    expr: self.arena.alloc(expr),
                    alias,
                });
            }

            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&columns))
    }

    fn parse_optional_alias(&mut self) -> Result<Option<&'a str>> {
        if self.consume_keyword(Keyword::As) {
            return Ok(Some(self.expect_ident()?));
        }
        match self.peek() {
            Token::Ident(name) => {
                let name = *name;
                self.advance();
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    fn parse_table_ref(&mut self) -> Result<TableRef<'a>> {
        let first = self.expect_ident()?;

        let (schema, name) = if self.consume_token(&Token::Dot) {
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };

        let alias = self.parse_optional_alias()?;

        Ok(TableRef { schema, name, alias })
    }

    fn parse_order_by_list(&mut self) -> Result<&'a [OrderByItem<'a>]> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr(0)?;
            let ascending = if self.consume_keyword(Keyword::Desc) {
                false
            } else {
                self.consume_keyword(Keyword::Asc);
                true
            };
            items.push(OrderByItem {
                expr: self.arena.alloc(expr),
                ascending,
            });

            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&items))
    }

    fn parse_expr_list(&mut self) -> Result<&'a [&'a Expr<'a>]> {
        let mut exprs: Vec<&Expr<'a>> = Vec::new();
        loop {
            exprs.push(self.arena.alloc(self.parse_expr(0)?));
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn expect_ident(&mut self) -> Result<&'a str> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            Token::QuotedIdent(s) => Ok(s),
            other => bail!("expected identifier, found {:?}", other),
        }
    }

    fn parse_insert(&mut self) -> Result<InsertStmt<'a>> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;

        let table = self.parse_table_ref()?;

        let columns = if self.consume_token(&Token::LParen) {
            let mut cols = Vec::new();
            loop {
                cols.push(self.expect_ident()?);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            self.expect_token(&Token::RParen)?;
            Some(&*self.arena.alloc_slice_copy(&cols))
        } else {
            None
        };

        let source = if self.consume_keyword(Keyword::Values) {
            let mut rows = Vec::new();
            loop {
                self.expect_token(&Token::LParen)?;
                let exprs = self.parse_expr_list()?;
                self.expect_token(&Token::RParen)?;
                rows.push(exprs);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
            InsertSource::Values(self.arena.alloc_slice_copy(&rows))
        } else if self.check_keyword(Keyword::Select) {
            let select = self.parse_select()?;
            InsertSource::Select(self.arena.alloc(select))
        } else {
            bail!("expected VALUES or SELECT after INSERT INTO");
        };

        Ok(InsertStmt { table, columns, source })
    }

    fn parse_update(&mut self) -> Result<UpdateStmt<'a>> {
        self.expect_keyword(Keyword::Update)?;

        let table = self.parse_table_ref()?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let first = self.expect_ident()?;
            let column = if self.consume_token(&Token::Dot) {
                ColumnRef {
                    table: Some(first),
                    column: self.expect_ident()?,
                }
            } else {
                ColumnRef { table: None, column: first }
            };
            self.expect_token(&Token::Eq)?;
            let value = self.parse_expr(0)?;
            assignments.push(Assignment {
                column,
                value: self.arena.alloc(value),
            });

            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        let where_clause: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Where) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        Ok(UpdateStmt {
            table,
            assignments: self.arena.alloc_slice_copy(&assignments),
            where_clause,
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt<'a>> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;

        let table = self.parse_table_ref()?;

        let where_clause: Option<&Expr<'a>> = if self.consume_keyword(Keyword::Where) {
            Some(self.arena.alloc(self.parse_expr(0)?))
        } else {
            None
        };

        Ok(DeleteStmt { table, where_clause })
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr<'a>> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek() {
                Token::Plus => Some((BinaryOperator::Plus, 10, 11)),
                Token::Minus => Some((BinaryOperator::Minus, 10, 11)),
                Token::Star => Some((BinaryOperator::Multiply, 12, 13)),
                Token::Slash => Some((BinaryOperator::Divide, 12, 13)),
                Token::Percent => Some((BinaryOperator::Modulo, 12, 13)),
                Token::Eq => Some((BinaryOperator::Eq, 6, 7)),
                Token::NotEq => Some((BinaryOperator::NotEq, 6, 7)),
                Token::Lt => Some((BinaryOperator::Lt, 6, 7)),
                Token::LtEq => Some((BinaryOperator::LtEq, 6, 7)),
                Token::Gt => Some((BinaryOperator::Gt, 6, 7)),
                Token::GtEq => Some((BinaryOperator::GtEq, 6, 7)),
                Token::Keyword(Keyword::And) => Some((BinaryOperator::And, 4, 5)),
                Token::Keyword(Keyword::Or) => Some((BinaryOperator::Or, 2, 3)),
                _ => None,
            };

            if let Some((op, l_bp, r_bp)) = op {
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                lhs = Expr::BinaryOp {
                    left: self.arena.alloc(lhs),
                    op,
                    right: self.arena.alloc(rhs),
                };
                continue;
            }

            if self.check_keyword(Keyword::Is) {
                if 6 < min_bp {
                    break;
                }
                self.advance();
                let negated = self.consume_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                lhs = Expr::IsNull {
                    expr: self.arena.alloc(lhs),
                    negated,
                };
                continue;
            }

            if matches!(
                self.peek(),
                Token::Keyword(Keyword::Not)
                    | Token::Keyword(Keyword::Like)
                    | Token::Keyword(Keyword::In)
                    | Token::Keyword(Keyword::Between)
            ) && 6 < min_bp
            {
                break;
            }

            let negated = self.consume_keyword(Keyword::Not);

            if self.check_keyword(Keyword::Like) {
                self.advance();
                let pattern = self.parse_expr(7)?;
                lhs = Expr::Like {
                    expr: self.arena.alloc(lhs),
                    negated,
                    pattern: self.arena.alloc(pattern),
                };
                continue;
            }

            if self.check_keyword(Keyword::In) {
                self.advance();
                self.expect_token(&Token::LParen)?;
                let list = self.parse_expr_list()?;
                self.expect_token(&Token::RParen)?;
                lhs = Expr::InList {
                    expr: self.arena.alloc(lhs),
                    negated,
                    list,
                };
                continue;
            }

            if self.check_keyword(Keyword::Between) {
                self.advance();
                let low = self.parse_expr(7)?;
                self.expect_keyword(Keyword::And)?;
                let high = self.parse_expr(7)?;
                lhs = Expr::Between {
                    expr: self.arena.alloc(lhs),
                    negated,
                    low: self.arena.alloc(low),
                    high: self.arena.alloc(high),
                };
                continue;
            }

            if negated {
                bail!("expected LIKE, IN, or BETWEEN after NOT");
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr<'a>> {
        match self.advance() {
            Token::Integer(text) => Ok(Expr::Literal(Literal::Integer(text))),
            Token::Float(text) => Ok(Expr::Literal(Literal::Float(text))),
            Token::String(text) => Ok(Expr::Literal(Literal::String(text))),
            Token::Keyword(Keyword::Null) => Ok(Expr::Literal(Literal::Null)),
            Token::Keyword(Keyword::True) => Ok(Expr::Literal(Literal::Boolean(true))),
            Token::Keyword(Keyword::False) => Ok(Expr::Literal(Literal::Boolean(false))),
            Token::Parameter(Parameter::Anonymous) => {
                Ok(Expr::Parameter(ParameterRef::Anonymous))
            }
            Token::Parameter(Parameter::Positional(n)) => {
                Ok(Expr::Parameter(ParameterRef::Positional(n)))
            }
            Token::Keyword(Keyword::Not) => {
                let operand = self.parse_expr(5)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: self.arena.alloc(operand),
                })
            }
            Token::Minus => {
                let operand = self.parse_expr(14)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: self.arena.alloc(operand),
                })
            }
            Token::Plus => {
                let operand = self.parse_expr(14)?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Plus,
                    expr: self.arena.alloc(operand),
                })
            }
            Token::Ident(first) | Token::QuotedIdent(first) => {
                if self.consume_token(&Token::Dot) {
                    let column = self.expect_ident()?;
                    Ok(Expr::Column(ColumnRef {
                        table: Some(first),
                        column,
                    }))
                } else {
                    Ok(Expr::Column(ColumnRef { table: None, column: first }))
                }
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect_token(&Token::RParen)?;
                Ok(inner)
            }
            other => bail!(
                "unexpected token {:?} in expression at line {} column {}",
                other,
                self.lexer.line(),
                self.lexer.column()
            ),
        }
    }
}
