//! # SQL Token Definitions
//!
//! Token, keyword, and span types shared by the lexer and parser. Keywords
//! are matched through a compile-time perfect hash map, so lookup is O(1)
//! with no collisions regardless of keyword count.
//!
//! The token set covers the DML subset the advisor consumes (SELECT,
//! INSERT, UPDATE, DELETE) plus the transaction-control markers that show
//! up in replayed query history (BEGIN, COMMIT, ROLLBACK).

use phf::phf_map;

/// Byte range of a token within the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Anonymous,
    Positional(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    QuotedIdent(&'a str),
    Integer(&'a str),
    Float(&'a str),
    String(&'a str),
    Parameter(Parameter),
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Error(&'static str),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Select,
    Insert,
    Update,
    Delete,
    From,
    Where,
    Group,
    Order,
    By,
    Having,
    And,
    Or,
    Not,
    Like,
    In,
    Between,
    Is,
    Null,
    True,
    False,
    Values,
    Into,
    Set,
    As,
    Asc,
    Desc,
    Limit,
    Offset,
    Distinct,
    All,
    Begin,
    Commit,
    Rollback,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Insert => "INSERT",
            Keyword::Update => "UPDATE",
            Keyword::Delete => "DELETE",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Group => "GROUP",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Having => "HAVING",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Like => "LIKE",
            Keyword::In => "IN",
            Keyword::Between => "BETWEEN",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Values => "VALUES",
            Keyword::Into => "INTO",
            Keyword::Set => "SET",
            Keyword::As => "AS",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::Distinct => "DISTINCT",
            Keyword::All => "ALL",
            Keyword::Begin => "BEGIN",
            Keyword::Commit => "COMMIT",
            Keyword::Rollback => "ROLLBACK",
        }
    }
}

pub static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "SELECT" => Keyword::Select,
    "INSERT" => Keyword::Insert,
    "UPDATE" => Keyword::Update,
    "DELETE" => Keyword::Delete,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "GROUP" => Keyword::Group,
    "ORDER" => Keyword::Order,
    "BY" => Keyword::By,
    "HAVING" => Keyword::Having,
    "AND" => Keyword::And,
    "OR" => Keyword::Or,
    "NOT" => Keyword::Not,
    "LIKE" => Keyword::Like,
    "IN" => Keyword::In,
    "BETWEEN" => Keyword::Between,
    "IS" => Keyword::Is,
    "NULL" => Keyword::Null,
    "TRUE" => Keyword::True,
    "FALSE" => Keyword::False,
    "VALUES" => Keyword::Values,
    "INTO" => Keyword::Into,
    "SET" => Keyword::Set,
    "AS" => Keyword::As,
    "ASC" => Keyword::Asc,
    "DESC" => Keyword::Desc,
    "LIMIT" => Keyword::Limit,
    "OFFSET" => Keyword::Offset,
    "DISTINCT" => Keyword::Distinct,
    "ALL" => Keyword::All,
    "BEGIN" => Keyword::Begin,
    "COMMIT" => Keyword::Commit,
    "ROLLBACK" => Keyword::Rollback,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_is_uppercase_keyed() {
        assert_eq!(KEYWORDS.get("SELECT"), Some(&Keyword::Select));
        assert_eq!(KEYWORDS.get("select"), None);
    }

    #[test]
    fn keyword_as_str_round_trips_through_table() {
        for (text, kw) in KEYWORDS.entries() {
            assert_eq!(*text, kw.as_str());
        }
    }
}
