//! # Query History
//!
//! The advisory table `pg_query_history(timestamp, fingerprint,
//! sql_text)` and the logger that feeds it. The advisor only ever reads
//! this table; sessions write to it through a [`QueryLogger`].
//!
//! ## Commit Visibility
//!
//! Statements executed inside an explicit transaction are buffered by
//! the logger and published to the table only when the transaction
//! commits; a rollback (or a transaction that never commits) publishes
//! nothing. Statements outside a transaction publish immediately. The
//! BEGIN/COMMIT markers themselves belong to their transaction and are
//! published with it.
//!
//! ## Timestamps
//!
//! Entries carry logical timestamps from a monotonic counter, assigned
//! at publication time. The periodic advisor tracks a high-water
//! timestamp and fetches only newer entries, so publication order is
//! exactly the order tuning observes.
//!
//! ## Fingerprints
//!
//! Each entry stores a CRC-32 fingerprint of the normalized statement
//! text (case folded, whitespace collapsed, literals blanked), so
//! equal-shaped statements share a fingerprint regardless of their
//! constants.

use crate::sql::{Keyword, Lexer, Token};
use crc::{Crc, CRC_32_ISO_HDLC};
use parking_lot::Mutex;

/// Name of the advisory table as exposed through the system catalog.
pub const QUERY_HISTORY_TABLE: &str = "pg_query_history";

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// One row of `pg_query_history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub timestamp: u64,
    pub fingerprint: String,
    pub sql_text: String,
}

/// Fingerprint of a statement: CRC-32 over its normalized text.
pub fn fingerprint(sql: &str) -> String {
    format!("{:08x}", CRC32.checksum(normalize_for_fingerprint(sql).as_bytes()))
}

/// Case folds, collapses whitespace, and blanks string and numeric
/// literals so statements differing only in constants coincide.
fn normalize_for_fingerprint(sql: &str) -> String {
    let mut normalized = String::with_capacity(sql.len());
    let mut lexer = Lexer::new(sql);

    loop {
        let token = lexer.next_token();
        match token {
            Token::Eof => break,
            Token::String(_) | Token::Integer(_) | Token::Float(_) => normalized.push('?'),
            Token::Keyword(kw) => normalized.push_str(kw.as_str()),
            Token::Ident(ident) | Token::QuotedIdent(ident) => {
                normalized.push_str(&ident.to_ascii_lowercase())
            }
            other => normalized.push_str(token_text(&other)),
        }
        normalized.push(' ');
    }

    normalized.truncate(normalized.trim_end().len());
    normalized
}

fn token_text(token: &Token<'_>) -> &'static str {
    match token {
        Token::Eq => "=",
        Token::NotEq => "<>",
        Token::Lt => "<",
        Token::LtEq => "<=",
        Token::Gt => ">",
        Token::GtEq => ">=",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::Comma => ",",
        Token::Semicolon => ";",
        Token::Dot => ".",
        Token::Parameter(_) => "?",
        _ => "",
    }
}

#[derive(Debug, Default)]
struct HistoryInner {
    rows: Vec<QueryRecord>,
    next_timestamp: u64,
}

/// The shared in-memory advisory table. Sessions publish through
/// [`QueryLogger`]; the advisor reads with [`QueryHistory::queries_after`].
#[derive(Debug, Default)]
pub struct QueryHistory {
    inner: Mutex<HistoryInner>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries with a timestamp strictly greater than `timestamp`, in
    /// publication order.
    pub fn queries_after(&self, timestamp: u64) -> Vec<QueryRecord> {
        let inner = self.inner.lock();
        inner
            .rows
            .iter()
            .filter(|row| row.timestamp > timestamp)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().rows.is_empty()
    }

    /// Timestamp of the newest entry; 0 when the table is empty.
    pub fn latest_timestamp(&self) -> u64 {
        self.inner.lock().next_timestamp
    }

    fn publish(&self, statements: impl IntoIterator<Item = String>) {
        let mut inner = self.inner.lock();
        for sql in statements {
            inner.next_timestamp += 1;
            let record = QueryRecord {
                timestamp: inner.next_timestamp,
                fingerprint: fingerprint(&sql),
                sql_text: sql,
            };
            inner.rows.push(record);
        }
    }
}

/// Per-session logger buffering statements until their transaction
/// commits.
pub struct QueryLogger<'h> {
    history: &'h QueryHistory,
    pending: Vec<String>,
    in_transaction: bool,
}

impl<'h> QueryLogger<'h> {
    pub fn new(history: &'h QueryHistory) -> Self {
        Self {
            history,
            pending: Vec::new(),
            in_transaction: false,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Records one executed statement. Autocommit statements publish
    /// immediately; transactional statements publish on COMMIT and are
    /// discarded on ROLLBACK.
    pub fn log_statement(&mut self, sql: &str) {
        match leading_keyword(sql) {
            Some(Keyword::Begin) if !self.in_transaction => {
                self.in_transaction = true;
                self.pending.push(sql.to_string());
            }
            Some(Keyword::Commit) if self.in_transaction => {
                self.pending.push(sql.to_string());
                self.history.publish(self.pending.drain(..));
                self.in_transaction = false;
            }
            Some(Keyword::Rollback) if self.in_transaction => {
                self.pending.clear();
                self.in_transaction = false;
            }
            _ => {
                if self.in_transaction {
                    self.pending.push(sql.to_string());
                } else {
                    self.history.publish(std::iter::once(sql.to_string()));
                }
            }
        }
    }
}

fn leading_keyword(sql: &str) -> Option<Keyword> {
    match Lexer::new(sql).next_token() {
        Token::Keyword(kw) => Some(kw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autocommit_statements_publish_immediately() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);

        logger.log_statement("INSERT INTO test VALUES (1)");
        assert_eq!(history.len(), 1);
        assert_eq!(history.queries_after(0)[0].sql_text, "INSERT INTO test VALUES (1)");
    }

    #[test]
    fn transactional_statements_wait_for_commit() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);

        logger.log_statement("BEGIN;");
        logger.log_statement("INSERT INTO test VALUES (1);");
        assert!(history.is_empty(), "uncommitted work SHOULD NOT be visible");

        logger.log_statement("COMMIT;");
        let rows = history.queries_after(0);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sql_text, "BEGIN;");
        assert_eq!(rows[2].sql_text, "COMMIT;");
    }

    #[test]
    fn rollback_discards_the_buffer() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);

        logger.log_statement("BEGIN;");
        logger.log_statement("INSERT INTO test VALUES (1);");
        logger.log_statement("ROLLBACK;");
        assert!(history.is_empty());
        assert!(!logger.in_transaction());

        logger.log_statement("INSERT INTO test VALUES (2);");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn timestamps_increase_in_publication_order() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);

        logger.log_statement("SELECT 1");
        logger.log_statement("SELECT 2");
        let rows = history.queries_after(0);
        assert!(rows[0].timestamp < rows[1].timestamp);
        assert_eq!(history.latest_timestamp(), rows[1].timestamp);
    }

    #[test]
    fn queries_after_filters_strictly() {
        let history = QueryHistory::new();
        let mut logger = QueryLogger::new(&history);

        logger.log_statement("SELECT 1");
        logger.log_statement("SELECT 2");
        let cutoff = history.queries_after(0)[0].timestamp;
        let newer = history.queries_after(cutoff);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].sql_text, "SELECT 2");
    }

    #[test]
    fn fingerprint_ignores_constants_and_case() {
        assert_eq!(
            fingerprint("SELECT * FROM t WHERE a = 1"),
            fingerprint("select * from T where A = 42")
        );
        assert_ne!(
            fingerprint("SELECT * FROM t WHERE a = 1"),
            fingerprint("SELECT * FROM t WHERE b = 1")
        );
    }

    #[test]
    fn fingerprint_blanks_string_literals() {
        assert_eq!(
            fingerprint("SELECT * FROM t WHERE name LIKE 'a%'"),
            fingerprint("SELECT * FROM t WHERE name LIKE 'b%'")
        );
    }
}
