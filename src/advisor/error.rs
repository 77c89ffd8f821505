//! Typed error kinds for the advisor.
//!
//! The crate's error currency is `eyre::Result`; these variants ride
//! inside the report so callers can classify a failure without string
//! matching. Classification drives the recovery policy: statement-local
//! kinds skip one query, fatal kinds abort the run.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisorError {
    /// The binder left a column reference without a catalog binding.
    #[error("column '{0}' is not bound to a catalog column")]
    UnboundColumn(String),

    /// A predicate shape outside the accepted comparison/conjunction set.
    #[error("unsupported expression in indexable position: {0}")]
    UnsupportedExpression(&'static str),

    /// The transaction could not be started or a catalog read failed.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The what-if service produced no plan for a statement.
    #[error("optimizer returned no plan")]
    OptimizerFailure,

    /// A create/drop index command failed.
    #[error("index rpc failed: {0}")]
    RpcFailure(String),

    /// The run was cancelled; no recommendation is produced.
    #[error("advisor run cancelled")]
    Cancelled,
}

impl AdvisorError {
    /// Errors that skip a single statement rather than the whole run.
    pub fn is_statement_local(&self) -> bool {
        matches!(
            self,
            AdvisorError::UnboundColumn(_) | AdvisorError::UnsupportedExpression(_)
        )
    }

    /// Pulls the typed kind back out of an eyre report, if present.
    pub fn classify(report: &eyre::Report) -> Option<&AdvisorError> {
        report.downcast_ref::<AdvisorError>()
    }

    pub fn is_cancelled(report: &eyre::Report) -> bool {
        matches!(Self::classify(report), Some(AdvisorError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;

    #[test]
    fn classification_survives_eyre_round_trip() {
        let report = eyre!(AdvisorError::UnboundColumn("a".to_string()));
        let kind = AdvisorError::classify(&report).expect("kind SHOULD survive wrapping");
        assert!(kind.is_statement_local());
        assert!(!AdvisorError::is_cancelled(&report));
    }

    #[test]
    fn cancelled_is_not_statement_local() {
        let report = eyre!(AdvisorError::Cancelled);
        assert!(AdvisorError::is_cancelled(&report));
        assert!(!AdvisorError::classify(&report).unwrap().is_statement_local());
    }
}
