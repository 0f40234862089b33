//! Error taxonomy for the ledger core.
//!
//! Recoverable conditions are absorbed where they occur: an unknown
//! `order_no` on a status event is a benign miss (logged by the store), and
//! a malformed numeric field defaults to zero behind the normalizer's
//! anomaly counter. Transport failures live in `stream::StreamError` and
//! never reach the store. The variants below are the conditions that must
//! surface to callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// An order with this order_no already exists; the original is kept.
    #[error("duplicate order: {0}")]
    DuplicateOrder(String),

    /// Matching produced a state that the invariants forbid (e.g. a lot
    /// driven negative). The transaction is rolled back; this signals a
    /// data-integrity bug, not a recoverable condition.
    #[error("matching invariant violated: {0}")]
    MatchingInvariant(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
