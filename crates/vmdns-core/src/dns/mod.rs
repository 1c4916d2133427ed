//! DNS reconciliation
//!
//! ```text
//! DnsStateResolver ── zone, provider view, local view ──┐
//!                                                       ▼
//!                                               decide() (pure)
//!                                                       │
//!                                                       ▼
//!                                   RecordUpserter::apply(decision)
//! ```

pub mod decision;
pub mod resolver;
pub mod upsert;

pub use decision::{ReconciliationDecision, decide};
pub use resolver::DnsStateResolver;
pub use upsert::{RecordUpserter, UpsertOutcome};
