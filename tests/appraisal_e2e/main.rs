//! Appraisal API E2E test suite.
//!
//! Drives the HTTP API against an in-memory SQLite database, a temporary
//! local storage directory and the deterministic mock analysis backends.
//!
//! Run with: cargo test --test appraisal_e2e

mod test_helpers;

mod test_appraisal_cancel;
mod test_appraisal_create;
mod test_appraisal_failures;
mod test_appraisal_history;
mod test_appraisal_submit;
mod test_market_data;
