//! API key authentication.
//!
//! Callers identify themselves with the `X-API-Key` header. The key is hashed
//! and resolved to an active user; unknown or deactivated keys are rejected.

mod extractor;

pub use extractor::{ApiKeyAuth, OptionalApiKeyAuth};
