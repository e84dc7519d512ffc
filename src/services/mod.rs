//! Business logic services.

pub mod analysis;
pub mod api_key;
pub mod appraisal;
pub mod pricing;
pub mod storage;

pub use analysis::{AnalysisBackends, build_backends};
pub use appraisal::AppraisalService;
pub use storage::{StorageBackend, UploadPolicy, build_storage};
