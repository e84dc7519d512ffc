//! Domain models for the appraisal server.

pub mod analysis;
pub mod appraisal;
pub mod market_data;
pub mod user;

// Re-export commonly used types
pub use analysis::{
    ComparableItem, DEFAULT_CURRENCY, DetectedObject, Embeddings, ExtractedFeatures, ImageInput,
    Label, MarketAnalysis, MarketOptions, MarketTrends, PriceEstimate, PriceOptions, PriceRange,
    PricingBreakdown, VisionAnalysis,
};
pub use appraisal::{
    AppraisalListParams, AppraisalListResponse, AppraisalRequest, AppraisalResult,
    AppraisalStats, AppraisalStatus, AppraisalStatusResponse, ImageUpload, SubmissionResponse,
};
pub use market_data::{MarketDataItem, MarketDataListResponse, MarketDataQuery, NewMarketData};
pub use user::{AuthenticatedUser, UserSummary};
