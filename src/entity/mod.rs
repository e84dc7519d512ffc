//! SeaORM entity definitions.

pub mod appraisal;
pub mod market_data;
pub mod user;
