//! Sanity checks applied to every backend's output before it is persisted.
//!
//! A remote backend can return JSON that deserializes but still makes no
//! sense; such output is reported as [`AnalysisError::Malformed`].

use crate::models::{MarketAnalysis, PriceEstimate, PriceRange, VisionAnalysis};

use super::AnalysisError;

/// Output of an analysis stage that can be checked for plausibility.
pub trait StageOutput {
    fn check(&self) -> Result<(), AnalysisError>;
}

fn malformed(message: String) -> AnalysisError {
    AnalysisError::Malformed(message)
}

fn unit_interval(field: &str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(malformed(format!("{} {} is outside [0, 1]", field, value)))
    }
}

fn price(field: &str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(malformed(format!("{} {} is not a valid price", field, value)))
    }
}

fn range(range: &PriceRange) -> Result<(), AnalysisError> {
    price("price_range.min", range.min)?;
    price("price_range.max", range.max)?;
    if range.min > range.max {
        return Err(malformed(format!(
            "price range min {} exceeds max {}",
            range.min, range.max
        )));
    }
    Ok(())
}

impl StageOutput for VisionAnalysis {
    fn check(&self) -> Result<(), AnalysisError> {
        unit_interval("confidence_score", self.confidence_score)?;
        for object in &self.detected_objects {
            unit_interval("detected object confidence", object.confidence)?;
        }
        for label in &self.labels {
            unit_interval("label confidence", label.confidence)?;
        }
        if self.embeddings.feature_vector.iter().any(|v| !v.is_finite()) {
            return Err(malformed("embedding contains non-finite values".to_string()));
        }
        Ok(())
    }
}

impl StageOutput for MarketAnalysis {
    fn check(&self) -> Result<(), AnalysisError> {
        price("estimated_value", self.estimated_value)?;
        range(&self.price_range)?;
        unit_interval("confidence_score", self.confidence_score)?;
        for item in &self.comparable_items {
            price("comparable price", item.price)?;
            unit_interval("similarity_score", item.similarity_score)?;
        }
        Ok(())
    }
}

impl StageOutput for PriceEstimate {
    fn check(&self) -> Result<(), AnalysisError> {
        price("estimated_price", self.estimated_price)?;
        range(&self.price_range)?;
        unit_interval("confidence_score", self.confidence_score)?;
        if self.estimated_price < self.price_range.min || self.estimated_price > self.price_range.max
        {
            return Err(malformed(format!(
                "estimate {} lies outside [{}, {}]",
                self.estimated_price, self.price_range.min, self.price_range.max
            )));
        }
        Ok(())
    }
}
