//! Append-only history of farm contexts and the recommendations made for them.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Recommendation, RecommendationType, RiskTolerance, UserContext};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const RECENT_CONTEXTS_LIMIT: usize = 10;
pub const RECENT_RECOMMENDATIONS_LIMIT: usize = 20;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row written before the pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFarmContext {
    pub user_id: String,
    pub crop_type: String,
    pub quantity: f64,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub storage_capacity: f64,
    pub risk_tolerance: RiskTolerance,
    pub preferred_markets: Vec<String>,
    /// Full context as submitted, camelCase.
    pub context: serde_json::Value,
}

impl NewFarmContext {
    pub fn from_context(user_id: &str, context: &UserContext) -> StoreResult<Self> {
        let location = context.farm_location();
        let crop = context.crop_details();
        let preferences = context.preferences();
        Ok(Self {
            user_id: user_id.to_string(),
            crop_type: crop.crop_type.clone(),
            quantity: crop.quantity,
            address: location.address.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            storage_capacity: preferences.storage_capacity,
            risk_tolerance: preferences.risk_tolerance,
            preferred_markets: preferences.preferred_markets.clone(),
            context: serde_json::to_value(context)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmContextRecord {
    pub id: i64,
    pub user_id: String,
    pub crop_type: String,
    pub quantity: f64,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationHistoryRecord {
    pub id: i64,
    pub farm_context_id: i64,
    pub recommendation_type: RecommendationType,
    pub target_market: String,
    pub expected_revenue: f64,
    pub net_profit: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub risks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the generated context id.
    async fn save_context(&self, context: NewFarmContext) -> StoreResult<i64>;

    async fn save_recommendation(
        &self,
        farm_context_id: i64,
        recommendation: &Recommendation,
    ) -> StoreResult<i64>;

    /// Newest first.
    async fn recent_contexts(&self, user_id: &str, limit: usize)
        -> StoreResult<Vec<FarmContextRecord>>;

    /// Newest first, across every context the user has saved.
    async fn recent_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationHistoryRecord>>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::types::{CropDetails, FarmLocation, Preferences, StorageReading};

    pub fn context(crop: &str) -> UserContext {
        UserContext::new(
            FarmLocation {
                latitude: 19.07,
                longitude: 72.87,
                address: "Mumbai".into(),
            },
            CropDetails {
                crop_type: crop.into(),
                quantity: 750.0,
                harvest_date: "2024-02-10".into(),
                current_storage: StorageReading {
                    temperature: Some(22.0),
                    humidity: None,
                },
            },
            Preferences {
                risk_tolerance: RiskTolerance::Low,
                preferred_markets: vec!["Vashi APMC".into()],
                storage_capacity: 1000.0,
            },
        )
        .unwrap()
    }

    pub fn recommendation(market: &str) -> Recommendation {
        Recommendation {
            recommendation_type: RecommendationType::Store,
            target_market: market.into(),
            best_time_to_sell: Utc::now(),
            expected_revenue: 1200.0,
            net_profit: 150.5,
            confidence: 0.64,
            reasoning: vec!["prices rising".into()],
            risks: vec!["weather".into()],
        }
    }
}
