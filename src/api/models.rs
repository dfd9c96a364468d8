use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::persistence::RecommendationHistoryRecord;
use crate::pipeline::AgentMetadata;
use crate::trace::ExecutionTrace;
use crate::types::{
    CropDetails, FarmLocation, LogisticsPlan, MarketAnalysis, Preferences, Recommendation,
    RiskTolerance, StorageAnalysis, StorageReading, UserContext,
};

// Request bodies are snake_case; the short field names are accepted too.

#[derive(Debug, Clone, Deserialize)]
pub struct CropRequest {
    #[serde(rename = "type")]
    pub crop_type: String,
    #[serde(alias = "quantity")]
    pub quantity_kg: f64,
    pub harvest_date: String,
    #[serde(default)]
    pub current_storage: Option<StorageReading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FarmLocationRequest {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
    #[serde(default)]
    pub preferred_markets: Vec<String>,
    #[serde(alias = "storage_capacity")]
    pub storage_capacity_kg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub crop: CropRequest,
    pub farm_location: FarmLocationRequest,
    pub preferences: PreferencesRequest,
}

impl RecommendationRequest {
    pub fn into_context(self) -> Result<UserContext, PlannerError> {
        UserContext::new(
            FarmLocation {
                latitude: self.farm_location.lat,
                longitude: self.farm_location.lon,
                address: self.farm_location.address,
            },
            CropDetails {
                crop_type: self.crop.crop_type,
                quantity: self.crop.quantity_kg,
                harvest_date: self.crop.harvest_date,
                current_storage: self.crop.current_storage.unwrap_or_default(),
            },
            Preferences {
                risk_tolerance: self.preferences.risk_tolerance,
                preferred_markets: self.preferences.preferred_markets,
                storage_capacity: self.preferences.storage_capacity_kg,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutputs {
    pub market: MarketAnalysis,
    pub logistics: LogisticsPlan,
    pub storage: StorageAnalysis,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub data: Recommendation,
    pub analysis: StageOutputs,
    pub metadata: AgentMetadata,
    pub trace: ExecutionTrace,
}

#[derive(Debug, Serialize)]
pub struct ContextsResponse {
    pub contexts: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub recommendations: Vec<RecommendationHistoryRecord>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}
