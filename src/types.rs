use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlannerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Conditions the crop is currently stored under. Either reading may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropDetails {
    #[serde(rename = "type")]
    pub crop_type: String,
    /// Quantity in kg
    pub quantity: f64,
    pub harvest_date: String,
    #[serde(default)]
    pub current_storage: StorageReading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub risk_tolerance: RiskTolerance,
    pub preferred_markets: Vec<String>,
    /// Storage capacity in kg
    pub storage_capacity: f64,
}

/// Everything the pipeline knows about one farmer's request.
///
/// Built once per request through [`UserContext::new`], which enforces the
/// positive-quantity invariant; the pipeline only ever borrows it.
/// Deserializing goes through the same checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UserContextParts")]
pub struct UserContext {
    farm_location: FarmLocation,
    crop_details: CropDetails,
    preferences: Preferences,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserContextParts {
    farm_location: FarmLocation,
    crop_details: CropDetails,
    preferences: Preferences,
}

impl TryFrom<UserContextParts> for UserContext {
    type Error = PlannerError;

    fn try_from(parts: UserContextParts) -> Result<Self, Self::Error> {
        UserContext::new(parts.farm_location, parts.crop_details, parts.preferences)
    }
}

impl UserContext {
    pub fn new(
        farm_location: FarmLocation,
        crop_details: CropDetails,
        preferences: Preferences,
    ) -> Result<Self, PlannerError> {
        if crop_details.crop_type.trim().is_empty() {
            return Err(PlannerError::InvalidContext("crop type is required".into()));
        }
        if !(crop_details.quantity > 0.0) {
            return Err(PlannerError::InvalidQuantity(crop_details.quantity));
        }
        if !(-90.0..=90.0).contains(&farm_location.latitude) {
            return Err(PlannerError::InvalidContext(format!(
                "latitude {} out of range",
                farm_location.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&farm_location.longitude) {
            return Err(PlannerError::InvalidContext(format!(
                "longitude {} out of range",
                farm_location.longitude
            )));
        }
        if preferences.storage_capacity < 0.0 {
            return Err(PlannerError::InvalidContext(
                "storage capacity cannot be negative".into(),
            ));
        }

        Ok(Self {
            farm_location,
            crop_details,
            preferences,
        })
    }

    pub fn farm_location(&self) -> &FarmLocation {
        &self.farm_location
    }

    pub fn crop_details(&self) -> &CropDetails {
        &self.crop_details
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}

// Market types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub market_id: String,
    pub market_name: String,
    pub crop: String,
    /// Price per kg
    pub price: f64,
    pub date: DateTime<Utc>,
    /// Price volatility percentage
    pub volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub current_prices: Vec<MarketPrice>,
    pub price_history: Vec<MarketPrice>,
    pub predicted_prices: Vec<MarketPrice>,
    pub confidence_score: f64,
    pub last_updated: DateTime<Utc>,
}

// Logistics types

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Truck,
    Tractor,
    Pickup,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Truck => "truck",
            VehicleType::Tractor => "tractor",
            VehicleType::Pickup => "pickup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetails {
    pub waypoints: Vec<String>,
    pub road_conditions: Vec<String>,
    pub tolls: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub from: String,
    pub to: String,
    /// Distance in km
    pub distance: f64,
    /// Travel time in hours
    pub estimated_time: f64,
    pub transport_cost: f64,
    pub route_details: RouteDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRequirements {
    pub vehicle_type: VehicleType,
    pub capacity_tons: f64,
    pub special_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsPlan {
    pub routes: Vec<Route>,
    pub total_cost: f64,
    pub estimated_arrival: DateTime<Utc>,
    pub transport_requirements: TransportRequirements,
}

// Storage types

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePoint {
    pub day: u32,
    /// Percentage of the initial value still present
    pub remaining_value: f64,
    /// Absolute loss in the same unit as the initial value
    pub cumulative_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub shelf_life_days: u32,
    pub daily_loss_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAnalysis {
    pub current_storage: StorageConditions,
    pub projected_losses: Vec<StoragePoint>,
    pub max_storage_days: u32,
}

// Recommendation types

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    SellNow,
    Store,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::SellNow => "sell_now",
            RecommendationType::Store => "store",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub recommendation_type: RecommendationType,
    pub target_market: String,
    pub best_time_to_sell: DateTime<Utc>,
    pub expected_revenue: f64,
    pub net_profit: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub risks: Vec<String>,
}
