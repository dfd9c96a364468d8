//! Static lookup tables behind the three analysis stages.
//!
//! The tables stand in for the market-data feed, the mapping service and the
//! storage research the planner would consult in production. They are loaded
//! once at start-up and shared read-only between requests.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::types::VehicleType;

pub const FALLBACK_LOSS_RATE: f64 = 1.0;
pub const FALLBACK_SHELF_LIFE_DAYS: u32 = 90;
pub const FALLBACK_TRANSPORT_RATE: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub crop: String,
    pub market_id: String,
    pub market_name: String,
    pub price: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownDistance {
    pub from: String,
    pub to: String,
    pub km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRate {
    pub vehicle: VehicleType,
    /// Currency units per km per ton
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadCondition {
    pub name: String,
    pub speed_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageProfile {
    pub crop: String,
    /// Percent of value lost per day under ideal conditions
    pub daily_loss_rate: f64,
    pub shelf_life_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub currency_symbol: String,
    pub market_quotes: Vec<MarketQuote>,
    pub distances: Vec<KnownDistance>,
    pub transport_rates: Vec<TransportRate>,
    pub road_conditions: Vec<RoadCondition>,
    pub storage_profiles: Vec<StorageProfile>,
}

impl ReferenceData {
    /// Built-in tables, optionally overridden by a TOML file.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            info!("📚 Using built-in reference data");
            return Ok(Self::default());
        };

        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(path)))
            .build()
            .with_context(|| format!("reading reference data from {}", path))?;
        let data: ReferenceData = settings
            .try_deserialize()
            .with_context(|| format!("parsing reference data in {}", path))?;
        data.validate()?;

        info!(
            "📚 Loaded reference data from {} ({} market quotes, {} storage profiles)",
            path,
            data.market_quotes.len(),
            data.storage_profiles.len()
        );
        Ok(data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.road_conditions.is_empty() {
            bail!("reference data needs at least one road condition");
        }
        if let Some(road) = self.road_conditions.iter().find(|r| r.speed_factor <= 0.0) {
            bail!("road condition {} has non-positive speed factor", road.name);
        }
        if let Some(q) = self.market_quotes.iter().find(|q| q.price <= 0.0) {
            bail!("market quote {} / {} has non-positive price", q.crop, q.market_id);
        }
        Ok(())
    }

    /// Catalog entries for a crop, in catalog order. Empty for unknown crops.
    pub fn market_quotes(&self, crop: &str) -> Vec<&MarketQuote> {
        let crop = crop.to_lowercase();
        self.market_quotes
            .iter()
            .filter(|q| q.crop.to_lowercase() == crop)
            .collect()
    }

    /// Distance for a known `from-to` pair. The key is case-insensitive but
    /// direction matters.
    pub fn known_distance(&self, from: &str, to: &str) -> Option<f64> {
        let key = route_key(from, to);
        let hit = self
            .distances
            .iter()
            .find(|d| route_key(&d.from, &d.to) == key)
            .map(|d| d.km);
        debug!("distance lookup {} -> {:?}", key, hit);
        hit
    }

    pub fn transport_rate(&self, vehicle: VehicleType) -> f64 {
        self.transport_rates
            .iter()
            .find(|r| r.vehicle == vehicle)
            .map(|r| r.rate)
            .unwrap_or(FALLBACK_TRANSPORT_RATE)
    }

    pub fn storage_profile(&self, crop: &str) -> Option<&StorageProfile> {
        let crop = crop.to_lowercase();
        self.storage_profiles
            .iter()
            .find(|p| p.crop.to_lowercase() == crop)
    }

    pub fn daily_loss_rate(&self, crop: &str) -> f64 {
        self.storage_profile(crop)
            .map(|p| p.daily_loss_rate)
            .unwrap_or(FALLBACK_LOSS_RATE)
    }

    pub fn shelf_life_days(&self, crop: &str) -> u32 {
        self.storage_profile(crop)
            .map(|p| p.shelf_life_days)
            .unwrap_or(FALLBACK_SHELF_LIFE_DAYS)
    }
}

fn route_key(from: &str, to: &str) -> String {
    format!("{}-{}", from.to_lowercase(), to.to_lowercase())
}

fn quote(
    crop: &str,
    market_id: &str,
    market_name: &str,
    price: f64,
    volatility: f64,
) -> MarketQuote {
    MarketQuote {
        crop: crop.into(),
        market_id: market_id.into(),
        market_name: market_name.into(),
        price,
        volatility,
    }
}

fn distance(from: &str, to: &str, km: f64) -> KnownDistance {
    KnownDistance {
        from: from.into(),
        to: to.into(),
        km,
    }
}

fn profile(crop: &str, daily_loss_rate: f64, shelf_life_days: u32) -> StorageProfile {
    StorageProfile {
        crop: crop.into(),
        daily_loss_rate,
        shelf_life_days,
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            market_quotes: vec![
                quote("wheat", "m1", "Azadpur Mandi", 2350.0, 2.5),
                quote("wheat", "m2", "Vashi APMC", 2280.0, 1.8),
                quote("wheat", "m3", "Koyambedu", 2400.0, 3.2),
                quote("rice", "m1", "Azadpur Mandi", 2800.0, 2.8),
                quote("rice", "m2", "Vashi APMC", 2750.0, 2.1),
                quote("tomato", "m1", "Azadpur Mandi", 1800.0, 5.2),
                quote("onion", "m1", "Azadpur Mandi", 1500.0, 4.1),
                quote("potato", "m1", "Azadpur Mandi", 1200.0, 2.3),
                quote("soybean", "m1", "Azadpur Mandi", 4500.0, 3.5),
            ],
            distances: vec![
                distance("delhi", "mumbai", 1400.0),
                distance("delhi", "bangalore", 2150.0),
                distance("mumbai", "bangalore", 1000.0),
                distance("delhi", "chandigarh", 250.0),
                distance("mumbai", "pune", 150.0),
            ],
            transport_rates: vec![
                TransportRate {
                    vehicle: VehicleType::Truck,
                    rate: 1.2,
                },
                TransportRate {
                    vehicle: VehicleType::Tractor,
                    rate: 1.0,
                },
                TransportRate {
                    vehicle: VehicleType::Pickup,
                    rate: 1.5,
                },
            ],
            road_conditions: vec![
                RoadCondition {
                    name: "highway".into(),
                    speed_factor: 1.0,
                },
                RoadCondition {
                    name: "state_road".into(),
                    speed_factor: 0.8,
                },
                RoadCondition {
                    name: "village_road".into(),
                    speed_factor: 0.5,
                },
            ],
            storage_profiles: vec![
                profile("wheat", 0.5, 180),
                profile("rice", 0.8, 210),
                profile("corn", 0.6, 150),
                profile("soybean", 0.7, 120),
                profile("tomato", 3.5, 14),
                profile("onion", 0.8, 60),
                profile("potato", 0.5, 90),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_are_case_insensitive() {
        let data = ReferenceData::default();
        assert_eq!(data.market_quotes("WHEAT").len(), 3);
        assert!(data.market_quotes("banana").is_empty());
        assert_eq!(data.known_distance("Delhi", "MUMBAI"), Some(1400.0));
    }

    #[test]
    fn test_distance_key_is_order_sensitive() {
        let data = ReferenceData::default();
        assert_eq!(data.known_distance("mumbai", "pune"), Some(150.0));
        assert_eq!(data.known_distance("pune", "mumbai"), None);
    }

    #[test]
    fn test_storage_fallbacks() {
        let data = ReferenceData::default();
        assert_eq!(data.daily_loss_rate("tomato"), 3.5);
        assert_eq!(data.daily_loss_rate("dragonfruit"), FALLBACK_LOSS_RATE);
        assert_eq!(data.shelf_life_days("dragonfruit"), FALLBACK_SHELF_LIFE_DAYS);
        assert_eq!(data.transport_rate(VehicleType::Pickup), 1.5);
    }

    #[test]
    fn test_load_bundled_file_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/reference_data.toml");
        let loaded = ReferenceData::load(Some(path)).expect("bundled reference data loads");
        let builtin = ReferenceData::default();

        assert_eq!(loaded.market_quotes.len(), builtin.market_quotes.len());
        assert_eq!(loaded.known_distance("delhi", "chandigarh"), Some(250.0));
        assert_eq!(loaded.transport_rate(VehicleType::Truck), 1.2);
        assert_eq!(loaded.shelf_life_days("rice"), 210);
        assert_eq!(loaded.road_conditions.len(), 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ReferenceData::load(Some("/definitely/not/here.toml")).is_err());
    }
}
