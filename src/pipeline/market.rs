//! Market price stage: current quotes from the catalog plus a jittered
//! day-by-day forecast.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::PlannerError;
use crate::jitter::JitterSource;
use crate::reference::ReferenceData;
use crate::trace::ExecutionTrace;
use crate::types::{MarketAnalysis, MarketPrice};

// Tools: fetch_market_prices, predict_prices, confidence_for_horizon

/// Expected daily drift of the forecast and its half-width.
const DAILY_DRIFT: f64 = 1.01;
const DAILY_DRIFT_SPREAD: f64 = 0.01;
const VOLATILITY_SPREAD: f64 = 0.10;

/// Current prices for `crop` across every catalogued market.
pub fn fetch_market_prices(
    reference: &ReferenceData,
    crop: &str,
    as_of: DateTime<Utc>,
    trace: &mut ExecutionTrace,
) -> Vec<MarketPrice> {
    let prices: Vec<MarketPrice> = reference
        .market_quotes(crop)
        .into_iter()
        .map(|q| MarketPrice {
            market_id: q.market_id.clone(),
            market_name: q.market_name.clone(),
            crop: q.crop.clone(),
            price: q.price,
            date: as_of,
            volatility: q.volatility,
        })
        .collect();

    debug!("📈 {} current quotes for {}", prices.len(), crop);
    trace.record(
        "fetch_market_prices",
        json!({ "crop": crop, "result": prices.len() }),
    );
    prices
}

/// One forecast per (day, market), day-major. Each market's price and
/// volatility compound from the previous day's values.
pub fn predict_prices(
    current: &[MarketPrice],
    days: u32,
    as_of: DateTime<Utc>,
    jitter: &mut dyn JitterSource,
    trace: &mut ExecutionTrace,
) -> Vec<MarketPrice> {
    let mut predicted = Vec::with_capacity(current.len() * days as usize);
    let mut running: Vec<(f64, f64)> = current.iter().map(|p| (p.price, p.volatility)).collect();

    for day in 1..=days {
        let date = as_of + Duration::days(i64::from(day));
        for (base, (price, volatility)) in current.iter().zip(running.iter_mut()) {
            *price = (*price * jitter.factor(DAILY_DRIFT, DAILY_DRIFT_SPREAD)).round();
            *volatility *= jitter.factor(1.0, VOLATILITY_SPREAD);

            predicted.push(MarketPrice {
                market_id: base.market_id.clone(),
                market_name: base.market_name.clone(),
                crop: base.crop.clone(),
                price: *price,
                date,
                volatility: *volatility,
            });
        }
    }

    trace.record(
        "generate_predictions",
        json!({ "days": days, "result": predicted.len() }),
    );
    predicted
}

/// Forecast confidence shrinks linearly with the horizon.
pub fn confidence_for_horizon(days: u32) -> f64 {
    (0.85 - 0.02 * f64::from(days)).clamp(0.10, 0.99)
}

/// Market stage: fails when the catalog has nothing for the crop.
pub fn analyze_market(
    reference: &ReferenceData,
    crop: &str,
    days: u32,
    as_of: DateTime<Utc>,
    jitter: &mut dyn JitterSource,
    trace: &mut ExecutionTrace,
) -> Result<MarketAnalysis, PlannerError> {
    let current_prices = fetch_market_prices(reference, crop, as_of, trace);
    if current_prices.is_empty() {
        warn!("⚠️ No catalog entry for crop {}", crop);
        return Err(PlannerError::UnknownCrop(crop.to_string()));
    }

    let predicted_prices = predict_prices(&current_prices, days, as_of, jitter, trace);
    let confidence_score = confidence_for_horizon(days);

    info!(
        "📊 Market analysis for {}: {} markets, {} forecasts, confidence {:.2}",
        crop,
        current_prices.len(),
        predicted_prices.len(),
        confidence_score
    );

    Ok(MarketAnalysis {
        price_history: current_prices.clone(),
        current_prices,
        predicted_prices,
        confidence_score,
        last_updated: Utc::now(),
    })
}
