//! Decision rule turning the three stage outputs into one recommendation.
//!
//! Storing wins when the projected price gain, discounted 10% for forecast
//! uncertainty, is worth more than the shrinkage lost over the horizon:
//!
//! ```text
//! (best_future - current) × quantity × 0.9  >  loss_at_horizon × current
//! ```

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::trace::ExecutionTrace;
use crate::types::{
    LogisticsPlan, MarketAnalysis, MarketPrice, Recommendation, RecommendationType,
    StorageAnalysis,
};

const UNCERTAINTY_DISCOUNT: f64 = 0.9;
const STORE_CONFIDENCE_FACTOR: f64 = 0.9;
const SELL_NOW_CONFIDENCE: f64 = 0.95;

/// Everything the decision needs, borrowed from the stage outputs.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub market: &'a MarketAnalysis,
    pub logistics: &'a LogisticsPlan,
    pub storage: &'a StorageAnalysis,
    pub quantity_kg: f64,
    pub horizon_days: u32,
    pub currency_symbol: &'a str,
}

/// Pure threshold comparison; no randomness.
pub fn decide(
    current_price: f64,
    best_future_price: f64,
    quantity_kg: f64,
    storage_loss: f64,
) -> RecommendationType {
    let gain_value = (best_future_price - current_price) * quantity_kg * UNCERTAINTY_DISCOUNT;
    let loss_value = storage_loss * current_price;
    if gain_value > loss_value {
        RecommendationType::Store
    } else {
        RecommendationType::SellNow
    }
}

/// Highest forecast, keeping the earliest on ties. Starts from the current
/// quote so an empty or falling forecast leaves the current market in place.
pub fn best_future<'a>(current: &'a MarketPrice, predicted: &'a [MarketPrice]) -> &'a MarketPrice {
    predicted
        .iter()
        .fold(current, |best, p| if p.price > best.price { p } else { best })
}

/// Cumulative loss on the horizon day, or zero when the projection is shorter.
pub fn storage_loss_at(storage: &StorageAnalysis, day: u32) -> f64 {
    storage
        .projected_losses
        .get(day as usize)
        .map(|p| p.cumulative_loss)
        .unwrap_or(0.0)
}

pub fn net_revenue(
    price: f64,
    quantity_kg: f64,
    logistics_cost: f64,
    storage_loss_pct: f64,
) -> f64 {
    price * quantity_kg * (1.0 - storage_loss_pct / 100.0) - logistics_cost
}

pub fn synthesize(
    inputs: &DecisionInputs<'_>,
    now: DateTime<Utc>,
    trace: &mut ExecutionTrace,
) -> Recommendation {
    let recommendation = build(inputs, now);
    trace.record(
        "generate_recommendation",
        json!({
            "recommendationType": recommendation.recommendation_type,
            "targetMarket": recommendation.target_market,
            "confidence": recommendation.confidence,
        }),
    );
    recommendation
}

fn build(inputs: &DecisionInputs<'_>, now: DateTime<Utc>) -> Recommendation {
    let Some(current) = inputs.market.current_prices.first() else {
        warn!("⚠️ No current prices reached the recommendation step, degrading to sell now");
        return Recommendation {
            recommendation_type: RecommendationType::SellNow,
            target_market: "Unknown".to_string(),
            best_time_to_sell: now,
            expected_revenue: 0.0,
            net_profit: 0.0,
            confidence: 0.0,
            reasoning: vec!["No market data available".to_string()],
            risks: vec!["Incomplete data".to_string()],
        };
    };

    let quantity = inputs.quantity_kg;
    let horizon = inputs.horizon_days;
    let currency = inputs.currency_symbol;
    let best = best_future(current, &inputs.market.predicted_prices);

    let logistics_cost = inputs
        .logistics
        .routes
        .first()
        .map(|r| r.transport_cost)
        .unwrap_or(0.0);
    let storage_loss = storage_loss_at(inputs.storage, horizon);

    let current_net = net_revenue(current.price, quantity, logistics_cost, 0.0);
    let future_net = net_revenue(best.price, quantity, logistics_cost, storage_loss);
    let price_increase = best.price - current.price;
    let storage_loss_value = storage_loss * current.price;

    let decision = decide(current.price, best.price, quantity, storage_loss);
    info!(
        "🧮 Decision {} (gain {:.2}/kg, loss {:.2} kg over {} days)",
        decision, price_increase, storage_loss, horizon
    );

    match decision {
        RecommendationType::Store => {
            let confidence = inputs.market.confidence_score;
            Recommendation {
                recommendation_type: RecommendationType::Store,
                target_market: best.market_name.clone(),
                best_time_to_sell: now + Duration::days(i64::from(horizon)),
                expected_revenue: future_net,
                net_profit: future_net - current_net,
                confidence: (confidence * STORE_CONFIDENCE_FACTOR).clamp(0.0, 1.0),
                reasoning: vec![
                    format!(
                        "Market prices expected to increase by {}{:.2}/kg in next {} days",
                        currency, price_increase, horizon
                    ),
                    format!("Storage losses estimated at {:.2} kg", storage_loss),
                    format!(
                        "Net gain from waiting: {}{:.2}",
                        currency,
                        future_net - current_net
                    ),
                ],
                risks: vec![
                    format!("Market predictions have {:.0}% confidence", confidence * 100.0),
                    "Unexpected weather could affect storage quality".to_string(),
                    "Market prices subject to volatility".to_string(),
                ],
            }
        }
        RecommendationType::SellNow => {
            let storage_note = if storage_loss_value == 0.0 {
                "No significant price increase expected".to_string()
            } else {
                format!("Storing would result in losses of {:.2} kg", storage_loss)
            };
            Recommendation {
                recommendation_type: RecommendationType::SellNow,
                target_market: current.market_name.clone(),
                best_time_to_sell: now,
                expected_revenue: current_net,
                net_profit: 0.0,
                confidence: SELL_NOW_CONFIDENCE,
                reasoning: vec![
                    format!("Current market price favorable at {}{}/kg", currency, current.price),
                    storage_note,
                ],
                risks: vec![
                    "Market prices may decrease in future".to_string(),
                    "Immediate transportation availability required".to_string(),
                ],
            }
        }
    }
}
