use std::sync::Arc;

use harvest_planner::config::PipelineConfig;
use harvest_planner::jitter::{FixedJitter, RngJitter};
use harvest_planner::pipeline::recommendation::{self, DecisionInputs};
use harvest_planner::pipeline::{storage, Orchestrator, Stage};
use harvest_planner::reference::ReferenceData;
use harvest_planner::trace::ExecutionTrace;
use harvest_planner::types::{
    CropDetails, FarmLocation, LogisticsPlan, MarketAnalysis, Preferences, RecommendationType,
    RiskTolerance, StorageReading, TransportRequirements, UserContext, VehicleType,
};

fn orchestrator(config: PipelineConfig) -> Orchestrator {
    Orchestrator::new(Arc::new(ReferenceData::default()), config)
}

fn no_latency() -> PipelineConfig {
    PipelineConfig {
        market_latency_ms: 0,
        ..PipelineConfig::default()
    }
}

fn context(crop: &str, quantity: f64, reading: StorageReading) -> UserContext {
    UserContext::new(
        FarmLocation {
            latitude: 28.61,
            longitude: 77.21,
            address: "Delhi".into(),
        },
        CropDetails {
            crop_type: crop.into(),
            quantity,
            harvest_date: "2024-03-15".into(),
            current_storage: reading,
        },
        Preferences {
            risk_tolerance: RiskTolerance::Medium,
            preferred_markets: vec!["Azadpur Mandi".into()],
            storage_capacity: 10_000.0,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_rising_wheat_market_recommends_storing() {
    let ctx = context("wheat", 1000.0, StorageReading::default());
    let report = orchestrator(no_latency())
        .run(&ctx, &mut FixedJitter::midpoint())
        .await
        .unwrap();

    // Koyambedu compounds 2400 -> 2572 over seven days; wheat loses ~34.5 kg.
    let rec = &report.recommendation;
    assert_eq!(rec.recommendation_type, RecommendationType::Store);
    assert_eq!(rec.target_market, "Koyambedu");
    assert!((rec.confidence - 0.71 * 0.9).abs() < 1e-9);
    assert_eq!(rec.reasoning.len(), 3);

    // Unknown origin/market pairs fall back to 600 km at the midpoint.
    assert_eq!(report.logistics.routes.len(), 3);
    assert!(report.logistics.routes.iter().all(|r| r.distance == 600.0));
    assert_eq!(report.logistics.total_cost, 3.0 * 720.0);
    assert_eq!(report.market.predicted_prices.len(), 21);
}

#[tokio::test]
async fn test_perishable_crop_recommends_selling_now() {
    let ctx = context("tomato", 1000.0, StorageReading::default());
    let report = orchestrator(no_latency())
        .run(&ctx, &mut FixedJitter::midpoint())
        .await
        .unwrap();

    let rec = &report.recommendation;
    assert_eq!(rec.recommendation_type, RecommendationType::SellNow);
    assert_eq!(rec.target_market, "Azadpur Mandi");
    assert_eq!(rec.confidence, 0.95);
    assert_eq!(rec.net_profit, 0.0);
    assert!(rec.reasoning[1].starts_with("Storing would result in losses of"));
    assert_eq!(report.storage.max_storage_days, 14);
}

#[tokio::test]
async fn test_same_seed_gives_same_plan() {
    let orchestrator = orchestrator(no_latency());
    let ctx = context("rice", 2500.0, StorageReading::default());

    let first = orchestrator.run(&ctx, &mut RngJitter::seeded(42)).await.unwrap();
    let second = orchestrator.run(&ctx, &mut RngJitter::seeded(42)).await.unwrap();

    let (a, b) = (&first.recommendation, &second.recommendation);
    assert_eq!(a.recommendation_type, b.recommendation_type);
    assert_eq!(a.expected_revenue, b.expected_revenue);
    assert_eq!(first.logistics.total_cost, second.logistics.total_cost);
    assert_ne!(first.metadata.request_id, second.metadata.request_id);
}

#[tokio::test]
async fn test_unknown_crop_fails_with_error_step() {
    let ctx = context("dragonfruit", 100.0, StorageReading::default());
    let failure = orchestrator(no_latency())
        .run(&ctx, &mut FixedJitter::midpoint())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Market);
    let last = failure.trace.steps.last().unwrap();
    assert_eq!(last.action, "error");
    assert!(last.result["error"]
        .as_str()
        .unwrap()
        .starts_with("Market analysis failed"));
}

#[tokio::test]
async fn test_no_destinations_stops_before_storage() {
    let ctx = context("wheat", 1000.0, StorageReading::default());
    let failure = orchestrator(PipelineConfig {
        max_logistics_destinations: 0,
        ..no_latency()
    })
    .run(&ctx, &mut FixedJitter::midpoint())
    .await
    .unwrap_err();

    assert_eq!(failure.stage, Stage::Logistics);
    assert_eq!(
        failure.trace.actions(),
        vec!["fetch_market_prices", "generate_predictions", "error"]
    );
}

#[tokio::test]
async fn test_poor_storage_conditions_raise_losses() {
    let orchestrator = orchestrator(no_latency());
    let ideal = StorageReading {
        temperature: Some(20.0),
        humidity: Some(60.0),
    };
    let hot = StorageReading {
        temperature: Some(38.0),
        humidity: Some(85.0),
    };

    let a = orchestrator
        .run(&context("onion", 1000.0, ideal), &mut FixedJitter::midpoint())
        .await
        .unwrap();
    let b = orchestrator
        .run(&context("onion", 1000.0, hot), &mut FixedJitter::midpoint())
        .await
        .unwrap();

    assert_eq!(a.storage.current_storage.daily_loss_rate, 0.8);
    let (cool, warm) = (&a.storage, &b.storage);
    assert!(warm.current_storage.daily_loss_rate > cool.current_storage.daily_loss_rate);
    assert!(warm.projected_losses[7].cumulative_loss > cool.projected_losses[7].cumulative_loss);
}

#[test]
fn test_empty_price_list_degrades_instead_of_failing() {
    let reference = ReferenceData::default();
    let mut trace = ExecutionTrace::new();
    let now = chrono::Utc::now();

    let market = MarketAnalysis {
        current_prices: vec![],
        price_history: vec![],
        predicted_prices: vec![],
        confidence_score: 0.71,
        last_updated: now,
    };
    let storage = storage::analyze_storage(
        &reference,
        "wheat",
        500.0,
        &StorageReading::default(),
        30,
        &mut trace,
    )
    .unwrap();
    let logistics = LogisticsPlan {
        routes: vec![],
        total_cost: 0.0,
        estimated_arrival: now,
        transport_requirements: TransportRequirements {
            vehicle_type: VehicleType::Truck,
            capacity_tons: 1.0,
            special_requirements: vec![],
        },
    };

    let inputs = DecisionInputs {
        market: &market,
        logistics: &logistics,
        storage: &storage,
        quantity_kg: 500.0,
        horizon_days: 7,
        currency_symbol: &reference.currency_symbol,
    };
    let rec = recommendation::synthesize(&inputs, now, &mut trace);

    assert_eq!(rec.recommendation_type, RecommendationType::SellNow);
    assert_eq!(rec.target_market, "Unknown");
    assert_eq!(rec.confidence, 0.0);
    assert_eq!(trace.actions(), vec!["calculate_losses", "generate_recommendation"]);
}
