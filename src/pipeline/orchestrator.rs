//! Sequences the stages for one request and collects the trace.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::recommendation::DecisionInputs;
use super::{logistics, market, recommendation, storage};
use crate::config::PipelineConfig;
use crate::error::PlannerError;
use crate::jitter::JitterSource;
use crate::reference::ReferenceData;
use crate::trace::ExecutionTrace;
use crate::types::{LogisticsPlan, MarketAnalysis, Recommendation, StorageAnalysis, UserContext};

pub const AGENT_NAME: &str = "SupervisorAgent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Market,
    Logistics,
    Storage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Market => "Market analysis failed",
            Stage::Logistics => "Logistics analysis failed",
            Stage::Storage => "Storage analysis failed",
        };
        f.write_str(s)
    }
}

/// A stage failed; the trace ends with an `error` step.
#[derive(Error, Debug, Clone)]
#[error("{stage}: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PlannerError,
    pub trace: ExecutionTrace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub processing_time_ms: u64,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub recommendation: Recommendation,
    pub market: MarketAnalysis,
    pub logistics: LogisticsPlan,
    pub storage: StorageAnalysis,
    pub trace: ExecutionTrace,
    pub metadata: AgentMetadata,
}

pub struct Orchestrator {
    reference: Arc<ReferenceData>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(reference: Arc<ReferenceData>, config: PipelineConfig) -> Self {
        Self { reference, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Market -> Logistics -> Storage -> Recommend, each gated on the one before.
    pub async fn run(
        &self,
        context: &UserContext,
        jitter: &mut dyn JitterSource,
    ) -> Result<PlanReport, PipelineFailure> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let mut trace = ExecutionTrace::new();

        let crop = context.crop_details().crop_type.as_str();
        let quantity = context.crop_details().quantity;
        let horizon = self.config.decision_horizon_days;

        info!(
            "🌾 [{}] Planning {} kg of {} from {}",
            request_id,
            quantity,
            crop,
            context.farm_location().address
        );

        // Simulated upstream price feed
        let latency = self.config.market_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let market = match market::analyze_market(
            &self.reference,
            crop,
            horizon,
            Utc::now(),
            jitter,
            &mut trace,
        ) {
            Ok(m) => m,
            Err(e) => return Err(fail(Stage::Market, e, trace)),
        };

        let destinations: Vec<String> = market
            .current_prices
            .iter()
            .take(self.config.max_logistics_destinations)
            .map(|p| p.market_name.clone())
            .collect();

        let logistics = match logistics::plan_logistics(
            &self.reference,
            &context.farm_location().address,
            &destinations,
            quantity,
            Utc::now(),
            jitter,
            &mut trace,
        ) {
            Ok(l) => l,
            Err(e) => return Err(fail(Stage::Logistics, e, trace)),
        };

        let storage = match storage::analyze_storage(
            &self.reference,
            crop,
            quantity,
            &context.crop_details().current_storage,
            self.config.storage_projection_days,
            &mut trace,
        ) {
            Ok(s) => s,
            Err(e) => return Err(fail(Stage::Storage, e, trace)),
        };

        let inputs = DecisionInputs {
            market: &market,
            logistics: &logistics,
            storage: &storage,
            quantity_kg: quantity,
            horizon_days: horizon,
            currency_symbol: &self.reference.currency_symbol,
        };
        let recommendation = recommendation::synthesize(&inputs, Utc::now(), &mut trace);

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "✅ [{}] {} at {} in {}ms ({} trace steps)",
            request_id,
            recommendation.recommendation_type,
            recommendation.target_market,
            processing_time_ms,
            trace.len()
        );

        Ok(PlanReport {
            recommendation,
            market,
            logistics,
            storage,
            trace,
            metadata: AgentMetadata {
                timestamp: Utc::now(),
                agent: AGENT_NAME.to_string(),
                processing_time_ms,
                request_id,
            },
        })
    }
}

fn fail(stage: Stage, error: PlannerError, mut trace: ExecutionTrace) -> PipelineFailure {
    let message = format!("{}: {}", stage, error);
    error!("❌ {}", message);
    trace.record_error(&message);
    PipelineFailure {
        stage,
        error,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::FixedJitter;
    use crate::types::{CropDetails, FarmLocation, Preferences, RiskTolerance, StorageReading};

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(ReferenceData::default()),
            PipelineConfig {
                market_latency_ms: 0,
                ..PipelineConfig::default()
            },
        )
    }

    fn context(crop: &str) -> UserContext {
        UserContext::new(
            FarmLocation {
                latitude: 28.6,
                longitude: 77.2,
                address: "Delhi".into(),
            },
            CropDetails {
                crop_type: crop.into(),
                quantity: 1000.0,
                harvest_date: "2024-03-01".into(),
                current_storage: StorageReading::default(),
            },
            Preferences {
                risk_tolerance: RiskTolerance::Medium,
                preferred_markets: vec![],
                storage_capacity: 5000.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_stage_messages() {
        assert_eq!(Stage::Market.to_string(), "Market analysis failed");
        assert_eq!(Stage::Storage.to_string(), "Storage analysis failed");
    }

    #[tokio::test]
    async fn test_trace_follows_stage_order() {
        let report = orchestrator()
            .run(&context("wheat"), &mut FixedJitter::midpoint())
            .await
            .unwrap();

        assert_eq!(
            report.trace.actions(),
            vec![
                "fetch_market_prices",
                "generate_predictions",
                "generate_routes",
                "calculate_losses",
                "generate_recommendation",
            ]
        );
        assert_eq!(report.metadata.agent, "SupervisorAgent");
        assert_eq!(report.logistics.routes.len(), 3);
        assert_eq!(report.storage.projected_losses.len(), 31);
    }

    #[tokio::test]
    async fn test_unknown_crop_aborts_before_logistics() {
        let failure = orchestrator()
            .run(&context("banana"), &mut FixedJitter::midpoint())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Market);
        assert_eq!(failure.trace.actions(), vec!["fetch_market_prices", "error"]);
        assert_eq!(
            failure.to_string(),
            "Market analysis failed: No market data available for banana"
        );
    }
}
