//! In-memory history store backed by DashMap.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::{
    FarmContextRecord, HistoryStore, NewFarmContext, RecommendationHistoryRecord, StoreResult,
};
use crate::types::Recommendation;

#[derive(Clone, Default)]
pub struct MemoryStore {
    contexts: Arc<DashMap<i64, FarmContextRecord>>,
    recommendations: Arc<DashMap<i64, RecommendationHistoryRecord>>,
    next_context_id: Arc<AtomicI64>,
    next_recommendation_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn save_context(&self, context: NewFarmContext) -> StoreResult<i64> {
        let id = self.next_context_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.contexts.insert(
            id,
            FarmContextRecord {
                id,
                user_id: context.user_id,
                crop_type: context.crop_type,
                quantity: context.quantity,
                context: context.context,
                created_at: Utc::now(),
            },
        );
        debug!("💾 Stored farm context {}", id);
        Ok(id)
    }

    async fn save_recommendation(
        &self,
        farm_context_id: i64,
        recommendation: &Recommendation,
    ) -> StoreResult<i64> {
        let id = self.next_recommendation_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.recommendations.insert(
            id,
            RecommendationHistoryRecord {
                id,
                farm_context_id,
                recommendation_type: recommendation.recommendation_type,
                target_market: recommendation.target_market.clone(),
                expected_revenue: recommendation.expected_revenue,
                net_profit: recommendation.net_profit,
                confidence: recommendation.confidence,
                reasoning: recommendation.reasoning.clone(),
                risks: recommendation.risks.clone(),
                created_at: Utc::now(),
            },
        );
        debug!("💾 Stored recommendation {} for context {}", id, farm_context_id);
        Ok(id)
    }

    async fn recent_contexts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<FarmContextRecord>> {
        let mut records: Vec<FarmContextRecord> = self
            .contexts
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        // Ids are monotonic, so they order insertions exactly.
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        Ok(records)
    }

    async fn recent_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationHistoryRecord>> {
        let mut records: Vec<RecommendationHistoryRecord> = self
            .recommendations
            .iter()
            .filter(|entry| {
                self.contexts
                    .get(&entry.farm_context_id)
                    .is_some_and(|ctx| ctx.user_id == user_id)
            })
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;

    #[tokio::test]
    async fn test_contexts_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        for crop in ["wheat", "rice", "onion"] {
            let row = NewFarmContext::from_context("farmer-1", &fixtures::context(crop)).unwrap();
            store.save_context(row).await.unwrap();
        }
        let other = NewFarmContext::from_context("farmer-2", &fixtures::context("tomato")).unwrap();
        store.save_context(other).await.unwrap();

        let recent = store.recent_contexts("farmer-1", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].crop_type, "onion");
        assert_eq!(recent[1].crop_type, "rice");
        assert_eq!(recent[0].context["cropDetails"]["type"], "onion");
        assert_eq!(store.context_count(), 4);
    }

    #[tokio::test]
    async fn test_recommendations_follow_their_context_owner() {
        let store = MemoryStore::new();
        let mine = store
            .save_context(NewFarmContext::from_context("a", &fixtures::context("wheat")).unwrap())
            .await
            .unwrap();
        let theirs = store
            .save_context(NewFarmContext::from_context("b", &fixtures::context("rice")).unwrap())
            .await
            .unwrap();

        store.save_recommendation(mine, &fixtures::recommendation("Azadpur Mandi")).await.unwrap();
        store.save_recommendation(theirs, &fixtures::recommendation("Karnal Mandi")).await.unwrap();
        store.save_recommendation(mine, &fixtures::recommendation("Vashi APMC")).await.unwrap();

        let history = store.recent_recommendations("a", 20).await.unwrap();
        let markets: Vec<&str> = history.iter().map(|r| r.target_market.as_str()).collect();
        assert_eq!(markets, vec!["Vashi APMC", "Azadpur Mandi"]);
        assert!(store.recent_recommendations("nobody", 20).await.unwrap().is_empty());
    }
}
