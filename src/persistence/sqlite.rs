//! SQLite history store. Every call runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use super::{
    FarmContextRecord, HistoryStore, NewFarmContext, RecommendationHistoryRecord, StoreError,
    StoreResult,
};
use crate::types::{Recommendation, RecommendationType};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS farm_contexts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    crop_type TEXT NOT NULL,
    quantity REAL NOT NULL,
    location TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    storage_capacity REAL NOT NULL,
    risk_tolerance TEXT NOT NULL,
    preferred_markets TEXT NOT NULL,
    context_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_farm_contexts_user ON farm_contexts(user_id);
CREATE TABLE IF NOT EXISTS recommendation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    farm_context_id INTEGER NOT NULL REFERENCES farm_contexts(id),
    recommendation_type TEXT NOT NULL,
    target_market TEXT NOT NULL,
    expected_revenue REAL NOT NULL,
    net_profit REAL NOT NULL,
    confidence REAL NOT NULL,
    reasoning TEXT NOT NULL,
    risks TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute("PRAGMA foreign_keys=ON;", [])?;
        conn.execute_batch(SCHEMA)?;
        info!("🗄️ History database ready at {}", path.as_ref().display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn save_context(&self, context: NewFarmContext) -> StoreResult<i64> {
        let preferred_markets = serde_json::to_string(&context.preferred_markets)?;
        let context_data = serde_json::to_string(&context.context)?;
        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO farm_contexts (user_id, crop_type, quantity, location, latitude, \
                     longitude, storage_capacity, risk_tolerance, preferred_markets, context_data, \
                     created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        context.user_id,
                        context.crop_type,
                        context.quantity,
                        context.address,
                        context.latitude,
                        context.longitude,
                        context.storage_capacity,
                        context.risk_tolerance.to_string(),
                        preferred_markets,
                        context_data,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!("💾 Stored farm context {}", id);
        Ok(id)
    }

    async fn save_recommendation(
        &self,
        farm_context_id: i64,
        recommendation: &Recommendation,
    ) -> StoreResult<i64> {
        let reasoning = serde_json::to_string(&recommendation.reasoning)?;
        let risks = serde_json::to_string(&recommendation.risks)?;
        let recommendation_type = recommendation.recommendation_type.as_str();
        let target_market = recommendation.target_market.clone();
        let expected_revenue = recommendation.expected_revenue;
        let net_profit = recommendation.net_profit;
        let confidence = recommendation.confidence;

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO recommendation_history (farm_context_id, recommendation_type, \
                     target_market, expected_revenue, net_profit, confidence, reasoning, risks, \
                     created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        farm_context_id,
                        recommendation_type,
                        target_market,
                        expected_revenue,
                        net_profit,
                        confidence,
                        reasoning,
                        risks,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!("💾 Stored recommendation {} for context {}", id, farm_context_id);
        Ok(id)
    }

    async fn recent_contexts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<FarmContextRecord>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, crop_type, quantity, context_data, created_at \
                 FROM farm_contexts WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit as i64], |row| {
                Ok(FarmContextRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    crop_type: row.get(2)?,
                    quantity: row.get(3)?,
                    context: json_column(row, 4)?,
                    created_at: timestamp_column(row, 5)?,
                })
            })?;
            let records = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn recent_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationHistoryRecord>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.farm_context_id, r.recommendation_type, r.target_market, \
                 r.expected_revenue, r.net_profit, r.confidence, r.reasoning, r.risks, \
                 r.created_at \
                 FROM recommendation_history r \
                 JOIN farm_contexts c ON c.id = r.farm_context_id \
                 WHERE c.user_id = ?1 ORDER BY r.id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit as i64], |row| {
                Ok(RecommendationHistoryRecord {
                    id: row.get(0)?,
                    farm_context_id: row.get(1)?,
                    recommendation_type: recommendation_type_column(row, 2)?,
                    target_market: row.get(3)?,
                    expected_revenue: row.get(4)?,
                    net_profit: row.get(5)?,
                    confidence: row.get(6)?,
                    reasoning: json_column(row, 7)?,
                    risks: json_column(row, 8)?,
                    created_at: timestamp_column(row, 9)?,
                })
            })?;
            let records = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn recommendation_type_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<RecommendationType> {
    let text: String = row.get(idx)?;
    match text.as_str() {
        "sell_now" => Ok(RecommendationType::SellNow),
        "store" => Ok(RecommendationType::Store),
        _ => Err(rusqlite::Error::InvalidColumnType(idx, text, Type::Text)),
    }
}
