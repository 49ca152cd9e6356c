use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, sqlite::SqlitePool};

use crate::domain::MonitoringConfig;

/// Stable key the monitoring state is persisted under.
pub const MONITOR_STATE_KEY: &str = "monitor_state";

/// Everything that survives a restart: the runtime config plus whether
/// monitoring was on when the process last ran.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub config: MonitoringConfig,
    pub is_monitoring: bool,
}

#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Loads the persisted monitoring state. A missing row means first run;
    /// an unreadable row is treated the same way rather than refusing to
    /// start.
    pub async fn load(&self) -> Result<Option<PersistedState>> {
        let row: Option<(String,)> = query_as(r#"SELECT value FROM settings WHERE key = ?1"#)
            .bind(MONITOR_STATE_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some((raw,)) = row else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                tracing::warn!(
                    target: "db",
                    error = %err,
                    key = MONITOR_STATE_KEY,
                    "stored monitoring state is unreadable; falling back to defaults"
                );
                Ok(None)
            }
        }
    }

    pub async fn save(&self, state: &PersistedState) -> Result<()> {
        let payload = serde_json::to_string(state)?;
        query(
            r#"INSERT INTO settings (key, value, updated_at)
               VALUES (?1, ?2, CURRENT_TIMESTAMP)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                              updated_at = CURRENT_TIMESTAMP"#,
        )
        .bind(MONITOR_STATE_KEY)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, domain::Sensitivity};

    #[tokio::test]
    async fn missing_state_loads_as_none() {
        let repo = SettingsRepository::new(db::memory_pool().await);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repo = SettingsRepository::new(db::memory_pool().await);
        let mut state = PersistedState::default();
        state.is_monitoring = true;
        state.config.sensitivity = Sensitivity::High;
        repo.save(&state).await.unwrap();

        let loaded = repo.load().await.unwrap().expect("state present");
        assert!(loaded.is_monitoring);
        assert_eq!(loaded.config.sensitivity, Sensitivity::High);
    }

    #[tokio::test]
    async fn corrupt_state_falls_back_to_none() {
        let pool = db::memory_pool().await;
        sqlx::query("INSERT INTO settings (key, value) VALUES (?1, ?2)")
            .bind(MONITOR_STATE_KEY)
            .bind("{not json")
            .execute(&pool)
            .await
            .unwrap();
        let repo = SettingsRepository::new(pool);
        assert!(repo.load().await.unwrap().is_none());
    }
}
