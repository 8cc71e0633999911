use anyhow::{Context, anyhow};
use async_trait::async_trait;
use market::Symbol;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::alert::target::{ChannelId, UserId};
use crate::subscription::model::{AlertRule, ChannelSubscription, PersonalSubscription};
use crate::subscription::repository::SubscriptionRepository;

/// SQLite-backed implementation of SubscriptionRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxSubscriptionRepository {
    pool: SqlitePool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn load_channels(&self) -> anyhow::Result<Vec<ChannelSubscription>> {
        let rows = sqlx::query(
            r#"
SELECT
  channel_id, guild_id, symbol,
  window_minutes, threshold_percent,
  monitoring_enabled, rename_enabled
FROM channel_subscriptions
ORDER BY channel_id;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_channel(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the load
                    tracing::warn!(error = %e, "skipping malformed channel subscription row");
                }
            }
        }

        Ok(out)
    }

    async fn load_personal(&self) -> anyhow::Result<Vec<PersonalSubscription>> {
        let rows = sqlx::query(
            r#"
SELECT
  user_id, symbol,
  window_minutes, threshold_percent,
  monitoring_enabled, holdings
FROM personal_subscriptions
ORDER BY user_id;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_personal(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed personal subscription row");
                }
            }
        }

        Ok(out)
    }

    async fn upsert_channel(&self, sub: &ChannelSubscription) -> anyhow::Result<()> {
        let guild_id = sub.guild_id.map(u64_to_i64).transpose()?;

        sqlx::query(
            r#"
INSERT INTO channel_subscriptions (
  channel_id, guild_id, symbol,
  window_minutes, threshold_percent,
  monitoring_enabled, rename_enabled
) VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(channel_id) DO UPDATE SET
  guild_id = excluded.guild_id,
  symbol = excluded.symbol,
  window_minutes = excluded.window_minutes,
  threshold_percent = excluded.threshold_percent,
  monitoring_enabled = excluded.monitoring_enabled,
  rename_enabled = excluded.rename_enabled;
"#,
        )
        .bind(u64_to_i64(sub.channel_id.0)?)
        .bind(guild_id)
        .bind(sub.rule.symbol.as_str())
        .bind(i64::from(sub.rule.window_minutes))
        .bind(sub.rule.threshold_percent)
        .bind(bool_to_i64(sub.rule.monitoring_enabled))
        .bind(bool_to_i64(sub.rename_enabled))
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert channel subscription {}", sub.channel_id))?;

        Ok(())
    }

    async fn upsert_personal(&self, sub: &PersonalSubscription) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO personal_subscriptions (
  user_id, symbol,
  window_minutes, threshold_percent,
  monitoring_enabled, holdings
) VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(user_id) DO UPDATE SET
  symbol = excluded.symbol,
  window_minutes = excluded.window_minutes,
  threshold_percent = excluded.threshold_percent,
  monitoring_enabled = excluded.monitoring_enabled,
  holdings = excluded.holdings;
"#,
        )
        .bind(u64_to_i64(sub.user_id.0)?)
        .bind(sub.rule.symbol.as_str())
        .bind(i64::from(sub.rule.window_minutes))
        .bind(sub.rule.threshold_percent)
        .bind(bool_to_i64(sub.rule.monitoring_enabled))
        .bind(sub.holdings)
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert personal subscription {}", sub.user_id))?;

        Ok(())
    }

    async fn delete_channel(&self, id: ChannelId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM channel_subscriptions WHERE channel_id = ?;")
            .bind(u64_to_i64(id.0)?)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn delete_personal(&self, id: UserId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM personal_subscriptions WHERE user_id = ?;")
            .bind(u64_to_i64(id.0)?)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_rule(r: &SqliteRow) -> anyhow::Result<AlertRule> {
    let symbol: String = r.try_get("symbol")?;
    let window: i64 = r.try_get("window_minutes")?;

    Ok(AlertRule {
        symbol: Symbol::new(symbol),
        window_minutes: i64_to_u32(window)?,
        threshold_percent: r.try_get("threshold_percent")?,
        monitoring_enabled: r.try_get::<i64, _>("monitoring_enabled")? == 1,
    })
}

fn row_to_channel(r: &SqliteRow) -> anyhow::Result<ChannelSubscription> {
    let channel_id: i64 = r.try_get("channel_id")?;
    let guild_id: Option<i64> = r.try_get("guild_id")?;

    Ok(ChannelSubscription {
        channel_id: ChannelId(i64_to_u64(channel_id)?),
        guild_id: guild_id.map(i64_to_u64).transpose()?,
        rule: row_to_rule(r).context("invalid channel rule")?,
        rename_enabled: r.try_get::<i64, _>("rename_enabled")? == 1,
    })
}

fn row_to_personal(r: &SqliteRow) -> anyhow::Result<PersonalSubscription> {
    let user_id: i64 = r.try_get("user_id")?;

    Ok(PersonalSubscription {
        user_id: UserId(i64_to_u64(user_id)?),
        rule: row_to_rule(r).context("invalid personal rule")?,
        holdings: r.try_get("holdings")?,
    })
}

/* =========================
Numeric safety helpers
========================= */

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}

fn i64_to_u64(v: i64) -> anyhow::Result<u64> {
    if v < 0 {
        return Err(anyhow!("negative i64 where u64 expected: {v}"));
    }
    Ok(v as u64)
}

fn i64_to_u32(v: i64) -> anyhow::Result<u32> {
    if v < 0 || v > u32::MAX as i64 {
        return Err(anyhow!("out of range for u32: {v}"));
    }
    Ok(v as u32)
}

fn u64_to_i64(v: u64) -> anyhow::Result<i64> {
    if v > i64::MAX as u64 {
        return Err(anyhow!("u64 too large for i64: {v}"));
    }
    Ok(v as i64)
}
