use sqlx::SqlitePool;

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Channel subscriptions
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS channel_subscriptions (
  channel_id BIGINT PRIMARY KEY,
  guild_id BIGINT,
  symbol TEXT NOT NULL,
  window_minutes INTEGER NOT NULL,
  threshold_percent REAL NOT NULL,
  monitoring_enabled INTEGER NOT NULL DEFAULT 0 CHECK (monitoring_enabled IN (0,1)),
  rename_enabled INTEGER NOT NULL DEFAULT 0 CHECK (rename_enabled IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    // Personal (direct message) subscriptions
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS personal_subscriptions (
  user_id BIGINT PRIMARY KEY,
  symbol TEXT NOT NULL,
  window_minutes INTEGER NOT NULL,
  threshold_percent REAL NOT NULL,
  monitoring_enabled INTEGER NOT NULL DEFAULT 0 CHECK (monitoring_enabled IN (0,1)),
  holdings REAL NOT NULL DEFAULT 0
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_channel_subscriptions_symbol ON channel_subscriptions(symbol);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_personal_subscriptions_symbol ON personal_subscriptions(symbol);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
