//! Append-only training sample log, backed by SQLite.

use chrono::{DateTime, Utc};
use digero_core::{CategoryLabel, TrainingSample};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database, used by tests and throwaway sessions.
pub async fn create_db_in_memory() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS training_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            label TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Record one correction. Inserts unconditionally; duplicates are kept
/// so repeated corrections weigh more in later training runs.
pub async fn append_training_sample(
    pool: &DbPool,
    description: &str,
    label: &CategoryLabel,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO training_samples (description, label, recorded_at) VALUES (?, ?, ?)")
        .bind(description)
        .bind(label.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(())
}

/// The full corpus, in insertion order.
pub async fn get_training_samples(pool: &DbPool) -> Result<Vec<TrainingSample>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT description, label, recorded_at FROM training_samples ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(description, label, recorded_at)| TrainingSample {
            description,
            label: CategoryLabel::new(&label),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
        .collect())
}

pub async fn count_training_samples(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM training_samples")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_read_back_in_order() {
        let pool = create_db_in_memory().await.unwrap();
        append_training_sample(&pool, "grocery mart #4", &CategoryLabel::new("Groceries"))
            .await
            .unwrap();
        append_training_sample(&pool, "taxi ride", &CategoryLabel::new("Transportation"))
            .await
            .unwrap();

        let samples = get_training_samples(&pool).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].description, "grocery mart #4");
        assert_eq!(samples[1].label.as_str(), "Transportation");
    }

    #[tokio::test]
    async fn duplicate_corrections_are_kept() {
        let pool = create_db_in_memory().await.unwrap();
        for _ in 0..3 {
            append_training_sample(&pool, "grocery mart", &CategoryLabel::new("Groceries"))
                .await
                .unwrap();
        }
        assert_eq!(count_training_samples(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn file_backed_db_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.db");
        {
            let pool = create_db(&path).await.unwrap();
            append_training_sample(&pool, "rent payment", &CategoryLabel::new("Rent"))
                .await
                .unwrap();
            pool.close().await;
        }
        let pool = create_db(&path).await.unwrap();
        assert_eq!(count_training_samples(&pool).await.unwrap(), 1);
    }
}
