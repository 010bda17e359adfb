use std::{path::Path, str::FromStr};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::{Result, schema};

pub struct Db {
	pub pool: SqlitePool,
}
impl Db {
	pub async fn connect(cfg: &dowser_config::Sqlite) -> Result<Self> {
		if let Some(parent) = Path::new(&cfg.path).parent()
			&& !parent.as_os_str().is_empty()
		{
			std::fs::create_dir_all(parent)?;
		}

		let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.path))?
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal)
			.foreign_keys(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.connect_with(options)
			.await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		for statement in schema::SCHEMA.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		let fts_exists: bool = sqlx::query_scalar(
			"SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
		)
		.bind(schema::FTS_TABLE)
		.fetch_one(&mut *tx)
		.await?;

		if !fts_exists {
			sqlx::query(schema::FTS_CREATE).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
