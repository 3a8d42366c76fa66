use std::path::Path;

use housing_core::EntityKind;
use surrealdb::engine::local::{Db, Mem, SurrealKv};
use surrealdb::Surreal;

use crate::store::StoreError;

/// Every reconciled kind gets a table; order only matters for readability.
const KINDS: [EntityKind; 5] = [
	EntityKind::Address,
	EntityKind::Name,
	EntityKind::Batch,
	EntityKind::Room,
	EntityKind::User,
];

pub const SNAPSHOT_TABLE: &str = "snapshots";

/// Wrapper around the SurrealDB handle.
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct DbHandle {
	pub db: Surreal<Db>,
}

/// Open (or create) the on-disk database and apply the schema.
pub async fn open(path: &Path) -> Result<DbHandle, StoreError> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)
			.map_err(|e| StoreError::Db(format!("{}: {e}", parent.display())))?;
	}
	let db = Surreal::new::<SurrealKv>(path.to_path_buf())
		.await
		.map_err(|e| StoreError::Db(e.to_string()))?;
	prepare(db).await
}

/// Throwaway in-memory database, used by `--memory` and tests.
pub async fn open_in_memory() -> Result<DbHandle, StoreError> {
	let db = Surreal::new::<Mem>(()).await.map_err(|e| StoreError::Db(e.to_string()))?;
	prepare(db).await
}

async fn prepare(db: Surreal<Db>) -> Result<DbHandle, StoreError> {
	db.use_ns("housing")
		.use_db("housing")
		.await
		.map_err(|e| StoreError::Db(e.to_string()))?;

	run_migrations(&db).await?;

	Ok(DbHandle { db })
}

/// DEFINE ... OVERWRITE statements are idempotent, so this runs on every open.
async fn run_migrations(db: &Surreal<Db>) -> Result<(), StoreError> {
	db.query(schema())
		.await
		.map_err(|e| StoreError::Db(e.to_string()))?
		.check()
		.map_err(|e| StoreError::Db(e.to_string()))?;
	Ok(())
}

/// Tables are schemaless: rows are stored exactly as serialized, nulls included.
/// The unique key index is what makes a duplicate insert abort a commit.
fn schema() -> String {
	let mut sql = String::new();
	for kind in KINDS {
		let table = kind.table();
		sql.push_str(&format!(
			"DEFINE TABLE OVERWRITE {table} SCHEMALESS;
			DEFINE INDEX OVERWRITE idx_{table}_key ON {table} FIELDS {key} UNIQUE;\n",
			key = kind.key_field(),
		));
	}
	sql.push_str(&format!(
		"DEFINE TABLE OVERWRITE {SNAPSHOT_TABLE} SCHEMALESS;
		DEFINE INDEX OVERWRITE idx_{SNAPSHOT_TABLE}_id ON {SNAPSHOT_TABLE} FIELDS snapshotId UNIQUE;
		DEFINE INDEX OVERWRITE idx_{SNAPSHOT_TABLE}_date ON {SNAPSHOT_TABLE} FIELDS date;
		DEFINE INDEX OVERWRITE idx_{SNAPSHOT_TABLE}_location ON {SNAPSHOT_TABLE} FIELDS location;\n"
	));
	sql
}
