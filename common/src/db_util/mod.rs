//! Interfaces between the application code and database.

use super::*;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use std::sync::atomic::{AtomicBool, Ordering};

mod conversions;
mod evidence;

pub use evidence::{
    get_all_evidence, update_evidence_correction, update_evidence_validated, upsert_evidence,
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS evidence (
        id BIGSERIAL PRIMARY KEY,
        team VARCHAR NOT NULL,
        team_class VARCHAR NOT NULL DEFAULT '',
        level INTEGER NOT NULL,
        points DOUBLE PRECISION NOT NULL,
        link VARCHAR NOT NULL,
        note VARCHAR,
        validated BOOLEAN NOT NULL DEFAULT FALSE,
        correction_note VARCHAR,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (team, team_class, level)
    );
    CREATE INDEX IF NOT EXISTS evidence_created_at_idx ON evidence (created_at DESC);
";

/// Build a connection pool without connecting.
/// Connections are opened on first use, so an unreachable database
/// surfaces as a per-request error instead of a startup failure.
pub fn get_database_pool(database_url: &str, max_size: u32) -> PgPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().max_size(max_size).build_unchecked(manager)
}

pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PgPooledConnection, String> {
    pool.get().map_err(|err| err.to_string())
}

/// Create the evidence table and its indexes if they don't exist yet.
pub fn ensure_schema(conn: &mut PgConnection) -> Result<(), String> {
    conn.batch_execute(SCHEMA_SQL)
        .map_err(|err| err.to_string())
}

/// Evidence persisted in Postgres.
///
/// The table is created on the first connection that succeeds, so a database
/// that was down at startup is picked up once it comes back.
pub struct PgEvidenceStore {
    pool: PgPool,
    schema_ready: AtomicBool,
}

impl PgEvidenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: AtomicBool::new(false),
        }
    }

    fn conn(&self) -> Result<PgPooledConnection, String> {
        let mut conn = get_pooled_database_connection(&self.pool)?;
        if !self.schema_ready.load(Ordering::Acquire) {
            ensure_schema(&mut conn)?;
            self.schema_ready.store(true, Ordering::Release);
            log::info!("Evidence table ready");
        }
        Ok(conn)
    }
}

impl EvidenceStore for PgEvidenceStore {
    fn prepare(&self) -> Result<(), String> {
        self.conn().map(|_| ())
    }

    fn list_newest_first(&self) -> Result<Vec<EvidenceRecord>, String> {
        let mut conn = self.conn()?;
        get_all_evidence(&mut conn)
    }

    fn upsert_by_key(&self, new: NewEvidence) -> Result<EvidenceRecord, String> {
        let mut conn = self.conn()?;
        upsert_evidence(&mut conn, new)
    }

    fn mark_validated(&self, id: u64) -> Result<Option<EvidenceRecord>, String> {
        let mut conn = self.conn()?;
        update_evidence_validated(&mut conn, id)
    }

    fn mark_for_correction(
        &self,
        id: u64,
        correction_note: Option<String>,
    ) -> Result<Option<EvidenceRecord>, String> {
        let mut conn = self.conn()?;
        update_evidence_correction(&mut conn, id, correction_note)
    }
}
