//! SQLite-backed threat store. Three access paths: recency, source ip, threat type.

use super::{PayloadCipher, ThreatQuery, ThreatRecord, ThreatStats, ThreatStore, ThreatTypeCount};
use crate::error::PersistenceError;
use crate::policy::ThreatType;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use tracing::warn;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS threats (
        id TEXT PRIMARY KEY,
        ts INTEGER NOT NULL,
        ip TEXT,
        endpoint TEXT,
        method TEXT,
        threat_type TEXT NOT NULL,
        probability REAL NOT NULL,
        email TEXT,
        user_agent TEXT,
        payload_enc TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_threats_ts ON threats(ts DESC);
    CREATE INDEX IF NOT EXISTS idx_threats_ip ON threats(ip, ts DESC);
    CREATE INDEX IF NOT EXISTS idx_threats_type ON threats(threat_type, ts DESC);
"#;

const COLUMNS: &str =
    "id, ts, ip, endpoint, method, threat_type, probability, email, user_agent, payload_enc";

pub struct SqliteThreatStore {
    conn: Mutex<Connection>,
    cipher: PayloadCipher,
}

impl SqliteThreatStore {
    /// Open or create the store at `path`. Payloads are sealed with a key derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, PersistenceError> {
        Self::init(Connection::open(path)?, secret)
    }

    pub fn open_in_memory(secret: &[u8]) -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?, secret)
    }

    fn init(conn: Connection, secret: &[u8]) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cipher: PayloadCipher::new(secret),
        })
    }

    fn read_row(&self, row: &Row<'_>) -> rusqlite::Result<ThreatRecord> {
        let id: String = row.get(0)?;
        let ts: i64 = row.get(1)?;
        let threat_type: String = row.get(5)?;
        let probability: f64 = row.get(6)?;
        let payload_enc: String = row.get(9)?;
        let request_data = match self
            .cipher
            .open(&payload_enc)
            .ok()
            .and_then(|plain| serde_json::from_slice(&plain).ok())
        {
            Some(v) => v,
            None => {
                warn!(threat_id = %id, "stored payload could not be decrypted");
                serde_json::Value::Null
            }
        };
        Ok(ThreatRecord {
            timestamp: Utc
                .timestamp_millis_opt(ts)
                .single()
                .unwrap_or_else(Utc::now),
            ip: row.get(2)?,
            endpoint: row.get(3)?,
            method: row.get(4)?,
            threat_type: ThreatType::from_label(&threat_type),
            probability: probability as f32,
            email: row.get(7)?,
            user_agent: row.get(8)?,
            request_data,
            id,
        })
    }
}

impl ThreatStore for SqliteThreatStore {
    fn insert(&self, record: &ThreatRecord) -> Result<(), PersistenceError> {
        let payload = serde_json::to_vec(&record.request_data)?;
        let enc = self.cipher.seal(&payload)?;
        self.conn.lock().execute(
            "INSERT INTO threats (id, ts, ip, endpoint, method, threat_type, probability, email, user_agent, payload_enc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.timestamp.timestamp_millis(),
                record.ip,
                record.endpoint,
                record.method,
                record.threat_type.as_str(),
                record.probability as f64,
                record.email,
                record.user_agent,
                enc,
            ],
        )?;
        Ok(())
    }

    fn find(&self, query: &ThreatQuery) -> Result<Vec<ThreatRecord>, PersistenceError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let mut clauses = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(t) = &query.threat_type {
            args.push(SqlValue::Text(t.clone()));
            clauses.push(format!("threat_type = ?{}", args.len()));
        }
        if let Some(ip) = &query.ip {
            args.push(SqlValue::Text(ip.clone()));
            clauses.push(format!("ip = ?{}", args.len()));
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        args.push(SqlValue::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
        let sql = format!(
            "SELECT {COLUMNS} FROM threats {filter} ORDER BY ts DESC, rowid DESC LIMIT ?{}",
            args.len()
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| self.read_row(row))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn stats(&self) -> Result<ThreatStats, PersistenceError> {
        let conn = self.conn.lock();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM threats", [], |r| r.get(0))?;
        let mut stmt = conn.prepare(
            "SELECT threat_type, COUNT(*) AS n FROM threats GROUP BY threat_type ORDER BY n DESC, threat_type",
        )?;
        let rows = stmt.query_map([], |r| {
            let n: i64 = r.get(1)?;
            Ok(ThreatTypeCount {
                threat_type: r.get(0)?,
                count: n.max(0) as u64,
            })
        })?;
        let mut by_type = Vec::new();
        for r in rows {
            by_type.push(r?);
        }
        Ok(ThreatStats {
            total: total.max(0) as u64,
            by_type,
        })
    }
}
