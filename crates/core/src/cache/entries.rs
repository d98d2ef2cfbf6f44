//! [`BlobStore`] implementation over the SQLite cache database.
//!
//! Generations live in their own table; entries reference them and are
//! removed by cascade when a generation is deleted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension, Transaction};

use super::connection::CacheDb;
use super::store::BlobStore;
use crate::Error;
use crate::http::{Request, Response, ResponseType};

const SELECT_ENTRY: &str = "SELECT e.response_url, e.status, e.status_text, e.response_type, e.headers_json, e.body
     FROM entries e JOIN generations g ON g.id = e.generation_id";

/// Raw column values of one stored entry.
struct StoredRow {
    response_url: String,
    status: i64,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            response_url: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            response_type: row.get(3)?,
            headers_json: row.get(4)?,
            body: row.get(5)?,
        })
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status {} out of range", self.status)))?;
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response type {}", self.response_type)))?;
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)?;

        let mut response =
            Response::new(self.response_url, status, response_type, self.body).with_status_text(self.status_text);
        response.headers = headers;
        Ok(response)
    }
}

fn ensure_generation(conn: &Connection, name: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row("SELECT id FROM generations WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}

fn upsert_entry(tx: &Transaction<'_>, generation_id: i64, request: &Request, response: Response) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    let response_url = response.url.clone();
    let status_text = response.status_text.clone();
    let status = response.status;
    let response_type = response.response_type.as_str();
    let body = response.into_body();

    tx.execute(
        "INSERT INTO entries (
            generation_id, key_hash, method, url, response_url, status, status_text,
            response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(generation_id, key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation_id,
            request.key(),
            &request.method,
            &request.url,
            response_url,
            status,
            status_text,
            response_type,
            headers_json,
            &body[..],
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl BlobStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_generation(conn, &generation)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error> {
        self.put_all(generation, vec![(request.clone(), response)]).await
    }

    async fn put_all(&self, generation: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let generation_id = ensure_generation(&tx, &generation)?;
                for (request, response) in entries {
                    upsert_entry(&tx, generation_id, &request, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let row = conn
                    .query_row(
                        &format!("{SELECT_ENTRY} WHERE e.key_hash = ?1 ORDER BY g.id ASC LIMIT 1"),
                        params![key],
                        StoredRow::read,
                    )
                    .optional()?;
                row.map(StoredRow::into_response).transpose()
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup_in(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let row = conn
                    .query_row(
                        &format!("{SELECT_ENTRY} WHERE g.name = ?1 AND e.key_hash = ?2"),
                        params![generation, key],
                        StoredRow::read,
                    )
                    .optional()?;
                row.map(StoredRow::into_response).transpose()
            })
            .await
            .map_err(Error::from)
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, generation: &str) -> Result<Vec<Request>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Request>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.method, e.url FROM entries e JOIN generations g ON g.id = e.generation_id
                     WHERE g.name = ?1 ORDER BY e.rowid ASC",
                )?;
                let requests = stmt
                    .query_map(params![generation], |row| {
                        Ok(Request { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(requests)
            })
            .await
            .map_err(Error::from)
    }
}
