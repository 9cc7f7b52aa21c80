//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. Points are
//! keyed by `(course_id, chunk_id)`; the `seq` column records insertion order and
//! survives in-place replacement, which gives searches a stable tie-break.

use super::{
    check_dimensions, group_by_course, is_valid_course_id, rank_chunks, validate_replacement,
    Chunk, DeleteScope, IndexedCourse, RetrievedMatch, SearchFilter, VectorStore,
};
use crate::error::{CoursebotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id TEXT NOT NULL,
        chunk_id TEXT NOT NULL,
        title TEXT NOT NULL,
        section TEXT,
        source_path TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        dimensions INTEGER NOT NULL,
        indexed_at TEXT NOT NULL,
        UNIQUE (course_id, chunk_id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_id);
    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(course_id, source_path);
"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO chunks
        (course_id, chunk_id, title, section, source_path, text, embedding, dimensions, indexed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT (course_id, chunk_id) DO UPDATE SET
        title = excluded.title,
        section = excluded.section,
        source_path = excluded.source_path,
        text = excluded.text,
        embedding = excluded.embedding,
        dimensions = excluded.dimensions,
        indexed_at = excluded.indexed_at
"#;

const SELECT_COURSE_SQL: &str = r#"
    SELECT chunk_id, course_id, title, section, source_path, text, embedding, indexed_at
    FROM chunks
    WHERE course_id = ?1
    ORDER BY seq
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoursebotError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let indexed_at_str: String = row.get(7)?;

        Ok(Chunk {
            id: row.get(0)?,
            course_id: row.get(1)?,
            title: row.get(2)?,
            section: row.get(3)?,
            source_path: row.get(4)?,
            text: row.get(5)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn load_course(conn: &Connection, course_id: &str) -> Result<Vec<Chunk>> {
        let mut stmt = conn.prepare(SELECT_COURSE_SQL)?;
        let rows = stmt.query_map(params![course_id], Self::row_to_chunk)?;
        let chunks = rows.collect::<rusqlite::Result<Vec<Chunk>>>()?;
        Ok(chunks)
    }

    /// Dimension of a course's stored rows, skipping rows `replaced(chunk_id, source_path)`
    /// says are about to be overwritten or removed.
    fn stored_dimension<F: Fn(&str, &str) -> bool>(
        conn: &Connection,
        course_id: &str,
        replaced: F,
    ) -> Result<Option<usize>> {
        let mut stmt = conn.prepare(
            "SELECT chunk_id, source_path, dimensions FROM chunks WHERE course_id = ?1 ORDER BY seq",
        )?;
        let mut rows = stmt.query(params![course_id])?;
        while let Some(row) = rows.next()? {
            let chunk_id: String = row.get(0)?;
            let source_path: String = row.get(1)?;
            if !replaced(&chunk_id, &source_path) {
                let dims: i64 = row.get(2)?;
                return Ok(Some(dims as usize));
            }
        }
        Ok(None)
    }

    fn insert_chunk(conn: &Connection, chunk: &Chunk) -> Result<()> {
        conn.execute(
            UPSERT_SQL,
            params![
                chunk.course_id,
                chunk.id,
                chunk.title,
                chunk.section,
                chunk.source_path,
                chunk.text,
                Self::embedding_to_bytes(&chunk.embedding),
                chunk.embedding.len() as i64,
                chunk.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Write one course's share of a batch after checking dimensions.
    fn write_group(conn: &Connection, course_id: &str, group: &[&Chunk]) -> Result<()> {
        let ids: HashSet<&str> = group.iter().map(|c| c.id.as_str()).collect();
        let stored = Self::stored_dimension(conn, course_id, |id, _| ids.contains(id))?;
        check_dimensions(course_id, group, stored)?;

        for chunk in group {
            Self::insert_chunk(conn, chunk)?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunk), fields(course = %chunk.course_id, chunk = %chunk.id))]
    async fn upsert(&self, chunk: &Chunk) -> Result<()> {
        chunk.validate()?;
        let conn = self.lock()?;
        Self::write_group(&conn, &chunk.course_id, &[chunk])?;
        debug!("Upserted chunk {}", chunk.id);
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        for chunk in chunks {
            chunk.validate()?;
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for (course_id, group) in group_by_course(chunks) {
            // Dropping the transaction on error rolls the whole batch back
            Self::write_group(&tx, course_id, &group)?;
        }
        tx.commit()?;

        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn replace_source(
        &self,
        course_id: &str,
        source_path: &str,
        chunks: &[Chunk],
    ) -> Result<usize> {
        validate_replacement(course_id, source_path, chunks)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let incoming: Vec<&Chunk> = chunks.iter().collect();
        let stored = Self::stored_dimension(&tx, course_id, |id, source| {
            source == source_path || ids.contains(id)
        })?;
        check_dimensions(course_id, &incoming, stored)?;

        let existing: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT chunk_id FROM chunks WHERE course_id = ?1 AND source_path = ?2")?;
            let rows = stmt.query_map(params![course_id, source_path], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()?
        };
        let mut removed = 0;
        for stale in existing.iter().filter(|id| !ids.contains(id.as_str())) {
            removed += tx.execute(
                "DELETE FROM chunks WHERE course_id = ?1 AND chunk_id = ?2",
                params![course_id, stale],
            )?;
        }
        for chunk in chunks {
            Self::insert_chunk(&tx, chunk)?;
        }
        tx.commit()?;

        debug!("Replaced {} with {} chunks ({} stale removed)", source_path, chunks.len(), removed);
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding, filter))]
    async fn search(
        &self,
        course_id: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<RetrievedMatch>> {
        if !is_valid_course_id(course_id) || top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let chunks = Self::load_course(&conn, course_id)?;
        let results = rank_chunks(chunks, query_embedding, top_k, filter);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete(&self, course_id: &str, scope: &DeleteScope) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = match scope {
            DeleteScope::Chunk(id) => conn.execute(
                "DELETE FROM chunks WHERE course_id = ?1 AND chunk_id = ?2",
                params![course_id, id],
            )?,
            DeleteScope::Source(path) => conn.execute(
                "DELETE FROM chunks WHERE course_id = ?1 AND source_path = ?2",
                params![course_id, path],
            )?,
            DeleteScope::Course => {
                conn.execute("DELETE FROM chunks WHERE course_id = ?1", params![course_id])?
            }
        };

        info!("Deleted {} chunks from course {}", deleted, course_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn course_chunks(&self, course_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;
        Self::load_course(&conn, course_id)
    }

    async fn chunk_count(&self, course_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE course_id = ?1",
            params![course_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_id, COUNT(*), COUNT(DISTINCT source_path), MAX(indexed_at)
            FROM chunks
            GROUP BY course_id
            ORDER BY course_id
            "#,
        )?;

        let courses = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(3)?;
            Ok(IndexedCourse {
                course_id: row.get(0)?,
                chunk_count: row.get(1)?,
                source_count: row.get(2)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result = courses.collect::<rusqlite::Result<Vec<IndexedCourse>>>()?;
        Ok(result)
    }
}
