use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use crate::application::ChunkStore;
use crate::domain::{Chunk, ChunkType, DomainError};

/// SQLite-backed chunk store with an FTS5 virtual table kept in sync by
/// triggers (§4.5, §9). `chunks_fts` is a contentless-adjacent external
/// content table pointed at `chunks`; insert/update/delete triggers on
/// `chunks` keep it current so callers never write to `chunks_fts` directly.
pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
}

impl SqliteChunkStore {
    pub fn open(path: &Path) -> Result<Self, DomainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DomainError::Io)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DomainError::internal(format!("opening chunk store: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DomainError::internal(format!("opening in-memory chunk store: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                content TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                language TEXT NOT NULL,
                chunk_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path);

            CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
                content,
                path,
                language,
                content='chunks',
                content_rowid='id'
            );

            CREATE TRIGGER IF NOT EXISTS chunks_after_insert AFTER INSERT ON chunks BEGIN
                INSERT INTO chunks_fts(rowid, content, path, language) VALUES (new.id, new.content, new.path, new.language);
            END;

            CREATE TRIGGER IF NOT EXISTS chunks_after_delete AFTER DELETE ON chunks BEGIN
                INSERT INTO chunks_fts(chunks_fts, rowid, content, path, language) VALUES ('delete', old.id, old.content, old.path, old.language);
            END;

            CREATE TRIGGER IF NOT EXISTS chunks_after_update AFTER UPDATE ON chunks BEGIN
                INSERT INTO chunks_fts(chunks_fts, rowid, content, path, language) VALUES ('delete', old.id, old.content, old.path, old.language);
                INSERT INTO chunks_fts(rowid, content, path, language) VALUES (new.id, new.content, new.path, new.language);
            END;
            "#,
        )
        .map_err(|e| DomainError::index_integrity(format!("initializing chunk store schema: {e}")))?;
        Ok(())
    }

    fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
        let id: i64 = row.get(0)?;
        let path: String = row.get(1)?;
        let content: String = row.get(2)?;
        let start_line: u32 = row.get(3)?;
        let end_line: u32 = row.get(4)?;
        let language: String = row.get(5)?;
        let chunk_type: String = row.get(6)?;
        let created_at: i64 = row.get(7)?;
        Ok(Chunk::reconstitute(
            id,
            path,
            content,
            start_line,
            end_line,
            language,
            ChunkType::parse(&chunk_type),
            created_at,
        ))
    }
}

impl ChunkStore for SqliteChunkStore {
    fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<i64>, DomainError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::internal(format!("starting transaction: {e}")))?;
        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO chunks (path, content, start_line, end_line, language, chunk_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(|e| DomainError::internal(format!("preparing insert: {e}")))?;
            for chunk in &chunks {
                stmt.execute(rusqlite::params![
                    chunk.path(),
                    chunk.content(),
                    chunk.start_line(),
                    chunk.end_line(),
                    chunk.language(),
                    chunk.chunk_type().as_str(),
                    chunk.created_at(),
                ])
                .map_err(|e| DomainError::internal(format!("inserting chunk: {e}")))?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()
            .map_err(|e| DomainError::internal(format!("committing insert: {e}")))?;
        debug!("inserted {} chunks", ids.len());
        Ok(ids)
    }

    fn delete_chunks_by_path(&self, path: &str) -> Result<Vec<i64>, DomainError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id FROM chunks WHERE path = ?1")
            .map_err(|e| DomainError::internal(format!("preparing select: {e}")))?;
        let ids: Vec<i64> = stmt
            .query_map([path], |row| row.get(0))
            .map_err(|e| DomainError::internal(format!("querying ids by path: {e}")))?
            .collect::<Result<_, _>>()
            .map_err(|e| DomainError::internal(format!("reading ids: {e}")))?;

        conn.execute("DELETE FROM chunks WHERE path = ?1", [path])
            .map_err(|e| DomainError::internal(format!("deleting chunks: {e}")))?;

        Ok(ids)
    }

    fn search_fts(
        &self,
        expression: &str,
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<(i64, f32)>, DomainError> {
        if expression.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();

        let sql = "SELECT c.id, bm25(chunks_fts) AS rank
                    FROM chunks_fts
                    JOIN chunks c ON c.id = chunks_fts.rowid
                    WHERE chunks_fts MATCH ?1
                    ORDER BY rank
                    LIMIT ?2";
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DomainError::internal(format!("preparing fts query: {e}")))?;

        let rows: Vec<(i64, f32, String)> = stmt
            .query_map(rusqlite::params![expression, limit as i64 * 4], |row| {
                let id: i64 = row.get(0)?;
                let rank: f64 = row.get(1)?;
                Ok((id, -(rank as f32), String::new()))
            })
            .map_err(|e| DomainError::query_validation(format!("invalid FTS expression: {e}")))?
            .collect::<Result<_, _>>()
            .map_err(|e| DomainError::internal(format!("reading fts results: {e}")))?;

        let mut results: Vec<(i64, f32)> = if let Some(extensions) = extension_filter {
            if extensions.is_empty() {
                rows.into_iter().map(|(id, score, _)| (id, score)).collect()
            } else {
                let mut filtered = Vec::new();
                for (id, score, _) in rows {
                    let path: String = conn
                        .query_row("SELECT path FROM chunks WHERE id = ?1", [id], |r| r.get(0))
                        .map_err(|e| DomainError::internal(format!("reading chunk path: {e}")))?;
                    let ext = Path::new(&path)
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_lowercase());
                    if matches!(ext, Some(ref e) if extensions.iter().any(|x| x.to_lowercase() == *e)) {
                        filtered.push((id, score));
                    }
                }
                filtered
            }
        } else {
            rows.into_iter().map(|(id, score, _)| (id, score)).collect()
        };

        results.truncate(limit);
        Ok(results)
    }

    fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Chunk>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut by_id = std::collections::HashMap::new();
        for id in ids {
            let chunk = conn.query_row(
                "SELECT id, path, content, start_line, end_line, language, chunk_type, created_at
                 FROM chunks WHERE id = ?1",
                [id],
                Self::row_to_chunk,
            );
            if let Ok(chunk) = chunk {
                by_id.insert(*id, chunk);
            }
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn count(&self) -> Result<usize, DomainError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| DomainError::internal(format!("counting chunks: {e}")))?;
        Ok(count as usize)
    }

    fn check_integrity(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().unwrap();
        let chunk_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| DomainError::internal(format!("counting chunks: {e}")))?;
        let fts_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks_fts", [], |row| row.get(0))
            .map_err(|e| DomainError::internal(format!("counting fts rows: {e}")))?;
        if chunk_count != fts_count {
            return Err(DomainError::index_integrity(format!(
                "chunks table has {chunk_count} rows but chunks_fts has {fts_count}"
            )));
        }
        Ok(())
    }

    fn rebuild_fts(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO chunks_fts(chunks_fts) VALUES ('rebuild')", [])
            .map_err(|e| DomainError::internal(format!("rebuilding fts index: {e}")))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| DomainError::internal(format!("clearing chunks: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, content: &str) -> Chunk {
        Chunk::new(path, content, 1, 1, "rust", ChunkType::Function, 0)
    }

    #[test]
    fn insert_and_search_round_trips() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        let ids = store
            .insert_chunks(vec![chunk("a.rs", "fn parse_query() -> bool { true }")])
            .unwrap();
        assert_eq!(ids.len(), 1);

        let results = store.search_fts("parse", 10, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ids[0]);
    }

    #[test]
    fn delete_by_path_removes_from_fts_too() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        store.insert_chunks(vec![chunk("a.rs", "fn widget_factory() {}")]).unwrap();

        let removed = store.delete_chunks_by_path("a.rs").unwrap();
        assert_eq!(removed.len(), 1);

        let results = store.search_fts("widget", 10, None).unwrap();
        assert!(results.is_empty());
        store.check_integrity().unwrap();
    }

    #[test]
    fn extension_filter_restricts_results() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        store
            .insert_chunks(vec![
                chunk("a.rs", "fn handler_thing() {}"),
                chunk("b.py", "def handler_thing(): pass"),
            ])
            .unwrap();

        let filtered = store
            .search_fts("handler", 10, Some(&["py".to_string()]))
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn clear_empties_both_tables() {
        let store = SqliteChunkStore::open_in_memory().unwrap();
        store.insert_chunks(vec![chunk("a.rs", "fn alpha_beta() {}")]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        store.check_integrity().unwrap();
    }
}
