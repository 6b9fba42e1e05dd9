//! Per-document embedding index persistence
//!
//! Each document's index is one SQLite file holding the vector blobs and the
//! chunk metadata in parallel rows. `publish` writes to a temporary file and
//! renames it into place, so an index either exists completely or not at all;
//! a load can never observe vectors without their chunks.

use crate::error::{Result, StudiumError};
use crate::ml::Embedding;
use crate::storage::schema::{
    CREATE_META_TABLE, CREATE_RECORDS_TABLE, META_CREATED_AT, META_DIMENSION, META_DOCUMENT_ID,
    META_SCHEMA_VERSION, SCHEMA_VERSION,
};
use crate::text::Chunk;
use crate::utils::sanitize_filename;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Addressable handle for one document's persisted index
///
/// Derived from the document id; safe to hand to the surrounding service and
/// store alongside its document row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    /// The owning document's id
    pub document_id: String,
    path: PathBuf,
}

impl IndexHandle {
    /// Filesystem location of the index
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("db.tmp")
    }
}

/// A fully loaded index: parallel vector and chunk arrays
#[derive(Debug, Clone)]
pub struct StoredIndex {
    /// One vector per chunk, in sequence order
    pub vectors: Vec<Embedding>,
    /// One chunk per vector, in sequence order
    pub chunks: Vec<Chunk>,
    /// Vector dimensionality recorded at publish time
    pub dimension: usize,
}

/// Directory of per-document index files
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    /// Open (creating if needed) an index store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Derive the handle a document's index is addressed by
    pub fn handle_for(&self, document_id: &str) -> IndexHandle {
        let file_name = format!("doc_{}.db", sanitize_filename(document_id));
        IndexHandle {
            document_id: document_id.to_string(),
            path: self.root.join(file_name),
        }
    }

    /// Persist a document's index, atomically
    ///
    /// Writes every record and the metadata into a temporary file, then
    /// renames it over the final path. On any failure the temporary file is
    /// discarded and no artifact becomes visible to `load`. Re-publishing a
    /// document replaces its previous index in the same atomic step.
    pub fn publish(
        &self,
        document_id: &str,
        vectors: &[Embedding],
        chunks: &[Chunk],
    ) -> Result<IndexHandle> {
        if vectors.len() != chunks.len() {
            return Err(StudiumError::Storage(format!(
                "vector/chunk length mismatch: {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        if vectors.is_empty() {
            return Err(StudiumError::Storage(
                "refusing to publish an empty index".to_string(),
            ));
        }
        let dimension = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dimension) {
            return Err(StudiumError::Storage(
                "vectors have inconsistent dimensions".to_string(),
            ));
        }

        let handle = self.handle_for(document_id);
        let temp_path = handle.temp_path();
        if temp_path.exists() {
            std::fs::remove_file(&temp_path)?;
        }

        let write_result = self.write_index(&temp_path, document_id, dimension, vectors, chunks);
        if let Err(e) = write_result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, handle.path())?;
        log::info!(
            "Published index for document '{}' ({} chunks, dimension {})",
            document_id,
            chunks.len(),
            dimension
        );
        Ok(handle)
    }

    fn write_index(
        &self,
        path: &Path,
        document_id: &str,
        dimension: usize,
        vectors: &[Embedding],
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut conn = Connection::open(path)?;
        conn.execute(CREATE_RECORDS_TABLE, [])?;
        conn.execute(CREATE_META_TABLE, [])?;

        let tx = conn.transaction()?;
        {
            let mut meta_stmt =
                tx.prepare("INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)")?;
            meta_stmt.execute(params![META_SCHEMA_VERSION, SCHEMA_VERSION.to_string()])?;
            meta_stmt.execute(params![META_DOCUMENT_ID, document_id])?;
            meta_stmt.execute(params![META_DIMENSION, dimension.to_string()])?;
            meta_stmt.execute(params![
                META_CREATED_AT,
                chrono::Utc::now().to_rfc3339()
            ])?;

            let mut record_stmt =
                tx.prepare("INSERT INTO records (seq, text, page, vector) VALUES (?, ?, ?, ?)")?;
            for (vector, chunk) in vectors.iter().zip(chunks.iter()) {
                let blob = bincode::serialize(vector).map_err(|e| {
                    StudiumError::Storage(format!("Failed to encode vector: {}", e))
                })?;
                record_stmt.execute(params![
                    chunk.sequence_index as i64,
                    chunk.text,
                    chunk.page.map(|p| p as i64),
                    blob,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a document's index
    ///
    /// A missing file, missing metadata, or an index with no records all mean
    /// the document is unprocessed: `IndexNotFound`, never a crash. Loading
    /// the same handle twice yields identical arrays.
    pub fn load(&self, handle: &IndexHandle) -> Result<StoredIndex> {
        if !handle.path().exists() {
            return Err(StudiumError::IndexNotFound(handle.document_id.clone()));
        }

        let conn = Connection::open(handle.path())?;

        let dimension: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                params![META_DIMENSION],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or(None);
        let Some(dimension) = dimension else {
            return Err(StudiumError::IndexNotFound(handle.document_id.clone()));
        };
        let dimension: usize = dimension
            .parse()
            .map_err(|_| StudiumError::Storage("corrupt dimension metadata".to_string()))?;

        let mut stmt = match conn.prepare("SELECT seq, text, page, vector FROM records ORDER BY seq")
        {
            Ok(stmt) => stmt,
            // No records table means the artifact is not a published index
            Err(_) => return Err(StudiumError::IndexNotFound(handle.document_id.clone())),
        };

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut vectors = Vec::new();
        let mut chunks = Vec::new();
        for row in rows {
            let (seq, text, page, blob) = row?;
            let vector: Embedding = bincode::deserialize(&blob)
                .map_err(|e| StudiumError::Storage(format!("Failed to decode vector: {}", e)))?;
            if vector.len() != dimension {
                return Err(StudiumError::Storage(format!(
                    "record {} has dimension {} but index records {}",
                    seq,
                    vector.len(),
                    dimension
                )));
            }
            vectors.push(vector);
            chunks.push(Chunk {
                text,
                sequence_index: seq as usize,
                page: page.map(|p| p as u32),
            });
        }

        if chunks.is_empty() {
            return Err(StudiumError::IndexNotFound(handle.document_id.clone()));
        }

        log::debug!(
            "Loaded index for document '{}' ({} chunks)",
            handle.document_id,
            chunks.len()
        );
        Ok(StoredIndex {
            vectors,
            chunks,
            dimension,
        })
    }

    /// Remove a document's index
    ///
    /// Deleting an absent index is a no-op so cleanup can be retried safely.
    pub fn delete(&self, handle: &IndexHandle) -> Result<()> {
        for path in [handle.path().to_path_buf(), handle.temp_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Deleted index artifact {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
