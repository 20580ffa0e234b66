//! Append-only edit log sidecars.
//!
//! Vertices and edges created through the API are appended to
//! `custom_vertices.csv` and `custom_edges.csv` under the data path and
//! replayed by the loader on the next startup. Each append opens, writes,
//! syncs and closes the file; no handle is kept between writes. The header
//! row is written only when the file does not exist yet, and a record never
//! starts on a line left unterminated by an earlier writer.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Vertex sidecar file name.
pub const VERTEX_LOG_FILE: &str = "custom_vertices.csv";

/// Edge sidecar file name.
pub const EDGE_LOG_FILE: &str = "custom_edges.csv";

/// Identifier column of the vertex sidecar.
pub const VERTEX_ID_COLUMN: &str = "id";

const VERTEX_LOG_HEADER: [&str; 3] = ["id", "name", "type"];
const EDGE_LOG_HEADER: [&str; 3] = ["src", "dst", "type"];

/// Error type for edit log appends.
#[derive(Debug, thiserror::Error)]
pub enum EditLogError {
    /// Opening, writing or syncing the sidecar failed.
    #[error("Failed to append to {}: {source}", path.display())]
    Io {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Encoding the record failed.
    #[error("Failed to encode record for {}: {source}", path.display())]
    Encode {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
}

/// One vertex creation: `id, name, type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Vertex identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Type label.
    #[serde(rename = "type")]
    pub vertex_type: String,
}

/// One edge creation: `src, dst, type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Source identifier.
    pub src: String,
    /// Target identifier.
    pub dst: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// A single sidecar file with its own writer lock.
#[derive(Debug)]
struct Sidecar {
    path: PathBuf,
    header: [&'static str; 3],
    lock: Mutex<()>,
}

impl Sidecar {
    fn new(path: PathBuf, header: [&'static str; 3]) -> Self {
        Self { path, header, lock: Mutex::new(()) }
    }

    /// Append one record, writing the header first if the file is new.
    ///
    /// `apply` runs after the record is synced and before the sidecar lock
    /// is released, so changes made there happen in log order. Returns
    /// whether the header was written together with `apply`'s result.
    fn append<T: Serialize, R>(
        &self,
        record: &T,
        apply: impl FnOnce() -> R,
    ) -> Result<(bool, R), EditLogError> {
        let _guard = self.lock.lock();

        let is_new = !self.path.exists();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(Vec::new());
        if is_new {
            writer.write_record(self.header).map_err(|e| self.encode_error(e))?;
        }
        writer.serialize(record).map_err(|e| self.encode_error(e))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        if !is_new && !ends_with_newline(&mut file).map_err(|e| self.io_error(e))? {
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }
        file.write_all(&bytes).map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))?;

        Ok((is_new, apply()))
    }

    fn io_error(&self, source: std::io::Error) -> EditLogError {
        EditLogError::Io { path: self.path.clone(), source }
    }

    fn encode_error(&self, source: csv::Error) -> EditLogError {
        EditLogError::Encode { path: self.path.clone(), source }
    }
}

/// Whether `file` is empty or its last byte is a line feed.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.seek(SeekFrom::End(0))? == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Writer for the two edit log sidecars under a data path.
///
/// Appends to the same sidecar are serialized; vertex and edge appends do
/// not block each other. A successful return means the record has been
/// synced to disk.
#[derive(Debug)]
pub struct EditLog {
    vertices: Sidecar,
    edges: Sidecar,
}

impl EditLog {
    /// Bind the sidecars under `data_path`. Nothing is created until the
    /// first append.
    pub fn open(data_path: &Path) -> Self {
        Self {
            vertices: Sidecar::new(data_path.join(VERTEX_LOG_FILE), VERTEX_LOG_HEADER),
            edges: Sidecar::new(data_path.join(EDGE_LOG_FILE), EDGE_LOG_HEADER),
        }
    }

    /// Append a vertex creation.
    pub fn append_vertex(&self, record: &VertexRecord) -> Result<(), EditLogError> {
        self.append_vertex_and(record, || ())
    }

    /// Append a vertex creation, then run `apply` while appends to the
    /// vertex sidecar are still held off.
    ///
    /// Callers mirror the record into memory from `apply` so the in-memory
    /// order of same-identifier upserts matches the order a replay sees.
    pub fn append_vertex_and<R>(
        &self,
        record: &VertexRecord,
        apply: impl FnOnce() -> R,
    ) -> Result<R, EditLogError> {
        let (created, applied) = self.vertices.append(record, apply)?;
        if created {
            tracing::info!(path = %self.vertices.path.display(), "Created vertex edit log");
        }
        Ok(applied)
    }

    /// Append an edge creation.
    pub fn append_edge(&self, record: &EdgeRecord) -> Result<(), EditLogError> {
        self.append_edge_and(record, || ())
    }

    /// Append an edge creation, then run `apply` under the edge sidecar lock.
    pub fn append_edge_and<R>(
        &self,
        record: &EdgeRecord,
        apply: impl FnOnce() -> R,
    ) -> Result<R, EditLogError> {
        let (created, applied) = self.edges.append(record, apply)?;
        if created {
            tracing::info!(path = %self.edges.path.display(), "Created edge edit log");
        }
        Ok(applied)
    }

    /// Vertex sidecar path.
    pub fn vertex_path(&self) -> &Path {
        &self.vertices.path
    }

    /// Edge sidecar path.
    pub fn edge_path(&self) -> &Path {
        &self.edges.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn vertex(id: &str) -> VertexRecord {
        VertexRecord {
            id: id.to_string(),
            name: format!("Name of {id}"),
            vertex_type: "Organization".to_string(),
        }
    }

    #[test]
    fn test_first_append_writes_header_once() {
        let dir = tempdir().unwrap();
        let log = EditLog::open(dir.path());

        log.append_vertex(&vertex("a")).unwrap();
        let content = fs::read_to_string(log.vertex_path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec![
            "\"id\",\"name\",\"type\"",
            "\"a\",\"Name of a\",\"Organization\"",
        ]);

        log.append_vertex(&vertex("b")).unwrap();
        let content = fs::read_to_string(log.vertex_path()).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("\"id\",\"name\",\"type\"").count(), 1);
    }

    #[test]
    fn test_existing_file_gets_no_header() {
        let dir = tempdir().unwrap();
        let log = EditLog::open(dir.path());
        fs::write(log.edge_path(), "\"src\",\"dst\",\"type\"\n").unwrap();

        log.append_edge(&EdgeRecord {
            src: "a".to_string(),
            dst: "b".to_string(),
            rel_type: "knows".to_string(),
        })
        .unwrap();

        let content = fs::read_to_string(log.edge_path()).unwrap();
        assert_eq!(content, "\"src\",\"dst\",\"type\"\n\"a\",\"b\",\"knows\"\n");
    }

    #[test]
    fn test_unterminated_last_line_is_closed_before_append() {
        let dir = tempdir().unwrap();
        let log = EditLog::open(dir.path());
        fs::write(log.vertex_path(), "\"id\",\"name\",\"type\"\n\"a\",\"Alpha\",\"City\"").unwrap();

        log.append_vertex(&VertexRecord {
            id: "b".to_string(),
            name: "Beta".to_string(),
            vertex_type: "City".to_string(),
        })
        .unwrap();

        let content = fs::read_to_string(log.vertex_path()).unwrap();
        assert_eq!(
            content,
            "\"id\",\"name\",\"type\"\n\"a\",\"Alpha\",\"City\"\n\"b\",\"Beta\",\"City\"\n"
        );

        let mut reader = csv::Reader::from_path(log.vertex_path()).unwrap();
        let rows: Vec<VertexRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vertex_type, "City");
        assert_eq!(rows[1].id, "b");
    }

    #[test]
    fn test_apply_sees_the_synced_record() {
        let dir = tempdir().unwrap();
        let log = EditLog::open(dir.path());
        let path = log.vertex_path().to_path_buf();

        let seen = log
            .append_vertex_and(&vertex("a"), || fs::read_to_string(&path).unwrap())
            .unwrap();
        assert!(seen.ends_with("\"a\",\"Name of a\",\"Organization\"\n"));
    }

    #[test]
    fn test_embedded_quotes_are_escaped() {
        let dir = tempdir().unwrap();
        let log = EditLog::open(dir.path());
        log.append_vertex(&VertexRecord {
            id: "q".to_string(),
            name: "The \"Quoted\", Inc".to_string(),
            vertex_type: "Organization".to_string(),
        })
        .unwrap();

        let mut reader = csv::Reader::from_path(log.vertex_path()).unwrap();
        let row: VertexRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(row.name, "The \"Quoted\", Inc");
    }

    #[test]
    fn test_concurrent_appends_stay_whole() {
        let dir = tempdir().unwrap();
        let log = Arc::new(EditLog::open(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.append_edge(&EdgeRecord {
                            src: format!("s{t}-{i}"),
                            dst: format!("d{t}-{i}"),
                            rel_type: "x".to_string(),
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut reader = csv::Reader::from_path(log.edge_path()).unwrap();
        let rows: Vec<EdgeRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 200);
    }
}
