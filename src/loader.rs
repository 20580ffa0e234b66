//! Bulk loading of base datasets and edit log overlays.
//!
//! Startup is strictly sequential: every base vertex file, then the base
//! edges file, then the `custom_vertices.csv` / `custom_edges.csv` overlays
//! written by the edit log. A missing or unparsable base file aborts startup;
//! serving a silently incomplete graph is worse than refusing to start.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::OverlayEdgePolicy;
use crate::edit_log::{EDGE_LOG_FILE, VERTEX_ID_COLUMN, VERTEX_LOG_FILE};
use crate::store::GraphStore;

/// Base vertex files (without the `.csv` extension), in load order.
pub const DEFAULT_VERTEX_FILES: &[&str] = &[
    "City",
    "Country",
    "Region",
    "Advisor",
    "Category",
    "Founder",
    "FundingRound",
    "HQ",
    "keywords",
    "Member",
    "Office",
    "organizations",
    "PrimaryImage",
    "TeamMember",
    "Website",
    "companies_acquired_by_sap",
];

/// Identifier column candidates of the base vertex files.
pub const DEFAULT_ID_COLUMNS: &[&str] = &["path", "url"];

/// Base edges file.
pub const DEFAULT_EDGES_FILE: &str = "edges_dump.csv";

/// Fatal error raised while building the startup graph.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// A required base dataset file does not exist.
    #[error("Required dataset file missing: {}", path.display())]
    MissingFile {
        /// Expected location.
        path: PathBuf,
    },
    /// A dataset file could not be opened or parsed.
    #[error("Failed to parse {}: {source}", path.display())]
    Csv {
        /// Offending file.
        path: PathBuf,
        /// Underlying reader error.
        #[source]
        source: csv::Error,
    },
    /// A vertex file has none of the identifier columns.
    #[error("No identifier column in {} (expected one of {candidates:?})", path.display())]
    MissingIdColumn {
        /// Offending file.
        path: PathBuf,
        /// Accepted identifier columns.
        candidates: Vec<String>,
    },
    /// The data path itself is not accessible.
    #[error("Cannot read data path {}: {source}", path.display())]
    Io {
        /// Data path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), source }
    }
}

/// Which files make up the base dataset and how to read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Vertex file stems, loaded in order.
    pub vertex_files: Vec<String>,
    /// Identifier column candidates for base vertex files.
    pub id_columns: Vec<String>,
    /// Base edges file name.
    pub edges_file: String,
    /// Delimiter of the base edges file.
    pub edge_delimiter: u8,
    /// Replay policy for `custom_edges.csv`.
    pub overlay_edge_policy: OverlayEdgePolicy,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            vertex_files: DEFAULT_VERTEX_FILES.iter().map(|s| s.to_string()).collect(),
            id_columns: DEFAULT_ID_COLUMNS.iter().map(|s| s.to_string()).collect(),
            edges_file: DEFAULT_EDGES_FILE.to_string(),
            edge_delimiter: b',',
            overlay_edge_policy: OverlayEdgePolicy::default(),
        }
    }
}

/// Summary of a completed startup load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Base vertex files read.
    pub vertex_files: usize,
    /// Vertex rows applied from base files.
    pub vertex_rows: usize,
    /// Relationships added from the base edges file.
    pub relationships: usize,
    /// Vertex rows replayed from the overlay.
    pub overlay_vertices: usize,
    /// Edge rows replayed from the overlay.
    pub overlay_edges: usize,
    /// Overlay edge rows skipped because the relationship already existed.
    pub skipped_duplicate_edges: usize,
    /// Total distinct vertices after loading.
    pub vertices: usize,
    /// Wall-clock load time.
    pub elapsed_ms: u64,
}

/// Parses CSV datasets into a [`GraphStore`].
pub struct BulkLoader<'a> {
    store: &'a mut GraphStore,
}

impl<'a> BulkLoader<'a> {
    /// Create a loader writing into `store`.
    pub fn new(store: &'a mut GraphStore) -> Self {
        Self { store }
    }

    /// Load a vertex file.
    ///
    /// Header names become property keys. The first column named in
    /// `id_columns` that appears in the header holds the identifier; every
    /// other non-empty cell is written with last-write-wins semantics.
    /// Returns the number of rows applied.
    pub fn load_vertices<S: AsRef<str>>(
        &mut self,
        path: &Path,
        id_columns: &[S],
    ) -> Result<usize, StartupError> {
        let mut reader = open_reader(path, b',')?;
        let headers = reader
            .headers()
            .map_err(|e| StartupError::csv(path, e))?
            .clone();

        let id_col = id_columns
            .iter()
            .find_map(|c| headers.iter().position(|h| h.trim() == c.as_ref()))
            .ok_or_else(|| StartupError::MissingIdColumn {
                path: path.to_path_buf(),
                candidates: id_columns.iter().map(|c| c.as_ref().to_string()).collect(),
            })?;

        let mut applied = 0;
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StartupError::csv(path, e))?;

            let id = record.get(id_col).map(str::trim).unwrap_or("");
            if id.is_empty() {
                warn!(file = %path.display(), row = line + 1, "Skipping vertex row without identifier");
                continue;
            }

            let idx = self.store.get_or_create_vertex(id);
            for (col, value) in record.iter().enumerate() {
                if col == id_col || value.is_empty() {
                    continue;
                }
                if let Some(key) = headers.get(col) {
                    self.store.set_property(idx, key.trim(), value);
                }
            }
            applied += 1;
        }

        debug!(file = %path.display(), rows = applied, "Loaded vertex file");
        Ok(applied)
    }

    /// Load an edges file of `(source, target, type[, ...])` rows.
    ///
    /// Every row adds a relationship; duplicates are kept.
    pub fn load_edges(&mut self, path: &Path, delimiter: u8) -> Result<usize, StartupError> {
        let (added, _) = self.read_edges(path, delimiter, OverlayEdgePolicy::Append)?;
        Ok(added)
    }

    /// Replay an edge overlay under the given policy.
    ///
    /// Returns `(added, skipped)`.
    pub fn replay_edges(
        &mut self,
        path: &Path,
        delimiter: u8,
        policy: OverlayEdgePolicy,
    ) -> Result<(usize, usize), StartupError> {
        self.read_edges(path, delimiter, policy)
    }

    fn read_edges(
        &mut self,
        path: &Path,
        delimiter: u8,
        policy: OverlayEdgePolicy,
    ) -> Result<(usize, usize), StartupError> {
        let mut reader = open_reader(path, delimiter)?;
        let headers = reader
            .headers()
            .map_err(|e| StartupError::csv(path, e))?
            .clone();

        let mut added = 0;
        let mut skipped = 0;
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StartupError::csv(path, e))?;

            let (source, target) = match (record.get(0), record.get(1)) {
                (Some(s), Some(t)) if !s.trim().is_empty() && !t.trim().is_empty() => (s.trim(), t.trim()),
                _ => {
                    warn!(file = %path.display(), row = line + 1, "Skipping edge row without both endpoints");
                    continue;
                }
            };
            let rel_type = record.get(2).map(str::trim).unwrap_or("");

            if policy == OverlayEdgePolicy::Dedupe && self.store.has_relationship(source, target, rel_type) {
                skipped += 1;
                continue;
            }

            let properties: BTreeMap<String, String> = record
                .iter()
                .enumerate()
                .skip(3)
                .filter(|(_, value)| !value.is_empty())
                .filter_map(|(col, value)| headers.get(col).map(|key| (key.trim().to_string(), value.to_string())))
                .collect();

            self.store.add_relationship_with(source, target, rel_type, properties);
            added += 1;
        }

        debug!(file = %path.display(), added, skipped, "Loaded edge file");
        Ok((added, skipped))
    }
}

fn open_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<std::fs::File>, StartupError> {
    if !path.is_file() {
        return Err(StartupError::MissingFile { path: path.to_path_buf() });
    }

    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StartupError::csv(path, e))
}

/// Build the startup graph from `data_path`.
///
/// Loads every base file in `layout`, then replays the edit log overlays if
/// present.
pub fn load_dataset(
    data_path: &Path,
    layout: &DatasetLayout,
) -> Result<(GraphStore, LoadReport), StartupError> {
    let start = Instant::now();
    std::fs::read_dir(data_path).map_err(|source| StartupError::Io {
        path: data_path.to_path_buf(),
        source,
    })?;

    let mut store = GraphStore::new();
    let mut report = LoadReport::default();

    {
        let mut loader = BulkLoader::new(&mut store);

        for stem in &layout.vertex_files {
            let path = data_path.join(format!("{stem}.csv"));
            report.vertex_rows += loader.load_vertices(&path, &layout.id_columns)?;
            report.vertex_files += 1;
        }

        report.relationships =
            loader.load_edges(&data_path.join(&layout.edges_file), layout.edge_delimiter)?;

        let vertex_overlay = data_path.join(VERTEX_LOG_FILE);
        if vertex_overlay.is_file() {
            report.overlay_vertices = loader.load_vertices(&vertex_overlay, &[VERTEX_ID_COLUMN])?;
        }

        let edge_overlay = data_path.join(EDGE_LOG_FILE);
        if edge_overlay.is_file() {
            let (added, skipped) =
                loader.replay_edges(&edge_overlay, b',', layout.overlay_edge_policy)?;
            report.overlay_edges = added;
            report.skipped_duplicate_edges = skipped;
        }
    }

    report.vertices = store.vertex_count();
    report.elapsed_ms = start.elapsed().as_millis() as u64;

    info!(
        vertices = report.vertices,
        relationships = store.relationship_count(),
        overlay_vertices = report.overlay_vertices,
        overlay_edges = report.overlay_edges,
        skipped_duplicate_edges = report.skipped_duplicate_edges,
        elapsed_ms = report.elapsed_ms,
        "Parsed all datasets"
    );

    Ok((store, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_vertices_selects_first_id_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("City.csv");
        fs::write(&path, "url,path,name,type\nu1,p1,Berlin,City\nu2,p2,Paris,City\n").unwrap();

        let mut store = GraphStore::new();
        let rows = BulkLoader::new(&mut store).load_vertices(&path, &["path", "url"]).unwrap();

        assert_eq!(rows, 2);
        let berlin = store.get_vertex("p1").unwrap();
        assert_eq!(berlin.alias(), "Berlin");
        assert_eq!(berlin.property("url"), Some("u1"));
        // The identifier column is not stored as a property
        assert_eq!(berlin.property("path"), None);
    }

    #[test]
    fn test_load_vertices_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        let mut store = GraphStore::new();
        let err = BulkLoader::new(&mut store)
            .load_vertices(&dir.path().join("Nope.csv"), &["id"])
            .unwrap_err();
        assert!(matches!(err, StartupError::MissingFile { .. }));
    }

    #[test]
    fn test_load_vertices_without_id_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Bad.csv");
        fs::write(&path, "name,type\nBerlin,City\n").unwrap();

        let mut store = GraphStore::new();
        let err = BulkLoader::new(&mut store).load_vertices(&path, &["id"]).unwrap_err();
        assert!(matches!(err, StartupError::MissingIdColumn { .. }));
    }

    #[test]
    fn test_load_vertices_skips_blank_ids_and_keeps_existing_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.csv");
        fs::write(&path, "id,name,type\na,Alpha,City\n,Ghost,City\na,,Region\n").unwrap();

        let mut store = GraphStore::new();
        let rows = BulkLoader::new(&mut store).load_vertices(&path, &["id"]).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(store.vertex_count(), 1);
        let a = store.get_vertex("a").unwrap();
        assert_eq!(a.alias(), "Alpha");
        assert_eq!(a.vertex_type(), "Region");
    }

    #[test]
    fn test_load_edges_keeps_duplicates_and_properties() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        fs::write(
            &path,
            "src\tdst\ttype\tsince\na\tb\tknows\t2019\na\tb\tknows\t\nc\n",
        )
        .unwrap();

        let mut store = GraphStore::new();
        let added = BulkLoader::new(&mut store).load_edges(&path, b'\t').unwrap();

        assert_eq!(added, 2);
        assert_eq!(store.relationship_count(), 2);
        let a = store.index_of("a").unwrap();
        assert_eq!(store.outgoing(a)[0].properties.get("since").map(String::as_str), Some("2019"));
        assert!(store.outgoing(a)[1].properties.is_empty());
        // Malformed row did not create a vertex
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_replay_edges_dedupe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom_edges.csv");
        fs::write(&path, "\"src\",\"dst\",\"type\"\n\"a\",\"b\",\"x\"\n\"a\",\"b\",\"x\"\n").unwrap();

        let mut store = GraphStore::new();
        store.add_relationship("a", "b", "x");

        let (added, skipped) = BulkLoader::new(&mut store)
            .replay_edges(&path, b',', OverlayEdgePolicy::Dedupe)
            .unwrap();
        assert_eq!((added, skipped), (0, 2));
        assert_eq!(store.relationship_count(), 1);

        let (added, skipped) = BulkLoader::new(&mut store)
            .replay_edges(&path, b',', OverlayEdgePolicy::Append)
            .unwrap();
        assert_eq!((added, skipped), (2, 0));
        assert_eq!(store.relationship_count(), 3);
    }
}
