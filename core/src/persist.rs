use crate::error::{Error, Result};
use crate::index::{GlobalIndex, Table};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const BLOCK_DIR: &str = "blocks";
pub const BLOCK_PREFIX: &str = "block";
pub const EXTENSION: &str = ".bin.gz";
pub const INDEX_FILE: &str = "index.bin.gz";
pub const META_FILE: &str = "index.meta.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub num_blocks: usize,
    pub block_size: usize,
    pub stemming: bool,
    pub upper: i64,
    pub lower: i64,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn blocks_dir(&self) -> PathBuf { self.root.join(BLOCK_DIR) }
    pub fn block_file(&self, id: usize) -> PathBuf { self.blocks_dir().join(format!("{BLOCK_PREFIX}{id}{EXTENSION}")) }
    pub fn index_file(&self) -> PathBuf { self.root.join(INDEX_FILE) }
    pub fn meta(&self) -> PathBuf { self.root.join(META_FILE) }
}

/// Metadata file written next to `index_file`.
pub fn meta_path_for(index_file: &Path) -> PathBuf {
    index_file.with_file_name(META_FILE)
}

/// Everything `index` writes for `index_file`: the block directory beside
/// it, the index itself and its metadata.
pub fn index_outputs(index_file: &Path) -> Vec<PathBuf> {
    vec![parent_dir(index_file).join(BLOCK_DIR), index_file.to_path_buf(), meta_path_for(index_file)]
}

/// Which error class an I/O failure on a table file maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Block,
    Index,
}

impl TableKind {
    fn io_error(self, path: &Path, source: io::Error) -> Error {
        let path = path.to_path_buf();
        match self {
            TableKind::Block => Error::BlockIo { path, source },
            TableKind::Index => Error::IndexIo { path, source },
        }
    }

    fn codec_error(self, path: &Path, err: bincode::Error) -> Error {
        match *err {
            bincode::ErrorKind::Io(source) => self.io_error(path, source),
            other => Error::Format { path: path.to_path_buf(), message: other.to_string() },
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Writes `table` gzip-compressed to a temporary file next to `path`, then
/// renames it into place. On error nothing is left at `path`.
pub fn save_table(path: &Path, table: &Table, kind: TableKind) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| kind.io_error(dir, e))?;
    let tmp = NamedTempFile::new_in(dir).map_err(|e| kind.io_error(path, e))?;

    let mut encoder = GzEncoder::new(BufWriter::new(tmp), Compression::default());
    bincode::serialize_into(&mut encoder, table).map_err(|e| kind.codec_error(path, e))?;
    let mut writer = encoder.finish().map_err(|e| kind.io_error(path, e))?;
    writer.flush().map_err(|e| kind.io_error(path, e))?;
    let tmp = writer.into_inner().map_err(|e| kind.io_error(path, e.into_error()))?;
    tmp.persist(path).map_err(|e| kind.io_error(path, e.error))?;
    Ok(())
}

pub fn load_table(path: &Path, kind: TableKind) -> Result<Table> {
    let f = File::open(path).map_err(|e| kind.io_error(path, e))?;
    let decoder = GzDecoder::new(BufReader::new(f));
    let table: Table = bincode::deserialize_from(decoder).map_err(|e| kind.codec_error(path, e))?;
    table.validate().map_err(|message| Error::Format { path: path.to_path_buf(), message })?;
    Ok(table)
}

pub fn load_index(path: &Path) -> Result<GlobalIndex> {
    let table = load_table(path, TableKind::Index)?;
    GlobalIndex::new(table).map_err(|message| Error::Format { path: path.to_path_buf(), message })
}

fn block_id(file_name: &str) -> Option<usize> {
    file_name.strip_prefix(BLOCK_PREFIX)?.strip_suffix(EXTENSION)?.parse().ok()
}

/// Block files in `dir`, ordered by numeric block id; names without an id
/// come last, by name. A missing directory holds no blocks.
pub fn list_blocks(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TableKind::Block.io_error(dir, e)),
    };
    let mut blocks: Vec<(Option<usize>, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TableKind::Block.io_error(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(BLOCK_PREFIX) || !name.ends_with(EXTENSION) {
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        blocks.push((block_id(&name), name, entry.path()));
    }
    blocks.sort_by(|a, b| (a.0.is_none(), a.0, &a.1).cmp(&(b.0.is_none(), b.0, &b.1)));
    Ok(blocks.into_iter().map(|(_, _, path)| path).collect())
}

/// Removes block files left by an earlier run.
pub fn clear_blocks(dir: &Path) -> Result<usize> {
    let blocks = list_blocks(dir)?;
    for path in &blocks {
        fs::remove_file(path).map_err(|e| TableKind::Block.io_error(path, e))?;
    }
    Ok(blocks.len())
}

pub fn save_meta(path: &Path, meta: &MetaFile) -> Result<()> {
    let io_err = |source: io::Error| Error::IndexIo { path: path.to_path_buf(), source };
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(io_err)?;
    let json = serde_json::to_string_pretty(meta).map_err(|e| io_err(e.into()))?;
    let mut f = File::create(path).map_err(io_err)?;
    f.write_all(json.as_bytes()).map_err(io_err)?;
    Ok(())
}

pub fn load_meta(path: &Path) -> Result<MetaFile> {
    let buf = fs::read_to_string(path).map_err(|source| Error::IndexIo { path: path.to_path_buf(), source })?;
    serde_json::from_str(&buf).map_err(|e| Error::Format { path: path.to_path_buf(), message: e.to_string() })
}
