use crate::index::TfIdfIndex;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_documents: u32,
    pub num_paragraphs: u32,
    pub num_terms: u32,
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
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write the index body and its header. The body lands via rename so a reader never sees
/// a half-written snapshot.
pub fn save_snapshot(paths: &IndexPaths, index: &TfIdfIndex) -> Result<MetaFile> {
    create_dir_all(&paths.root)
        .with_context(|| format!("creating snapshot dir {}", paths.root.display()))?;
    let tmp = NamedTempFile::new_in(&paths.root)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        bincode::serialize_into(&mut writer, index)?;
        writer.flush()?;
    }
    tmp.persist(paths.index())?;

    let meta = MetaFile {
        num_documents: index.num_documents(),
        num_paragraphs: index.num_paragraphs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<TfIdfIndex> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        bail!("snapshot version {} unsupported (expected {})", meta.version, SNAPSHOT_VERSION);
    }
    let f = File::open(paths.index())
        .with_context(|| format!("opening {}", paths.index().display()))?;
    let index: TfIdfIndex = bincode::deserialize_from(BufReader::new(f))?;
    if index.num_paragraphs() != meta.num_paragraphs as usize {
        bail!("snapshot body does not match meta.json");
    }
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())
        .with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
