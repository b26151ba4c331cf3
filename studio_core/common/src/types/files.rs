use serde::Deserialize;
use std::path::PathBuf;

/// One file staged for upload. Batch entries are keyed by `name`; a
/// later entry with the same name replaces the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl FileEntry {
    pub fn in_memory(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            size,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn from_path(name: impl Into<String>, size: u64, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            size,
            source: FileSource::Path(path),
        }
    }
}

/// Server acknowledgement of a batch upload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub uploaded: usize,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Downloaded local-agent artifact plus its suggested filename.
#[derive(Debug, Clone)]
pub struct AgentArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}
