/// Content sources accepted by the hasher.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{Result, VerifyError};

#[derive(Debug, Clone)]
pub enum ContentSource {
    /// In-memory content with a display name.
    Bytes { name: String, data: Arc<[u8]> },
    /// A regular file on disk.
    File(PathBuf),
}

impl ContentSource {
    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Name reported in hasher events.
    pub fn name(&self) -> String {
        match self {
            Self::Bytes { name, .. } => name.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }

    pub async fn size(&self) -> Result<u64> {
        match self {
            Self::Bytes { data, .. } => Ok(data.len() as u64),
            Self::File(path) => {
                let meta = tokio::fs::metadata(path).await?;
                if !meta.is_file() {
                    return Err(VerifyError::InvalidParameter(format!(
                        "{} is not a regular file",
                        path.display()
                    )));
                }
                Ok(meta.len())
            }
        }
    }

    pub(crate) async fn open(&self) -> Result<ContentReader> {
        match self {
            Self::Bytes { data, .. } => Ok(ContentReader::Memory {
                data: data.clone(),
                pos: 0,
            }),
            Self::File(path) => Ok(ContentReader::File(File::open(path).await?)),
        }
    }
}

/// Sequential chunk reader over a content source.
pub(crate) enum ContentReader {
    Memory { data: Arc<[u8]>, pos: usize },
    File(File),
}

impl ContentReader {
    /// Read up to `max` bytes; an empty chunk means end of content.
    pub(crate) async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>> {
        match self {
            Self::Memory { data, pos } => {
                let end = (*pos + max).min(data.len());
                let chunk = data[*pos..end].to_vec();
                *pos = end;
                Ok(chunk)
            }
            Self::File(file) => {
                let mut buf = vec![0u8; max];
                let mut filled = 0;
                // A single read may return short; fill the chunk unless at EOF.
                while filled < max {
                    let n = file.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf.truncate(filled);
                Ok(buf)
            }
        }
    }
}
