//! Local filesystem resource

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use logval_types::LogSource;

use crate::error::{Result, SourceError};
use crate::resource::{Delta, FileEntry, Resource, SourceDir};

/// Reads sources on the local filesystem (`file://` URLs or bare paths)
#[derive(Clone, Debug, Default)]
pub struct LocalResource;

impl LocalResource {
    pub fn new() -> Self {
        Self
    }

    /// Turn a source URL into a local path
    fn local_path(source: &LogSource) -> Result<PathBuf> {
        if !source.url.contains("://") {
            return Ok(PathBuf::from(&source.url));
        }

        let url = Url::parse(&source.url)
            .map_err(|e| SourceError::unavailable(&source.url, e.to_string()))?;
        if url.scheme() != "file" {
            return Err(SourceError::unavailable(
                &source.url,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        url.to_file_path()
            .map_err(|_| SourceError::unavailable(&source.url, "not a local file URL"))
    }
}

impl Resource for LocalResource {
    fn resolve_directory(&self, source: &LogSource) -> Result<SourceDir> {
        if source.credential.is_some() {
            debug!(url = %source.url, "credential not used by local resource");
        }

        let path = Self::local_path(source)?;
        let metadata =
            fs::metadata(&path).map_err(|e| SourceError::unavailable(&source.url, e.to_string()))?;

        let dir = if metadata.is_dir() {
            path
        } else {
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        let dir = std::path::absolute(&dir).map_err(|e| SourceError::io(&dir, e))?;

        let url = Url::from_directory_path(&dir)
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| dir.display().to_string());

        debug!(url = %url, "resolved source directory");
        Ok(SourceDir {
            url,
            path: dir,
            credential: source.credential.clone(),
        })
    }

    fn list_files(&self, dir: &SourceDir) -> Result<Vec<FileEntry>> {
        let entries = fs::read_dir(&dir.path)
            .map_err(|e| SourceError::unavailable(&dir.url, e.to_string()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::io(&dir.path, e))?;
            let path = entry.path();
            // Follow symlinks; entries that vanished mid-listing are skipped
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                len: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn read_delta(&self, path: &Path, from_offset: u64, max_len: u64) -> Result<Delta> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Delta {
                    bytes: Vec::new(),
                    new_offset: from_offset,
                });
            }
            Err(e) => return Err(SourceError::io(path, e)),
        };

        let len = file.metadata().map_err(|e| SourceError::io(path, e))?.len();
        if len < from_offset {
            return Err(SourceError::Stale {
                path: path.to_path_buf(),
                offset: from_offset,
                len,
            });
        }
        if len == from_offset {
            return Ok(Delta {
                bytes: Vec::new(),
                new_offset: from_offset,
            });
        }

        file.seek(SeekFrom::Start(from_offset))
            .map_err(|e| SourceError::io(path, e))?;

        // Bytes written after the length check are left for the next read
        let want = (len - from_offset).min(max_len);
        let mut bytes = Vec::with_capacity(want as usize);
        file.take(want)
            .read_to_end(&mut bytes)
            .map_err(|e| SourceError::io(path, e))?;

        Ok(Delta {
            new_offset: from_offset + bytes.len() as u64,
            bytes,
        })
    }
}
