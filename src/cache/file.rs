use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{BlobStore, CacheError};

/// Blob store keeping one `<key>.json` file per key in a directory.
///
/// Writes go to a temp file that is synced and renamed over the target, so a
/// crash leaves either the old or the new snapshot, never a torn one.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }
    /// Characters outside `[A-Za-z0-9_.-]` become `_`, so keys differing only
    /// in those characters (`a/b` and `a_b`) share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        let written = write_synced(&tmp_path, value.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e)));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut file = File::create(path).map_err(|e| io_err(path, e))?;
    file.write_all(bytes).map_err(|e| io_err(path, e))?;
    file.sync_all().map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, err: std::io::Error) -> CacheError {
    CacheError::Storage(format!("{}: {}", path.display(), err))
}
