//! FileMedium - single-file durable medium.
//!
//! The whole map lives in one file that is rewritten on every mutation via a
//! temporary file and a rename, so a crash leaves either the old or the new
//! contents on disk.
//!
//! Layout (version 2): `DAYX` magic, one version byte, then the bitcode
//! encoding of `Vec<(date, document)>`.
//!
//! Version 1 files are a plain JSON record array. They are read once; each
//! element is kept verbatim under its `date` and the file is rewritten in
//! the current layout on the next mutation. An element without a `date`
//! fails the open rather than being dropped.

use std::collections::BTreeMap;
use std::fs;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{debug, info};
use serde_json::Value;

use super::RecordMedium;
use crate::error::StoreError;

const MAGIC: &[u8; 4] = b"DAYX";
const TMP_SUFFIX: &str = ".dayx-tmp";

/// Current on-disk layout version.
pub const FILE_FORMAT_VERSION: u8 = 2;

type Documents = BTreeMap<String, Vec<u8>>;

/// File-backed medium. Reads are served from memory; writes go to disk
/// first and are applied in memory only once the file has been replaced.
pub struct FileMedium {
    path: PathBuf,
    documents: RwLock<Documents>,
}

impl FileMedium {
    /// Open (or lazily create) the medium at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let documents = if path.exists() {
            let bytes = fs::read(&path)?;
            decode_file(&bytes)?
        } else {
            Documents::new()
        };
        debug!("opened {} with {} records", path.display(), documents.len());
        Ok(Self {
            path,
            documents: RwLock::new(documents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path the next version is written to before the rename.
    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(TMP_SUFFIX);
        PathBuf::from(name)
    }

    fn persist(&self, documents: &Documents) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries: Vec<(String, Vec<u8>)> = documents
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let body = bitcode::serialize(&entries)?;

        let tmp = self.tmp_path();
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(MAGIC)?;
            file.write_all(&[FILE_FORMAT_VERSION])?;
            file.write_all(&body)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&tmp, &self.path)
        });
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!("wrote {} records to {}", documents.len(), self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the documents, persist it, then publish it.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Documents) -> T,
    ) -> Result<T, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::poisoned("medium write"))?;
        let mut next = documents.clone();
        let out = change(&mut next);
        self.persist(&next)?;
        *documents = next;
        Ok(out)
    }
}

fn decode_file(bytes: &[u8]) -> Result<Documents, StoreError> {
    if bytes.starts_with(MAGIC) {
        let version = bytes.get(MAGIC.len()).copied().ok_or_else(|| {
            StoreError::Storage("truncated medium header".into())
        })?;
        if version != FILE_FORMAT_VERSION {
            return Err(StoreError::Storage(format!(
                "unsupported medium version {}",
                version
            )));
        }
        let entries: Vec<(String, Vec<u8>)> = bitcode::deserialize(&bytes[MAGIC.len() + 1..])?;
        return Ok(entries.into_iter().collect());
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Documents::new());
    }

    // version 1: bare JSON record array
    let legacy: Vec<Value> = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Storage(format!("unrecognized medium file: {}", e)))?;
    let mut documents = Documents::new();
    for (i, element) in legacy.into_iter().enumerate() {
        let Some(date) = element
            .get("date")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
        else {
            return Err(StoreError::Storage(format!(
                "version 1 record {} has no date",
                i + 1
            )));
        };
        let doc = serde_json::to_vec(&element)
            .map_err(|e| StoreError::Storage(format!("re-encode record: {}", e)))?;
        documents.insert(date, doc);
    }
    info!("read {} records from a version 1 medium file", documents.len());
    Ok(documents)
}

impl RecordMedium for FileMedium {
    fn get_raw(&self, date: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::poisoned("medium read"))?;
        Ok(documents.get(date).cloned())
    }

    fn put_raw(&self, date: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.mutate(|docs| {
            docs.insert(date.to_string(), bytes);
        })
    }

    fn remove(&self, date: &str) -> Result<bool, StoreError> {
        self.mutate(|docs| docs.remove(date).is_some())
    }

    fn scan_raw(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::poisoned("medium read"))?;
        Ok(documents.values().cloned().collect())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|docs| docs.clear())
    }

    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        self.mutate(|docs| {
            *docs = entries.into_iter().collect();
        })
    }
}
