use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Error, MergeReport, Store};

/// Top-level key holding the data point array.
pub const DATAPOINTS_KEY: &str = "datapoints";

/// Serializes every read-modify-write in the process, whichever store instance
/// performs it.
static WRITE_LOCK: Mutex<()> = Mutex::const_new(());

/// A data point store backed by one JSON file.
///
/// Every append reads the whole document, extends `datapoints` and rewrites the
/// file through a temporary sibling that is renamed into place. Top-level keys
/// other than `datapoints` are carried through untouched.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn io_error(&self, source: std::io::Error) -> Error {
    if source.kind() == ErrorKind::NotFound {
      Error::Missing(self.path.clone())
    } else {
      Error::Io {
        path: self.path.clone(),
        source,
      }
    }
  }

  fn malformed(&self, message: impl Into<String>) -> Error {
    Error::Malformed {
      path: self.path.clone(),
      message: message.into(),
    }
  }

  /// Read and parse the store document.
  async fn load(&self) -> Result<Map<String, Value>, Error> {
    let content = fs::read_to_string(&self.path)
      .await
      .map_err(|e| self.io_error(e))?;

    match serde_json::from_str(&content) {
      Ok(Value::Object(document)) => Ok(document),
      Ok(_) => Err(self.malformed("top-level value is not an object")),
      Err(e) => Err(self.malformed(e.to_string())),
    }
  }

  /// Replace the store file with `document`.
  async fn write(&self, document: Map<String, Value>) -> Result<(), Error> {
    let mut bytes = serde_json::to_vec_pretty(&Value::Object(document))
      .map_err(|e| self.malformed(e.to_string()))?;
    bytes.push(b'\n');

    let path = self.path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
      .await?
      .map_err(|source| Error::Io {
        path: self.path.clone(),
        source,
      })
  }
}

#[async_trait]
impl Store for JsonFileStore {
  async fn ensure_exists(&self) -> Result<(), Error> {
    let metadata = fs::metadata(&self.path)
      .await
      .map_err(|e| self.io_error(e))?;
    if !metadata.is_file() {
      return Err(Error::NotAFile(self.path.clone()));
    }
    Ok(())
  }

  async fn append(&self, entries: Vec<Value>) -> Result<MergeReport, Error> {
    let _guard = WRITE_LOCK.lock().await;

    self.ensure_exists().await?;
    let mut document = self.load().await?;

    let points = document
      .entry(DATAPOINTS_KEY)
      .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(points) = points else {
      return Err(self.malformed(format!("'{}' is not an array", DATAPOINTS_KEY)));
    };

    let report = MergeReport {
      previous: points.len(),
      appended: entries.len(),
    };

    if entries.is_empty() {
      debug!(path = %self.path.display(), "nothing to append, store left untouched");
      return Ok(report);
    }

    points.extend(entries);
    self.write(document).await?;

    info!(
      path = %self.path.display(),
      previous = report.previous,
      appended = report.appended,
      total = report.total(),
      "store updated"
    );
    Ok(report)
  }
}

/// Write `bytes` to a temp file next to `path`, flush it to disk, then rename it over `path`.
///
/// The temp file takes the permissions of the file it replaces.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  let permissions = std::fs::metadata(path)?.permissions();

  let mut tmp = NamedTempFile::new_in(dir)?;
  tmp.as_file().set_permissions(permissions)?;
  tmp.write_all(bytes)?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}
