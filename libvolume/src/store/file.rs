//! JSON-file backed remote store.
//!
//! # On-disk layout
//!
//! ```text
//! {
//!   "backup": { "type": "s3", "bucket": "b1" },
//!   "scratch": { "type": "local" }
//! }
//! ```
//!
//! The file is re-read on every call and replaced atomically (write to a
//! sibling, then rename) on every change.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{RemoteDefinition, RemoteStore};
use crate::error::VolumeError;
use crate::types::{RemoteParams, RemoteStatus};

type Remotes = BTreeMap<String, RemoteDefinition>;

/// Remote store persisted as a single JSON document.
pub struct FileRemoteStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles issued through this instance.
    write_lock: Mutex<()>,
}

impl FileRemoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Remotes, VolumeError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            // A store that was never written is empty.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Remotes::new()),
            Err(e) => {
                return Err(VolumeError::Store(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if json.trim().is_empty() {
            return Ok(Remotes::new());
        }
        serde_json::from_str(&json)
            .map_err(|e| VolumeError::Store(format!("parse {}: {e}", self.path.display())))
    }

    async fn save(&self, remotes: &Remotes) -> Result<(), VolumeError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                VolumeError::Store(format!("create dir {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(remotes).map_err(VolumeError::store)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| VolumeError::Store(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| VolumeError::Store(format!("replace {}: {e}", self.path.display())))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "remotes.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RemoteStore for FileRemoteStore {
    async fn create_remote(
        &self,
        name: &str,
        kind: &str,
        params: RemoteParams,
        overwrite_forbidden: bool,
    ) -> Result<(), VolumeError> {
        let definition = RemoteDefinition::new(kind, params)?;

        let _guard = self.write_lock.lock().await;
        let mut remotes = self.load().await?;
        if overwrite_forbidden && remotes.contains_key(name) {
            return Err(VolumeError::VolumeAlreadyExists(name.to_owned()));
        }
        remotes.insert(name.to_owned(), definition);
        self.save(&remotes).await?;

        info!(%name, %kind, store = %self.path.display(), "remote defined");
        Ok(())
    }

    async fn delete_remote(&self, name: &str) -> Result<(), VolumeError> {
        let _guard = self.write_lock.lock().await;
        let mut remotes = self.load().await?;
        if remotes.remove(name).is_none() {
            debug!(%name, "remote not defined, nothing to delete");
            return Ok(());
        }
        self.save(&remotes).await?;

        info!(%name, store = %self.path.display(), "remote deleted");
        Ok(())
    }

    async fn list_remote_names(&self) -> Result<Vec<String>, VolumeError> {
        Ok(self.load().await?.into_keys().collect())
    }

    async fn dump_remote(&self, name: &str) -> Result<RemoteStatus, VolumeError> {
        Ok(self
            .load()
            .await?
            .get(name)
            .map(RemoteDefinition::dump)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RemoteParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn create_dump_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(tmp.path().join("remotes.json"));

        store
            .create_remote("backup", "s3", params(&[("bucket", "b1")]), true)
            .await
            .unwrap();

        let dump = store.dump_remote("backup").await.unwrap();
        assert_eq!(dump["type"], "s3");
        assert_eq!(dump["bucket"], "b1");
        assert_eq!(store.list_remote_names().await.unwrap(), vec!["backup"]);

        store.delete_remote("backup").await.unwrap();
        assert!(store.dump_remote("backup").await.unwrap().is_empty());
        assert!(store.list_remote_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_rejected_when_overwrite_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(tmp.path().join("remotes.json"));

        store
            .create_remote("dup", "local", RemoteParams::new(), true)
            .await
            .unwrap();
        let err = store
            .create_remote("dup", "s3", RemoteParams::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, VolumeError::VolumeAlreadyExists(_)));

        // Original definition is untouched.
        assert_eq!(store.dump_remote("dup").await.unwrap()["type"], "local");
    }

    #[tokio::test]
    async fn overwrite_allowed_replaces_definition() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(tmp.path().join("remotes.json"));

        store
            .create_remote("r", "local", RemoteParams::new(), false)
            .await
            .unwrap();
        store
            .create_remote("r", "s3", params(&[("bucket", "b2")]), false)
            .await
            .unwrap();
        let dump = store.dump_remote("r").await.unwrap();
        assert_eq!(dump["type"], "s3");
        assert_eq!(dump["bucket"], "b2");
    }

    #[tokio::test]
    async fn delete_absent_is_noop_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("remotes.json");
        let store = FileRemoteStore::new(&path);

        store.delete_remote("ghost").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn state_is_read_from_disk_on_every_call() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf/remotes.json");

        let first = FileRemoteStore::new(&path);
        let second = FileRemoteStore::new(&path);

        first
            .create_remote("shared", "local", RemoteParams::new(), true)
            .await
            .unwrap();
        assert_eq!(second.list_remote_names().await.unwrap(), vec!["shared"]);

        std::fs::write(&path, r#"{"edited": {"type": "sftp", "host": "h"}}"#).unwrap();
        assert_eq!(first.list_remote_names().await.unwrap(), vec!["edited"]);
        assert_eq!(first.dump_remote("edited").await.unwrap()["host"], "h");
    }

    #[tokio::test]
    async fn malformed_file_is_a_store_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("remotes.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileRemoteStore::new(&path);
        let err = store.list_remote_names().await.unwrap_err();
        assert!(matches!(err, VolumeError::Store(_)));
    }

    #[tokio::test]
    async fn no_temporary_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileRemoteStore::new(tmp.path().join("remotes.json"));
        store
            .create_remote("a", "local", RemoteParams::new(), true)
            .await
            .unwrap();
        assert!(!tmp.path().join("remotes.json.tmp").exists());
    }
}
