//! Controller document access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelflow_models::ControllerDocument;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};

/// File-backed task catalog.
///
/// Holds no cached document: every `load` re-reads and re-parses the file so
/// edits made while the server runs are picked up by the next request.
/// Clones share one edit lock.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    path: PathBuf,
    edit_lock: Arc<Mutex<()>>,
}

impl TaskCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            edit_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current on-disk document.
    pub async fn load(&self) -> CatalogResult<ControllerDocument> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(self.path.clone()));
            }
            Err(e) => {
                return Err(CatalogError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let document: ControllerDocument =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::InvalidJson {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(
            path = %self.path.display(),
            tasks = document.tasks.len(),
            "Loaded controller document"
        );
        Ok(document)
    }

    /// Replace the on-disk document.
    ///
    /// Writes a sibling temp file and renames it over the original, so a
    /// concurrent `load` sees either the old or the new document.
    pub async fn save(&self, document: &ControllerDocument) -> CatalogResult<()> {
        let bytes = serde_json::to_vec_pretty(document).map_err(CatalogError::Encode)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| CatalogError::Write {
                path: tmp_path.clone(),
                source: e,
            })?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CatalogError::Write {
                path: self.path.clone(),
                source: e,
            });
        }

        info!(path = %self.path.display(), "Saved controller document");
        Ok(())
    }

    /// Load, modify and save the document as one edit.
    ///
    /// Edits through clones of this catalog never interleave. When `apply`
    /// fails nothing is written.
    pub async fn update<T, E>(
        &self,
        apply: impl FnOnce(&mut ControllerDocument) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<CatalogError>,
    {
        let _guard = self.edit_lock.lock().await;

        let mut document = self.load().await?;
        let value = apply(&mut document)?;
        self.save(&document).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TaskCatalog::new(dir.path().join("controller.json"));
        assert!(matches!(catalog.load().await, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.json");
        std::fs::write(&path, "{ not json").unwrap();

        let catalog = TaskCatalog::new(&path);
        assert!(matches!(catalog.load().await, Err(CatalogError::InvalidJson { .. })));
    }

    #[tokio::test]
    async fn test_load_sees_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.json");
        std::fs::write(&path, r#"{"tasks": {"Build": {"script": "build.sh"}}}"#).unwrap();

        let catalog = TaskCatalog::new(&path);
        assert_eq!(catalog.load().await.unwrap().task_names(), vec!["Build"]);

        std::fs::write(
            &path,
            r#"{"tasks": {"Build": {"script": "build.sh"}, "Deploy": {"script": "deploy.sh"}}}"#,
        )
        .unwrap();
        assert_eq!(catalog.load().await.unwrap().task_names(), vec!["Build", "Deploy"]);
    }

    #[tokio::test]
    async fn test_update_saves_and_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.json");
        std::fs::write(
            &path,
            r#"{"tasks": {"Build": {"script": "build.sh"}}, "categories": {"Cars": {}}, "schedules": [1, 2]}"#,
        )
        .unwrap();

        let catalog = TaskCatalog::new(&path);
        catalog
            .update(|doc| {
                doc.global_settings = serde_json::json!({"ollama_timeout": 90});
                Ok::<_, CatalogError>(())
            })
            .await
            .unwrap();

        let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["global_settings"]["ollama_timeout"], 90);
        assert_eq!(saved["schedules"], serde_json::json!([1, 2]));
        assert_eq!(saved["tasks"]["Build"]["script"], "build.sh");
        assert!(!dir.path().join("controller.json.tmp").exists());

        assert_eq!(catalog.load().await.unwrap().category_names(), vec!["Cars"]);
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.json");
        let original = r#"{"tasks": {}}"#;
        std::fs::write(&path, original).unwrap();

        let catalog = TaskCatalog::new(&path);
        let result = catalog
            .update(|doc| {
                doc.categories.insert("Cars".into(), serde_json::json!({}));
                Err::<(), _>(CatalogError::NotFound(PathBuf::from("Cars")))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_update_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TaskCatalog::new(dir.path().join("controller.json"));

        let result = catalog.update(|_| Ok::<_, CatalogError>(())).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert!(!dir.path().join("controller.json").exists());
    }
}
