//! JSON file storage implementation.
//!
//! Pathways live in `pathways/<id>.json`; progress lives in
//! `progress/<pathway-id>/<user-key>.json`, one file per (user, pathway)
//! pair. Files are replaced by writing a sibling temp file and renaming it,
//! so readers see either the old or the new record.

use std::path::{Path, PathBuf};
use pathway_core::{Pathway, PathwayId, ProgressRecord, UserId};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CasOutcome, PathwayStore, Result};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating its directories.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("pathways")).await?;
        fs::create_dir_all(root.join("progress")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn pathway_path(&self, id: PathwayId) -> PathBuf {
        self.root.join("pathways").join(format!("{}.json", id))
    }

    fn progress_dir(&self, pathway: PathwayId) -> PathBuf {
        self.root.join("progress").join(pathway.to_string())
    }

    fn progress_path(&self, user: &UserId, pathway: PathwayId) -> PathBuf {
        self.progress_dir(pathway).join(format!("{}.json", user.storage_key()))
    }

    /// Write a progress record. Caller must hold `write_lock`.
    async fn write_progress(&self, user: &UserId, pathway: PathwayId, completed_steps: u32) -> Result<ProgressRecord> {
        let path = self.progress_path(user, pathway);
        let record = match read_json::<ProgressRecord>(&path).await? {
            Some(mut existing) => {
                existing.advance_to(completed_steps);
                existing
            }
            None => ProgressRecord::new(user.clone(), pathway, completed_steps),
        };

        fs::create_dir_all(self.progress_dir(pathway)).await?;
        write_json_atomic(&path, &record).await?;
        debug!("Stored progress {}/{} = {}", user, pathway, completed_steps);
        Ok(record)
    }
}

#[async_trait::async_trait]
impl PathwayStore for JsonStorage {
    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json_atomic(&self.pathway_path(pathway.id), pathway).await?;
        debug!("Saved pathway {} ({})", pathway.id, pathway.slug);
        Ok(())
    }

    async fn load_pathway(&self, id: PathwayId) -> Result<Option<Pathway>> {
        read_json(&self.pathway_path(id)).await
    }

    async fn load_pathway_by_slug(&self, slug: &str) -> Result<Option<Pathway>> {
        let all: Vec<Pathway> = list_dir(&self.root.join("pathways")).await?;
        Ok(all.into_iter().find(|p| p.slug == slug))
    }

    async fn list_pathways(&self) -> Result<Vec<Pathway>> {
        let mut pathways: Vec<Pathway> = list_dir(&self.root.join("pathways")).await?;
        pathways.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pathways)
    }

    async fn load_progress(&self, user: &UserId, pathway: PathwayId) -> Result<Option<ProgressRecord>> {
        read_json(&self.progress_path(user, pathway)).await
    }

    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRecord>> {
        let file_name = format!("{}.json", user.storage_key());
        let mut records = Vec::new();
        let mut rd = fs::read_dir(self.root.join("progress")).await?;
        while let Some(entry) = rd.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(record) = read_json(&entry.path().join(&file_name)).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        completed_steps: u32,
    ) -> Result<ProgressRecord> {
        let _guard = self.write_lock.lock().await;
        self.write_progress(user, pathway, completed_steps).await
    }

    async fn compare_and_set_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        expected: u32,
        completed_steps: u32,
    ) -> Result<CasOutcome> {
        let _guard = self.write_lock.lock().await;
        let actual = read_json::<ProgressRecord>(&self.progress_path(user, pathway))
            .await?
            .map_or(0, |r| r.completed_steps);
        if actual != expected {
            return Ok(CasOutcome::Conflict { actual });
        }
        Ok(CasOutcome::Applied(self.write_progress(user, pathway, completed_steps).await?))
    }
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(item) = read_json(&entry.path()).await? {
            items.push(item);
        }
    }
    Ok(items)
}
