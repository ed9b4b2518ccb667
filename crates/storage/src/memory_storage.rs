//! In-process storage backend.
//!
//! Keeps everything in hash maps behind a single lock. Useful for tests and
//! for embedding the tracker where persistence is handled elsewhere.

use std::collections::HashMap;
use async_trait::async_trait;
use pathway_core::{Pathway, PathwayId, ProgressRecord, UserId};
use tokio::sync::RwLock;

use super::{CasOutcome, PathwayStore, Result};

#[derive(Default)]
struct Tables {
    pathways: HashMap<PathwayId, Pathway>,
    progress: HashMap<(UserId, PathwayId), ProgressRecord>,
}

impl Tables {
    fn write_progress(&mut self, user: &UserId, pathway: PathwayId, completed_steps: u32) -> ProgressRecord {
        let record = self
            .progress
            .entry((user.clone(), pathway))
            .and_modify(|r| r.advance_to(completed_steps))
            .or_insert_with(|| ProgressRecord::new(user.clone(), pathway, completed_steps));
        record.clone()
    }
}

/// Memory-backed storage.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PathwayStore for MemoryStorage {
    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        self.tables.write().await.pathways.insert(pathway.id, pathway.clone());
        Ok(())
    }

    async fn load_pathway(&self, id: PathwayId) -> Result<Option<Pathway>> {
        Ok(self.tables.read().await.pathways.get(&id).cloned())
    }

    async fn load_pathway_by_slug(&self, slug: &str) -> Result<Option<Pathway>> {
        Ok(self
            .tables
            .read()
            .await
            .pathways
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn list_pathways(&self) -> Result<Vec<Pathway>> {
        let mut pathways: Vec<Pathway> = self.tables.read().await.pathways.values().cloned().collect();
        pathways.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pathways)
    }

    async fn load_progress(&self, user: &UserId, pathway: PathwayId) -> Result<Option<ProgressRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .progress
            .get(&(user.clone(), pathway))
            .cloned())
    }

    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .progress
            .values()
            .filter(|r| &r.user_id == user)
            .cloned()
            .collect())
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        completed_steps: u32,
    ) -> Result<ProgressRecord> {
        Ok(self.tables.write().await.write_progress(user, pathway, completed_steps))
    }

    async fn compare_and_set_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        expected: u32,
        completed_steps: u32,
    ) -> Result<CasOutcome> {
        let mut tables = self.tables.write().await;
        let actual = tables
            .progress
            .get(&(user.clone(), pathway))
            .map_or(0, |r| r.completed_steps);
        if actual != expected {
            return Ok(CasOutcome::Conflict { actual });
        }
        Ok(CasOutcome::Applied(tables.write_progress(user, pathway, completed_steps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use pathway_core::PathwayStep;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_pathway_lookup_by_id_and_slug() {
        let store = MemoryStorage::new();
        let pathway = Pathway::new("Rust", "").with_step(PathwayStep::new("Ownership", "1h"));
        store.save_pathway(&pathway).await.unwrap();

        assert_eq!(store.load_pathway(pathway.id).await.unwrap().unwrap().title, "Rust");
        assert_eq!(
            store.load_pathway_by_slug(&pathway.slug).await.unwrap().unwrap().id,
            pathway.id
        );
        assert!(store.load_pathway(PathwayId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let store = MemoryStorage::new();
        let pathway = PathwayId::new();
        let first = store.upsert_progress(&user("u1"), pathway, 1).await.unwrap();
        let second = store.upsert_progress(&user("u1"), pathway, 2).await.unwrap();

        assert_eq!(second.completed_steps, 2);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_cas_treats_missing_record_as_zero() {
        let store = MemoryStorage::new();
        let pathway = PathwayId::new();

        let stale = store.compare_and_set_progress(&user("u1"), pathway, 2, 3).await.unwrap();
        assert_eq!(stale, CasOutcome::Conflict { actual: 0 });
        assert!(store.load_progress(&user("u1"), pathway).await.unwrap().is_none());

        let applied = store.compare_and_set_progress(&user("u1"), pathway, 0, 1).await.unwrap();
        assert!(matches!(applied, CasOutcome::Applied(ref r) if r.completed_steps == 1));
    }

    #[tokio::test]
    async fn test_list_progress_is_per_user() {
        let store = MemoryStorage::new();
        store.upsert_progress(&user("u1"), PathwayId::new(), 1).await.unwrap();
        store.upsert_progress(&user("u1"), PathwayId::new(), 2).await.unwrap();
        store.upsert_progress(&user("u2"), PathwayId::new(), 3).await.unwrap();

        assert_eq!(store.list_progress(&user("u1")).await.unwrap().len(), 2);
        assert_eq!(store.list_progress(&user("u2")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_cas_increments_are_not_lost() {
        let store = Arc::new(MemoryStorage::new());
        let pathway = PathwayId::new();
        let mut handles = Vec::new();

        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let current = store
                        .load_progress(&user("u1"), pathway)
                        .await
                        .unwrap()
                        .map_or(0, |r| r.completed_steps);
                    match store
                        .compare_and_set_progress(&user("u1"), pathway, current, current + 1)
                        .await
                        .unwrap()
                    {
                        CasOutcome::Applied(_) => break,
                        CasOutcome::Conflict { .. } => tokio::task::yield_now().await,
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.load_progress(&user("u1"), pathway).await.unwrap().unwrap();
        assert_eq!(record.completed_steps, 16);
    }
}
