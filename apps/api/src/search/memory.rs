//! In-process index, used when no Elasticsearch endpoint is configured.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::db::models::Pagination;
use crate::search::{IndexError, IndexedJob, JobFilter, JobIndex, SearchHit, SearchPage};

#[derive(Default)]
pub struct MemoryJobIndex {
    docs: RwLock<BTreeMap<i32, IndexedJob>>,
}

impl MemoryJobIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobIndex for MemoryJobIndex {
    async fn upsert(&self, job: &IndexedJob) -> Result<(), IndexError> {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn bulk_upsert(&self, jobs: &[IndexedJob]) -> Result<(), IndexError> {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        for job in jobs {
            docs.insert(job.id, job.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), IndexError> {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<IndexedJob>, IndexError> {
        Ok(self
            .docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn search(
        &self,
        filter: &JobFilter,
        page: Pagination,
    ) -> Result<SearchPage, IndexError> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<&IndexedJob> = docs.values().filter(|job| filter.matches(job)).collect();
        let hits = matching
            .iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .map(|job| SearchHit {
                id: job.id,
                job: (*job).clone(),
            })
            .collect();
        Ok(SearchPage {
            total: matching.len() as u64,
            hits,
        })
    }
}
