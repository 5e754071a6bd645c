// src/store.rs
//
// Briefing cache as an explicit key-value collaborator. The collection
// orchestrator never touches this; only the API layer reads and writes
// it, keyed by briefing id.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::briefing::Briefing;

pub trait BriefingStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Briefing>;
    fn put(&self, briefing: Briefing);
    fn contains(&self, id: &str) -> bool;
}

/// In-memory store; cleared on restart. Durable storage would slot in
/// behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Briefing>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BriefingStore for MemoryStore {
    fn get(&self, id: &str) -> Option<Briefing> {
        match self.inner.read() {
            Ok(map) => map.get(id).cloned(),
            Err(_) => None,
        }
    }

    fn put(&self, briefing: Briefing) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(briefing.id.clone(), briefing);
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .map(|map| map.contains_key(id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{briefing_id, BriefingStatus, BriefingSummary};
    use crate::collect::status::OverallStatus;
    use chrono::Utc;

    fn briefing(date: &str) -> Briefing {
        let date: chrono::NaiveDate = date.parse().unwrap();
        Briefing {
            id: briefing_id(date),
            date,
            status: BriefingStatus::Completed,
            overall_status: OverallStatus::Success,
            summary: Some(BriefingSummary::default()),
            sections: vec![],
            generated_at: Utc::now(),
            processing_time_seconds: None,
            data_sources: vec![],
            raw_data: None,
        }
    }

    #[test]
    fn put_get_contains_round_trip() {
        let store = MemoryStore::new();
        assert!(!store.contains("briefing-2026-02-01"));
        store.put(briefing("2026-02-01"));
        assert!(store.contains("briefing-2026-02-01"));
        let got = store.get("briefing-2026-02-01").unwrap();
        assert_eq!(got.status, BriefingStatus::Completed);
        assert!(store.get("briefing-2026-02-02").is_none());
    }

    #[test]
    fn put_overwrites_same_id() {
        let store = MemoryStore::new();
        store.put(briefing("2026-02-01"));
        let mut b = briefing("2026-02-01");
        b.status = BriefingStatus::Failed;
        store.put(b);
        assert_eq!(
            store.get("briefing-2026-02-01").unwrap().status,
            BriefingStatus::Failed
        );
    }
}
