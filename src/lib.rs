// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod briefing;
pub mod collect;
pub mod config;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::collect::{collect_all, CollectorCfg};
pub use crate::collect::status::OverallStatus;
pub use crate::collect::types::{
    CollectedData, CollectionResult, FetchWindow, InvalidWindow, RawItem, SourceClient,
    SourceError, SourceName, SourceStatus,
};
