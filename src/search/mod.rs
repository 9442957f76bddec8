//! Search module - query orchestration for the photo library / 搜索模块
//!
//! Layering / 分层：
//! - Primitives: classifier, fingerprint, cache, pagination, debounce
//! - Coordinator: single-flight dispatch with cancellation and duplicate suppression
//! - Orchestrator: the session state machine the view talks to
//!
//! Call direction: Orchestrator → Coordinator → SearchApi (unidirectional) / 调用方向单向

pub mod api;
pub mod cache;
pub mod classifier;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod pagination;
pub mod schema;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpSearchApi, SearchApi};
pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use classifier::classify;
pub use coordinator::{Dispatch, FetchedPage, RequestCoordinator};
pub use error::SearchError;
pub use orchestrator::{SearchOrchestrator, SearchPhase, SessionEvent, SessionSnapshot};
pub use pagination::PaginationController;
pub use schema::{
    DateRange, MediaTypeFilter, PhotoSummary, ResultPage, SearchMode, SearchParameters, SearchRequest,
    SearchStrategy, SortKey, StrategySource,
};
