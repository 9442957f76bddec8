//! Request coordinator - single-flight search execution / 请求协调器
//!
//! Owns the only in-flight search and the result cache. Every dispatch gets
//! a generation number and a cancellation token; starting a new one cancels
//! the previous token, and outcomes whose generation is no longer current are
//! discarded without touching shared state.
//! 同一时间只有一个请求；新请求取消旧请求，过期代次的结果直接丢弃。

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::api::SearchApi;
use super::cache::{CacheStats, ResultCache};
use super::error::SearchError;
use super::fingerprint::{base_fingerprint, fingerprint};
use super::pagination::PaginationController;
use super::schema::{PhotoSummary, SearchMode, SearchParameters, SearchRequest};

/// Page delivered to the orchestrator / 交付给编排器的一页结果
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub results: Vec<PhotoSummary>,
    pub total: Option<u64>,
    pub has_more: bool,
    /// Offset the page was fetched at / 本页偏移量
    pub offset: usize,
}

/// Outcome of a dispatch / 一次分发的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Fetched from the remote API / 远程获取
    Fetched(FetchedPage),
    /// Served from the result cache / 命中缓存
    Cached(FetchedPage),
    /// Same search as the displayed or pending one, nothing done / 重复搜索被抑制
    Unchanged,
    /// A newer dispatch replaced this one / 已被新搜索取代
    Superseded,
}

/// Handle for one started dispatch / 已开始的分发
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    params: SearchParameters,
    mode: SearchMode,
    offset: usize,
    base: String,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }
}

struct Flight {
    generation: u64,
    token: CancellationToken,
    /// Base fingerprint of a pending fresh search / 进行中的新搜索指纹
    pending_base: Option<String>,
}

struct CoordinatorState {
    generation: u64,
    in_flight: Option<Flight>,
    /// Base fingerprint of the search whose results are on screen / 当前显示的搜索指纹
    displayed: Option<String>,
    cache: ResultCache,
}

pub struct RequestCoordinator {
    api: Arc<dyn SearchApi>,
    page_size: usize,
    state: Mutex<CoordinatorState>,
}

impl RequestCoordinator {
    pub fn new(api: Arc<dyn SearchApi>, page_size: usize, cache: ResultCache) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            state: Mutex::new(CoordinatorState {
                generation: 0,
                in_flight: None,
                displayed: None,
                cache,
            }),
        }
    }

    /// Begin and run a dispatch / 开始并执行一次分发
    pub async fn execute(&self, params: &SearchParameters, mode: SearchMode, offset: usize) -> Result<Dispatch, SearchError> {
        match self.begin(params, mode, offset) {
            Some(ticket) => self.run(ticket).await,
            None => Ok(Dispatch::Unchanged),
        }
    }

    /// Start a dispatch: suppress duplicates, cancel the previous flight and
    /// stamp a new generation. `None` means the fresh search is a duplicate.
    /// 开始分发；返回 `None` 表示重复的新搜索。
    pub fn begin(&self, params: &SearchParameters, mode: SearchMode, offset: usize) -> Option<Ticket> {
        let base = base_fingerprint(params);
        let mut state = self.state.lock();

        if mode == SearchMode::Fresh {
            let pending = state.in_flight.as_ref().and_then(|f| f.pending_base.as_deref());
            let duplicate = match pending {
                Some(pending) => pending == base,
                None => state.displayed.as_deref() == Some(base.as_str()),
            };
            if duplicate {
                tracing::debug!("Duplicate search suppressed: q='{}'", params.query);
                return None;
            }
        }

        if let Some(previous) = state.in_flight.take() {
            previous.token.cancel();
            tracing::debug!("Cancelled superseded search (generation {})", previous.generation);
        }

        state.generation += 1;
        let generation = state.generation;
        let token = CancellationToken::new();
        state.in_flight = Some(Flight {
            generation,
            token: token.clone(),
            pending_base: (mode == SearchMode::Fresh).then(|| base.clone()),
        });

        Some(Ticket {
            generation,
            params: params.clone(),
            mode,
            offset,
            base,
            token,
        })
    }

    /// Run a started dispatch to completion / 执行已开始的分发
    pub async fn run(&self, ticket: Ticket) -> Result<Dispatch, SearchError> {
        let first_page = ticket.mode == SearchMode::Fresh && ticket.offset == 0;
        let cache_key = fingerprint(&ticket.params, ticket.offset);

        if first_page {
            let mut state = self.state.lock();
            if state.generation != ticket.generation {
                return Ok(Dispatch::Superseded);
            }
            if let Some(entry) = state.cache.get(&cache_key) {
                tracing::debug!("Cache hit: q='{}' ({} results)", ticket.params.query, entry.results.len());
                state.in_flight = None;
                state.displayed = Some(ticket.base.clone());
                return Ok(Dispatch::Cached(FetchedPage {
                    results: entry.results,
                    total: entry.total,
                    has_more: entry.has_more,
                    offset: 0,
                }));
            }
        }

        let request = SearchRequest::from_params(&ticket.params, self.page_size, ticket.offset);
        tracing::debug!(
            "Dispatching {:?} search: q='{}' strategy={} offset={} (generation {})",
            ticket.mode,
            request.query,
            request.strategy.as_str(),
            request.offset,
            ticket.generation
        );

        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(SearchError::Cancelled),
            result = self.api.search(&request, ticket.token.clone()) => result,
        };

        let mut state = self.state.lock();
        if state.generation != ticket.generation {
            tracing::debug!("Discarding superseded result (generation {})", ticket.generation);
            return Ok(Dispatch::Superseded);
        }
        state.in_flight = None;

        match result {
            Err(SearchError::Cancelled) => Ok(Dispatch::Superseded),
            Err(e) => {
                tracing::warn!("Search failed: q='{}' offset={}: {}", request.query, request.offset, e);
                if ticket.mode == SearchMode::Fresh {
                    state.displayed = None;
                }
                Err(e)
            }
            Ok(page) => {
                if page.is_empty() {
                    tracing::debug!("No results: q='{}' offset={}", request.query, request.offset);
                }
                let has_more = PaginationController::page_has_more(page.len(), self.page_size);
                if ticket.mode == SearchMode::Fresh {
                    state.displayed = Some(ticket.base.clone());
                }
                if first_page {
                    state.cache.put(cache_key, page.results.clone(), page.total, has_more);
                }
                Ok(Dispatch::Fetched(FetchedPage {
                    results: page.results,
                    total: page.total,
                    has_more,
                    offset: ticket.offset,
                }))
            }
        }
    }

    /// Whether `generation` is still the latest dispatch / 是否仍是最新分发
    pub fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Cancel the in-flight search without starting another / 取消当前请求
    pub fn cancel_in_flight(&self) {
        let mut state = self.state.lock();
        if let Some(flight) = state.in_flight.take() {
            flight.token.cancel();
            state.generation += 1;
            tracing::debug!("Cancelled in-flight search (generation {})", flight.generation);
        }
    }

    /// Forget what is displayed so the next fresh search is not suppressed / 清除已显示标记
    pub fn invalidate_displayed(&self) {
        self.state.lock().displayed = None;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.lock().cache.stats()
    }
}
