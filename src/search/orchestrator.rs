//! Search orchestrator - the session's single writer / 搜索编排器
//!
//! Composes the classifier, coordinator, pagination and debounce timer:
//! - Query text is debounced, every other parameter dispatches immediately
//! - Without a manual override the classifier picks the strategy
//! - Remote errors become session state, never returned to callers
//!
//! 文本输入防抖，其它参数变更立即搜索；错误写入会话状态而不是返回给调用方。

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::SearchConfig;

use super::api::SearchApi;
use super::cache::{CacheStats, ResultCache};
use super::classifier::classify;
use super::coordinator::{Dispatch, RequestCoordinator, Ticket};
use super::debounce::Debouncer;
use super::error::SearchError;
use super::pagination::PaginationController;
use super::schema::{
    non_empty, DateRange, MediaTypeFilter, PhotoSummary, SearchMode, SearchParameters, SearchStrategy, SortKey,
    StrategySource,
};

/// Session phase / 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Searching,
    Loaded,
    LoadingMore,
    Errored,
}

/// Session events for view consumers / 会话事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged { phase: SearchPhase },
    StrategyChanged { strategy: SearchStrategy, source: StrategySource },
    ResultsReplaced { count: usize, has_more: bool, from_cache: bool },
    ResultsAppended { added: usize, count: usize, has_more: bool },
    Failed { mode: SearchMode, message: String },
}

/// Read-only copy of the session state / 会话状态快照
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub params: SearchParameters,
    pub results: Vec<PhotoSummary>,
    /// Total-count hint from the server / 服务端总数提示
    pub total: Option<u64>,
    pub phase: SearchPhase,
    pub loading: bool,
    pub error: Option<SearchError>,
    pub has_more: bool,
    pub manual_strategy: Option<SearchStrategy>,
    /// Query text still inside the debounce window / 防抖中的查询
    pub pending_query: Option<String>,
}

struct SessionState {
    params: SearchParameters,
    results: Vec<PhotoSummary>,
    total: Option<u64>,
    in_flight: Option<SearchMode>,
    /// A result set is on screen / 已有结果
    loaded: bool,
    error: Option<SearchError>,
    failed_mode: Option<SearchMode>,
    pagination: PaginationController,
    manual_strategy: Option<SearchStrategy>,
    pending_query: Option<String>,
    last_dispatched_query: Option<String>,
    last_dispatched: Option<SearchParameters>,
    last_phase: SearchPhase,
}

struct Inner {
    coordinator: RequestCoordinator,
    debouncer: Debouncer,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

/// Search session handle, cheap to clone / 搜索会话句柄
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    pub fn new(api: Arc<dyn SearchApi>, config: &SearchConfig) -> Self {
        let cache = ResultCache::new(config.cache_ttl(), config.cache_capacity);
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                coordinator: RequestCoordinator::new(api, config.page_size, cache),
                debouncer: Debouncer::new(config.debounce()),
                state: RwLock::new(SessionState {
                    params: SearchParameters::default(),
                    results: Vec::new(),
                    total: None,
                    in_flight: None,
                    loaded: false,
                    error: None,
                    failed_mode: None,
                    pagination: PaginationController::new(config.page_size),
                    manual_strategy: None,
                    pending_query: None,
                    last_dispatched_query: None,
                    last_dispatched: None,
                    last_phase: SearchPhase::Idle,
                }),
                events,
            }),
        }
    }

    /// Subscribe to session events / 订阅会话事件
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Query text changed (one keystroke); dispatch after the debounce window
    /// 查询文本变化，防抖后搜索
    pub fn search(&self, query: impl Into<String>) {
        let query = query.into();
        {
            let mut state = self.inner.state.write();
            state.pending_query = Some(query.clone());
        }

        let inner = self.inner.clone();
        self.inner.debouncer.schedule(async move {
            inner.settle_query(query).await;
        });

        let mut state = self.inner.state.write();
        self.inner.emit_phase(&mut state);
    }

    /// Fetch the next page / 加载更多
    pub async fn load_more(&self) {
        self.inner.load_more().await;
    }

    /// Select a strategy; a manual choice disables auto-classification
    /// 选择检索策略；手动选择会关闭自动分类
    pub async fn set_strategy(&self, strategy: SearchStrategy, source: StrategySource) {
        let ticket = {
            let mut state = self.inner.state.write();
            match source {
                StrategySource::Manual => state.manual_strategy = Some(strategy),
                StrategySource::Auto if state.manual_strategy.is_some() => {
                    tracing::debug!("Auto strategy {} ignored, manual override active", strategy.as_str());
                    return;
                }
                StrategySource::Auto => {}
            }
            if state.params.strategy == strategy {
                return;
            }

            let mut params = state.params.clone();
            params.strategy = strategy;
            self.inner.emit(SessionEvent::StrategyChanged { strategy, source });
            self.inner.begin_fresh(&mut state, params)
        };
        self.inner.finish(ticket).await;
    }

    /// Hand strategy selection back to the classifier / 恢复自动分类
    pub async fn clear_manual_strategy(&self) {
        let ticket = {
            let mut state = self.inner.state.write();
            if state.manual_strategy.take().is_none() {
                return;
            }
            let classified = classify(&state.params.query);
            if classified == state.params.strategy {
                return;
            }

            let mut params = state.params.clone();
            params.strategy = classified;
            self.inner.emit(SessionEvent::StrategyChanged {
                strategy: classified,
                source: StrategySource::Auto,
            });
            self.inner.begin_fresh(&mut state, params)
        };
        self.inner.finish(ticket).await;
    }

    pub async fn set_sort(&self, sort: SortKey) {
        self.inner.update_params(|p| p.sort = sort).await;
    }

    pub async fn set_type_filter(&self, type_filter: MediaTypeFilter) {
        self.inner.update_params(|p| p.type_filter = type_filter).await;
    }

    pub async fn set_favorites_only(&self, favorites_only: bool) {
        self.inner.update_params(|p| p.favorites_only = favorites_only).await;
    }

    pub async fn set_tag(&self, tag: Option<String>) {
        let tag = non_empty(tag);
        self.inner.update_params(|p| p.tag = tag).await;
    }

    pub async fn set_date_range(&self, date_range: DateRange) {
        self.inner.update_params(|p| p.date_range = date_range).await;
    }

    pub async fn set_source(&self, source: Option<String>) {
        let source = non_empty(source);
        self.inner.update_params(|p| p.source = source).await;
    }

    /// Re-issue the last failed operation, or the last dispatched search
    /// 重试上次失败的操作或上次的搜索
    pub async fn retry(&self) {
        let (failed_mode, last) = {
            let state = self.inner.state.read();
            (state.failed_mode, state.last_dispatched.clone())
        };

        if failed_mode == Some(SearchMode::LoadMore) {
            self.inner.load_more().await;
            return;
        }

        let Some(params) = last else {
            return;
        };
        tracing::info!("Retrying search: q='{}'", params.query);
        let ticket = {
            let mut state = self.inner.state.write();
            self.inner.coordinator.invalidate_displayed();
            self.inner.begin_fresh(&mut state, params)
        };
        self.inner.finish(ticket).await;
    }

    /// Drop the pending keystroke and the in-flight request / 取消所有进行中的操作
    pub fn shutdown(&self) {
        self.inner.debouncer.cancel();
        let mut state = self.inner.state.write();
        self.inner.coordinator.cancel_in_flight();
        state.in_flight = None;
        state.pending_query = None;
        self.inner.emit_phase(&mut state);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read();
        SessionSnapshot {
            params: state.params.clone(),
            results: state.results.clone(),
            total: state.total,
            phase: self.inner.phase_of(&state),
            loading: state.in_flight.is_some(),
            error: state.error.clone(),
            has_more: state.pagination.has_more(),
            manual_strategy: state.manual_strategy,
            pending_query: state.pending_query.clone(),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        let state = self.inner.state.read();
        self.inner.phase_of(&state)
    }

    pub fn results(&self) -> Vec<PhotoSummary> {
        self.inner.state.read().results.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().in_flight.is_some()
    }

    pub fn error(&self) -> Option<SearchError> {
        self.inner.state.read().error.clone()
    }

    pub fn has_more(&self) -> bool {
        self.inner.state.read().pagination.has_more()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.coordinator.cache_stats()
    }
}

impl Inner {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn phase_of(&self, state: &SessionState) -> SearchPhase {
        if self.debouncer.is_pending() {
            return SearchPhase::Debouncing;
        }
        match state.in_flight {
            Some(SearchMode::Fresh) => SearchPhase::Searching,
            Some(SearchMode::LoadMore) => SearchPhase::LoadingMore,
            None if state.error.is_some() => SearchPhase::Errored,
            None if state.loaded => SearchPhase::Loaded,
            None => SearchPhase::Idle,
        }
    }

    fn emit_phase(&self, state: &mut SessionState) {
        let phase = self.phase_of(state);
        if phase != state.last_phase {
            state.last_phase = phase;
            self.emit(SessionEvent::PhaseChanged { phase });
        }
    }

    /// Debounce window elapsed / 防抖结束
    async fn settle_query(&self, query: String) {
        let query = query.trim().to_string();
        let ticket = {
            let mut state = self.state.write();
            state.pending_query = None;

            if state.last_dispatched_query.as_deref() == Some(query.as_str()) {
                tracing::debug!("Settled query unchanged: q='{}'", query);
                self.emit_phase(&mut state);
                return;
            }

            let mut params = state.params.clone();
            params.query = query;
            if state.manual_strategy.is_none() {
                let classified = classify(&params.query);
                if classified != params.strategy {
                    tracing::debug!(
                        "Auto strategy {} -> {} for q='{}'",
                        params.strategy.as_str(),
                        classified.as_str(),
                        params.query
                    );
                    params.strategy = classified;
                    self.emit(SessionEvent::StrategyChanged {
                        strategy: classified,
                        source: StrategySource::Auto,
                    });
                }
            }
            self.begin_fresh(&mut state, params)
        };
        self.finish(ticket).await;
    }

    /// Non-text parameter change, dispatched without debounce / 非文本参数变更
    async fn update_params<F>(&self, update: F)
    where
        F: FnOnce(&mut SearchParameters),
    {
        let ticket = {
            let mut state = self.state.write();
            let mut params = state.params.clone();
            update(&mut params);
            if params == state.params {
                return;
            }
            self.begin_fresh(&mut state, params)
        };
        self.finish(ticket).await;
    }

    /// Install new parameters and start a fresh search; clears results unless
    /// the search is a duplicate.
    /// 设置参数并开始新搜索（重复搜索不清空结果）
    fn begin_fresh(&self, state: &mut SessionState, params: SearchParameters) -> Option<Ticket> {
        state.params = params.clone();
        state.last_dispatched_query = Some(params.query.clone());
        state.last_dispatched = Some(params.clone());

        let ticket = self.coordinator.begin(&params, SearchMode::Fresh, 0);
        if ticket.is_some() {
            state.results.clear();
            state.total = None;
            state.loaded = false;
            state.error = None;
            state.failed_mode = None;
            state.pagination.reset();
            state.in_flight = Some(SearchMode::Fresh);
        }
        self.emit_phase(state);
        ticket
    }

    async fn load_more(&self) {
        let ticket = {
            let mut state = self.state.write();
            if !state.loaded || !state.pagination.can_load_more(state.in_flight.is_some()) {
                return;
            }

            let offset = state.pagination.offset();
            let params = state.params.clone();
            let ticket = self.coordinator.begin(&params, SearchMode::LoadMore, offset);
            if ticket.is_some() {
                state.in_flight = Some(SearchMode::LoadMore);
                state.error = None;
                state.failed_mode = None;
            }
            self.emit_phase(&mut state);
            ticket
        };
        self.finish(ticket).await;
    }

    /// Run a started dispatch and apply its outcome if it is still current
    /// 执行分发并在仍为最新时应用结果
    async fn finish(&self, ticket: Option<Ticket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let generation = ticket.generation();
        let mode = ticket.mode();
        let outcome = self.coordinator.run(ticket).await;

        let mut state = self.state.write();
        if !self.coordinator.is_current(generation) {
            return;
        }

        let (page, from_cache) = match outcome {
            Ok(Dispatch::Fetched(page)) => (page, false),
            Ok(Dispatch::Cached(page)) => (page, true),
            Ok(Dispatch::Unchanged) | Ok(Dispatch::Superseded) => {
                state.in_flight = None;
                self.emit_phase(&mut state);
                return;
            }
            Err(e) => {
                state.in_flight = None;
                state.error = Some(e.clone());
                state.failed_mode = Some(mode);
                if mode == SearchMode::Fresh {
                    state.results.clear();
                    state.total = None;
                    state.pagination.restore(0, false);
                }
                self.emit(SessionEvent::Failed {
                    mode,
                    message: e.to_string(),
                });
                self.emit_phase(&mut state);
                return;
            }
        };

        state.in_flight = None;
        let count = page.results.len();
        match mode {
            SearchMode::Fresh => {
                state.results = page.results;
                state.total = page.total;
                state.loaded = true;
                if from_cache {
                    state.pagination.restore(count, page.has_more);
                } else {
                    state.pagination.record_page(count);
                }
                let has_more = state.pagination.has_more();
                self.emit(SessionEvent::ResultsReplaced {
                    count,
                    has_more,
                    from_cache,
                });
            }
            SearchMode::LoadMore => {
                state.results.extend(page.results);
                if page.total.is_some() {
                    state.total = page.total;
                }
                let has_more = state.pagination.record_page(count);
                let total_count = state.results.len();
                self.emit(SessionEvent::ResultsAppended {
                    added: count,
                    count: total_count,
                    has_more,
                });
            }
        }
        self.emit_phase(&mut state);
    }
}
