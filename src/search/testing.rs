//! Scripted in-memory search API for tests / 测试用的脚本化搜索 API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::api::SearchApi;
use super::error::SearchError;
use super::schema::{PhotoSummary, ResultPage, SearchRequest};

type Responder = dyn Fn(&SearchRequest) -> (Duration, Result<ResultPage, SearchError>) + Send + Sync;

/// Fake API that ignores the cancellation token, like a transport without
/// abort support.
pub struct FakeSearchApi {
    responder: Box<Responder>,
    requests: Mutex<Vec<SearchRequest>>,
    completed: AtomicUsize,
}

impl FakeSearchApi {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&SearchRequest) -> (Duration, Result<ResultPage, SearchError>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        })
    }

    /// Every call returns a full page after `delay` / 每次返回满页
    pub fn full_pages(delay: Duration) -> Arc<Self> {
        Self::new(move |req| (delay, Ok(page(req.offset, req.limit))))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }

    /// Calls that ran to completion (not dropped mid-flight) / 完整执行的调用数
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchApi for FakeSearchApi {
    async fn search(&self, request: &SearchRequest, _cancel: CancellationToken) -> Result<ResultPage, SearchError> {
        self.requests.lock().push(request.clone());
        let (delay, result) = (self.responder)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// `count` photos with ids starting at `start` / 生成测试照片
pub fn page(start: usize, count: usize) -> ResultPage {
    ResultPage::new(
        (start..start + count)
            .map(|id| PhotoSummary(serde_json::json!({ "id": id })))
            .collect(),
    )
}
