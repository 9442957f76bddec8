//! Search parameter and result schema / 搜索参数与结果的 Schema 定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Retrieval strategy sent to the remote search API / 检索策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Structured metadata lookup (EXIF fields, tags, dates) / 元数据检索
    Metadata,
    /// Embedding-based retrieval / 语义检索
    Semantic,
    /// Metadata and semantic results combined / 混合检索
    Hybrid,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Metadata => "metadata",
            SearchStrategy::Semantic => "semantic",
            SearchStrategy::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metadata" | "meta" => Some(SearchStrategy::Metadata),
            "semantic" => Some(SearchStrategy::Semantic),
            "hybrid" => Some(SearchStrategy::Hybrid),
            _ => None,
        }
    }
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::Metadata
    }
}

/// Who picked the current strategy / 策略来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySource {
    /// Chosen by the query classifier / 自动分类
    Auto,
    /// Chosen explicitly by the user / 用户手动选择
    Manual,
}

/// Result ordering / 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
    SizeDesc,
    SizeAsc,
    Relevance,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::DateDesc => "date_desc",
            SortKey::DateAsc => "date_asc",
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::SizeDesc => "size_desc",
            SortKey::SizeAsc => "size_asc",
            SortKey::Relevance => "relevance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date_desc" | "newest" => Some(SortKey::DateDesc),
            "date_asc" | "oldest" => Some(SortKey::DateAsc),
            "name_asc" | "name" => Some(SortKey::NameAsc),
            "name_desc" => Some(SortKey::NameDesc),
            "size_desc" | "largest" => Some(SortKey::SizeDesc),
            "size_asc" | "smallest" => Some(SortKey::SizeAsc),
            "relevance" => Some(SortKey::Relevance),
            _ => None,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::DateDesc
    }
}

/// Media type filter / 媒体类型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaTypeFilter {
    All,
    Photos,
    Videos,
}

impl MediaTypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaTypeFilter::All => "all",
            MediaTypeFilter::Photos => "photos",
            MediaTypeFilter::Videos => "videos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(MediaTypeFilter::All),
            "photos" | "photo" | "image" | "images" => Some(MediaTypeFilter::Photos),
            "videos" | "video" => Some(MediaTypeFilter::Videos),
            _ => None,
        }
    }
}

impl Default for MediaTypeFilter {
    fn default() -> Self {
        MediaTypeFilter::All
    }
}

/// Inclusive date range, either end may be open / 日期范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }
}

/// Full parameter set of one search invocation / 一次搜索的完整参数
///
/// Rebuilt on every user-driven change and compared structurally.
/// 每次用户操作都会重新构造，按字段比较相等。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Free-text query / 搜索文本
    pub query: String,
    /// Retrieval strategy / 检索策略
    pub strategy: SearchStrategy,
    /// Sort key / 排序
    pub sort: SortKey,
    /// Media type filter / 类型过滤
    pub type_filter: MediaTypeFilter,
    /// Only favorites / 仅收藏
    pub favorites_only: bool,
    /// Tag name / 标签
    pub tag: Option<String>,
    /// Date range / 日期范围
    pub date_range: DateRange,
    /// Source filter (import source, device, album) / 来源过滤
    pub source: Option<String>,
}

impl SearchParameters {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_type_filter(mut self, type_filter: MediaTypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_favorites_only(mut self, favorites_only: bool) -> Self {
        self.favorites_only = favorites_only;
        self
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = non_empty(tag);
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = non_empty(source);
        self
    }
}

/// Empty strings mean "no filter" / 空字符串视为未设置
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim();
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    })
}

/// Photo record returned by the remote API, passed through untouched / 远程 API 返回的照片记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoSummary(pub serde_json::Value);

impl PhotoSummary {
    /// Best-effort display label for console output / 用于显示的名称
    pub fn label(&self) -> String {
        for key in ["filename", "name", "path", "id"] {
            match self.0.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(serde_json::Value::Number(n)) => return n.to_string(),
                _ => {}
            }
        }
        self.0.to_string()
    }
}

/// One page of results / 一页结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub results: Vec<PhotoSummary>,
    /// Total-count hint from the server / 服务端返回的总数提示
    #[serde(default, alias = "count", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ResultPage {
    pub fn new(results: Vec<PhotoSummary>) -> Self {
        Self { results, total: None }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Whether a dispatch replaces or extends the displayed results / 搜索模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Replace the result set / 新搜索
    Fresh,
    /// Append the next page / 加载更多
    LoadMore,
}

/// Request handed to the remote search API / 发送给远程搜索 API 的请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub strategy: SearchStrategy,
    pub limit: usize,
    pub offset: usize,
    pub sort: SortKey,
    pub type_filter: MediaTypeFilter,
    pub favorites_only: bool,
    pub tag: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub source: Option<String>,
}

impl SearchRequest {
    pub fn from_params(params: &SearchParameters, limit: usize, offset: usize) -> Self {
        Self {
            query: params.query.clone(),
            strategy: params.strategy,
            limit,
            offset,
            sort: params.sort,
            type_filter: params.type_filter,
            favorites_only: params.favorites_only,
            tag: params.tag.clone(),
            date_from: params.date_range.from,
            date_to: params.date_range.to,
            source: params.source.clone(),
        }
    }

    /// Query-string pairs in the remote API's naming / 查询参数
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("search_type", self.strategy.as_str().to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("type", self.type_filter.as_str().to_string()),
        ];
        if self.favorites_only {
            pairs.push(("favorites", "true".to_string()));
        }
        if let Some(ref tag) = self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(from) = self.date_from {
            pairs.push(("date_from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("date_to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(ref source) = self.source {
            pairs.push(("source", source.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_normalize_to_none() {
        let params = SearchParameters::new("x")
            .with_tag(Some("  ".to_string()))
            .with_source(Some(String::new()));
        assert_eq!(params.tag, None);
        assert_eq!(params.source, None);

        let params = SearchParameters::new("x").with_tag(Some(" trip ".to_string()));
        assert_eq!(params.tag.as_deref(), Some("trip"));
    }

    #[test]
    fn test_query_pairs_skip_absent_filters() {
        let params = SearchParameters::new("beach").with_strategy(SearchStrategy::Semantic);
        let request = SearchRequest::from_params(&params, 50, 100);
        let pairs = request.query_pairs();
        assert!(pairs.contains(&("search_type", "semantic".to_string())));
        assert!(pairs.contains(&("offset", "100".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "tag" || *k == "favorites"));

        let params = params
            .with_favorites_only(true)
            .with_date_range(DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 2), None));
        let pairs = SearchRequest::from_params(&params, 50, 0).query_pairs();
        assert!(pairs.contains(&("favorites", "true".to_string())));
        assert!(pairs.contains(&("date_from", "2024-01-02".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "date_to"));
    }

    #[test]
    fn test_photo_summary_is_opaque() {
        let raw = serde_json::json!({"id": 7, "filename": "IMG_0001.jpg", "faces": [1, 2]});
        let photo: PhotoSummary = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(photo.label(), "IMG_0001.jpg");
        assert_eq!(serde_json::to_value(&photo).unwrap(), raw);
    }

    #[test]
    fn test_result_page_accepts_count_alias() {
        let page: ResultPage = serde_json::from_str(r#"{"results": [{"id": 1}], "count": 42}"#).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.total, Some(42));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!(SearchStrategy::parse("Hybrid"), Some(SearchStrategy::Hybrid));
        assert_eq!(SearchStrategy::parse("vector"), None);
        assert_eq!(SortKey::parse("oldest"), Some(SortKey::DateAsc));
        assert_eq!(MediaTypeFilter::parse("video"), Some(MediaTypeFilter::Videos));
    }
}
