//! Query tokenizer - word counting for the strategy classifier / 查询分词器
//!
//! Supports / 支持：
//! - Latin text: whitespace separation + lowercase / 英文按空白分词
//! - CJK text: jieba segmentation (search mode) / 中日韩文本使用 jieba 分词

use jieba_rs::Jieba;
use once_cell::sync::Lazy;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Tokenize a search query into words / 对搜索查询进行分词
///
/// Punctuation-only fragments are dropped so they never count as words.
/// 纯标点片段不计为词。
pub fn tokenize_query(query: &str) -> Vec<String> {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return Vec::new();
    }

    if !contains_cjk(&normalized) {
        return normalized
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();
    }

    JIEBA
        .cut(&normalized, true)
        .into_iter()
        .map(|w| w.trim())
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .map(|w| w.to_string())
        .collect()
}

/// Number of words in the query / 查询词数
pub fn word_count(query: &str) -> usize {
    tokenize_query(query).len()
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测文本是否包含CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
            '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
            '\u{3040}'..='\u{309f}' |  // Hiragana
            '\u{30a0}'..='\u{30ff}' |  // Katakana
            '\u{ac00}'..='\u{d7af}'    // Hangul Syllables
        )
    })
}

/// Normalize a query / 标准化查询
/// - Convert to lowercase / 转小写
/// - Collapse whitespace / 合并空白
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
