//! Query classifier - picks a search strategy from the raw query text / 查询分类器
//!
//! Rule order / 规则顺序：
//! 1. Empty query → metadata (browsing) / 空查询为浏览模式
//! 2. Structured field patterns → metadata / 字段语法
//! 3. Natural-language patterns → semantic / 自然语言
//! 4. More than 3 words → hybrid / 长查询
//! 5. Otherwise → semantic

use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::SearchStrategy;
use super::tokenizer::{normalize_query, word_count};

/// Queries longer than this many words are ambiguous / 超过该词数视为混合查询
const HYBRID_WORD_THRESHOLD: usize = 3;

static METADATA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\w+:\w+").unwrap(),
        Regex::new(r"\b(camera|lens|iso|aperture|date|location|tag|size|format):").unwrap(),
    ]
});

static SEMANTIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Explicit requests / 显式请求
        Regex::new(r"\b(show me|find|search for|looking for|photos of|pictures of|images of)\b").unwrap(),
        // Content nouns / 内容名词
        Regex::new(
            r"\b(people|person|portraits?|animals?|pets?|dogs?|cats?|birds?|nature|landscapes?|mountains?|beach|ocean|sunsets?|sunrise|sky|food|travel|city|architecture|flowers?)\b",
        )
        .unwrap(),
        // Colors / 颜色
        Regex::new(r"\b(red|orange|yellow|green|blue|purple|pink|brown|black|white|gr[ae]y|golden)\b").unwrap(),
        // Emotions / 情绪
        Regex::new(r"\b(happy|sad|smiling|laughing|angry|calm|peaceful|joyful|romantic|excited)\b").unwrap(),
        Regex::new(r"(人物|动物|风景|美食|旅行|日落|海边|花)").unwrap(),
    ]
});

/// Classify a query into a search strategy / 将查询分类为检索策略
pub fn classify(query: &str) -> SearchStrategy {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return SearchStrategy::Metadata;
    }

    if METADATA_PATTERNS.iter().any(|re| re.is_match(&normalized)) {
        return SearchStrategy::Metadata;
    }

    if SEMANTIC_PATTERNS.iter().any(|re| re.is_match(&normalized)) {
        return SearchStrategy::Semantic;
    }

    if word_count(&normalized) > HYBRID_WORD_THRESHOLD {
        return SearchStrategy::Hybrid;
    }

    SearchStrategy::Semantic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_metadata() {
        assert_eq!(classify(""), SearchStrategy::Metadata);
        assert_eq!(classify("   \t"), SearchStrategy::Metadata);
    }

    #[test]
    fn test_structured_fields() {
        assert_eq!(classify("camera:canon"), SearchStrategy::Metadata);
        assert_eq!(classify("ISO: 800"), SearchStrategy::Metadata);
        assert_eq!(classify("album:summer2023"), SearchStrategy::Metadata);
    }

    #[test]
    fn test_metadata_beats_semantic() {
        // "find" and "beach" are semantic, the field syntax wins / 字段语法优先
        assert_eq!(classify("find location:beach"), SearchStrategy::Metadata);
    }

    #[test]
    fn test_natural_language() {
        assert_eq!(classify("show me sunsets at the beach"), SearchStrategy::Semantic);
        assert_eq!(classify("Find my dog"), SearchStrategy::Semantic);
        assert_eq!(classify("blue"), SearchStrategy::Semantic);
        assert_eq!(classify("happy kids playing in the garden"), SearchStrategy::Semantic);
        assert_eq!(classify("海边的日落"), SearchStrategy::Semantic);
    }

    #[test]
    fn test_long_query_is_hybrid() {
        assert_eq!(classify("old barn near grandpa farm"), SearchStrategy::Hybrid);
        assert_eq!(classify("wedding reception at the vineyard"), SearchStrategy::Hybrid);
    }

    #[test]
    fn test_short_query_defaults_to_semantic() {
        assert_eq!(classify("family"), SearchStrategy::Semantic);
        assert_eq!(classify("graduation day"), SearchStrategy::Semantic);
        assert_eq!(classify("wedding at vineyard"), SearchStrategy::Semantic);
    }

    #[test]
    fn test_word_boundaries() {
        // "findings" must not trigger "find" / 单词边界
        assert_eq!(classify("findings"), SearchStrategy::Semantic);
        assert_eq!(classify("research findings from last quarter"), SearchStrategy::Hybrid);
    }
}
