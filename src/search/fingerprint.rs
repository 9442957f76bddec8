//! Request fingerprints - cache keys and duplicate-search guards / 请求指纹
//!
//! Layout: `query|strategy|sort|type|favorites|tag|from|to|source[|@offset]`
//! Free-text fields are escaped, absent fields are empty, present optional
//! fields carry a `=` marker so `None` and `Some("")` never collide.

use super::schema::SearchParameters;

const SEPARATOR: char = '|';

/// Fingerprint of the parameter set without pagination / 不含偏移量的指纹
pub fn base_fingerprint(params: &SearchParameters) -> String {
    let fields = [
        escape(&params.query),
        params.strategy.as_str().to_string(),
        params.sort.as_str().to_string(),
        params.type_filter.as_str().to_string(),
        if params.favorites_only { "1" } else { "0" }.to_string(),
        optional(params.tag.as_deref()),
        optional(params.date_range.from.map(|d| d.to_string()).as_deref()),
        optional(params.date_range.to.map(|d| d.to_string()).as_deref()),
        optional(params.source.as_deref()),
    ];
    fields.join(&SEPARATOR.to_string())
}

/// Fingerprint of the parameter set at a given offset / 含偏移量的指纹
pub fn fingerprint(params: &SearchParameters, offset: usize) -> String {
    format!("{}{}@{}", base_fingerprint(params), SEPARATOR, offset)
}

fn optional(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("={}", escape(v)),
        None => String::new(),
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == SEPARATOR {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::{DateRange, MediaTypeFilter, SearchStrategy, SortKey};
    use chrono::NaiveDate;

    fn sample() -> SearchParameters {
        SearchParameters::new("sunset")
            .with_strategy(SearchStrategy::Semantic)
            .with_sort(SortKey::DateAsc)
            .with_type_filter(MediaTypeFilter::Photos)
            .with_tag(Some("trip".to_string()))
            .with_date_range(DateRange::new(NaiveDate::from_ymd_opt(2023, 6, 1), None))
    }

    #[test]
    fn test_equal_params_equal_fingerprints() {
        let a = sample();
        let b = sample();
        assert_eq!(fingerprint(&a, 0), fingerprint(&b, 0));
        assert_eq!(base_fingerprint(&a), base_fingerprint(&b));
    }

    #[test]
    fn test_every_field_changes_fingerprint() {
        let base = sample();
        let variants = vec![
            SearchParameters { query: "sunrise".into(), ..base.clone() },
            SearchParameters { strategy: SearchStrategy::Hybrid, ..base.clone() },
            SearchParameters { sort: SortKey::NameAsc, ..base.clone() },
            SearchParameters { type_filter: MediaTypeFilter::Videos, ..base.clone() },
            SearchParameters { favorites_only: true, ..base.clone() },
            SearchParameters { tag: None, ..base.clone() },
            SearchParameters { tag: Some("work".into()), ..base.clone() },
            SearchParameters { date_range: DateRange::default(), ..base.clone() },
            SearchParameters {
                date_range: DateRange::new(None, NaiveDate::from_ymd_opt(2023, 6, 1)),
                ..base.clone()
            },
            SearchParameters { source: Some("iphone".into()), ..base.clone() },
        ];

        let reference = fingerprint(&base, 0);
        for variant in &variants {
            assert_ne!(fingerprint(variant, 0), reference, "{:?}", variant);
        }
        assert_ne!(fingerprint(&base, 50), reference);
    }

    #[test]
    fn test_separator_in_text_does_not_collide() {
        let a = SearchParameters::new("a|semantic").with_tag(Some("x".into()));
        let b = SearchParameters::new("a").with_tag(Some("semantic|x".into()));
        assert_ne!(base_fingerprint(&a), base_fingerprint(&b));

        let c = SearchParameters::new("x").with_source(Some("=".into()));
        let d = SearchParameters::new("x");
        assert_ne!(base_fingerprint(&c), base_fingerprint(&d));
    }

    #[test]
    fn test_offset_suffix() {
        let params = SearchParameters::new("cats");
        let fp = fingerprint(&params, 100);
        assert!(fp.starts_with(&base_fingerprint(&params)));
        assert!(fp.ends_with("|@100"));
    }
}
