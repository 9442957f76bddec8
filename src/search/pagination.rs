//! Pagination controller / 分页控制

/// Offset and more-available state for the active parameter set / 当前搜索的分页状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationController {
    page_size: usize,
    offset: usize,
    has_more: bool,
}

impl PaginationController {
    /// Nothing loaded yet, so nothing more to load / 初始状态不可加载更多
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            offset: 0,
            has_more: false,
        }
    }

    /// A full page might be followed by more; an exact multiple of the page
    /// size reports one extra (empty) page.
    /// 满页即认为还有更多（结果数恰为页大小整数倍时会多报一页）。
    pub fn page_has_more(count: usize, page_size: usize) -> bool {
        count >= page_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Start of a fresh search / 新搜索开始
    pub fn reset(&mut self) {
        self.offset = 0;
        self.has_more = true;
    }

    /// Record a fetched page, returns the new has-more flag / 记录一页结果
    pub fn record_page(&mut self, count: usize) -> bool {
        self.offset += count;
        self.has_more = Self::page_has_more(count, self.page_size);
        self.has_more
    }

    /// Restore state from a cached first page / 从缓存恢复
    pub fn restore(&mut self, offset: usize, has_more: bool) {
        self.offset = offset;
        self.has_more = has_more;
    }

    /// Whether a load-more should be dispatched / 是否可以加载更多
    pub fn can_load_more(&self, fetch_in_flight: bool) -> bool {
        !fetch_in_flight && self.has_more
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation() {
        let mut pager = PaginationController::new(50);
        pager.reset();

        let flags: Vec<bool> = [50, 50, 12].iter().map(|&n| pager.record_page(n)).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(pager.offset(), 112);
        assert!(!pager.can_load_more(false));
    }

    #[test]
    fn test_reset() {
        let mut pager = PaginationController::new(50);
        assert!(!pager.has_more());
        pager.record_page(7);
        pager.reset();
        assert_eq!(pager.offset(), 0);
        assert!(pager.has_more());
    }

    #[test]
    fn test_in_flight_blocks_load_more() {
        let mut pager = PaginationController::new(10);
        pager.reset();
        pager.record_page(10);
        assert!(pager.can_load_more(false));
        assert!(!pager.can_load_more(true));
    }

    #[test]
    fn test_exact_multiple_reports_more() {
        let mut pager = PaginationController::new(25);
        pager.reset();
        assert!(pager.record_page(25));
        assert!(!pager.record_page(0));
        assert_eq!(pager.offset(), 25);
    }
}
