//! Page-number pagination for repository search.

use gitreader_api_types::{PageLink, PaginationView};

pub const DEFAULT_PER_PAGE: u32 = 10;
/// GitHub never pages past the first thousand search results.
pub const MAX_SEARCH_RESULTS: u64 = 1000;
const WINDOW_DELTA: u32 = 2;

/// Highest page number the provider will serve at `per_page`.
pub fn page_limit(per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    MAX_SEARCH_RESULTS.div_ceil(per_page) as u32
}

/// Number of reachable pages for `total_count` results.
pub fn total_pages(total_count: u64, per_page: u32) -> u32 {
    let pages = total_count.div_ceil(u64::from(per_page.max(1)));
    pages.min(u64::from(page_limit(per_page))) as u32
}

/// Page buttons to show: first, last, and the current page's neighbours,
/// with gaps where numbers are skipped. Empty when there is one page or less.
pub fn page_window(current: u32, total: u32) -> Vec<PageLink> {
    if total <= 1 {
        return Vec::new();
    }

    let page = |number: u32| PageLink::Page {
        number,
        current: number == current,
    };

    let mut window = vec![page(1)];
    if current.saturating_sub(WINDOW_DELTA) > 2 {
        window.push(PageLink::Gap);
    }

    let first_inner = current.saturating_sub(WINDOW_DELTA).max(2);
    let last_inner = current.saturating_add(WINDOW_DELTA).min(total - 1);
    window.extend((first_inner..=last_inner).map(page));

    if current.saturating_add(WINDOW_DELTA) < total - 1 {
        window.push(PageLink::Gap);
    }
    window.push(page(total));
    window
}

pub fn pagination_view(current: u32, total_count: u64, per_page: u32) -> PaginationView {
    let total = total_pages(total_count, per_page);
    PaginationView {
        current_page: current,
        total_pages: total,
        per_page,
        has_previous: current > 1,
        has_next: current < total,
        window: page_window(current, total),
    }
}
