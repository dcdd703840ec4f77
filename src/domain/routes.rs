//! Page routes served as HTML shells.
//!
//! Matching is exact on the path; anything unknown falls back to the main
//! explorer page rather than a 404, so deep links into client state still load.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRoute {
    Explorer,
    CheckoutSuccess,
    CheckoutCancel,
}

const ROUTES: &[(&str, PageRoute)] = &[
    ("/", PageRoute::Explorer),
    ("/success", PageRoute::CheckoutSuccess),
    ("/cancel", PageRoute::CheckoutCancel),
];

impl PageRoute {
    pub fn path(&self) -> &'static str {
        ROUTES
            .iter()
            .find(|(_, route)| route == self)
            .map(|(path, _)| *path)
            .unwrap_or("/")
    }
}

/// Exact-path lookup.
pub fn match_path(path: &str) -> Option<PageRoute> {
    ROUTES
        .iter()
        .find(|(candidate, _)| *candidate == path)
        .map(|(_, route)| *route)
}

/// Exact-path lookup with the explorer as fallback.
pub fn resolve(path: &str) -> PageRoute {
    match_path(path).unwrap_or(PageRoute::Explorer)
}
