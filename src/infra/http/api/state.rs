use std::sync::Arc;

use crate::application::account::AccountService;
use crate::application::checkout::CheckoutService;
use crate::application::readme::ReadmeService;
use crate::application::search::SearchService;
use crate::application::suggestions::SuggestionService;

#[derive(Clone)]
pub struct ApiState {
    pub search: Arc<SearchService>,
    pub suggestions: Arc<SuggestionService>,
    pub readme: Arc<ReadmeService>,
    pub checkout: Arc<CheckoutService>,
    pub account: Arc<AccountService>,
}
