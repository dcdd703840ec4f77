//! Application services layer.

pub mod account;
pub mod checkout;
pub mod error;
pub mod pagination;
pub mod providers;
pub mod readme;
pub mod render;
pub mod search;
pub mod suggestions;
