//! Domain layer types and invariants.

pub mod account;
pub mod document;
pub mod error;
pub mod language;
pub mod products;
pub mod repository;
pub mod routes;

pub use gitreader_api_types::Theme;
