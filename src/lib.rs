//! gitreader: search GitHub repositories and read their READMEs with safe,
//! syntax-highlighted Markdown rendering.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
