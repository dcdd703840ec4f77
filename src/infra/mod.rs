//! Infrastructure adapters and runtime bootstrap.

pub mod checkout;
pub mod error;
pub mod github;
pub mod http;
pub mod identity;
pub mod telemetry;
