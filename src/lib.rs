pub mod auth;
pub mod engine;
pub mod error;
pub mod http;
pub mod model;
pub mod observability;
pub mod reaper;
pub mod session;
pub mod storage;
