//! HTTP surface of the tx mirror: routes, layers and shared handler state.

pub mod app;
pub mod middleware;
pub mod router;
