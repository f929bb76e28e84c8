//! Path-based JSON expectations for HTTP API tests.
//!
//! Paths like `items.*.tags.?.name` navigate a decoded response body; `*`
//! requires every element to match and `?` requires at least one.

pub mod adapters;
pub mod cmd;
pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
pub mod util;
