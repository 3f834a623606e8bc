//! # Skimmer Headless
//!
//! A fixed-size bag of pre-connected headless browsers. Browsers are
//! launched once at startup, checked out per request, and returned
//! when the request's guard drops. The pool tracks every browser it
//! ever created so shutdown can close them all even when the idle
//! channel has been drained.

pub mod pool;

pub use pool::{BrowserGuard, BrowserPool, PooledBrowser};
