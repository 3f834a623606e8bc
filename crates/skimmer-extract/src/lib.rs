//! # Skimmer Extract
//!
//! Source-specific extraction adapters and the dispatcher that routes a
//! URL to one of them. Adapters share a single capability: given a URL,
//! the entry endpoint and an optional character cap, produce the
//! source's structured payload or a typed error. The dispatcher
//! materializes errors into failed [`skimmer_types::ExtractedResult`]s;
//! nothing escapes the per-URL boundary.

pub mod dispatcher;
pub mod pdf;
pub mod reddit;
pub mod twitter;
pub mod webpage;
pub mod youtube;

pub use dispatcher::{classify, pool_class, Dispatcher, PoolClass};
pub use pdf::PdfAdapter;
pub use reddit::RedditAdapter;
pub use twitter::TwitterAdapter;
pub use webpage::WebpageAdapter;
pub use youtube::YoutubeAdapter;
