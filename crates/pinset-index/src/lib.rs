//! Package metadata providers: a local TOML index, a PyPI JSON API client,
//! and the on-disk cache for PyPI responses.

pub mod cache;
pub mod error;
pub mod local;
pub mod pypi;

pub use cache::HttpCache;
pub use local::LocalIndex;
pub use pypi::PypiProvider;
