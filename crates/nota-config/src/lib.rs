#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-backed configuration for the Nota services.
//!
//! Layout: `settings.rs` (typed `AppSettings` loaded from `NOTA_*` variables
//! with local-dev defaults), `error.rs` (`ConfigError`). Parsing lives here;
//! semantic checks such as port and TTL sanity belong to the app bootstrap.

pub mod error;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::AppSettings;
