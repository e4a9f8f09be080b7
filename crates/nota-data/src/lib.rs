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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Postgres data access layer for Nota: migrations, credential hashing, and the domain store.

mod credentials;
pub mod error;
pub mod store;

pub use error::{DataError, Result as DataResult};
pub use store::{
    CommentCreateOutcome, CommentWriteOutcome, IssuedSession, NotaStore, NoteWriteOutcome,
    RegisterOutcome,
};
