#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Settings facade for the replication engine.
//!
//! Layout: `defaults.rs` (setting keys and fall-back values), `store.rs`
//! (`SettingsStore` trait and the in-memory/JSON-backed store), `validate.rs`
//! (typed field parsers), `model.rs` (`GlobalConfig`, raw and resolved mappings).

pub mod defaults;
pub mod error;
pub mod model;
pub mod store;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{GlobalConfig, Mapping, Method, RawMapping};
pub use store::{MemorySettings, SettingsStore, apply_defaults};
