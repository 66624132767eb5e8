//! Sectioned settings backed by a single TOML file.
//!
//! Every setting type is one section (`[join_policy]`, `[join_timing]`, ...).
//! A section that is not present in the file stays absent: the store does not
//! invent values for it. Callers decide whether absence is an error
//! ([`SettingsStore::get`]) or falls back to `Default`
//! ([`SettingsStore::get_or_default`]).

mod errors;
pub(crate) mod settings;
pub(crate) mod store;

pub use errors::SettingsError;
pub use settings::Settings;
pub use store::{SettingsStore, SettingsStoreBuilder};
