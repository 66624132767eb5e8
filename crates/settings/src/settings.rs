use serde::de::DeserializeOwned;

use crate::SettingsError;

/// A value that lives in its own section of the settings file.
pub trait Settings: DeserializeOwned + 'static + Send + Sync {
    /// Table name inside the TOML file.
    const SECTION: &'static str;

    fn name() -> &'static str {
        Self::SECTION
    }

    /// Semantic checks beyond what serde enforces. Runs on register and reload.
    fn validate(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}
