use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::{Settings, SettingsError};

/// Re-parses and validates one section; stored per registered type so that
/// `reload` can re-check sections without knowing their concrete types.
type SectionCheck = fn(&Value) -> Result<(), SettingsError>;

fn check_section<T: Settings>(value: &Value) -> Result<(), SettingsError> {
    let parsed = decode::<T>(value)?;
    parsed.validate()
}

fn decode<T: Settings>(value: &Value) -> Result<T, SettingsError> {
    if !value.is_table() {
        return Err(SettingsError::NotATable(T::SECTION));
    }
    T::deserialize(value.clone()).map_err(SettingsError::from)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn parse_table(content: &str) -> Result<Table, SettingsError> {
    if content.trim().is_empty() {
        return Ok(Table::new());
    }
    Ok(toml::from_str::<Table>(content)?)
}

/// Builder for [`SettingsStore`].
#[derive(Debug, Default)]
pub struct SettingsStoreBuilder {
    settings_file: Option<PathBuf>,
    contents: Option<String>,
}

impl SettingsStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back the store with a file. A missing file means every section is absent.
    pub fn with_settings_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Back the store with in-memory TOML (no reload source).
    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn build(self) -> Result<SettingsStore, SettingsError> {
        let raw = match (&self.settings_file, &self.contents) {
            (_, Some(contents)) => parse_table(contents)?,
            (Some(path), None) => load_file(path)?,
            (None, None) => Table::new(),
        };

        Ok(SettingsStore {
            file_path: self.settings_file,
            raw: RwLock::new(raw),
            sections: RwLock::new(HashMap::new()),
        })
    }
}

fn load_file(path: &Path) -> Result<Table, SettingsError> {
    if !path.exists() {
        debug!(
            target = "settings::store",
            "settings file {} not found, all sections absent",
            path.display()
        );
        return Ok(Table::new());
    }
    let content = fs::read_to_string(path)?;
    parse_table(&content)
}

/// Settings store (thread-safe).
///
/// Sections must be registered before they can be read. Registration validates
/// the section if it is present; absence is recorded and reported on `get`.
pub struct SettingsStore {
    file_path: Option<PathBuf>,
    raw: RwLock<Table>,
    sections: RwLock<HashMap<&'static str, SectionCheck>>,
}

impl SettingsStore {
    pub fn builder() -> SettingsStoreBuilder {
        SettingsStoreBuilder::new()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_registered<T: Settings>(&self) -> bool {
        read(&self.sections).contains_key(T::name())
    }

    /// Whether the section of `T` is present in the loaded file.
    pub fn is_present<T: Settings>(&self) -> bool {
        read(&self.raw).contains_key(T::name())
    }

    /// Register a section type. Fails if the section is present but malformed.
    pub fn register<T: Settings>(&self) -> Result<(), SettingsError> {
        let section = T::name();
        if read(&self.sections).contains_key(section) {
            return Err(SettingsError::AlreadyRegistered(section));
        }

        if let Some(value) = read(&self.raw).get(section) {
            check_section::<T>(value)?;
        } else {
            debug!(
                target = "settings::store",
                "section [{section}] registered but absent"
            );
        }

        write(&self.sections).insert(section, check_section::<T>);
        Ok(())
    }

    /// Section value; `SectionMissing` when the file does not carry it.
    pub fn get<T: Settings>(&self) -> Result<T, SettingsError> {
        self.try_get::<T>()?
            .ok_or(SettingsError::SectionMissing(T::name()))
    }

    /// `None` when the section is registered but absent.
    pub fn try_get<T: Settings>(&self) -> Result<Option<T>, SettingsError> {
        let section = T::name();
        if !read(&self.sections).contains_key(section) {
            return Err(SettingsError::NotRegistered(section));
        }
        let raw = read(&self.raw);
        let Some(value) = raw.get(section) else {
            return Ok(None);
        };
        decode::<T>(value).map(Some)
    }

    /// Section value, or `T::default()` when absent.
    pub fn get_or_default<T: Settings + Default>(&self) -> Result<T, SettingsError> {
        Ok(self.try_get::<T>()?.unwrap_or_default())
    }

    /// Re-read the backing file and re-validate all registered sections.
    ///
    /// On failure the previously loaded contents stay in effect.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let Some(path) = self.file_path.as_deref() else {
            return Ok(());
        };
        let fresh = load_file(path)?;

        for (section, check) in read(&self.sections).iter() {
            if let Some(value) = fresh.get(*section) {
                if let Err(err) = check(value) {
                    warn!(
                        target = "settings::store",
                        "reload rejected, section [{section}] invalid: {err}"
                    );
                    return Err(err);
                }
            }
        }

        *write(&self.raw) = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Default)]
    struct Audio {
        volume: u8,
    }

    impl Settings for Audio {
        const SECTION: &'static str = "audio";

        fn validate(&self) -> Result<(), SettingsError> {
            if self.volume > 100 {
                return Err(SettingsError::Invalid {
                    section: Self::SECTION,
                    reason: format!("volume {} above 100", self.volume),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn absent_section_is_missing_not_defaulted() {
        let store = SettingsStore::builder()
            .with_contents("[other]\nx = 1\n")
            .build()
            .unwrap();
        store.register::<Audio>().unwrap();

        assert!(matches!(
            store.get::<Audio>(),
            Err(SettingsError::SectionMissing("audio"))
        ));
        assert_eq!(store.try_get::<Audio>().unwrap(), None);
        assert_eq!(store.get_or_default::<Audio>().unwrap(), Audio::default());
    }

    #[test]
    fn unregistered_section_is_rejected() {
        let store = SettingsStore::builder()
            .with_contents("[audio]\nvolume = 3\n")
            .build()
            .unwrap();
        assert!(matches!(
            store.get::<Audio>(),
            Err(SettingsError::NotRegistered("audio"))
        ));
    }

    #[test]
    fn validation_runs_on_register() {
        let store = SettingsStore::builder()
            .with_contents("[audio]\nvolume = 250\n")
            .build()
            .unwrap();
        assert!(matches!(
            store.register::<Audio>(),
            Err(SettingsError::Invalid { section: "audio", .. })
        ));
        assert!(!store.is_registered::<Audio>());
    }

    #[test]
    fn double_register_fails() {
        let store = SettingsStore::builder().build().unwrap();
        store.register::<Audio>().unwrap();
        assert!(matches!(
            store.register::<Audio>(),
            Err(SettingsError::AlreadyRegistered("audio"))
        ));
    }

    #[test]
    fn non_table_section_is_rejected() {
        let store = SettingsStore::builder()
            .with_contents("audio = 5\n")
            .build()
            .unwrap();
        assert!(matches!(
            store.register::<Audio>(),
            Err(SettingsError::NotATable("audio"))
        ));
    }
}
