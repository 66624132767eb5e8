//! Integration tests for the SettingsStore:
//! - Sections read from a real file
//! - Absent sections stay absent
//! - Reloading after external file modification

use std::fs;

use serde::Deserialize;
use settings::{Settings, SettingsError, SettingsStore};

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Lobby {
    max_players: u16,
    public: bool,
}

impl Settings for Lobby {
    const SECTION: &'static str = "lobby";
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Timing {
    delay_secs: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self { delay_secs: 2.5 }
    }
}

impl Settings for Timing {
    const SECTION: &'static str = "timing";

    fn validate(&self) -> Result<(), SettingsError> {
        if self.delay_secs.is_sign_negative() {
            return Err(SettingsError::Invalid {
                section: Self::SECTION,
                reason: "delay must not be negative".into(),
            });
        }
        Ok(())
    }
}

#[test]
fn reads_sections_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("host.toml");
    fs::write(&path, "[lobby]\nmax_players = 6\npublic = true\n").expect("write settings");

    let store = SettingsStore::builder()
        .with_settings_file(&path)
        .build()
        .expect("build store");
    store.register::<Lobby>().expect("register lobby");
    store.register::<Timing>().expect("register timing");

    assert_eq!(store.file_path(), Some(path.as_path()));
    assert_eq!(
        store.get::<Lobby>().expect("lobby"),
        Lobby {
            max_players: 6,
            public: true
        }
    );
    assert!(!store.is_present::<Timing>());
    assert_eq!(store.get_or_default::<Timing>().expect("timing"), Timing::default());
}

#[test]
fn missing_file_means_every_section_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::builder()
        .with_settings_file(dir.path().join("nope.toml"))
        .build()
        .expect("build store");
    store.register::<Lobby>().expect("register");

    assert!(matches!(
        store.get::<Lobby>(),
        Err(SettingsError::SectionMissing("lobby"))
    ));
}

#[test]
fn partial_section_is_an_error_not_a_default() {
    let store = SettingsStore::builder()
        .with_contents("[lobby]\nmax_players = 4\n")
        .build()
        .expect("build store");

    assert!(matches!(
        store.register::<Lobby>(),
        Err(SettingsError::Toml(_))
    ));
}

#[test]
fn reload_applies_external_changes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("host.toml");
    fs::write(&path, "").expect("write empty settings");

    let store = SettingsStore::builder()
        .with_settings_file(&path)
        .build()
        .expect("build");
    store.register::<Lobby>().expect("register lobby");
    store.register::<Timing>().expect("register timing");
    assert!(store.try_get::<Lobby>().expect("try_get").is_none());

    fs::write(
        &path,
        "[lobby]\nmax_players = 8\npublic = false\n\n[timing]\ndelay_secs = 4.0\n",
    )
    .expect("write external change");
    store.reload().expect("reload");

    assert_eq!(store.get::<Lobby>().expect("lobby").max_players, 8);
    assert_eq!(store.get::<Timing>().expect("timing").delay_secs, 4.0);
}

#[test]
fn invalid_reload_keeps_previous_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("host.toml");
    fs::write(&path, "[timing]\ndelay_secs = 1.0\n").expect("write settings");

    let store = SettingsStore::builder()
        .with_settings_file(&path)
        .build()
        .expect("build");
    store.register::<Timing>().expect("register");

    fs::write(&path, "[timing]\ndelay_secs = -3.0\n").expect("write invalid change");
    assert!(matches!(
        store.reload(),
        Err(SettingsError::Invalid {
            section: "timing",
            ..
        })
    ));
    assert_eq!(store.get::<Timing>().expect("timing").delay_secs, 1.0);
}
