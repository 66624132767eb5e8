use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("section not registered: {0}")]
    NotRegistered(&'static str),

    #[error("section already registered: {0}")]
    AlreadyRegistered(&'static str),

    #[error("section missing from settings: {0}")]
    SectionMissing(&'static str),

    #[error("section `{0}` is not a table")]
    NotATable(&'static str),

    #[error("invalid value in `{section}`: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}
