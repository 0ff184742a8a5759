use std::{io::Write, path::Path};

mod adapter;
mod model;
mod raw;

pub use model::DaemonSnapshot;

/// Error type for snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("toml encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error(s): {0}")]
    Validation(String),
}

/// Load the persisted snapshot from a file path. A file that does not exist
/// yet is an empty snapshot; a file that cannot be read or decoded is an
/// error.
///
/// # Errors
///
/// Returns a `ConfigError` if the snapshot cannot be read or parsed.
pub fn load_snapshot(path: &Path) -> Result<DaemonSnapshot, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DaemonSnapshot::default());
        }
        Err(err) => return Err(err.into()),
    };
    parse_toml(&text)
}

/// Parse a snapshot document from a string.
///
/// # Errors
///
/// Returns a `ConfigError` if the document cannot be parsed or validated.
pub fn parse_toml(text: &str) -> Result<DaemonSnapshot, ConfigError> {
    let raw_snapshot = toml::from_str::<raw::RawSnapshot>(text)?;
    raw_snapshot.into_snapshot()
}

/// Persist the snapshot atomically: write a temp sibling, flush it, then
/// rename it over the destination.
///
/// # Errors
///
/// Returns a `ConfigError` if the snapshot cannot be encoded or written.
pub fn save_snapshot(snapshot: &DaemonSnapshot, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("toml.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
