pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("application `{0}` has no process")]
    NoProcess(String),

    #[error("unsupported language `{0}`")]
    UnsupportedLanguage(String),

    #[error("build failed: {message}")]
    BuildFailure { message: String, output: Vec<u8> },

    #[error("application `{0}` already exists")]
    DuplicateApplication(String),

    #[error("unknown application `{0}`")]
    UnknownApplication(String),

    #[error("persist error: {0}")]
    Persist(#[from] maestro_config::ConfigError),
}
