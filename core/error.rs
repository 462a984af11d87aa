use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Packed Document Error: {0}")]
    XmlParse(String),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable Entry: '{path}': {reason}")]
    UnreadableEntry { path: String, reason: String },

    #[error("Invalid Source Reference: {0}")]
    InvalidSourceReference(String),

    #[error("Remote Resource Not Found: {0}")]
    RemoteResourceNotFound(String),

    #[error("Fetch Failed: '{url}': {reason}")]
    TransientFetch { url: String, reason: String },

    #[error("HTTP Error: {0}")]
    Http(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),

    #[error("Data Loading Error: {0}")]
    DataLoading(String),
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for AppError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        AppError::XmlParse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for AppError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        AppError::XmlParse(err.to_string())
    }
}

impl From<std::str::Utf8Error> for AppError {
    fn from(err: std::str::Utf8Error) -> Self {
        AppError::DataLoading(format!("UTF-8 decoding error: {}", err))
    }
}
