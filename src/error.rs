use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarcBatchError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read input record on line {line}")]
    InputRead {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare directory: {path}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Failed to write batch report: {path}")]
    Report { path: String, message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for WarcBatchError {
    fn user_message(&self) -> String {
        match self {
            WarcBatchError::InputRead { line, source } => {
                format!("Could not read input line {}: {}", line, source)
            }
            WarcBatchError::Directory { path, source } => {
                format!("Could not create directory {}: {}", path, source)
            }
            WarcBatchError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            WarcBatchError::Cancelled => "Operation was cancelled by user".to_string(),
            WarcBatchError::Report { path, message } => {
                format!("Could not write batch report {}: {}", path, message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            WarcBatchError::InputRead { .. } => Some(
                "Pipe one WARC path or URI per line on standard input, encoded as UTF-8.".to_string()
            ),
            WarcBatchError::Directory { .. } => Some(
                "Ensure you have write permission in the working directory, or choose another one with --work-dir.".to_string()
            ),
            WarcBatchError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate one with --generate-config.".to_string()
            ),
            WarcBatchError::Report { .. } => Some(
                "Choose a --report path inside an existing, writable directory.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for WarcBatchError {
    fn from(error: toml::de::Error) -> Self {
        WarcBatchError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WarcBatchError>;
