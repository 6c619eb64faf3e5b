use std::any::Any;

use derive_more::derive::From;

// region -- ThreadError

pub type ThreadResult<T> = core::result::Result<T, ThreadError>;

#[derive(From, Debug)]
pub enum ThreadError {
    /// The operating system refused to create the thread,
    /// usually due to resource limits.
    FailedStart(std::io::Error),

    /// The unit of work owned by the thread panicked before completing.
    #[from(ignore)]
    Panicked { name: String, message: String },
}

impl ThreadError {
    pub(crate) fn panicked(name: &str, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            String::from("<non-string panic payload>")
        };

        Self::Panicked {
            name: name.to_string(),
            message,
        }
    }

    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

impl core::error::Error for ThreadError {}

impl core::fmt::Display for ThreadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailedStart(err) => write!(f, "ThreadError::FailedStart({err})"),
            Self::Panicked { name, message } => {
                write!(f, "ThreadError::Panicked(thread={name}, message={message})")
            }
        }
    }
}

// --- end region: ThreadError

// region -- ConfigError

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    IOError(std::io::Error),

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),

    #[from(ignore)]
    InvalidValue { key: &'static str, value: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl core::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// --- end region: ConfigError

// region -- SignalError

pub type SignalResult<T> = core::result::Result<T, SignalError>;

#[derive(Debug, From)]
pub enum SignalError {
    Registration(ctrlc::Error),
}

impl core::error::Error for SignalError {}

impl core::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// --- end region: SignalError
