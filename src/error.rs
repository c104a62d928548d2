use thiserror::Error;

#[derive(Error, Debug)]
pub enum PunchcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Structural frame source failures. Any of these ends the processing loop.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame source disconnected: {details}")]
    Disconnected { details: String },

    #[error("Frame source reached the end of its stream")]
    EndOfStream,

    #[error("Failed to read from frame source: {details}")]
    Read { details: String },
}

impl PunchcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True when the error means the frame source ran out of input rather than failed
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Source(SourceError::EndOfStream))
    }
}

pub type Result<T> = std::result::Result<T, PunchcamError>;
