use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_position(element: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidPosition {
                element: element.into(),
            }
            .into(),
        )
    }

    pub fn closed(element: impl Into<String>) -> Error {
        Error(
            ErrorKind::Closed {
                element: element.into(),
            }
            .into(),
        )
    }

    /// Reports bytes that claim to be a redirect but fail length or tag
    /// validation. The offending bytes are kept hex-encoded for diagnostics.
    pub fn malformed_redirect(bytes: &[u8]) -> Error {
        Error(
            ErrorKind::MalformedRedirect {
                len: bytes.len(),
                hex: hex::encode(bytes),
            }
            .into(),
        )
    }

    pub fn not_found(element: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotFound {
                element: element.into(),
            }
            .into(),
        )
    }

    pub fn configuration(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Configuration {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn is_invalid_position(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidPosition { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::Closed { .. })
    }

    pub fn is_malformed_redirect(&self) -> bool {
        matches!(self.kind(), ErrorKind::MalformedRedirect { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("cursor for '{element}' is not positioned on an element")]
    InvalidPosition { element: String },

    #[error("'{element}' has been closed")]
    Closed { element: String },

    #[error("not a serialized redirect ({len} bytes): {hex}")]
    MalformedRedirect { len: usize, hex: String },

    #[error("'{element}' not found")]
    NotFound { element: String },

    #[error("invalid configuration {name}: {message}")]
    Configuration { name: String, message: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
