use thiserror::Error;

/// The one error type the crate exposes.
///
/// It's a newtype around a boxed ErrorKind so that Results stay one pointer
/// wide no matter how large the biggest variant gets.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Error(Box::new(value.into()))
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    /// The parser reported a definite malformation. Anything more specific is
    /// lost on purpose: parsing communicates through a boolean, not errors.
    #[error("Could not understand query:\n{0}")]
    MalformedQuery(String),
    #[error("IO error:\n{0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error:\n{0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub fn into_inner(self) -> ErrorKind {
        *self.0
    }
}
