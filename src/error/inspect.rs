//! Errors of the `inspect` command, one per pipeline step

use crate::error::RegistryError;
use thiserror::Error;

/// Which step of the inspect pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUsage,
    ReferenceParse,
    SourceOpen,
    ImageParse,
    Inspect,
    MissingLabel,
    SourceClose,
    /// Writing the result line failed
    Output,
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("image reference missing: expected exactly 1 argument, got {0}")]
    InvalidUsage(usize),

    #[error("image reference must not be empty")]
    EmptyReference,

    #[error("can't parse image reference: {0}")]
    ReferenceParse(RegistryError),

    #[error("can't get new image source: {0}")]
    SourceOpen(RegistryError),

    #[error("can't read unparsed image: {0}")]
    ImageParse(RegistryError),

    #[error("can't inspect image: {0}")]
    Inspect(RegistryError),

    #[error("no {0} label found")]
    MissingLabel(String),

    #[error("could not close image source: {0}")]
    SourceClose(RegistryError),

    #[error("{primary} (additionally, could not close image source: {close})")]
    SourceCloseAfterFailure {
        primary: Box<InspectError>,
        close: RegistryError,
    },

    #[error("failed to write result: {0}")]
    Output(#[from] std::io::Error),
}

impl InspectError {
    /// Step that produced the error. A close failure that follows another
    /// failure reports the primary step.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InspectError::InvalidUsage(_) | InspectError::EmptyReference => ErrorKind::InvalidUsage,
            InspectError::ReferenceParse(_) => ErrorKind::ReferenceParse,
            InspectError::SourceOpen(_) => ErrorKind::SourceOpen,
            InspectError::ImageParse(_) => ErrorKind::ImageParse,
            InspectError::Inspect(_) => ErrorKind::Inspect,
            InspectError::Output(_) => ErrorKind::Output,
            InspectError::MissingLabel(_) => ErrorKind::MissingLabel,
            InspectError::SourceClose(_) => ErrorKind::SourceClose,
            InspectError::SourceCloseAfterFailure { primary, .. } => primary.kind(),
        }
    }

    /// The release failure, if closing the image source failed
    pub fn close_error(&self) -> Option<&RegistryError> {
        match self {
            InspectError::SourceClose(err) => Some(err),
            InspectError::SourceCloseAfterFailure { close, .. } => Some(close),
            _ => None,
        }
    }

    /// Combine the pipeline outcome with the outcome of releasing the source.
    /// A release failure never replaces a primary error.
    pub fn with_close_result<T>(
        outcome: std::result::Result<T, InspectError>,
        closed: std::result::Result<(), RegistryError>,
    ) -> std::result::Result<T, InspectError> {
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close)) => Err(InspectError::SourceClose(close)),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(close)) => Err(InspectError::SourceCloseAfterFailure {
                primary: Box::new(primary),
                close,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_failure_alone_is_reported() {
        let result: std::result::Result<(), InspectError> = InspectError::with_close_result(
            Ok(()),
            Err(RegistryError::Network("connection reset".to_string())),
        );
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceClose);
        assert_eq!(
            err.to_string(),
            "could not close image source: Network error: connection reset"
        );
    }

    #[test]
    fn test_close_failure_is_attached_to_primary() {
        let result: std::result::Result<(), InspectError> = InspectError::with_close_result(
            Err(InspectError::MissingLabel("version".to_string())),
            Err(RegistryError::Io("broken pipe".to_string())),
        );
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingLabel);
        assert_eq!(err.close_error(), Some(&RegistryError::Io("broken pipe".to_string())));
        assert_eq!(
            err.to_string(),
            "no version label found (additionally, could not close image source: IO error: broken pipe)"
        );
    }

    #[test]
    fn test_primary_error_passes_through() {
        let result: std::result::Result<(), InspectError> = InspectError::with_close_result(
            Err(InspectError::ImageParse(RegistryError::Parse("bad json".to_string()))),
            Ok(()),
        );
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImageParse);
        assert!(err.close_error().is_none());
    }

    #[test]
    fn test_write_failure_has_its_own_kind() {
        let err = InspectError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        ));
        assert_eq!(err.kind(), ErrorKind::Output);
        assert_eq!(err.to_string(), "failed to write result: stdout closed");
    }

    #[test]
    fn test_usage_message() {
        assert_eq!(
            InspectError::InvalidUsage(2).to_string(),
            "image reference missing: expected exactly 1 argument, got 2"
        );
    }
}
