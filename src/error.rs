use http::{Method, StatusCode};

use crate::{form::FormError, session::SessionError, view::ViewError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything a request handler can fail with.
///
/// Each variant maps to the status of the error page sent back to the client,
/// see [`Error::status`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Abort the request with the given status.
    #[error("http error {0}")]
    Http(StatusCode),
    #[error("handler does not implement {0}")]
    MethodNotImplemented(Method),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Other(BoxError),
}

impl Error {
    pub fn http(status: StatusCode) -> Self {
        Self::Http(status)
    }

    pub fn other<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Other(err.into())
    }

    /// Status of the error page rendered for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(status) => *status,
            // There is no dedicated handling for unsupported methods; they
            // are reported the same way as an unknown route.
            Self::MethodNotImplemented(_) => StatusCode::NOT_FOUND,
            Self::Form(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::View(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn statuses() {
        assert_eq!(
            Error::http(StatusCode::FORBIDDEN).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::MethodNotImplemented(Method::POST).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::from(FormError::MissingBoundary).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::other("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
