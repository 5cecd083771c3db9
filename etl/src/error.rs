//! Error types and result definitions for the ingestion pipeline.
//!
//! Provides an error system with classification and captured diagnostic metadata.
//! [`EtlError`] carries an [`ErrorKind`], a static description, optional dynamic
//! detail, an optional source error, and the callsite location.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for pipeline operations using [`EtlError`] as the error type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Main error type for pipeline operations.
#[derive(Debug, Clone)]
pub struct EtlError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Specific categories of errors that can occur during an ingestion run.
///
/// Error kinds are organized by pipeline stage and failure mode, so callers can
/// decide whether a failure is a source, transformation, or destination problem.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source errors
    SourceTransportFailed,
    SourceQueryFailed,

    // Transformation errors
    MalformedRecord,
    ConversionError,
    InvalidData,

    // Destination errors
    DestinationProvisionFailed,
    DestinationLoadFailed,
    DestinationQueryFailed,
    DestinationTableNameInvalid,

    // Security & authentication errors
    AuthenticationError,

    // Configuration errors
    ConfigError,

    // IO & serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / uncategorized
    Unknown,
}

impl EtlError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// The stored source is preserved across clones and exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates an [`EtlError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        let detail = err.to_string();
        let source = Arc::new(err);
        EtlError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`] with the appropriate error kind.
impl From<serde_json::Error> for EtlError {
    #[track_caller]
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`chrono::ParseError`] to [`EtlError`] with [`ErrorKind::ConversionError`].
impl From<chrono::ParseError> for EtlError {
    #[track_caller]
    fn from(err: chrono::ParseError) -> EtlError {
        let detail = err.to_string();
        let source = Arc::new(err);
        EtlError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Datetime parsing failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`reqwest::Error`] to [`EtlError`] with the appropriate error kind.
///
/// Both non-success HTTP statuses and connection-level failures (connect errors,
/// timeouts, body read errors) are transport failures from the pipeline's point of
/// view: the page request did not complete successfully.
impl From<reqwest::Error> for EtlError {
    #[track_caller]
    fn from(err: reqwest::Error) -> EtlError {
        let (kind, description) = if err.is_status() {
            (
                ErrorKind::SourceTransportFailed,
                "Source returned non-success status",
            )
        } else {
            (ErrorKind::SourceTransportFailed, "Source request failed")
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
