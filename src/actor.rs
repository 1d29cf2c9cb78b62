use crate::autoscaler::TickError;
use std::error::Error as StdError;
use std::fmt;
use tracing::error;
use tracing_error::SpanTrace;

/// Error returned from actor methods. Fatal errors stop the actor.
#[derive(Debug, thiserror::Error)]
pub struct Error {
    source: ErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Fatal(anyhow::Error),
    #[error(transparent)]
    NonFatal(anyhow::Error),
}

impl Error {
    pub fn fatal(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::Fatal(source.into()))
    }

    pub fn non_fatal(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::NonFatal(source.into()))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.source, ErrorKind::Fatal(_))
    }

    fn new(source: ErrorKind) -> Self {
        Self {
            source,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, fmt)
    }
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Self::non_fatal(source)
    }
}

impl From<TickError> for Error {
    fn from(source: TickError) -> Self {
        if source.is_fatal() {
            Self::fatal(source)
        } else {
            Self::non_fatal(source)
        }
    }
}

/// Logs an actor error; returns whether the actor has to stop.
pub fn handle_error(error: Box<dyn StdError + Send + Sync>) -> bool {
    let (error, stop_actor, span_trace) = match error.downcast_ref::<Error>() {
        Some(e) => (format!("{:?}", e.source), e.is_fatal(), Some(&e.span_trace)),
        None => (format!("{:?}", error), false, None),
    };

    error!(
        %stop_actor,
        "ActorError: {} SpanTrace: {}",
        error,
        span_trace
            .map(|st| format!("{}", st))
            .unwrap_or_else(|| String::from("None"))
    );

    stop_actor
}
