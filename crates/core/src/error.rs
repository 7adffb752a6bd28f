//! Domain error model.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Stable classification of a failure.
///
/// The kind decides the user-visible code (and, at the HTTP edge, the status).
/// Business-rule violations are always `BadRequest` or `NotFound`, never
/// `Internal`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or a request the current state cannot satisfy
    /// (e.g. quantity exceeds what is available).
    BadRequest,

    /// No resolvable actor identity.
    Unauthorized,

    /// The actor may not act on the target storage.
    Forbidden,

    /// Entry absent, tombstoned, or in the wrong area for the operation.
    NotFound,

    /// A concurrent writer won a uniqueness race.
    Conflict,

    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Stable, machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Title-cased code, used when an error carries no explicit message.
    pub fn title(self) -> String {
        self.code()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Domain-level error: a kind, zero or more human-readable messages, and an
/// optional wrapped cause.
///
/// The cause is kept for logs only; callers read [`DomainError::code`] and
/// [`DomainError::messages`] rather than inspecting the cause chain.
#[derive(Debug, Clone, Error)]
#[error("{}", render(.kind, .messages))]
pub struct DomainError {
    kind: ErrorKind,
    messages: Vec<String>,
    source: Option<Cause>,
}

fn render(kind: &ErrorKind, messages: &[String]) -> String {
    if messages.is_empty() {
        format!("<{kind}>")
    } else {
        format!("<{kind}> [{}]", messages.join(", "))
    }
}

impl DomainError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            messages: Vec::new(),
            source: None,
        }
    }

    pub fn with_messages(kind: ErrorKind, messages: Vec<String>) -> Self {
        Self {
            kind,
            messages,
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::BadRequest, vec![msg.into()])
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::NotFound, vec![msg.into()])
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::Unauthorized, vec![msg.into()])
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::Forbidden, vec![msg.into()])
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::Conflict, vec![msg.into()])
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_messages(ErrorKind::Internal, vec![msg.into()])
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// User-visible messages; falls back to the title-cased code.
    pub fn messages(&self) -> Vec<String> {
        if self.messages.is_empty() {
            vec![self.kind.title()]
        } else {
            self.messages.clone()
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::BadRequest
    }
}
