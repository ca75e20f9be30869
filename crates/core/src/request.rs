use std::error::Error as StdError;

/// Whether a request reads state or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Query,
    Command,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Command => "command",
        }
    }
}

/// An immutable, already validated input to a single use case.
///
/// Implementors only expose smart constructors and read accessors, so a
/// value of a `Request` type is valid by construction. The dispatcher routes
/// each implementor to exactly one [`Handler`](crate::dispatcher::Handler).
pub trait Request: Send + Sync + 'static {
    /// Stable name used in logs and wiring errors.
    const NAME: &'static str;
    const KIND: RequestKind;

    /// Value produced by the handler on success.
    type Output: Send + 'static;

    /// Domain failure the handler may raise.
    type Error: StdError + Send + Sync + 'static;
}
