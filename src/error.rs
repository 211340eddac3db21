use itertools::Itertools;
use thiserror::Error;

use crate::ast::SyntaxTree;
use crate::token::Span;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ErrorKind {
    /// A non-terminal without a usable production, or a production without
    /// elements.
    #[error("non-terminal {0} has no usable production")]
    EmptyRule(String),

    /// The grammar is not deterministically parsable; `actions` names the two
    /// colliding action kinds (e.g. `shift/reduce`).
    #[error("{actions} conflict on {symbol} for rule {key} := {}", .rhs.iter().join(" "))]
    Conflict {
        actions: String,
        symbol: String,
        key: String,
        rhs: Vec<String>,
    },

    /// No terminal matched at the current position.
    #[error("unrecognized input")]
    Unrecognized,

    /// A line's indentation matches no enclosing level.
    #[error("indentation matches no enclosing level")]
    Indent,

    /// The action table has no entry for the current state and lookahead.
    #[error("unexpected {0}")]
    NoAction(String),

    #[error("invalid pattern for terminal {kind}: {source}")]
    Pattern {
        kind: String,
        source: regex::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Table(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

/// An error with an optional source position.
///
/// `Display` appends ` at line L:C` (1-based) when the position is known.
#[derive(Debug)]
pub struct ParseError {
    kind: ErrorKind,
    span: Option<Span>,
}

impl ParseError {
    pub fn new<M: Into<String>>(message: M, span: Option<Span>) -> Self {
        Self {
            kind: ErrorKind::Message(message.into()),
            span,
        }
    }

    /// An error positioned at the leftmost leaf beneath `tree`.
    pub fn from_tree<M: Into<String>>(message: M, tree: &SyntaxTree) -> Self {
        Self::new(message, tree.span())
    }

    pub(crate) fn from_kind(kind: ErrorKind, span: Option<Span>) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl From<ErrorKind> for ParseError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)?;
        if let Some(span) = self.span {
            write!(f, " at {}", span)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
