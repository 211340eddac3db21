//! Building blocks for small domain-specific languages: a pattern-based
//! tokenizer with an offside mode, an SLR table generator that understands
//! `?`/`*`/`+` quantifiers on rule elements, and a tree-walking visitor.
//!
//! The usual flow: declare [`Terminal`]s for a [`Lexer`], declare a
//! [`Grammar`] and build a [`Parser`] from it, then [`Parser::parse`] a token
//! stream from [`Lexer::split`] (or [`Lexer::split_offside`]) into a
//! [`SyntaxTree`] and fold it with a [`Visitor`].

pub mod ast;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod lr;
pub mod parser;
pub mod rule;
pub mod token;
pub mod visitor;

mod item;

pub use ast::{SyntaxNode, SyntaxTree};
pub use error::{ErrorKind, ParseError, ParseResult};
pub use grammar::Grammar;
pub use lexer::{Lexer, Terminal};
pub use lr::{Action, LrTable};
pub use parser::Parser;
pub use rule::RuleDef;
pub use token::{Span, Token, DEDENT, END, INDENT, UNKNOWN, WHITESPACE};
pub use visitor::Visitor;
