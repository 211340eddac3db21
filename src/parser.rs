use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::trace;

use crate::ast::{SyntaxNode, SyntaxTree};
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::grammar::Grammar;
use crate::lexer::{Lexer, Terminal};
use crate::lr::{Action, LrTable};
use crate::rule::RuleSet;
use crate::token::{Span, Token, RESERVED, UNKNOWN, WHITESPACE};

/// A table-driven parser for one grammar.
///
/// The action table is built once at construction; `parse` is read-only and
/// the instance can be reused across calls.
#[derive(Debug)]
pub struct Parser {
    start: String,
    table: LrTable,
    literals: Vec<Terminal>,
}

impl Parser {
    pub fn new(grammar: &Grammar, start: &str) -> ParseResult<Self> {
        let rules = Self::check(grammar, start)?;
        let table = LrTable::build(&rules)?;
        Self::assemble(rules, table)
    }

    /// Like `new`, but the table is rehydrated from
    /// `dsl-parser_v<version>.json` in the working directory when present,
    /// and persisted there after a fresh build otherwise.
    pub fn with_version(grammar: &Grammar, start: &str, version: &str) -> ParseResult<Self> {
        Self::with_table_path(grammar, start, LrTable::path_for(version))
    }

    /// `with_version` with an explicit table location.
    pub fn with_table_path<P: AsRef<Path>>(
        grammar: &Grammar,
        start: &str,
        path: P,
    ) -> ParseResult<Self> {
        let rules = Self::check(grammar, start)?;
        let table = match LrTable::load(path.as_ref())? {
            Some(table) => table,
            None => {
                let table = LrTable::build(&rules)?;
                table.store(path.as_ref())?;
                table
            }
        };
        Self::assemble(rules, table)
    }

    fn check(grammar: &Grammar, start: &str) -> ParseResult<RuleSet> {
        if !grammar.is_non_terminal(start) {
            return Err(ErrorKind::EmptyRule(start.to_string()).into());
        }
        Ok(RuleSet::new(grammar, start))
    }

    fn assemble(rules: RuleSet, table: LrTable) -> ParseResult<Self> {
        let literals = rules
            .terminal_names()
            .into_iter()
            .filter(|name| !RESERVED.contains(&name.as_str()))
            .map(|name| Terminal::literal(&name))
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(Self {
            start: rules.start().to_string(),
            table,
            literals,
        })
    }

    /// The non-terminal this parser accepts.
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn table(&self) -> &LrTable {
        &self.table
    }

    /// Drive the action table over `tokens`, as produced by `split`,
    /// `split_offside` or `lex`.
    ///
    /// `unknown` line tokens are lexed on demand; each call hands the lexer
    /// the symbols the current state can accept, so a terminal the grammar
    /// cannot consume here is never attempted. Whitespace is discarded
    /// wherever it appears.
    pub fn parse(&self, lexer: &Lexer, tokens: Vec<Token>) -> ParseResult<SyntaxTree> {
        let lexer = lexer.with_literals(&self.literals);

        let mut symbols: Vec<SyntaxTree> = vec![];
        let mut states: Vec<usize> = vec![0];
        let mut reads: Vec<HashMap<usize, usize>> = vec![HashMap::new()];

        let mut stream = tokens.into_iter();
        let mut outer: Option<Token> = None;
        let mut lexed: Option<Token> = None;
        let mut index = 0;

        loop {
            if outer.is_none() && lexed.is_none() {
                outer = Some(stream.next().ok_or_else(|| {
                    ParseError::new("token stream ended without end-of-input marker", None)
                })?);
            }

            // Materialize an inner token from a raw line if needed.
            if lexed.is_none() && outer.as_ref().is_some_and(|t| t.kind == UNKNOWN) {
                let line = outer.as_ref().unwrap();
                let at = Span::new(line.span.line, index);
                let active = self.active_set(*states.last().unwrap());
                let token = match lexer.next(&line.value, index, at, Some(&active)) {
                    Ok(token) => token,
                    // Nothing the grammar accepts here matches; lex without
                    // the restriction so the refusal names the actual token.
                    Err(err) if matches!(err.kind(), ErrorKind::Unrecognized) => {
                        lexer.next(&line.value, index, at, None)?
                    }
                    Err(err) => return Err(err),
                };
                if token.is_end() {
                    // Line exhausted; move on to the next raw token.
                    outer = None;
                    index = 0;
                    continue;
                }
                index += token.value.len();
                lexed = Some(token);
            }

            let current = lexed.as_ref().or(outer.as_ref()).unwrap();
            if current.kind == WHITESPACE {
                if lexed.take().is_none() {
                    outer = None;
                }
                continue;
            }

            let state = *states.last().unwrap();
            let action = self
                .table
                .action(state, &current.kind)
                .ok_or_else(|| {
                    ParseError::from_kind(
                        ErrorKind::NoAction(current.to_string()),
                        Some(current.span),
                    )
                })?
                .clone();
            trace!(state, token = %current, action = %action, "step");

            match action {
                Action::Shift { goto, came_from } => {
                    let token = match lexed.take() {
                        Some(token) => token,
                        None => {
                            index = 0;
                            outer.take().unwrap()
                        }
                    };
                    symbols.push(SyntaxTree::Leaf(token));
                    push_state(&mut states, &mut reads, goto, &came_from);
                }
                Action::Reduce { key, rule } => {
                    let width = reads.last().unwrap().get(&rule).copied().unwrap_or(0);
                    if width > symbols.len() {
                        return Err(ParseError::new(
                            format!("reduction of {} exceeds the parse stack", key),
                            current.span.into(),
                        ));
                    }
                    let children = symbols.split_off(symbols.len() - width);
                    states.truncate(states.len() - width);
                    reads.truncate(reads.len() - width);

                    let parent = SyntaxTree::Node(SyntaxNode { kind: key, children });
                    let state = *states.last().unwrap();
                    let goto = self.table.action(state, parent.kind()).cloned();
                    let Some(Action::Shift { goto, came_from }) = goto else {
                        return Err(ParseError::from_kind(
                            ErrorKind::NoAction(parent.kind().to_string()),
                            parent.span(),
                        ));
                    };
                    symbols.push(parent);
                    push_state(&mut states, &mut reads, goto, &came_from);
                }
                Action::Accept { .. } => {
                    return symbols.pop().ok_or_else(|| {
                        ParseError::new("accepted with an empty parse stack", None)
                    });
                }
            }
        }
    }

    /// The symbols the given state has any action for, as the lexer hint.
    fn active_set(&self, state: usize) -> HashSet<&str> {
        self.table
            .get(state)
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Enter `goto`, deriving its read counters from the predecessors recorded in
/// `came_from`: an item continuing `source` has now read one more symbol than
/// `source` had.
fn push_state(
    states: &mut Vec<usize>,
    reads: &mut Vec<HashMap<usize, usize>>,
    goto: usize,
    came_from: &[Option<usize>],
) {
    let previous = reads.last().unwrap();
    let mut counts = HashMap::new();
    for (item, source) in came_from.iter().enumerate() {
        if let Some(source) = source {
            counts.insert(item, previous.get(source).copied().unwrap_or(0) + 1);
        }
    }
    states.push(goto);
    reads.push(counts);
}
