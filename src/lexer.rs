use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::token::{Span, Token, DEDENT, END, INDENT, UNKNOWN, WHITESPACE};

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"\r?\n").unwrap();
}

/// A named terminal pattern.
///
/// The pattern is compiled anchored (`\A(?:…)`) and matched against the input
/// tail, so it can only succeed at the requested position.
#[derive(Debug, Clone)]
pub struct Terminal {
    kind: String,
    regex: Regex,
}

impl Terminal {
    pub fn new<K: Into<String>>(kind: K, pattern: &str) -> ParseResult<Self> {
        let kind = kind.into();
        let regex = Regex::new(&format!(r"\A(?:{pattern})")).map_err(|source| {
            ErrorKind::Pattern {
                kind: kind.clone(),
                source,
            }
        })?;
        Ok(Self { kind, regex })
    }

    /// A terminal matching `text` verbatim, named after it.
    pub fn literal(text: &str) -> ParseResult<Self> {
        Self::new(text, &regex::escape(text))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// A pattern-matching tokenizer.
///
/// Terminals are tried in declaration order; the first match wins.
#[derive(Debug, Default, Clone)]
pub struct Lexer {
    terminals: Vec<Terminal>,
}

impl Lexer {
    pub fn new(terminals: Vec<Terminal>) -> Self {
        Self { terminals }
    }

    /// A copy of this lexer extended with terminals it does not declare,
    /// appended after the declared ones so declaration order keeps winning
    /// ties.
    pub(crate) fn with_literals(&self, extra: &[Terminal]) -> Lexer {
        let mut terminals = self.terminals.clone();
        for terminal in extra {
            if !terminals.iter().any(|have| have.kind == terminal.kind) {
                terminals.push(terminal.clone());
            }
        }
        Lexer { terminals }
    }

    /// Match one token at byte offset `index` of `input`, reported at `at`.
    ///
    /// When `active` is given, only terminals named in it are tried, except
    /// `whitespace` which stays eligible so noise between tokens can always
    /// be consumed. Returns a `$` token once `index` reaches the end.
    pub fn next(
        &self,
        input: &str,
        index: usize,
        at: Span,
        active: Option<&HashSet<&str>>,
    ) -> ParseResult<Token> {
        if index >= input.len() {
            return Ok(Token::marker(END, at));
        }

        let tail = &input[index..];
        for terminal in &self.terminals {
            if let Some(active) = active {
                if terminal.kind != WHITESPACE && !active.contains(terminal.kind.as_str()) {
                    continue;
                }
            }
            let Some(caps) = terminal.regex.captures(tail) else {
                continue;
            };
            let value = &caps[0];
            if value.is_empty() {
                // A zero-width match would never advance the cursor.
                return Err(ParseError::from_kind(ErrorKind::Unrecognized, Some(at)));
            }
            let captures = caps
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect();
            return Ok(Token {
                kind: terminal.kind.clone(),
                value: value.to_string(),
                captures,
                span: at,
            });
        }

        Err(ParseError::from_kind(ErrorKind::Unrecognized, Some(at)))
    }

    /// Tokenize the whole input, ending with a `$` token.
    pub fn lex(&self, input: &str) -> ParseResult<Vec<Token>> {
        let mut tokens = vec![];
        let mut index = 0;
        let mut at = Span::default();

        loop {
            let token = self.next(input, index, at, None)?;
            index += token.value.len();
            match token.value.rfind('\n') {
                Some(last) => {
                    at.line += token.value.matches('\n').count();
                    at.column = token.value.len() - (last + 1);
                }
                None => at.column += token.value.len(),
            }
            let done = token.is_end();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Split the input into raw per-line `unknown` tokens, to be lexed on
    /// demand once the parser can say which terminals it will accept.
    ///
    /// Lines matching `comment` are dropped; numbering still counts them.
    pub fn split(&self, input: &str, comment: Option<&Regex>) -> Vec<Token> {
        let lines: Vec<&str> = LINE_BREAK.split(input).collect();
        let mut tokens: Vec<Token> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !comment.is_some_and(|c| c.is_match(line)))
            .map(|(line_no, line)| Token::new(UNKNOWN, *line, Span::new(line_no, 0)))
            .collect();
        tokens.push(Token::marker(END, end_of(&lines)));
        tokens
    }

    /// Like `split`, with offside-rule `indent`/`dedent` markers.
    ///
    /// Indentation columns form a stack, initially `[0]`. A deeper line pushes
    /// a level and emits `indent`; a shallower one pops and emits `dedent`
    /// per level, and must land exactly on a remaining level. Blank and
    /// comment lines do not participate.
    pub fn split_offside(&self, input: &str, comment: Option<&Regex>) -> ParseResult<Vec<Token>> {
        let lines: Vec<&str> = LINE_BREAK.split(input).collect();
        let mut levels: Vec<usize> = vec![0];
        let mut tokens = vec![];

        for (line_no, line) in lines.iter().enumerate() {
            if comment.is_some_and(|c| c.is_match(line)) {
                continue;
            }
            let body = line.trim_start();
            if body.is_empty() {
                continue;
            }

            let column = line.len() - body.len();
            let level = *levels.last().unwrap();
            if column > level {
                levels.push(column);
                tokens.push(Token::marker(INDENT, Span::new(line_no, column)));
            } else if column < level {
                while column < *levels.last().unwrap() {
                    levels.pop();
                    tokens.push(Token::marker(DEDENT, Span::new(line_no, column)));
                }
                if column != *levels.last().unwrap() {
                    return Err(ParseError::from_kind(
                        ErrorKind::Indent,
                        Some(Span::new(line_no, column)),
                    ));
                }
            }
            tokens.push(Token::new(UNKNOWN, *line, Span::new(line_no, 0)));
        }

        let last_line = lines.len().saturating_sub(1);
        while *levels.last().unwrap() > 0 {
            levels.pop();
            tokens.push(Token::marker(DEDENT, Span::new(last_line, 0)));
        }
        tokens.push(Token::marker(END, end_of(&lines)));
        Ok(tokens)
    }
}

fn end_of(lines: &[&str]) -> Span {
    Span::new(
        lines.len().saturating_sub(1),
        lines.last().map_or(0, |line| line.len()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Lexer {
        Lexer::new(vec![
            Terminal::new("number", "[0-9]+").unwrap(),
            Terminal::new("word", "[a-z]+").unwrap(),
            Terminal::new("whitespace", r"\s+").unwrap(),
        ])
    }

    #[test]
    fn test_next_matches_only_at_the_cursor() {
        let lexer = fixture();
        let token = lexer.next("ab 12", 3, Span::new(0, 3), None).unwrap();
        assert_eq!(token.kind, "number");
        assert_eq!(token.value, "12");
        assert_eq!(token.span, Span::new(0, 3));
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let lexer = Lexer::new(vec![
            Terminal::new("keyword", "if").unwrap(),
            Terminal::new("ident", "[a-z]+").unwrap(),
        ]);
        let token = lexer.next("if", 0, Span::default(), None).unwrap();
        assert_eq!(token.kind, "keyword");
    }

    #[test]
    fn test_active_set_restricts_candidates() {
        let lexer = Lexer::new(vec![
            Terminal::new("word", "[a-z]+").unwrap(),
            Terminal::new("key", "abc").unwrap(),
        ]);

        let active: HashSet<&str> = ["key"].into();
        let token = lexer
            .next("abcd", 0, Span::default(), Some(&active))
            .unwrap();
        assert_eq!(token.kind, "key");
        assert_eq!(token.value, "abc");
    }

    #[test]
    fn test_whitespace_is_always_eligible() {
        let lexer = fixture();
        let active: HashSet<&str> = ["number"].into();
        let token = lexer
            .next("  12", 0, Span::default(), Some(&active))
            .unwrap();
        assert_eq!(token.kind, "whitespace");
    }

    #[test]
    fn test_unrecognized_input_carries_position() {
        let lexer = fixture();
        let err = lexer.next("ab!", 2, Span::new(0, 2), None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unrecognized));
        assert_eq!(err.span(), Some(Span::new(0, 2)));
    }

    #[test]
    fn test_zero_width_match_is_rejected() {
        let lexer = Lexer::new(vec![Terminal::new("empty", "x?").unwrap()]);
        let err = lexer.next("y", 0, Span::default(), None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unrecognized));
    }

    #[test]
    fn test_lex_tracks_lines_and_columns() {
        let lexer = fixture();
        let tokens = lexer.lex("ab 12\ncd").unwrap();

        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, ["word", "whitespace", "number", "whitespace", "word", "$"]);
        assert_eq!(tokens[2].span, Span::new(0, 3));
        assert_eq!(tokens[4].span, Span::new(1, 0));
        assert_eq!(tokens[5].span, Span::new(1, 2));
    }

    #[test]
    fn test_lex_concatenation_round_trip() {
        let lexer = fixture();
        let left = lexer.lex("ab 12 ").unwrap();
        let right = lexer.lex("cd 34").unwrap();
        let whole = lexer.lex("ab 12 cd 34").unwrap();

        let kinds = |tokens: &[Token]| {
            tokens
                .iter()
                .filter(|t| !t.is_end())
                .map(|t| t.kind.clone())
                .collect::<Vec<_>>()
        };
        let mut joined = kinds(&left);
        joined.extend(kinds(&right));
        assert_eq!(joined, kinds(&whole));
    }

    #[test]
    fn test_split_defers_lines_and_drops_comments() {
        let lexer = fixture();
        let comment = Regex::new(r"^\s*#").unwrap();
        let tokens = lexer.split("ab\n# note\ncd", Some(&comment));

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, UNKNOWN);
        assert_eq!(tokens[0].value, "ab");
        assert_eq!(tokens[1].value, "cd");
        assert_eq!(tokens[1].span, Span::new(2, 0));
        assert!(tokens[2].is_end());
        assert_eq!(tokens[2].span, Span::new(2, 2));
    }

    #[test]
    fn test_split_offside_emits_indent_and_dedent() {
        let lexer = fixture();
        let tokens = lexer.split_offside("a\n  b\n  c\nd", None).unwrap();

        let shape: Vec<(&str, &str)> = tokens
            .iter()
            .map(|t| (t.kind.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(
            shape,
            [
                (UNKNOWN, "a"),
                (INDENT, ""),
                (UNKNOWN, "  b"),
                (UNKNOWN, "  c"),
                (DEDENT, ""),
                (UNKNOWN, "d"),
                (END, ""),
            ]
        );
    }

    #[test]
    fn test_split_offside_closes_open_levels_at_end() {
        let lexer = fixture();
        let tokens = lexer.split_offside("a\n  b\n    c", None).unwrap();
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            kinds,
            [UNKNOWN, INDENT, UNKNOWN, INDENT, UNKNOWN, DEDENT, DEDENT, END]
        );
    }

    #[test]
    fn test_split_offside_rejects_orphan_column() {
        let lexer = fixture();
        let err = lexer.split_offside("a\n    b\n  c", None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Indent));
        assert_eq!(err.span(), Some(Span::new(2, 2)));
    }
}
