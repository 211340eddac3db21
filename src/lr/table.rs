use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use prettytable::Table as PrettyTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ErrorKind, ParseResult};
use crate::grammar::{analyze, START};
use crate::item::Item;
use crate::rule::{base, RuleSet};
use crate::token::END;

use super::{Action, Graph};

pub type Row = HashMap<String, Action>;

/// The action table driving the parser: one map per state, keyed by terminal
/// or non-terminal name. Gotos for reduced non-terminals are plain shifts on
/// the non-terminal's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LrTable {
    rows: Vec<Row>,
}

impl LrTable {
    /// Build the table for an augmented rule set.
    ///
    /// Accept and reduce actions are emitted in item order per state, so a
    /// colliding pair is always reported against the later item's rule.
    pub(crate) fn build(rules: &RuleSet) -> ParseResult<Self> {
        let sets = analyze(rules.as_slice());

        let mut graph = Graph::new(rules);
        graph.build()?;

        let mut rows = Vec::with_capacity(graph.sets.len());
        for set in &graph.sets {
            let mut row = Row::new();

            for (index, item) in set.items.iter().enumerate() {
                if item.is_exhausted() {
                    if item.rule.lhs == START {
                        let action = Action::Accept {
                            key: rules.start().to_string(),
                        };
                        insert(&mut row, END, action, item)?;
                    } else {
                        let action = Action::Reduce {
                            key: item.rule.lhs.clone(),
                            rule: index,
                        };
                        for terminal in sets.follow(&item.rule.lhs).sorted() {
                            insert(&mut row, terminal, action.clone(), item)?;
                        }
                    }
                    continue;
                }

                let el = base(item.symbol().unwrap_or_default());
                match row.get(el) {
                    // The whole-state transition was recorded when the first
                    // item reaching `el` came by.
                    Some(Action::Shift { .. }) => {}
                    Some(existing) => {
                        // Name the reduce side's rule, resolved through the
                        // item index the action carries.
                        let blamed = match existing {
                            Action::Reduce { rule, .. } => &set.items[*rule],
                            _ => item,
                        };
                        return Err(conflict(existing.name(), "shift", el, blamed));
                    }
                    None => {
                        let edge = graph.edge(set.id, el).ok_or_else(|| {
                            ErrorKind::Message(format!(
                                "missing transition from state {} on {}",
                                set.id, el
                            ))
                        })?;
                        row.insert(
                            el.to_string(),
                            Action::Shift {
                                goto: edge.to,
                                came_from: edge.came_from.clone(),
                            },
                        );
                    }
                }
            }

            rows.push(row);
        }

        debug!(states = rows.len(), "action table built");
        Ok(Self { rows })
    }

    pub fn get(&self, state: usize) -> Option<&Row> {
        self.rows.get(state)
    }

    pub fn action(&self, state: usize, symbol: &str) -> Option<&Action> {
        self.rows.get(state).and_then(|row| row.get(symbol))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn path_for(version: &str) -> PathBuf {
        PathBuf::from(format!("dsl-parser_v{}.json", version))
    }

    /// Read a persisted table; `None` when the file does not exist.
    pub(crate) fn load(path: &Path) -> ParseResult<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(
                serde_json::from_str(&text).map_err(ErrorKind::from)?,
            )),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ErrorKind::from(err).into()),
        }
    }

    /// Persist the table, atomically: write a sibling temp file, then rename
    /// it into place.
    pub(crate) fn store(&self, path: &Path) -> ParseResult<()> {
        let staged = path.with_extension("json.tmp");
        let text = serde_json::to_string(self).map_err(ErrorKind::from)?;
        fs::write(&staged, text).map_err(ErrorKind::from)?;
        fs::rename(&staged, path).map_err(ErrorKind::from)?;
        Ok(())
    }
}

fn insert(row: &mut Row, symbol: &str, action: Action, item: &Item) -> ParseResult<()> {
    if let Some(existing) = row.get(symbol) {
        return Err(conflict(existing.name(), action.name(), symbol, item));
    }
    row.insert(symbol.to_string(), action);
    Ok(())
}

fn conflict(
    existing: &str,
    proposed: &str,
    symbol: &str,
    item: &Item,
) -> crate::error::ParseError {
    ErrorKind::Conflict {
        actions: format!("{}/{}", existing, proposed),
        symbol: symbol.to_string(),
        key: item.rule.lhs.clone(),
        rhs: item.rule.rhs.clone(),
    }
    .into()
}

impl std::fmt::Display for LrTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols: Vec<&str> = self
            .rows
            .iter()
            .flat_map(|row| row.keys())
            .map(String::as_str)
            .sorted()
            .dedup()
            .collect();

        let mut table = PrettyTable::new();
        table.add_row(["#"].into_iter().chain(symbols.iter().copied()).collect());
        for (state, row) in self.rows.iter().enumerate() {
            table.add_row(
                [state.to_string()]
                    .into_iter()
                    .chain(symbols.iter().map(|sym| {
                        row.get(*sym).map(ToString::to_string).unwrap_or_default()
                    }))
                    .collect(),
            );
        }
        write!(f, "{}", table)
    }
}
