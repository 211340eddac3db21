use std::hash::{Hash, Hasher};
use std::rc::Rc;

use itertools::Itertools;

use crate::error::{ErrorKind, ParseResult};
use crate::rule::{base, can_omit, can_repeat, RuleDef, RuleSet};

/// A dotted rule: `key := a • b c`.
#[derive(Debug, Clone, Eq)]
pub(crate) struct Item {
    pub rule: Rc<RuleDef>,
    pub dot: usize,
}

/// Structural equality: identical productions collapse even when declared
/// separately.
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.dot == other.dot
            && self.rule.lhs == other.rule.lhs
            && self.rule.rhs == other.rule.rhs
    }
}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule.lhs.hash(state);
        self.rule.rhs.hash(state);
        self.dot.hash(state);
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rhs = self
            .rule
            .rhs
            .iter()
            .enumerate()
            .map(|(pos, el)| {
                if pos == self.dot {
                    format!("• {}", el)
                } else {
                    el.clone()
                }
            })
            .join(" ");
        if self.is_exhausted() {
            rhs.push_str(" •");
        }
        write!(f, "{} := {}", self.rule.lhs, rhs)
    }
}

impl Item {
    pub fn new(rule: Rc<RuleDef>, dot: usize) -> Self {
        Self { rule, dot }
    }

    /// The element at the dot, quantifier included.
    pub fn symbol(&self) -> Option<&str> {
        self.rule.rhs.get(self.dot).map(String::as_str)
    }

    pub fn is_exhausted(&self) -> bool {
        self.dot >= self.rule.rhs.len()
    }

    pub fn advanced(&self) -> Self {
        Self::new(Rc::clone(&self.rule), self.dot + 1)
    }
}

/// The item itself plus one more per consecutive omissible element at the
/// dot. Folding `?`/`*` nullability into the set this way removes any need
/// for ε-handling downstream.
pub(crate) fn skip_omit(item: &Item) -> Vec<Item> {
    let mut chain = vec![item.clone()];
    let mut dot = item.dot;
    while let Some(el) = item.rule.rhs.get(dot) {
        if !can_omit(el) {
            break;
        }
        dot += 1;
        chain.push(Item::new(Rc::clone(&item.rule), dot));
    }
    chain
}

/// An ordered item list, compared as a set.
///
/// The order is the breadth-first closure order; reduce actions and read
/// counters reference items by their index in it.
#[derive(Debug, Default)]
pub(crate) struct ItemSet {
    pub id: usize,
    pub items: Vec<Item>,
}

impl PartialEq for ItemSet {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().all(|item| other.contains(item))
    }
}

impl std::fmt::Display for ItemSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}{{{}}}", self.id, self.items.iter().join(", "))
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut set = Self::default();
        for item in iter {
            set.push_unique(item);
        }
        set
    }
}

impl ItemSet {
    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    pub fn index_of(&self, item: &Item) -> Option<usize> {
        self.items.iter().position(|have| have == item)
    }

    /// Append if absent; either way return the item's index.
    fn push_unique(&mut self, item: Item) -> usize {
        match self.index_of(&item) {
            Some(index) => index,
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        }
    }

    /// Close the set in place.
    ///
    /// Existing items are re-seeded through their skip chains, then every
    /// non-terminal at a dot pulls in its productions at dot zero,
    /// breadth-first.
    pub fn close(&mut self, rules: &RuleSet) {
        let seed = std::mem::take(&mut self.items);
        for item in seed {
            for link in skip_omit(&item) {
                self.push_unique(link);
            }
        }

        let mut cursor = 0;
        while cursor < self.items.len() {
            let key = self.items[cursor]
                .symbol()
                .map(base)
                .filter(|name| rules.is_non_terminal(name))
                .map(str::to_string);
            if let Some(key) = &key {
                let productions: Vec<Rc<RuleDef>> =
                    rules.iter_by_key(key).map(Rc::clone).collect();
                for rule in productions {
                    for link in skip_omit(&Item::new(rule, 0)) {
                        self.push_unique(link);
                    }
                }
            }
            cursor += 1;
        }
    }

    /// The transition on `el`: the produced closed set and, per produced
    /// item, the index of the source item it directly continues.
    ///
    /// Each matching item is advanced past the dot, and kept in place as well
    /// when the element is repeatable (advance first, then stay, so the
    /// produced item order is reproducible). Only the skip chain of a moved
    /// item counts as its direct continuation; items contributed by closure
    /// carry no source.
    pub fn goto(&self, el: &str, rules: &RuleSet) -> ParseResult<(ItemSet, Vec<Option<usize>>)> {
        let mut produced = ItemSet::default();
        let mut came_from: Vec<Option<usize>> = vec![];

        for (source, item) in self.items.iter().enumerate() {
            let Some(sym) = item.symbol() else {
                continue;
            };
            if base(sym) != el {
                continue;
            }

            let mut moves = vec![item.advanced()];
            if can_repeat(sym) {
                moves.push(item.clone());
            }

            for moved in moves {
                let direct = skip_omit(&moved);
                let mut sub: ItemSet = [moved].into_iter().collect();
                sub.close(rules);

                for produced_item in sub.items {
                    let is_direct = direct.contains(&produced_item);
                    let rule = Rc::clone(&produced_item.rule);
                    let index = produced.push_unique(produced_item);
                    if came_from.len() <= index {
                        came_from.resize(index + 1, None);
                    }
                    if is_direct {
                        if came_from[index].is_some_and(|prev| prev != source) {
                            return Err(ErrorKind::Conflict {
                                actions: "reduce/reduce".into(),
                                symbol: el.to_string(),
                                key: rule.lhs.clone(),
                                rhs: rule.rhs.clone(),
                            }
                            .into());
                        }
                        came_from[index] = Some(source);
                    }
                }
            }
        }

        came_from.resize(produced.items.len(), None);
        Ok((produced, came_from))
    }
}
