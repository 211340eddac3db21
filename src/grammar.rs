use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{ErrorKind, ParseResult};
use crate::rule::{base, can_omit, can_repeat, RuleDef};
use crate::token::END;

/// Left-hand side of the synthetic rule seeding the canonical collection.
pub(crate) const START: &str = "<start>";

/// A grammar: ordered productions keyed by non-terminal.
///
/// An element name is a non-terminal when it has at least one production;
/// anything else is a terminal, matched either by a declared lexer pattern or
/// auto-promoted to a verbatim literal. A trailing `?`, `*` or `+` quantifies
/// the element.
///
/// # Example
///
/// ```
/// use dsl_parser::Grammar;
///
/// let mut grammar = Grammar::default();
/// grammar
///     .add_rule("list", ["[", "item*", "]"])?
///     .add_rule("item", ["a"])?;
/// # Ok::<(), dsl_parser::ParseError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct Grammar {
    rules: Vec<RuleDef>,
}

impl Grammar {
    /// Add a production for `lhs`.
    pub fn add_rule<I, S>(&mut self, lhs: &str, rhs: I) -> ParseResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = RuleDef::new(lhs, rhs);
        if rule.rhs.is_empty() {
            return Err(ErrorKind::EmptyRule(lhs.to_string()).into());
        }
        self.rules.push(rule);
        Ok(self)
    }

    pub fn is_non_terminal(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.lhs == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.iter()
    }
}

/// FIRST and FOLLOW over an augmented rule list.
#[derive(Debug)]
pub(crate) struct SymbolSets {
    first: HashMap<String, HashSet<String>>,
    follow: HashMap<String, HashSet<String>>,
}

impl SymbolSets {
    pub fn first(&self, name: &str) -> impl Iterator<Item = &str> {
        self.first.get(name).into_iter().flatten().map(String::as_str)
    }

    pub fn follow(&self, name: &str) -> impl Iterator<Item = &str> {
        self.follow.get(name).into_iter().flatten().map(String::as_str)
    }
}

/// Compute FIRST and FOLLOW to fixpoint.
///
/// Quantifiers fold into both computations: an omissible element lets its
/// successor contribute, and a repeatable element may be followed by another
/// instance of itself.
pub(crate) fn analyze(rules: &[Rc<RuleDef>]) -> SymbolSets {
    let keys: HashSet<&str> = rules.iter().map(|rule| rule.lhs.as_str()).collect();

    let mut first: HashMap<String, HashSet<String>> = keys
        .iter()
        .map(|key| (key.to_string(), HashSet::new()))
        .collect();
    for rule in rules {
        for el in &rule.rhs {
            let el = base(el);
            if !keys.contains(el) {
                first
                    .entry(el.to_string())
                    .or_default()
                    .insert(el.to_string());
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            for el in &rule.rhs {
                let add = first[base(el)].clone();
                let target = first.get_mut(&rule.lhs).unwrap();
                let before = target.len();
                target.extend(add);
                changed |= target.len() != before;
                if !can_omit(el) {
                    break;
                }
            }
        }
    }

    let mut follow: HashMap<String, HashSet<String>> = keys
        .iter()
        .map(|key| (key.to_string(), HashSet::new()))
        .collect();
    follow.get_mut(START).unwrap().insert(END.to_string());

    changed = true;
    while changed {
        changed = false;
        for rule in rules {
            for (i, el) in rule.rhs.iter().enumerate() {
                let name = base(el);
                if !keys.contains(name) {
                    continue;
                }

                let mut add: HashSet<String> = HashSet::new();
                if can_repeat(el) {
                    add.extend(first[name].iter().cloned());
                }
                let mut reaches_end = true;
                for next in &rule.rhs[i + 1..] {
                    add.extend(first[base(next)].iter().cloned());
                    if !can_omit(next) {
                        reaches_end = false;
                        break;
                    }
                }
                if reaches_end {
                    add.extend(follow[&rule.lhs].iter().cloned());
                }

                let target = follow.get_mut(name).unwrap();
                let before = target.len();
                target.extend(add);
                changed |= target.len() != before;
            }
        }
    }

    SymbolSets { first, follow }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSet;
    use std::collections::BTreeSet;

    fn set<'a, I: Iterator<Item = &'a str>>(iter: I) -> BTreeSet<&'a str> {
        iter.collect()
    }

    fn arithmetic() -> Grammar {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("root", ["addExpr"])
            .unwrap()
            .add_rule("addExpr", ["addExpr", "add", "mulExpr"])
            .unwrap()
            .add_rule("addExpr", ["mulExpr"])
            .unwrap()
            .add_rule("mulExpr", ["mulExpr", "mul", "number"])
            .unwrap()
            .add_rule("mulExpr", ["number"])
            .unwrap();
        grammar
    }

    #[test]
    fn test_empty_rule_is_rejected() {
        let mut grammar = Grammar::default();
        let err = grammar.add_rule("root", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EmptyRule(key) if key == "root"));
    }

    #[test]
    fn test_first_sets() {
        let grammar = arithmetic();
        let rules = RuleSet::new(&grammar, "root");
        let sets = analyze(rules.as_slice());

        assert_eq!(set(sets.first("mulExpr")), set(["number"].into_iter()));
        assert_eq!(set(sets.first("addExpr")), set(["number"].into_iter()));
        assert_eq!(set(sets.first("root")), set(["number"].into_iter()));
    }

    #[test]
    fn test_follow_sets() {
        let grammar = arithmetic();
        let rules = RuleSet::new(&grammar, "root");
        let sets = analyze(rules.as_slice());

        assert_eq!(set(sets.follow("root")), set(["$"].into_iter()));
        assert_eq!(set(sets.follow("addExpr")), set(["$", "add"].into_iter()));
        assert_eq!(
            set(sets.follow("mulExpr")),
            set(["$", "add", "mul"].into_iter())
        );
    }

    #[test]
    fn test_first_skips_past_omissible_elements() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("doc", ["header?", "body"])
            .unwrap()
            .add_rule("header", ["#"])
            .unwrap()
            .add_rule("body", ["word+"])
            .unwrap();

        let rules = RuleSet::new(&grammar, "doc");
        let sets = analyze(rules.as_slice());
        assert_eq!(set(sets.first("doc")), set(["#", "word"].into_iter()));
    }

    #[test]
    fn test_repeatable_element_follows_itself() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("list", ["[", "item*", "]"])
            .unwrap()
            .add_rule("item", ["a"])
            .unwrap();

        let rules = RuleSet::new(&grammar, "list");
        let sets = analyze(rules.as_slice());
        assert_eq!(set(sets.follow("item")), set(["a", "]"].into_iter()));
    }
}
