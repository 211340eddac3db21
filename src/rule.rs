use std::rc::Rc;

use itertools::Itertools;

use crate::grammar::{Grammar, START};

/// One production: `lhs := rhs`.
///
/// Elements keep their quantifier suffix (`?`, `*`, `+`); `base` strips it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleDef {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl RuleDef {
    pub fn new<L, I, S>(lhs: L, rhs: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for RuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} := {}", self.lhs, self.rhs.iter().join(" "))
    }
}

/// The element name without its quantifier suffix.
pub(crate) fn base(el: &str) -> &str {
    el.strip_suffix(['?', '*', '+']).unwrap_or(el)
}

/// `?` and `*` elements may match nothing.
pub(crate) fn can_omit(el: &str) -> bool {
    el.ends_with('?') || el.ends_with('*')
}

/// `*` and `+` elements may match again.
pub(crate) fn can_repeat(el: &str) -> bool {
    el.ends_with('*') || el.ends_with('+')
}

/// The augmented rule list the table builder works from.
///
/// Rule 0 is the synthetic `<start> := start`; the user's rules follow in
/// declaration order.
#[derive(Debug)]
pub(crate) struct RuleSet {
    rules: Vec<Rc<RuleDef>>,
    start: String,
}

impl RuleSet {
    pub fn new(grammar: &Grammar, start: &str) -> Self {
        let mut rules = Vec::with_capacity(grammar.len() + 1);
        rules.push(Rc::new(RuleDef::new(START, [start])));
        rules.extend(grammar.iter().map(|def| Rc::new(def.clone())));
        Self {
            rules,
            start: start.to_string(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn start_rule(&self) -> Rc<RuleDef> {
        Rc::clone(&self.rules[0])
    }

    pub fn as_slice(&self) -> &[Rc<RuleDef>] {
        &self.rules
    }

    pub fn iter_by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Rc<RuleDef>> + 'a {
        self.rules.iter().filter(move |rule| rule.lhs == key)
    }

    pub fn is_non_terminal(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.lhs == name)
    }

    /// Terminal element names in first-appearance order.
    pub fn terminal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        for rule in &self.rules {
            for el in &rule.rhs {
                let el = base(el);
                if !self.is_non_terminal(el) && !names.iter().any(|have| have == el) {
                    names.push(el.to_string());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_strips_one_quantifier() {
        assert_eq!(base("item"), "item");
        assert_eq!(base("item?"), "item");
        assert_eq!(base("item*"), "item");
        assert_eq!(base("item+"), "item");
    }

    #[test]
    fn test_quantifier_classes() {
        assert!(can_omit("x?") && can_omit("x*"));
        assert!(!can_omit("x+") && !can_omit("x"));
        assert!(can_repeat("x*") && can_repeat("x+"));
        assert!(!can_repeat("x?") && !can_repeat("x"));
    }

    #[test]
    fn test_terminal_names_in_first_appearance_order() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("list", ["[", "item*", "]"])
            .unwrap()
            .add_rule("item", ["a"])
            .unwrap();

        let rules = RuleSet::new(&grammar, "list");
        assert_eq!(rules.terminal_names(), ["[", "]", "a"]);
    }
}
