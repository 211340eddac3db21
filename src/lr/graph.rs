use std::collections::VecDeque;

use tracing::trace;

use crate::error::ParseResult;
use crate::item::{Item, ItemSet};
use crate::rule::{base, RuleSet};

/// A transition of the LR automaton, as produced by `ItemSet::goto`.
#[derive(Debug)]
pub(crate) struct Edge {
    pub from: usize,
    pub symbol: String,
    pub to: usize,
    pub came_from: Vec<Option<usize>>,
}

/// The canonical collection: states in discovery order plus their
/// transitions.
#[derive(Debug)]
pub(crate) struct Graph<'r> {
    rules: &'r RuleSet,
    pub sets: Vec<ItemSet>,
    pub edges: Vec<Edge>,
}

impl<'r> Graph<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        let mut start: ItemSet = [Item::new(rules.start_rule(), 0)].into_iter().collect();
        start.close(rules);
        Self {
            rules,
            sets: vec![start],
            edges: vec![],
        }
    }

    pub fn edge(&self, from: usize, symbol: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.symbol == symbol)
    }

    fn position(&self, set: &ItemSet) -> Option<usize> {
        self.sets.iter().position(|have| have == set)
    }

    /// Discover all states breadth-first from state 0.
    pub fn build(&mut self) -> ParseResult<()> {
        let mut queue = VecDeque::from([0]);

        while let Some(from) = queue.pop_front() {
            for symbol in self.transition_symbols(from) {
                let (set, came_from) = self.sets[from].goto(&symbol, self.rules)?;

                let (to, came_from) = match self.position(&set) {
                    // An equal set may have been discovered in a different
                    // item order; remap the sources onto its indices.
                    Some(existing) => (existing, self.remap(&set, came_from, existing)),
                    None => {
                        let id = self.sets.len();
                        let mut set = set;
                        set.id = id;
                        trace!(id, set = %set, "state discovered");
                        self.sets.push(set);
                        queue.push_back(id);
                        (id, came_from)
                    }
                };

                self.edges.push(Edge {
                    from,
                    symbol,
                    to,
                    came_from,
                });
            }
        }

        Ok(())
    }

    /// Distinct dot symbols of a state, in first-seen item order.
    fn transition_symbols(&self, id: usize) -> Vec<String> {
        let mut symbols: Vec<String> = vec![];
        for item in &self.sets[id].items {
            if let Some(sym) = item.symbol() {
                let sym = base(sym);
                if !symbols.iter().any(|have| have == sym) {
                    symbols.push(sym.to_string());
                }
            }
        }
        symbols
    }

    fn remap(
        &self,
        produced: &ItemSet,
        came_from: Vec<Option<usize>>,
        existing: usize,
    ) -> Vec<Option<usize>> {
        let target = &self.sets[existing];
        let mut remapped = vec![None; target.items.len()];
        for (index, item) in produced.items.iter().enumerate() {
            if let (Some(source), Some(slot)) = (came_from[index], target.index_of(item)) {
                remapped[slot] = Some(source);
            }
        }
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[test]
    fn test_left_recursive_grammar_loops_back() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("A", ["A", "x"])
            .unwrap()
            .add_rule("A", ["x"])
            .unwrap();

        let rules = RuleSet::new(&grammar, "A");
        let mut graph = Graph::new(&rules);
        graph.build().unwrap();

        // <start> := • A closes over both A productions.
        assert_eq!(graph.sets[0].items.len(), 3);
        // Shifting x from the A-state must come back to an existing state.
        let a_state = graph.edge(0, "A").unwrap().to;
        assert!(graph.edge(a_state, "x").is_some());
    }

    #[test]
    fn test_repeatable_transition_is_a_self_loop() {
        let mut grammar = Grammar::default();
        grammar
            .add_rule("list", ["[", "item*", "]"])
            .unwrap()
            .add_rule("item", ["a"])
            .unwrap();

        let rules = RuleSet::new(&grammar, "list");
        let mut graph = Graph::new(&rules);
        graph.build().unwrap();

        let open = graph.edge(0, "[").unwrap().to;
        let looped = graph.edge(open, "item").unwrap().to;
        assert_eq!(graph.edge(looped, "item").unwrap().to, looped);
    }
}
