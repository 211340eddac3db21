use std::collections::HashMap;

use crate::ast::SyntaxTree;

type VisitFn<S, R> = Box<dyn Fn(&Visitor<S, R>, &mut S, &SyntaxTree) -> R>;

struct Handler<S, R> {
    call: VisitFn<S, R>,
    collapse: bool,
}

/// A tree walk dispatched on node kind.
///
/// Nodes without a handler are walked through: every child is visited in
/// order and the last result is returned. Handlers receive the visitor so
/// they can recurse.
///
/// # Example
///
/// ```
/// use dsl_parser::{SyntaxTree, Visitor};
///
/// let visitor: Visitor<(), usize> = Visitor::new()
///     .on("number", |_, _, tree| tree.children().len());
/// ```
pub struct Visitor<S, R> {
    handlers: HashMap<String, Handler<S, R>>,
}

impl<S, R: Default> Default for Visitor<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R: Default> Visitor<S, R> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for nodes of `kind`.
    pub fn on<F>(mut self, kind: &str, call: F) -> Self
    where
        F: Fn(&Visitor<S, R>, &mut S, &SyntaxTree) -> R + 'static,
    {
        self.handlers.insert(
            kind.to_string(),
            Handler {
                call: Box::new(call),
                collapse: false,
            },
        );
        self
    }

    /// Like `on`, but a node with exactly one child delegates to that child's
    /// dispatch instead. Convenient for unit productions such as
    /// `addExpr := mulExpr`.
    pub fn on_collapsing<F>(mut self, kind: &str, call: F) -> Self
    where
        F: Fn(&Visitor<S, R>, &mut S, &SyntaxTree) -> R + 'static,
    {
        self.handlers.insert(
            kind.to_string(),
            Handler {
                call: Box::new(call),
                collapse: true,
            },
        );
        self
    }

    pub fn visit(&self, state: &mut S, tree: &SyntaxTree) -> R {
        match self.handlers.get(tree.kind()) {
            Some(handler) => {
                if handler.collapse && tree.children().len() == 1 {
                    return self.visit(state, &tree.children()[0]);
                }
                (handler.call)(self, state, tree)
            }
            None => self.visit_children(state, tree),
        }
    }

    /// Visit every child in order; the last result wins. Leaves and childless
    /// nodes yield the default value.
    pub fn visit_children(&self, state: &mut S, tree: &SyntaxTree) -> R {
        let mut result = R::default();
        for child in tree.children() {
            result = self.visit(state, child);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SyntaxNode;
    use crate::token::{Span, Token};

    fn leaf(kind: &str, value: &str) -> SyntaxTree {
        SyntaxTree::Leaf(Token::new(kind, value, Span::default()))
    }

    fn node(kind: &str, children: Vec<SyntaxTree>) -> SyntaxTree {
        SyntaxTree::Node(SyntaxNode {
            kind: kind.into(),
            children,
        })
    }

    #[test]
    fn test_dispatch_by_kind() {
        let visitor: Visitor<(), i64> = Visitor::new()
            .on("number", |_, _, tree| tree.value().unwrap().parse().unwrap());

        assert_eq!(visitor.visit(&mut (), &leaf("number", "42")), 42);
    }

    #[test]
    fn test_unhandled_node_walks_children_and_keeps_last() {
        let visitor: Visitor<(), i64> = Visitor::new()
            .on("number", |_, _, tree| tree.value().unwrap().parse().unwrap());

        let tree = node(
            "row",
            vec![leaf("number", "1"), leaf("word", "x"), leaf("number", "3")],
        );
        assert_eq!(visitor.visit(&mut (), &tree), 3);
    }

    #[test]
    fn test_unhandled_leaf_yields_default() {
        let visitor: Visitor<(), i64> = Visitor::new();
        assert_eq!(visitor.visit(&mut (), &leaf("word", "x")), 0);
    }

    #[test]
    fn test_collapse_delegates_unit_productions() {
        let visitor: Visitor<(), String> = Visitor::new()
            .on("number", |_, _, tree| tree.value().unwrap().to_string())
            .on_collapsing("expr", |visitor, state, tree| {
                let parts: Vec<String> = tree
                    .children()
                    .iter()
                    .map(|child| visitor.visit(state, child))
                    .collect();
                parts.join("+")
            });

        // A unit expr falls through to its child.
        let unit = node("expr", vec![leaf("number", "7")]);
        assert_eq!(visitor.visit(&mut (), &unit), "7");

        // A full expr runs its own handler.
        let full = node(
            "expr",
            vec![leaf("number", "1"), leaf("number", "2")],
        );
        assert_eq!(visitor.visit(&mut (), &full), "1+2");
    }

    #[test]
    fn test_handlers_see_mutable_state() {
        let visitor: Visitor<Vec<String>, ()> = Visitor::new()
            .on("word", |_, seen: &mut Vec<String>, tree| {
                seen.push(tree.value().unwrap().to_string());
            });

        let mut seen = vec![];
        let tree = node("row", vec![leaf("word", "a"), leaf("word", "b")]);
        visitor.visit(&mut seen, &tree);
        assert_eq!(seen, ["a", "b"]);
    }
}
