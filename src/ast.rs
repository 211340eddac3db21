use crate::token::{Span, Token};

/// A node of the parse tree: either a lexed leaf or a reduced production.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxTree {
    Leaf(Token),
    Node(SyntaxNode),
}

/// An inner node. Children are in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: String,
    pub children: Vec<SyntaxTree>,
}

impl SyntaxTree {
    pub fn kind(&self) -> &str {
        match self {
            SyntaxTree::Leaf(token) => &token.kind,
            SyntaxTree::Node(node) => &node.kind,
        }
    }

    /// The position of the leftmost leaf beneath this node.
    ///
    /// `None` for a node reduced from zero symbols.
    pub fn span(&self) -> Option<Span> {
        match self {
            SyntaxTree::Leaf(token) => Some(token.span),
            SyntaxTree::Node(node) => node.children.iter().find_map(SyntaxTree::span),
        }
    }

    pub fn children(&self) -> &[SyntaxTree] {
        match self {
            SyntaxTree::Leaf(_) => &[],
            SyntaxTree::Node(node) => &node.children,
        }
    }

    pub fn as_leaf(&self) -> Option<&Token> {
        match self {
            SyntaxTree::Leaf(token) => Some(token),
            SyntaxTree::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            SyntaxTree::Leaf(_) => None,
            SyntaxTree::Node(node) => Some(node),
        }
    }

    /// The matched text, for leaves.
    pub fn value(&self) -> Option<&str> {
        self.as_leaf().map(|token| token.value.as_str())
    }
}

impl From<Token> for SyntaxTree {
    fn from(token: Token) -> Self {
        SyntaxTree::Leaf(token)
    }
}
