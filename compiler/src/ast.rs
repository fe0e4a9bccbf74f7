// AST node types for loop-language source files.
//
// A uniform node tree: every node has a kind tag, ordered children, and a
// typed value payload whose shape depends on the kind. Lowering treats the
// tree as read-only input and reports kind/payload mismatches.
//
// Preconditions: produced by the parser, or built by hand in tests.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use std::fmt;

use chumsky::span::SimpleSpan;
use serde::Serialize;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Kind tag ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    Statements,
    Decl,
    For,
    ForInit,
    ForCond,
    ForIncr,
    Assign,
    Plus,
    Array,
    Number,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Program => "program",
            NodeKind::Statements => "statements",
            NodeKind::Decl => "decl",
            NodeKind::For => "for",
            NodeKind::ForInit => "for_init",
            NodeKind::ForCond => "for_cond",
            NodeKind::ForIncr => "for_incr",
            NodeKind::Assign => "assign",
            NodeKind::Plus => "plus",
            NodeKind::Array => "array",
            NodeKind::Number => "number",
        };
        f.write_str(name)
    }
}

// ── Loop comparison ──

/// Comparison operator of a loop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CondOp {
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
}

impl CondOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CondOp::Le => "<=",
            CondOp::Lt => "<",
        }
    }
}

impl fmt::Display for CondOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Operands ──

/// Array subscript: an identifier or an integer literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    Var(String),
    Literal(i64),
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Var(name) => f.write_str(name),
            Index::Literal(n) => write!(f, "{n}"),
        }
    }
}

/// `name[index]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRef {
    pub array: String,
    pub index: Index,
}

impl fmt::Display for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.array, self.index)
    }
}

/// Right operand of an addition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Array(ArrayRef),
    Number(i64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Array(r) => write!(f, "{r}"),
            Operand::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Destination of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignTarget {
    Scalar(String),
    Array(ArrayRef),
}

impl AssignTarget {
    /// True for `name[index] = ...`, false for a scalar target.
    pub fn is_array(&self) -> bool {
        matches!(self, AssignTarget::Array(_))
    }
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignTarget::Scalar(name) => f.write_str(name),
            AssignTarget::Array(r) => write!(f, "{r}"),
        }
    }
}

// ── Payloads ──

/// `int id[size];`. `size` is `None` for a scalar declaration `int id;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclValue {
    pub id: String,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForValue {
    pub var: String,
    pub start: i64,
    pub end: i64,
    pub cond_op: CondOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForInitValue {
    pub var: String,
    pub start: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForCondValue {
    pub var: String,
    pub op: CondOp,
    pub end: i64,
}

/// `var++` has no step; `var += n` records `n`. Kept so the tree mirrors the
/// source; lowering ignores it and every IR loop steps by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForIncrValue {
    pub var: String,
    pub step: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlusValue {
    pub left: ArrayRef,
    pub right: Operand,
}

/// Kind-specific value payload attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Decl(DeclValue),
    For(ForValue),
    ForInit(ForInitValue),
    ForCond(ForCondValue),
    ForIncr(ForIncrValue),
    Assign(AssignTarget),
    Plus(PlusValue),
    Array(ArrayRef),
    Number(i64),
}

// ── Node ──

/// One node of the syntax tree.
///
/// Child semantics per kind:
/// - `program`: one `statements` child
/// - `statements`: the statements in source order
/// - `for`: one `statements` child holding the loop body
/// - `assign`: one expression child (`plus`, `array`, or `number`)
/// - everything else: no children
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub value: Option<NodeValue>,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>, value: Option<NodeValue>, span: Span) -> Self {
        Self {
            kind,
            children,
            value,
            span,
        }
    }

    /// A childless node carrying `value`.
    pub fn leaf(kind: NodeKind, value: NodeValue, span: Span) -> Self {
        Self::new(kind, Vec::new(), Some(value), span)
    }
}
