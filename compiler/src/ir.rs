// ir.rs — Flat loop IR: declarations, top-level instructions, and a list of
// single-level loops.
//
// Operands are opaque strings (`name`, `name[expr]`, or a decimal literal).
// Passes never parse them back; they match and rewrite by substring.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use serde::Serialize;

use crate::ast::{CondOp, Span};

/// `int id[size];`, or `int id;` when `size` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub id: String,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// `result = args[0]`
    Assign,
    /// `result = args[0] + args[1]`
    Add,
    /// `args[0] += args[1]` (only produced by unrolling)
    Inc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub op: Op,
    pub args: Vec<String>,
    pub result: Option<String>,
}

impl Instruction {
    pub fn assign(result: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: Op::Assign,
            args: vec![value.into()],
            result: Some(result.into()),
        }
    }

    pub fn add(result: impl Into<String>, lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Self {
            op: Op::Add,
            args: vec![lhs.into(), rhs.into()],
            result: Some(result.into()),
        }
    }

    pub fn inc(var: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            op: Op::Inc,
            args: vec![var.into(), amount.into()],
            result: None,
        }
    }

    /// All args concatenated, followed by the result (empty if none).
    pub fn flattened(&self) -> String {
        let mut text = self.args.concat();
        if let Some(result) = &self.result {
            text.push_str(result);
        }
        text
    }

    /// Copy with every occurrence of `from` in args and result replaced by `to`.
    pub fn renamed(&self, from: &str, to: &str) -> Self {
        Self {
            op: self.op,
            args: self.args.iter().map(|a| a.replace(from, to)).collect(),
            result: self.result.as_ref().map(|r| r.replace(from, to)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loop {
    pub var: String,
    pub start: i64,
    pub end: i64,
    pub cond_op: CondOp,
    pub body: Vec<Instruction>,
    #[serde(skip)]
    pub span: Span,
}

impl Loop {
    pub fn new(var: impl Into<String>, start: i64, end: i64, cond_op: CondOp) -> Self {
        Self {
            var: var.into(),
            start,
            end,
            cond_op,
            body: Vec::new(),
            span: (0..0).into(),
        }
    }

    pub fn with_body(mut self, body: Vec<Instruction>) -> Self {
        self.body = body;
        self
    }

    /// `end - start + 1` for `<=`, `end - start` for `<`. Negative when the
    /// bounds are inverted. Computed in `i128` so any pair of `i64` bounds
    /// fits.
    pub fn iterations(&self) -> i128 {
        let span = i128::from(self.end) - i128::from(self.start);
        match self.cond_op {
            CondOp::Le => span + 1,
            CondOp::Lt => span,
        }
    }

    /// True when start, end, induction variable, and comparison all match.
    pub fn same_header(&self, other: &Loop) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.var == other.var
            && self.cond_op == other.cond_op
    }
}

/// IR root. `instructions` holds the original top-level statements followed
/// by anything LICM hoisted, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    pub decls: Vec<Declaration>,
    pub loops: Vec<Loop>,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
}
