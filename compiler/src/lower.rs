// lower.rs — AST → flat loop IR
//
// Walks the node tree once, depth-first, collecting declarations, loops, and
// instructions into an `ir::Program`.
//
// Preconditions: `ast` is the root produced by the parser (or `None` when the
//   parse failed).
// Postconditions: every loop's body holds the assignments lexically inside it,
//   in source order; see `lower` for where later assignments land.
// Failure modes: absent AST, or a node whose payload does not match its kind.
// Side effects: none.

use thiserror::Error;

use crate::ast::{Node, NodeKind, NodeValue, Span};
use crate::ir::{Declaration, Instruction, Loop, Program};

// ── Error type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoweringError {
    /// The front end produced no tree.
    #[error("no AST to lower (parsing failed)")]
    MissingAst,

    #[error("`{kind}` node has no value payload")]
    MissingPayload { kind: NodeKind, span: Span },

    #[error("`{kind}` node carries a payload of the wrong shape")]
    PayloadMismatch { kind: NodeKind, span: Span },

    #[error("`{kind}` node is missing its child node")]
    MissingChild { kind: NodeKind, span: Span },

    #[error("`{kind}` node cannot appear as an assignment value")]
    UnsupportedExpression { kind: NodeKind, span: Span },
}

impl LoweringError {
    /// Source location of the offending node, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            LoweringError::MissingAst => None,
            LoweringError::MissingPayload { span, .. }
            | LoweringError::PayloadMismatch { span, .. }
            | LoweringError::MissingChild { span, .. }
            | LoweringError::UnsupportedExpression { span, .. } => Some(*span),
        }
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Lower an AST into the flat IR.
///
/// Loops are not nested in the IR: every `for` node appends a new loop to
/// `Program::loops`, and each assignment attaches to the most recently opened
/// loop if any loop has been seen so far, otherwise to the top-level
/// instruction list. An assignment written after a loop's closing brace
/// therefore still lands in that loop's body.
pub fn lower(ast: Option<&Node>) -> Result<Program, LoweringError> {
    let root = ast.ok_or(LoweringError::MissingAst)?;
    let mut program = Program::new();
    lower_node(root, &mut program)?;
    tracing::debug!(
        decls = program.decls.len(),
        loops = program.loops.len(),
        instructions = program.instructions.len(),
        "lowered AST"
    );
    Ok(program)
}

fn lower_node(node: &Node, program: &mut Program) -> Result<(), LoweringError> {
    match node.kind {
        NodeKind::Program | NodeKind::Statements => {
            for child in &node.children {
                lower_node(child, program)?;
            }
        }
        NodeKind::Decl => {
            let NodeValue::Decl(decl) = payload(node)? else {
                return Err(mismatch(node));
            };
            program.decls.push(Declaration {
                id: decl.id.clone(),
                size: decl.size,
            });
        }
        NodeKind::For => {
            let NodeValue::For(header) = payload(node)? else {
                return Err(mismatch(node));
            };
            let body = first_child(node)?;
            let mut ir_loop = Loop::new(header.var.clone(), header.start, header.end, header.cond_op);
            ir_loop.span = node.span;
            program.loops.push(ir_loop);
            lower_node(body, program)?;
        }
        NodeKind::Assign => {
            let instr = lower_assign(node)?;
            match program.loops.last_mut() {
                Some(current) => current.body.push(instr),
                None => program.instructions.push(instr),
            }
        }
        // Header clauses and bare expressions carry nothing for the IR on
        // their own.
        NodeKind::ForInit
        | NodeKind::ForCond
        | NodeKind::ForIncr
        | NodeKind::Plus
        | NodeKind::Array
        | NodeKind::Number => {}
    }
    Ok(())
}

fn lower_assign(node: &Node) -> Result<Instruction, LoweringError> {
    let NodeValue::Assign(target) = payload(node)? else {
        return Err(mismatch(node));
    };
    // Array targets render as `name[index]`, scalars as the bare name.
    let result = target.to_string();
    tracing::trace!(result = %result, is_array = target.is_array(), "lowering assignment");

    let expr = first_child(node)?;
    let instr = match (expr.kind, payload(expr)?) {
        (NodeKind::Plus, NodeValue::Plus(plus)) => {
            Instruction::add(result, plus.left.to_string(), plus.right.to_string())
        }
        (NodeKind::Array, NodeValue::Array(r)) => Instruction::assign(result, r.to_string()),
        (NodeKind::Number, NodeValue::Number(n)) => Instruction::assign(result, n.to_string()),
        (NodeKind::Plus | NodeKind::Array | NodeKind::Number, _) => return Err(mismatch(expr)),
        (kind, _) => {
            return Err(LoweringError::UnsupportedExpression {
                kind,
                span: expr.span,
            })
        }
    };
    Ok(instr)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn payload(node: &Node) -> Result<&NodeValue, LoweringError> {
    node.value.as_ref().ok_or(LoweringError::MissingPayload {
        kind: node.kind,
        span: node.span,
    })
}

fn first_child(node: &Node) -> Result<&Node, LoweringError> {
    node.children.first().ok_or(LoweringError::MissingChild {
        kind: node.kind,
        span: node.span,
    })
}

fn mismatch(node: &Node) -> LoweringError {
    LoweringError::PayloadMismatch {
        kind: node.kind,
        span: node.span,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArrayRef, AssignTarget, CondOp, DeclValue, ForValue, Index};

    fn span() -> Span {
        (0..0).into()
    }

    fn lower_source(source: &str) -> Program {
        let parsed = crate::parser::parse(source);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        lower(parsed.program.as_ref()).expect("lowering failed")
    }

    #[test]
    fn missing_ast_is_an_error() {
        assert_eq!(lower(None), Err(LoweringError::MissingAst));
    }

    #[test]
    fn declarations_keep_order_and_duplicates() {
        let program = lower_source("int a[10]; int x; int a[10];");
        assert_eq!(
            program.decls,
            vec![
                Declaration { id: "a".into(), size: Some(10) },
                Declaration { id: "x".into(), size: None },
                Declaration { id: "a".into(), size: Some(10) },
            ]
        );
    }

    #[test]
    fn assignment_shapes_become_instructions() {
        let program = lower_source(
            "a[i] = b[i] + c[i];\n\
             a[0] = b[i] + 1;\n\
             x = b[2];\n\
             y = 7;",
        );
        assert!(program.loops.is_empty());
        assert_eq!(
            program.instructions,
            vec![
                Instruction::add("a[i]", "b[i]", "c[i]"),
                Instruction::add("a[0]", "b[i]", "1"),
                Instruction::assign("x", "b[2]"),
                Instruction::assign("y", "7"),
            ]
        );
    }

    #[test]
    fn loop_body_collects_its_assignments() {
        let program = lower_source(
            "int a[100];\n\
             for (int i = 0; i < 100; i++) {\n\
               a[i] = b[i] + 1;\n\
               x = b[0];\n\
             }",
        );
        assert_eq!(program.loops.len(), 1);
        let l = &program.loops[0];
        assert_eq!((l.var.as_str(), l.start, l.end, l.cond_op), ("i", 0, 100, CondOp::Lt));
        assert_eq!(
            l.body,
            vec![
                Instruction::add("a[i]", "b[i]", "1"),
                Instruction::assign("x", "b[0]"),
            ]
        );
        assert!(program.instructions.is_empty());
    }

    #[test]
    fn statements_before_any_loop_stay_top_level() {
        let program = lower_source("x = 1; for (int i = 0; i < 2; i++) { a[i] = 0; }");
        assert_eq!(program.instructions, vec![Instruction::assign("x", "1")]);
        assert_eq!(program.loops[0].body, vec![Instruction::assign("a[i]", "0")]);
    }

    #[test]
    fn statement_after_loop_attaches_to_last_loop() {
        let program = lower_source("for (int i = 0; i < 2; i++) { a[i] = 0; } y = 3;");
        assert!(program.instructions.is_empty());
        assert_eq!(
            program.loops[0].body,
            vec![Instruction::assign("a[i]", "0"), Instruction::assign("y", "3")]
        );
    }

    #[test]
    fn nested_loops_are_flattened() {
        let program = lower_source(
            "for (int i = 0; i < 4; i++) {\n\
               a[i] = 1;\n\
               for (int j = 0; j < 4; j++) { b[j] = 2; }\n\
               c[i] = 3;\n\
             }",
        );
        assert_eq!(program.loops.len(), 2);
        assert_eq!(program.loops[0].body, vec![Instruction::assign("a[i]", "1")]);
        // `c[i] = 3` follows the inner loop, so it lands there.
        assert_eq!(
            program.loops[1].body,
            vec![Instruction::assign("b[j]", "2"), Instruction::assign("c[i]", "3")]
        );
    }

    #[test]
    fn decl_without_payload_is_rejected() {
        let node = Node::new(NodeKind::Decl, Vec::new(), None, span());
        assert!(matches!(
            lower(Some(&node)),
            Err(LoweringError::MissingPayload { kind: NodeKind::Decl, .. })
        ));
    }

    #[test]
    fn for_with_wrong_payload_is_rejected() {
        let node = Node::leaf(
            NodeKind::For,
            NodeValue::Decl(DeclValue { id: "a".into(), size: Some(1) }),
            span(),
        );
        assert!(matches!(
            lower(Some(&node)),
            Err(LoweringError::PayloadMismatch { kind: NodeKind::For, .. })
        ));
    }

    #[test]
    fn for_without_body_is_rejected() {
        let node = Node::leaf(
            NodeKind::For,
            NodeValue::For(ForValue {
                var: "i".into(),
                start: 0,
                end: 1,
                cond_op: CondOp::Lt,
            }),
            span(),
        );
        assert!(matches!(
            lower(Some(&node)),
            Err(LoweringError::MissingChild { kind: NodeKind::For, .. })
        ));
    }

    #[test]
    fn expression_with_wrong_payload_is_rejected() {
        let node = Node::new(
            NodeKind::Assign,
            vec![Node::leaf(NodeKind::Plus, NodeValue::Number(1), span())],
            Some(NodeValue::Assign(AssignTarget::Scalar("x".into()))),
            span(),
        );
        assert!(matches!(
            lower(Some(&node)),
            Err(LoweringError::PayloadMismatch { kind: NodeKind::Plus, .. })
        ));
    }

    #[test]
    fn array_and_scalar_targets_render_as_results() {
        let program = lower_source("a[3] = 1; x = b[i];");
        assert_eq!(
            program.instructions,
            vec![Instruction::assign("a[3]", "1"), Instruction::assign("x", "b[i]")]
        );
    }

    #[test]
    fn assign_with_statement_child_is_rejected() {
        let target = AssignTarget::Array(ArrayRef {
            array: "a".into(),
            index: Index::Literal(0),
        });
        let node = Node::new(
            NodeKind::Assign,
            vec![Node::leaf(
                NodeKind::Decl,
                NodeValue::Decl(DeclValue { id: "b".into(), size: None }),
                span(),
            )],
            Some(NodeValue::Assign(target)),
            span(),
        );
        assert!(matches!(
            lower(Some(&node)),
            Err(LoweringError::UnsupportedExpression { kind: NodeKind::Decl, .. })
        ));
    }

    #[test]
    fn lowering_error_stops_at_first_failure() {
        // A valid decl followed by a broken one: the whole call fails.
        let ok = Node::leaf(
            NodeKind::Decl,
            NodeValue::Decl(DeclValue { id: "a".into(), size: Some(1) }),
            span(),
        );
        let broken = Node::new(NodeKind::Decl, Vec::new(), None, span());
        let stmts = Node::new(NodeKind::Statements, vec![ok, broken], None, span());
        assert!(lower(Some(&stmts)).is_err());
    }
}
