// emit.rs — Source-level code emission
//
// Renders the IR back to text in a fixed section order: declarations,
// top-level instructions, then loops.
//
// Preconditions: `program` is well-formed (every `assign`/`add` has a result,
//   every instruction has the args its op needs).
// Postconditions: output is deterministic for a given program; lines are
//   joined by `\n` with no trailing newline.
// Failure modes: none.
// Side effects: none.

use crate::ir::{Declaration, Instruction, Loop, Op, Program};

/// Render `program` as source text.
pub fn emit(program: &Program) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.extend(program.decls.iter().map(declaration));
    lines.extend(program.instructions.iter().map(instruction));
    for ir_loop in &program.loops {
        lines.push(loop_header(ir_loop));
        for instr in &ir_loop.body {
            lines.push(format!("  {}", instruction(instr)));
        }
        lines.push("}".to_string());
    }

    lines.join("\n")
}

fn declaration(decl: &Declaration) -> String {
    match decl.size {
        Some(size) => format!("int {}[{}];", decl.id, size),
        None => format!("int {};", decl.id),
    }
}

fn loop_header(ir_loop: &Loop) -> String {
    let var = &ir_loop.var;
    format!(
        "for (int {var} = {}; {var} {} {}; {var}++) {{",
        ir_loop.start, ir_loop.cond_op, ir_loop.end
    )
}

fn instruction(instr: &Instruction) -> String {
    let arg = |n: usize| instr.args.get(n).map(String::as_str).unwrap_or("");
    let result = instr.result.as_deref().unwrap_or("");
    match instr.op {
        Op::Add => format!("{} = {} + {};", result, arg(0), arg(1)),
        Op::Assign => format!("{} = {};", result, arg(0)),
        Op::Inc => format!("{} += {};", arg(0), arg(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CondOp;

    #[test]
    fn empty_program_is_empty_text() {
        assert_eq!(emit(&Program::new()), "");
    }

    #[test]
    fn sections_in_fixed_order() {
        let mut program = Program::new();
        program.decls.push(Declaration { id: "a".into(), size: Some(100) });
        program.decls.push(Declaration { id: "x".into(), size: None });
        program.loops.push(Loop::new("i", 0, 100, CondOp::Lt).with_body(vec![
            Instruction::add("a[i]", "b[i]", "1"),
            Instruction::inc("i", "1"),
        ]));
        program.instructions.push(Instruction::assign("x", "b[0]"));

        assert_eq!(
            emit(&program),
            "int a[100];\n\
             int x;\n\
             x = b[0];\n\
             for (int i = 0; i < 100; i++) {\n  \
             a[i] = b[i] + 1;\n  \
             i += 1;\n\
             }"
        );
    }

    #[test]
    fn le_header() {
        let program = Program {
            loops: vec![Loop::new("j", 3, 9, CondOp::Le)],
            ..Program::default()
        };
        assert_eq!(emit(&program), "for (int j = 3; j <= 9; j++) {\n}");
    }

    #[test]
    fn duplicate_declarations_emitted_twice() {
        let decl = Declaration { id: "a".into(), size: Some(4) };
        let program = Program {
            decls: vec![decl.clone(), decl],
            ..Program::default()
        };
        assert_eq!(emit(&program), "int a[4];\nint a[4];");
    }

    #[test]
    fn operands_are_emitted_verbatim() {
        let program = Program {
            instructions: vec![Instruction::add("q[i+1]", "z[99999999]", "007")],
            ..Program::default()
        };
        assert_eq!(emit(&program), "q[i+1] = z[99999999] + 007;");
    }
}
