// licm.rs — Loop-invariant code motion
//
// Moves instructions that never mention a loop's induction variable out of
// the loop and onto the end of the top-level instruction list.
//
// Preconditions: `program` came from lowering.
// Postconditions: no loop body holds an instruction whose flattened text
//   lacks the loop variable; hoisted instructions keep discovery order.
// Failure modes: none.
// Side effects: none.

use crate::ir::Program;

/// Hoist loop-invariant instructions. Returns the number hoisted.
///
/// The invariance test is purely textual: an instruction stays in the loop
/// iff the induction variable name occurs as a substring of its args
/// concatenated with its result. An induction variable `i` therefore keeps
/// `x = size[0]` inside the loop, since `size` contains `i`.
pub fn licm(program: &mut Program) -> usize {
    let mut hoisted = Vec::new();

    for ir_loop in &mut program.loops {
        let (variant, invariant): (Vec<_>, Vec<_>) = std::mem::take(&mut ir_loop.body)
            .into_iter()
            .partition(|instr| instr.flattened().contains(ir_loop.var.as_str()));
        if !invariant.is_empty() {
            tracing::debug!(
                var = %ir_loop.var,
                count = invariant.len(),
                "hoisting loop-invariant instructions"
            );
        }
        ir_loop.body = variant;
        hoisted.extend(invariant);
    }

    let count = hoisted.len();
    program.instructions.extend(hoisted);
    count
}
