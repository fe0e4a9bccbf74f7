// fuse.rs — Loop fusion
//
// Merges adjacent loops whose headers match exactly.
//
// Preconditions: none beyond a well-formed `Program`.
// Postconditions: surviving loops keep their relative order.
// Failure modes: none.
// Side effects: none.

use crate::ir::Program;

/// Fuse adjacent loops with identical `(start, end, var, cond_op)`. Returns
/// the number of merges performed.
///
/// One forward pass: when loop `n` and loop `n + 1` match, the second body is
/// appended to the first and scanning resumes at `n + 2`. A fused loop is not
/// compared against its new neighbour, so three identical loops in a row
/// become two.
pub fn fuse(program: &mut Program) -> usize {
    let mut fused = Vec::with_capacity(program.loops.len());
    let mut merges = 0;
    let mut loops = std::mem::take(&mut program.loops).into_iter().peekable();

    while let Some(mut current) = loops.next() {
        if let Some(next) = loops.next_if(|candidate| current.same_header(candidate)) {
            tracing::debug!(
                var = %current.var,
                start = current.start,
                end = current.end,
                "fusing adjacent loops"
            );
            current.body.extend(next.body);
            merges += 1;
        }
        fused.push(current);
    }

    program.loops = fused;
    merges
}
