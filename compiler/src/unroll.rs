// unroll.rs — Loop unrolling
//
// Replicates each loop body `factor` times, renaming the induction variable
// in replica k to `var+k`, then appends `var += factor-1` so the unchanged
// `var++` header advances by `factor` per iteration.
//
// Preconditions: `options.factor >= 1` (enforced by `UnrollOptions::new`).
// Postconditions: an unrolled body has `factor * n + 1` instructions; a
//   skipped loop is untouched.
// Failure modes: none. Loops whose trip count is not a multiple of `factor`
//   produce a W0100 warning and are left as-is.
// Side effects: none.

use serde::Serialize;
use thiserror::Error;

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::ir::{Instruction, Loop, Program};

// ── Options ─────────────────────────────────────────────────────────────────

/// How replicas are laid out in the new body.
///
/// `Interleaved` reproduces the end-to-end hoist/fuse/unroll listing;
/// `ByCopy` follows the body-repetition algorithm of the reference tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaOrder {
    /// Each instruction is immediately followed by its renamed replicas:
    /// `s0, s0', t0, t0'`.
    #[default]
    Interleaved,
    /// The whole body is repeated once per replica: `s0, t0, s0', t0'`.
    ByCopy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnrollOptions {
    factor: u32,
    pub order: ReplicaOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("unroll factor must be at least 1")]
    ZeroFactor,
}

impl UnrollOptions {
    pub const DEFAULT_FACTOR: u32 = 2;

    pub fn new(factor: u32, order: ReplicaOrder) -> Result<Self, OptionsError> {
        if factor == 0 {
            return Err(OptionsError::ZeroFactor);
        }
        Ok(Self { factor, order })
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }
}

impl Default for UnrollOptions {
    fn default() -> Self {
        Self {
            factor: Self::DEFAULT_FACTOR,
            order: ReplicaOrder::default(),
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct UnrollResult {
    /// Loops whose bodies were replicated.
    pub unrolled: usize,
    /// One W0100 warning per skipped loop.
    pub diagnostics: Vec<Diagnostic>,
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Unroll every loop whose iteration count is a multiple of the factor.
///
/// Renaming is plain substring replacement over args and result, so any
/// identifier containing the variable name is rewritten too. Loop bounds are
/// left unchanged; only the trailing `inc` accounts for the wider stride.
pub fn unroll(program: &mut Program, options: &UnrollOptions) -> UnrollResult {
    let factor = i128::from(options.factor);
    let mut result = UnrollResult::default();

    for ir_loop in &mut program.loops {
        let iterations = ir_loop.iterations();
        // Euclidean remainder so inverted bounds are judged like any other
        // count.
        if iterations.rem_euclid(factor) != 0 {
            result.diagnostics.push(skipped(ir_loop, iterations, options.factor));
            continue;
        }

        ir_loop.body = replicate(ir_loop, options);
        ir_loop
            .body
            .push(Instruction::inc(ir_loop.var.clone(), (factor - 1).to_string()));
        result.unrolled += 1;
        tracing::debug!(
            var = %ir_loop.var,
            factor = options.factor,
            body_len = ir_loop.body.len(),
            "unrolled loop"
        );
    }

    result
}

fn replica_var(var: &str, k: u32) -> String {
    if k == 0 {
        var.to_string()
    } else {
        format!("{var}+{k}")
    }
}

fn replicate(ir_loop: &Loop, options: &UnrollOptions) -> Vec<Instruction> {
    let var = ir_loop.var.as_str();
    let mut body = Vec::with_capacity(ir_loop.body.len() * options.factor as usize + 1);
    match options.order {
        ReplicaOrder::Interleaved => {
            for instr in &ir_loop.body {
                for k in 0..options.factor {
                    body.push(instr.renamed(var, &replica_var(var, k)));
                }
            }
        }
        ReplicaOrder::ByCopy => {
            for k in 0..options.factor {
                let renamed_var = replica_var(var, k);
                body.extend(ir_loop.body.iter().map(|instr| instr.renamed(var, &renamed_var)));
            }
        }
    }
    body
}

fn skipped(ir_loop: &Loop, iterations: i128, factor: u32) -> Diagnostic {
    Diagnostic::new(
        DiagLevel::Warning,
        ir_loop.span,
        format!(
            "loop from {} to {} not unrollable by factor {}",
            ir_loop.start, ir_loop.end, factor
        ),
    )
    .with_code(codes::W0100)
    .with_hint(format!(
        "iteration count {} is not a multiple of {}",
        iterations, factor
    ))
}

// ── Tests ───────────────────────────────────────────────────────────────────
