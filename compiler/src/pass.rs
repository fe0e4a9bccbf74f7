// pass.rs — Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the compiler's passes (parse is outside the runner), their
// dependency edges, and the artifacts they produce. The dependency chain
// encodes the fixed optimization order: lower → licm → fuse → unroll → emit.
// Reordering the optimizations changes the output program.

use std::collections::HashSet;
use std::fmt;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each compiler pass (parse excluded, handled before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Lower,
    Licm,
    Fuse,
    Unroll,
    Emit,
}

/// Machine-readable artifact identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Ir,      // ir::Program (rewritten in place by each optimization)
    Emitted, // String
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(descriptor(*self).name)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactId::Ir => f.write_str("ir"),
            ArtifactId::Emitted => f.write_str("emitted code"),
        }
    }
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a compiler pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/verbose output.
    pub name: &'static str,
    /// Pass dependencies (other passes whose outputs this pass consumes).
    pub inputs: &'static [PassId],
    /// Artifacts this pass produces or rewrites.
    pub outputs: &'static [ArtifactId],
    /// Postcondition (documentation only).
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Lower => PassDescriptor {
            name: "lower",
            inputs: &[],
            outputs: &[ArtifactId::Ir],
            invariants: "loops flattened, assignments attached to the last loop seen",
        },
        PassId::Licm => PassDescriptor {
            name: "licm",
            inputs: &[PassId::Lower],
            outputs: &[ArtifactId::Ir],
            invariants: "every loop body instruction mentions its induction variable",
        },
        PassId::Fuse => PassDescriptor {
            name: "fuse",
            inputs: &[PassId::Licm],
            outputs: &[ArtifactId::Ir],
            invariants: "no two adjacent input loops with equal headers left unmerged",
        },
        PassId::Unroll => PassDescriptor {
            name: "unroll",
            inputs: &[PassId::Fuse],
            outputs: &[ArtifactId::Ir],
            invariants: "divisible loops replicated, bounds unchanged",
        },
        PassId::Emit => PassDescriptor {
            name: "emit",
            inputs: &[PassId::Unroll],
            outputs: &[ArtifactId::Emitted],
            invariants: "deterministic text: decls, top-level instructions, loops",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration (execution) order.
pub const ALL_PASSES: [PassId; 5] = [
    PassId::Lower,
    PassId::Licm,
    PassId::Fuse,
    PassId::Unroll,
    PassId::Emit,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_passes_emit_includes_all_in_fixed_order() {
        assert_eq!(required_passes(PassId::Emit), ALL_PASSES.to_vec());
    }

    #[test]
    fn required_passes_lower_is_minimal() {
        assert_eq!(required_passes(PassId::Lower), vec![PassId::Lower]);
    }

    #[test]
    fn required_passes_unroll_stops_before_emit() {
        assert_eq!(
            required_passes(PassId::Unroll),
            vec![PassId::Lower, PassId::Licm, PassId::Fuse, PassId::Unroll]
        );
    }

    #[test]
    fn licm_runs_before_fuse_before_unroll() {
        let passes = required_passes(PassId::Emit);
        let pos = |p: PassId| passes.iter().position(|&q| q == p);
        assert!(pos(PassId::Licm) < pos(PassId::Fuse));
        assert!(pos(PassId::Fuse) < pos(PassId::Unroll));
    }

    #[test]
    fn display_uses_descriptor_name() {
        assert_eq!(PassId::Licm.to_string(), "licm");
        assert_eq!(ArtifactId::Emitted.to_string(), "emitted code");
    }

    #[test]
    fn no_parse_in_pass_id() {
        // Parse is handled outside the runner; PassId has no Parse variant.
        for pass in &ALL_PASSES {
            assert_ne!(descriptor(*pass).name, "parse");
        }
    }

    #[test]
    fn all_descriptors_have_outputs() {
        for pass in &ALL_PASSES {
            let desc = descriptor(*pass);
            assert!(
                !desc.outputs.is_empty(),
                "pass {:?} has no outputs declared",
                pass
            );
        }
    }
}
