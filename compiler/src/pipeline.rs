// pipeline.rs — Compilation state and pass orchestration
//
// Holds all pass artifacts and runs the minimal set of passes for a given
// terminal PassId. Also hosts the one-call `compile` entry points.
//
// Preconditions: the AST (or its absence) is set before calling run_pipeline.
// Postconditions: all artifacts for required passes are populated, or an
//   error is returned and has_error is set.
// Failure modes: lowering errors; a pass reached without its input artifact.
// Side effects: calls on_pass_complete callback after each pass; prints
//   timings to stderr when verbose.

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::ast::Node;
use crate::diag::{codes, has_errors, DiagLevel, Diagnostic};
use crate::ir::Program;
use crate::lower::LoweringError;
use crate::pass::{descriptor, required_passes, ArtifactId, PassId};
use crate::unroll::UnrollOptions;

// ── Options ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub unroll: UnrollOptions,
    /// Print per-pass timings to stderr.
    pub verbose: bool,
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated diagnostics.
pub struct CompilationState {
    /// Parser output; `None` when parsing produced no tree.
    pub ast: Option<Node>,
    pub program: Option<Program>,
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(ast: Option<Node>) -> Self {
        Self {
            ast,
            program: None,
            output: None,
            diagnostics: Vec::new(),
            has_error: false,
        }
    }
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds.
///
/// `source_hash`: SHA-256 of the raw source text.
/// `options_fingerprint`: SHA-256 of the compact JSON of the unroll options.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub options_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    options_fingerprint: String,
    compiler_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    /// Hex string of the options fingerprint (64 characters).
    pub fn options_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.options_fingerprint)
    }

    /// Serialize provenance as pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&BuildInfo {
            source_hash: self.source_hash_hex(),
            options_fingerprint: self.options_fingerprint_hex(),
            compiler_version: self.compiler_version,
        })
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute provenance from source text and options.
pub fn compute_provenance(
    source: &str,
    options: &PipelineOptions,
) -> serde_json::Result<Provenance> {
    let canonical = serde_json::to_string(&options.unroll)?;
    Ok(Provenance {
        source_hash: sha256(source.as_bytes()),
        options_fingerprint: sha256(canonical.as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Error types ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lowering(#[from] LoweringError),

    #[error("pass `{pass}` ran without its {artifact} artifact")]
    MissingArtifact { pass: PassId, artifact: ArtifactId },
}

#[derive(Debug, Error)]
pub enum CompilationError {
    /// The front end reported errors or produced no tree.
    #[error("parse failed with {} error(s)", .diagnostics.len())]
    Parse { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ── Per-pass bookkeeping ───────────────────────────────────────────────────

/// Per-pass post-processing: callback, accumulate, verbose.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    verbose: bool,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) {
    on_pass_complete(pass_id, &diags);
    if has_errors(&diags) {
        state.has_error = true;
    }
    state.diagnostics.extend(diags);
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    if verbose {
        eprintln!(
            "loopc: {} complete, {:.1}ms",
            descriptor(pass_id).name,
            elapsed_ms
        );
    }
    tracing::debug!(pass = descriptor(pass_id).name, elapsed_ms, "pass complete");
}

fn program_mut(state: &mut CompilationState, pass: PassId) -> Result<&mut Program, PipelineError> {
    state.program.as_mut().ok_or(PipelineError::MissingArtifact {
        pass,
        artifact: ArtifactId::Ir,
    })
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → verbose.
/// Optimization passes only warn; the run stops at the first lowering error.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    options: &PipelineOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let diags = match pass_id {
            PassId::Lower => match crate::lower::lower(state.ast.as_ref()) {
                Ok(program) => {
                    state.program = Some(program);
                    Vec::new()
                }
                Err(err) => {
                    let span = err.span().unwrap_or_else(|| (0..0).into());
                    let diag = Diagnostic::new(DiagLevel::Error, span, err.to_string())
                        .with_code(codes::E0100);
                    finish_pass(
                        state,
                        pass_id,
                        vec![diag],
                        t.elapsed(),
                        options.verbose,
                        &mut on_pass_complete,
                    );
                    return Err(err.into());
                }
            },
            PassId::Licm => {
                crate::licm::licm(program_mut(state, pass_id)?);
                Vec::new()
            }
            PassId::Fuse => {
                crate::fuse::fuse(program_mut(state, pass_id)?);
                Vec::new()
            }
            PassId::Unroll => {
                crate::unroll::unroll(program_mut(state, pass_id)?, &options.unroll).diagnostics
            }
            PassId::Emit => {
                let code = crate::emit::emit(program_mut(state, pass_id)?);
                state.output = Some(code);
                Vec::new()
            }
        };
        finish_pass(
            state,
            pass_id,
            diags,
            t.elapsed(),
            options.verbose,
            &mut on_pass_complete,
        );
    }
    Ok(())
}

// ── One-call entry points ──────────────────────────────────────────────────

/// Compile source text with the default options (unroll factor 2).
///
/// Warnings are logged through `tracing` and never appear in the output.
pub fn compile(source: &str) -> Result<String, CompilationError> {
    compile_with(source, &PipelineOptions::default(), |diag| {
        tracing::warn!("{}", diag);
    })
}

/// Compile source text, handing every pass diagnostic to `on_diagnostic`.
pub fn compile_with(
    source: &str,
    options: &PipelineOptions,
    mut on_diagnostic: impl FnMut(&Diagnostic),
) -> Result<String, CompilationError> {
    let parsed = crate::parser::parse(source);
    if !parsed.errors.is_empty() || parsed.program.is_none() {
        let diagnostics = parsed
            .errors
            .iter()
            .map(|e| Diagnostic::new(DiagLevel::Error, *e.span(), e.to_string()).with_code(codes::E0001))
            .collect();
        return Err(CompilationError::Parse { diagnostics });
    }

    let mut state = CompilationState::new(parsed.program);
    run_pipeline(&mut state, PassId::Emit, options, |_, diags| {
        diags.iter().for_each(&mut on_diagnostic)
    })?;
    state.output.take().ok_or_else(|| {
        PipelineError::MissingArtifact {
            pass: PassId::Emit,
            artifact: ArtifactId::Emitted,
        }
        .into()
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────
