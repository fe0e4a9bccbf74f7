use clap::Parser;
use std::path::PathBuf;

use loopc::diag::{has_errors, Diagnostic};
use loopc::pass::PassId;
use loopc::pipeline::{compute_provenance, run_pipeline, CompilationState, PipelineOptions};
use loopc::unroll::{ReplicaOrder, UnrollOptions};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Optimized source text
    Code,
    /// Parse tree
    Ast,
    /// IR straight after lowering (JSON)
    Ir,
    /// IR after LICM, fusion and unrolling (JSON)
    OptIr,
    /// Source hash and options fingerprint (JSON)
    BuildInfo,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OrderArg {
    Interleaved,
    ByCopy,
}

impl From<OrderArg> for ReplicaOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Interleaved => ReplicaOrder::Interleaved,
            OrderArg::ByCopy => ReplicaOrder::ByCopy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "loopc",
    version,
    about = "Loop optimizing compiler: hoists invariants, fuses and unrolls loops"
)]
struct Cli {
    /// Input source file
    source: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Code)]
    emit: EmitStage,

    /// Loop unroll factor
    #[arg(long, default_value_t = UnrollOptions::DEFAULT_FACTOR)]
    unroll_factor: u32,

    /// Layout of unrolled replicas
    #[arg(long, value_enum, default_value_t = OrderArg::Interleaved)]
    replica_order: OrderArg,

    /// Print compiler phases and timing
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("loopc: source = {}", cli.source.display());
        eprintln!("loopc: emit   = {:?}", cli.emit);
    }

    let unroll = match UnrollOptions::new(cli.unroll_factor, cli.replica_order.into()) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("loopc: error: {}", e);
            std::process::exit(2);
        }
    };
    let options = PipelineOptions {
        unroll,
        verbose: cli.verbose,
    };

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("loopc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    if let EmitStage::BuildInfo = cli.emit {
        match compute_provenance(&source, &options).and_then(|p| p.to_json()) {
            Ok(json) => write_output(&cli, &json),
            Err(e) => {
                eprintln!("loopc: error: {}", e);
                std::process::exit(2);
            }
        }
        return;
    }

    let parse_result = loopc::parser::parse(&source);
    if !parse_result.errors.is_empty() {
        for err in &parse_result.errors {
            eprintln!("loopc: parse error: {}", err);
        }
        std::process::exit(1);
    }
    let program = match parse_result.program {
        Some(p) => p,
        None => {
            eprintln!("loopc: parse failed with no output");
            std::process::exit(1);
        }
    };

    if let EmitStage::Ast = cli.emit {
        write_output(&cli, &format!("{:#?}", program));
        return;
    }

    // ── Run passes ──
    let terminal = match cli.emit {
        EmitStage::Ir => PassId::Lower,
        EmitStage::OptIr => PassId::Unroll,
        _ => PassId::Emit,
    };
    let mut state = CompilationState::new(Some(program));
    let result = run_pipeline(&mut state, terminal, &options, |_, diags| {
        print_diagnostics(diags)
    });
    if let Err(e) = result {
        eprintln!("loopc: error: {}", e);
        std::process::exit(1);
    }
    if state.has_error || has_errors(&state.diagnostics) {
        std::process::exit(1);
    }

    let text = match cli.emit {
        EmitStage::Ir | EmitStage::OptIr => {
            match state.program.as_ref().map(serde_json::to_string_pretty) {
                Some(Ok(json)) => json,
                Some(Err(e)) => {
                    eprintln!("loopc: error: {}", e);
                    std::process::exit(2);
                }
                None => {
                    eprintln!("loopc: error: no IR produced");
                    std::process::exit(1);
                }
            }
        }
        _ => state.output.take().unwrap_or_default(),
    };
    write_output(&cli, &text);
}

fn print_diagnostics(diags: &[Diagnostic]) {
    for diag in diags {
        eprintln!("loopc: {}", diag);
    }
}

fn write_output(cli: &Cli, text: &str) {
    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, format!("{}\n", text)) {
                eprintln!("loopc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            if cli.verbose {
                eprintln!("loopc: wrote {}", path.display());
            }
        }
        None => println!("{}", text),
    }
}
