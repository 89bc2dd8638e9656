mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pbe_core::{
    Classification, EngineConfig, LearnedRule, RunOutcome, Session, parse_sequence,
    render_sequence,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pbe", about = "Learn positional rewrite rules from one example")]
struct Cli {
    /// TOML engine config (defaults to $PBE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Probe budget of each search
    #[arg(long, global = true)]
    energy: Option<u32>,

    /// Maximum number of ticks
    #[arg(long, global = true)]
    steps: Option<usize>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an example and print the rules learned from it
    Learn {
        /// Sequence before the edit, e.g. "[a_]" or "a _"
        #[arg(long)]
        before: String,
        /// Sequence after the edit
        #[arg(long)]
        after: String,
    },

    /// Learn from an example and apply the rules to a new input
    Apply {
        #[arg(long)]
        before: String,
        #[arg(long)]
        after: String,
        /// Sequence to rewrite
        #[arg(long)]
        input: String,
    },

    /// Run a session and write the ownership graph as JSON
    Dump {
        #[arg(long)]
        before: String,
        #[arg(long)]
        after: String,
        /// Also apply the rules to this sequence
        #[arg(long)]
        input: Option<String>,
        /// Output file path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(cli.config.as_deref(), cli.energy, cli.steps)?;
    match &cli.command {
        Commands::Learn { before, after } => cmd_learn(&cli, config, before, after),
        Commands::Apply {
            before,
            after,
            input,
        } => cmd_apply(&cli, config, before, after, input),
        Commands::Dump {
            before,
            after,
            input,
            out,
        } => cmd_dump(config, before, after, input.as_deref(), out.as_deref()),
    }
}

fn open_session(
    config: EngineConfig,
    before: &str,
    after: &str,
    input: Option<&str>,
) -> Result<Session> {
    let input = input.map(parse_sequence).unwrap_or_default();
    Session::with_config(parse_sequence(before), parse_sequence(after), input, config)
        .context("invalid example")
}

/// Turn a non-converged outcome into an error for the exit status.
fn require_converged(outcome: &RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Converged { .. } => Ok(()),
        RunOutcome::Conflicted { conflict, .. } => bail!(
            "conflicting examples for {:?}: {} vs {}",
            shown(&conflict.value),
            describe(&conflict.existing),
            describe(&conflict.incoming)
        ),
        RunOutcome::Incomplete => bail!("step budget exhausted before convergence"),
    }
}

fn shown(value: &str) -> &str {
    if value.is_empty() {
        pbe_core::ABSENT_TOKEN
    } else {
        value
    }
}

fn describe(c: &Classification) -> String {
    match c.delta {
        0 => c.kind.to_string(),
        delta => format!("{} {delta}", c.kind),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LearnReport<'a> {
    outcome: &'a RunOutcome,
    classifications: Vec<Classification>,
    rules: Vec<LearnedRule>,
}

fn cmd_learn(cli: &Cli, config: EngineConfig, before: &str, after: &str) -> Result<()> {
    let mut session = open_session(config, before, after, None)?;
    let budget = session.config().step_budget;
    let outcome = session
        .run_until_done(budget, true, false)
        .context("inference failed")?;

    let report = LearnReport {
        outcome: &outcome,
        classifications: session.classifications()?,
        rules: session.rules()?,
    };
    if cli.json {
        print_json(&report)?;
    } else {
        println!("classifications:");
        for c in &report.classifications {
            println!("  {} {}", shown(&c.value), describe(c));
        }
        println!("rules:");
        for rule in &report.rules {
            println!("  {} -> {}", shown(&rule.value), describe(&rule.output));
        }
        if let Some(steps) = outcome.steps() {
            println!("steps: {steps}");
        }
    }
    require_converged(&outcome)
}

#[derive(Serialize)]
struct ApplyReport<'a> {
    outcome: &'a RunOutcome,
    output: Vec<String>,
    rendered: String,
}

fn cmd_apply(cli: &Cli, config: EngineConfig, before: &str, after: &str, input: &str) -> Result<()> {
    let mut session = open_session(config, before, after, Some(input))?;
    let budget = session.config().step_budget;
    let outcome = session
        .run_until_done(budget, true, true)
        .context("inference failed")?;
    require_converged(&outcome)?;

    let output = session.output_sequence()?;
    let rendered = render_sequence(&output);
    if cli.json {
        print_json(&ApplyReport {
            outcome: &outcome,
            output,
            rendered,
        })?;
    } else {
        println!("{rendered}");
    }
    Ok(())
}

fn cmd_dump(
    config: EngineConfig,
    before: &str,
    after: &str,
    input: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(config, before, after, input)?;
    let budget = session.config().step_budget;
    let outcome = session
        .run_until_done(budget, true, input.is_some())
        .context("inference failed")?;

    let dump = session.dump();
    let json = dump.to_json().context("failed to serialize dump")?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "dumped {} nodes, {} edges to {}",
                dump.nodes.len(),
                dump.edges.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    require_converged(&outcome)
}
