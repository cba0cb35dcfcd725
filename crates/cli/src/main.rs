use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::fmt::SubscriberBuilder;
use wcol::api::{read_edge_list_file, Append, EngineCfg, GraphBounds, Ordering};

mod provenance;
mod solve;

#[derive(Parser)]
#[command(name = "wcol")]
#[command(about = "Orderings with bounded weak r-reachability sets")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Build an ordering greedily, repairing it whenever it overflows
    Solve(solve::SolveArgs),
    /// Print lower bounds on the weak coloring number
    LowerBound {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        radius: usize,
    },
    /// Print a small provenance JSON block
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Solve(args) => solve::solve(args),
        Action::LowerBound { input, radius } => lower_bound(input, radius),
        Action::Report => report(),
    }
}

fn lower_bound(input: PathBuf, radius: usize) -> Result<()> {
    ensure!(radius > 0, "--radius must be positive");
    let loaded = read_edge_list_file(&input)
        .with_context(|| format!("loading graph {}", input.display()))?;
    tracing::info!(
        input = %input.display(),
        n = loaded.graph.n(),
        m = loaded.graph.m(),
        radius,
        "lower-bound"
    );
    let ord: Ordering<'_, Append> = Ordering::new(
        &loaded.graph,
        EngineCfg {
            radius,
            ..EngineCfg::default()
        },
    );
    println!("Degeneracy: {}", ord.degeneracy_lower_bound());
    println!("WCOL-UB-MMD+: {}", ord.contraction_lower_bound());
    println!("WCOL-MMD+: {}", ord.contraction_lower_bound_exact());
    println!("Best: {}", GraphBounds::of(&loaded.graph, radius).best());
    Ok(())
}

fn report() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&report_json())?);
    Ok(())
}

fn report_json() -> serde_json::Value {
    serde_json::json!({
        "code_rev": provenance::current_git_rev(),
        "version": wcol::VERSION,
    })
}
