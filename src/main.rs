use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};

use game_assignment_flow::{
    aggregate, min_cost_flow, NetworkBuilder, NodeId, NodePayload, SolverConfig,
};

#[derive(Parser, Debug)]
#[command(name = "game-assignment-flow")]
#[command(about = "Assign users to games with a min-cost flow", long_about = None)]
struct Args {
    /// Verbose output level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input JSON path ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output JSON path ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Accept a maximum flow that leaves some supply unrouted
    #[arg(long)]
    allow_partial: bool,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    start_nodes: Vec<NodeId>,
    end_nodes: Vec<NodeId>,
    capacities: Vec<i64>,
    unit_costs: Vec<i64>,
    #[serde(default)]
    node_supplies: HashMap<NodeId, i64>,
    #[serde(default)]
    node_data: HashMap<NodeId, NodePayload>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut input_json = String::new();
    if args.input == "-" {
        io::stdin().read_to_string(&mut input_json)?;
    } else {
        input_json = fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read input file: {}", &args.input))?;
    }
    let problem: Problem =
        serde_json::from_str(&input_json).context("failed to parse input JSON")?;

    let network = NetworkBuilder::from_arrays(
        &problem.start_nodes,
        &problem.end_nodes,
        &problem.capacities,
        &problem.unit_costs,
    )?
    .supplies(problem.node_supplies)
    .payloads(problem.node_data)
    .build()?;
    if args.verbose > 0 {
        eprintln!(
            "game-assignment-flow: {} nodes, {} arcs, {} units to route",
            network.node_count(),
            network.arc_count(),
            network.required_flow()
        );
    }

    let config = if args.allow_partial {
        SolverConfig::allow_partial()
    } else {
        SolverConfig::default()
    };
    let solution = min_cost_flow(&network, config)?;
    if args.verbose > 0 {
        eprintln!(
            "game-assignment-flow: routed {} units at cost {}",
            solution.flow_value(),
            solution.total_cost()
        );
    }
    if args.verbose > 1 {
        for (node, left) in solution.unsatisfied() {
            eprintln!("game-assignment-flow: node {node} left with {left} unrouted");
        }
    }
    let assignment = aggregate(&network, &solution)?;

    let serialized = if args.pretty {
        serde_json::to_string_pretty(&assignment)?
    } else {
        serde_json::to_string(&assignment)?
    };
    if args.output == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(serialized.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        fs::write(&args.output, serialized)
            .with_context(|| format!("failed to write output file: {}", &args.output))?;
    }
    Ok(())
}
