//! CLI logic for the Strata layout tool.
//!
//! Reads a graph description, lays it out with the configured strategies and
//! reports the resulting node positions.

pub mod error_adapter;

mod args;
mod config;
mod error;
mod input;

pub use args::Args;
pub use error::CliError;

use std::{fs, path::Path};

use indexmap::IndexMap;
use log::{info, warn};

use strata::{Layouter, Outcome, geometry::Point, progress::NullMonitor};

use input::InputGraph;

/// Run the Strata CLI application
///
/// Loads the configuration, parses the input graph, lays it out and returns
/// a report with one `id x y` line per node, in declaration order.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed or inconsistent input graphs
/// - Layout errors
pub fn run(args: &Args) -> Result<String, CliError> {
    info!(input_path = args.input; "Processing graph");

    let config = config::load_config(args.config.as_ref())?;
    let layouter = Layouter::new(config)?;

    let path = Path::new(&args.input);
    let source = fs::read_to_string(path)?;

    let (outcome, positions) = match input::parse(path, &source)? {
        InputGraph::Layered { mut graph, ids } => {
            let outcome = layouter.layout(&mut graph, &NullMonitor)?;
            (outcome, collect_positions(ids, |id| graph.node(id).position()))
        }
        InputGraph::Tree { mut graph, ids } => {
            let outcome = layouter.layout_tree(&mut graph, &NullMonitor)?;
            (outcome, collect_positions(ids, |id| graph.node(id).position()))
        }
    };

    if outcome == Outcome::Cancelled {
        warn!("Layout was cancelled, positions are partial");
    }

    let report: String = positions
        .iter()
        .map(|(id, point)| format!("{id} {:.2} {:.2}\n", point.x(), point.y()))
        .collect();

    info!(nodes = positions.len(); "Layout finished");
    Ok(report)
}

/// Pairs every declared id with the position of its node.
fn collect_positions<T>(
    ids: IndexMap<String, T>,
    position: impl Fn(T) -> Point,
) -> Vec<(String, Point)> {
    ids.into_iter()
        .map(|(label, id)| {
            let point = position(id);
            (label, point)
        })
        .collect()
}
