//! TOML input format of the CLI.
//!
//! A file describes either a layered graph or a tree:
//!
//! ```toml
//! groups = [["a", "b"]]
//!
//! [[layers]]
//! nodes = [{ id = "a", width = 10, height = 10 }, { id = "b", width = 10, height = 10 }]
//!
//! [[layers]]
//! nodes = [{ id = "c", width = 10, height = 10, pinned = true, y = 40 }]
//!
//! [[edges]]
//! source = "a"
//! target = "c"
//! weight = 2
//! ```
//!
//! or
//!
//! ```toml
//! [tree]
//! nodes = [{ id = "r", width = 10, height = 10 }, { id = "x", width = 10, height = 10 }]
//! edges = [{ source = "r", target = "x" }]
//! ```

use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use strata::{
    geometry::{Point, Size},
    structure::{LNode, LayeredGraph, NodeId, TGraph, TNode, TNodeId},
};

use crate::error::CliError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphFile {
    #[serde(default)]
    layers: Vec<LayerTable>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
    #[serde(default)]
    groups: Vec<Vec<String>>,
    tree: Option<TreeTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayerTable {
    #[serde(default)]
    nodes: Vec<NodeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeEntry {
    id: String,
    width: f64,
    height: f64,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    constrained: bool,
    #[serde(default)]
    dummy: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeEntry {
    source: String,
    target: String,
    #[serde(default = "default_weight")]
    weight: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TreeTable {
    nodes: Vec<TreeNodeEntry>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TreeNodeEntry {
    id: String,
    width: f64,
    height: f64,
}

fn default_weight() -> u32 {
    1
}

/// A graph read from an input file, with its nodes keyed by their ids in
/// declaration order.
#[derive(Debug)]
pub enum InputGraph {
    Layered {
        graph: LayeredGraph,
        ids: IndexMap<String, NodeId>,
    },
    Tree {
        graph: TGraph,
        ids: IndexMap<String, TNodeId>,
    },
}

/// Parses the input file contents.
///
/// # Errors
///
/// Returns [`CliError::Toml`] for malformed TOML and [`CliError::Input`] for
/// duplicate or unknown node ids, groups the graph rejects, or a file that
/// mixes the layered and the tree form.
pub fn parse(path: &Path, src: &str) -> Result<InputGraph, CliError> {
    let file: GraphFile = toml::from_str(src).map_err(|err| CliError::toml(path, src, err))?;

    match file.tree {
        Some(tree) => {
            if !file.layers.is_empty() || !file.edges.is_empty() || !file.groups.is_empty() {
                return Err(CliError::Input(
                    "a tree input cannot also declare layers, edges or groups".to_string(),
                ));
            }
            build_tree(tree)
        }
        None => build_layered(file),
    }
}

fn build_layered(file: GraphFile) -> Result<InputGraph, CliError> {
    let mut graph = LayeredGraph::new();
    let mut ids = IndexMap::new();

    for (layer, table) in file.layers.into_iter().enumerate() {
        for node in table.nodes {
            if ids.contains_key(&node.id) {
                return Err(duplicate(&node.id));
            }
            let mut lnode = LNode::new(node.id.as_str(), Size::new(node.width, node.height))
                .with_position(Point::new(node.x, node.y));
            if node.pinned {
                lnode = lnode.pinned();
            }
            if node.constrained {
                lnode = lnode.constrained();
            }
            if node.dummy {
                lnode = lnode.dummy();
            }
            let id = graph.add_node(layer, lnode);
            ids.insert(node.id, id);
        }
    }

    for edge in &file.edges {
        let source = lookup(&ids, &edge.source)?;
        let target = lookup(&ids, &edge.target)?;
        graph.add_weighted_edge(source, target, edge.weight);
    }

    for group in &file.groups {
        let members = group
            .iter()
            .map(|id| lookup(&ids, id))
            .collect::<Result<Vec<_>, _>>()?;
        graph
            .group_nodes(&members)
            .map_err(|err| CliError::Input(err.to_string()))?;
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        layers = graph.layer_count();
        "Layered input parsed"
    );
    Ok(InputGraph::Layered { graph, ids })
}

fn build_tree(tree: TreeTable) -> Result<InputGraph, CliError> {
    let mut graph = TGraph::new();
    let mut ids = IndexMap::new();

    for node in tree.nodes {
        if ids.contains_key(&node.id) {
            return Err(duplicate(&node.id));
        }
        let id = graph.add_node(TNode::new(
            node.id.as_str(),
            Size::new(node.width, node.height),
        ));
        ids.insert(node.id, id);
    }

    for edge in &tree.edges {
        let source = lookup(&ids, &edge.source)?;
        let target = lookup(&ids, &edge.target)?;
        graph.add_edge(source, target);
    }

    debug!(nodes = graph.node_count(), edges = graph.edge_count(); "Tree input parsed");
    Ok(InputGraph::Tree { graph, ids })
}

fn lookup<T: Copy>(ids: &IndexMap<String, T>, id: &str) -> Result<T, CliError> {
    ids.get(id)
        .copied()
        .ok_or_else(|| CliError::Input(format!("unknown node id `{id}`")))
}

fn duplicate(id: &str) -> CliError {
    CliError::Input(format!("duplicate node id `{id}`"))
}
