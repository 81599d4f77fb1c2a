//! Graphviz DOT rendering for citation graphs.

use crate::graph::{CitationEdge, GraphNode};
use std::fmt::{self, Write};

/// Name of the emitted digraph.
pub const GRAPH_NAME: &str = "CitationGraph";

/// Write nodes then edges as a left-to-right digraph.
pub fn write_dot<W: Write>(out: &mut W, nodes: &[GraphNode], edges: &[CitationEdge]) -> fmt::Result {
    writeln!(out, "digraph {} {{", GRAPH_NAME)?;
    writeln!(out, "  rankdir=\"LR\";")?;

    for node in nodes {
        writeln!(
            out,
            "  \"{}\" [label=\"{}\"];",
            escape(&node.doi),
            escape(&node.title)
        )?;
    }

    for edge in edges {
        writeln!(
            out,
            "  \"{}\" -> \"{}\";",
            escape(&edge.citing),
            escape(&edge.cited)
        )?;
    }

    writeln!(out, "}}")
}

/// Escape a value for use inside a double-quoted DOT string.
///
/// Line breaks become `\n` escapes so every statement stays on one line.
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
