//! Rendering a resolved graph as a pinned list or a JSON dependency map.

use std::io::Write;
use std::path::Path;

use pinset_resolver::DependencyGraph;
use pinset_util::errors::{PinsetError, PinsetResult};
use serde::Serialize;

/// One `name==version` per line, first-discovery order.
pub fn render_flat(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    for line in graph.to_flat_list() {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// `{"name==version": ["dep==version", ...]}` in discovery order, indented
/// by four spaces.
pub fn render_json(graph: &DependencyGraph) -> PinsetResult<String> {
    let adjacency = graph.to_adjacency();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    adjacency.serialize(&mut ser).map_err(|e| PinsetError::Generic {
        message: format!("Failed to serialize dependency map: {e}"),
    })?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| {
        PinsetError::Generic {
            message: format!("Dependency map is not valid UTF-8: {e}"),
        }
        .into()
    })
}

/// Write `content` to `target`, or to stdout when `target` is `-`.
pub fn write_output(target: &Path, content: &str) -> PinsetResult<()> {
    if is_stdout(target) {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(PinsetError::Io)?;
        return Ok(());
    }
    pinset_util::fs::write_creating_dirs(target, content.as_bytes()).map_err(|e| {
        PinsetError::Generic {
            message: format!("Failed to write {}: {e}", target.display()),
        }
        .into()
    })
}

pub fn is_stdout(target: &Path) -> bool {
    target.as_os_str() == "-"
}
