//! YAML ticket document: the editable hand-off between `convert` and `create`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TicketError};
use crate::model::TicketNode;

#[derive(Serialize)]
struct DocumentRef<'a> {
    tickets: &'a [TicketNode],
}

#[derive(Deserialize)]
struct Document {
    tickets: Vec<TicketNode>,
}

/// Encode `tree` as a YAML document with a top-level `tickets` list.
///
/// # Errors
///
/// Returns [`TicketError::Format`] if the YAML emitter fails.
pub fn serialize(tree: &[TicketNode]) -> Result<String> {
    serde_yaml::to_string(&DocumentRef { tickets: tree })
        .map_err(|e| TicketError::Format(e.to_string()))
}

/// Decode a ticket document.
///
/// # Errors
///
/// Returns [`TicketError::Format`] when the text is not YAML, has no
/// top-level `tickets` key, `tickets` is not a list, or a node is malformed.
pub fn deserialize(text: &str) -> Result<Vec<TicketNode>> {
    serde_yaml::from_str::<Document>(text)
        .map(|doc| doc.tickets)
        .map_err(|e| TicketError::Format(e.to_string()))
}

/// Read and decode the document at `path`.
///
/// # Errors
///
/// Returns [`TicketError::Io`] if the file cannot be read and
/// [`TicketError::Format`] if its contents are malformed.
pub fn load_document(path: &Path) -> Result<Vec<TicketNode>> {
    let text = std::fs::read_to_string(path).map_err(|source| TicketError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tree = deserialize(&text).map_err(|e| match e {
        TicketError::Format(msg) => TicketError::Format(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), roots = tree.len(), "loaded ticket document");
    Ok(tree)
}

/// Encode `tree` and write it to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`TicketError::Io`] if the file cannot be written.
pub fn save_document(path: &Path, tree: &[TicketNode]) -> Result<()> {
    let text = serialize(tree)?;
    write_file(path, &text)
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| TicketError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| TicketError::Io {
        path: path.to_path_buf(),
        source,
    })
}
