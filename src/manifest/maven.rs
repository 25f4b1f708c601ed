//! Maven `pom.xml` extraction.

use crate::traits::{ExtractionError, ManifestExtractor};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

pub const POM_XML_FILE: &str = "pom.xml";

/// Reads `dependencies/dependency` entries from `pom.xml` files and emits
/// `groupId:artifactId` identifiers.
///
/// Elements are matched by local name, so both the default POM namespace and
/// prefixed or namespace-less documents are accepted. Nested `exclusions` are
/// not dependencies and are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct MavenExtractor;

#[derive(Default)]
struct Coordinate {
    group_id: Option<String>,
    artifact_id: Option<String>,
}

impl ManifestExtractor for MavenExtractor {
    fn manifest_name(&self) -> &'static str {
        POM_XML_FILE
    }

    fn parse(&self, path: &Path, content: &str) -> Result<Vec<String>, ExtractionError> {
        let malformed = |reason: String| ExtractionError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut identifiers = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut current: Option<Coordinate> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    saw_root = true;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if name == "dependency" && stack.last().map(String::as_str) == Some("dependencies")
                    {
                        current = Some(Coordinate::default());
                    }
                    stack.push(name);
                }
                Ok(Event::Empty(_)) => saw_root = true,
                Ok(Event::End(_)) => {
                    let closed = stack.pop();
                    if closed.as_deref() == Some("dependency")
                        && stack.last().map(String::as_str) == Some("dependencies")
                    {
                        if let Some(coordinate) = current.take() {
                            match (coordinate.group_id, coordinate.artifact_id) {
                                (Some(group), Some(artifact)) => {
                                    identifiers.push(format!("{}:{}", group, artifact));
                                }
                                _ => {
                                    return Err(malformed(
                                        "dependency without groupId or artifactId".to_string(),
                                    ))
                                }
                            }
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(format!("invalid text content: {}", e)))?;
                    record_field(&stack, current.as_mut(), &text);
                }
                Ok(Event::CData(t)) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    record_field(&stack, current.as_mut(), &text);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(format!(
                        "XML error at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(malformed("no root element".to_string()));
        }
        if let Some(open) = stack.last() {
            return Err(malformed(format!("unclosed element <{}>", open)));
        }

        Ok(identifiers)
    }
}

/// Stores `groupId`/`artifactId` text when it is a direct child of the
/// dependency being read.
fn record_field(stack: &[String], current: Option<&mut Coordinate>, text: &str) {
    let Some(coordinate) = current else {
        return;
    };
    let depth = stack.len();
    if depth < 3 || stack[depth - 2] != "dependency" || stack[depth - 3] != "dependencies" {
        return;
    }
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match stack[depth - 1].as_str() {
        "groupId" => coordinate.group_id = Some(text.to_string()),
        "artifactId" => coordinate.artifact_id = Some(text.to_string()),
        _ => {}
    }
}
