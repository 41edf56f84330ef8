//! Structured document merger
//!
//! Documents are JSON element trees. An element is an object that may carry
//! an `id`, a `ref` to another element's id, and a `children` array. An
//! element with `"compose": "<item uri>"` is a placeholder: the composed
//! item's root element is appended to its `children` and the `compose` key is
//! dropped.
//!
//! Every spliced copy gets its ids prefixed with `<item-slug>.<occurrence>.`
//! so that an item composed twice still yields unique ids. References inside
//! the copy that point at one of its own ids are rewritten the same way.
//!
//! Placeholders for a node are only searched inside the content spliced for
//! its parent, never inside content spliced for the parent's other children.

use super::{combination_identity, ContentMerger, MergeResult};
use crate::{ContentScope, ExternalizationError, NodeId, NodeRef};
use pressroom_domain::{ItemUri, VersionId};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const COMPOSE: &str = "compose";
const CHILDREN: &str = "children";
const ID: &str = "id";
const REF: &str = "ref";

/// Merger for `application/vnd.pressroom.document+json`
#[derive(Debug, Default)]
pub struct StructuredDocumentMerger {
    document: Option<Value>,
    root_item: Option<ItemUri>,
    /// JSON pointers to every copy of a node's content in the document
    anchors: HashMap<NodeId, (ItemUri, Vec<String>)>,
    spliced: HashSet<String>,
    occurrences: HashMap<String, usize>,
    versions: Vec<VersionId>,
}

impl StructuredDocumentMerger {
    /// Create a merger with nothing visited
    pub fn new() -> Self {
        Self::default()
    }

    fn splice(
        &mut self,
        id: NodeId,
        item: &ItemUri,
        parent: NodeId,
        element: Value,
    ) -> Result<(), ExternalizationError> {
        let document = self.document.as_mut().ok_or(ExternalizationError::EmptyTree)?;
        let (parent_item, parent_anchors) = self
            .anchors
            .get(&parent)
            .cloned()
            .ok_or(ExternalizationError::EmptyTree)?;

        let mut slots = Vec::new();
        for anchor in &parent_anchors {
            if let Some(value) = document.pointer(anchor) {
                find_placeholders(value, anchor, item, &self.spliced, &mut slots);
            }
        }
        if slots.is_empty() {
            return Err(ExternalizationError::PlaceholderNotFound {
                item: item.clone(),
                parent: parent_item,
            });
        }

        let slug = item.slug();
        let mut child_anchors = Vec::with_capacity(slots.len());
        for slot in slots {
            let occurrence = self.occurrences.entry(slug.clone()).or_insert(0);
            *occurrence += 1;
            let mut copy = element.clone();
            prefix_ids(&mut copy, &format!("{}.{}.", slug, occurrence));

            let placeholder = document
                .pointer_mut(&slot)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| ExternalizationError::PlaceholderNotFound {
                    item: item.clone(),
                    parent: parent_item.clone(),
                })?;
            placeholder.remove(COMPOSE);
            let children = placeholder
                .entry(CHILDREN)
                .or_insert_with(|| Value::Array(Vec::new()))
                .as_array_mut()
                .ok_or_else(|| ExternalizationError::MalformedContent {
                    item: parent_item.clone(),
                    reason: format!("'{}' of placeholder at '{}' is not an array", CHILDREN, slot),
                })?;

            let anchor = format!("{}/{}/{}", slot, CHILDREN, children.len());
            children.push(copy);
            self.spliced.insert(anchor.clone());
            child_anchors.push(anchor);
        }

        tracing::debug!(
            item = %item,
            parent = %parent_item,
            copies = child_anchors.len(),
            "Spliced composed element"
        );
        self.anchors.insert(id, (item.clone(), child_anchors));
        Ok(())
    }
}

impl ContentMerger for StructuredDocumentMerger {
    fn visit(&mut self, node: NodeRef<'_>, scope: &ContentScope) -> Result<(), ExternalizationError> {
        let version = node.version();
        let element: Value = scope
            .with_current(|bytes| serde_json::from_slice::<Value>(bytes))?
            .map_err(|e| ExternalizationError::MalformedContent {
                item: version.item.clone(),
                reason: e.to_string(),
            })?;
        if !element.is_object() {
            return Err(ExternalizationError::MalformedContent {
                item: version.item.clone(),
                reason: "document root must be an object".to_string(),
            });
        }

        match node.parent() {
            None => {
                self.document = Some(element);
                self.root_item = Some(version.item.clone());
                self.anchors
                    .insert(node.id, (version.item.clone(), vec![String::new()]));
            }
            Some(parent) => self.splice(node.id, &version.item, parent, element)?,
        }
        self.versions.push(version.id);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<MergeResult, ExternalizationError> {
        let (document, root_item) = match (self.document, self.root_item) {
            (Some(document), Some(root_item)) => (document, root_item),
            _ => return Err(ExternalizationError::EmptyTree),
        };
        let content = serde_json::to_vec_pretty(&document).map_err(|e| {
            ExternalizationError::MalformedContent {
                item: root_item,
                reason: e.to_string(),
            }
        })?;
        Ok(MergeResult {
            content,
            identity: Some(combination_identity(&self.versions)),
        })
    }
}

/// JSON pointer token escaping (RFC 6901)
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn find_placeholders(
    value: &Value,
    pointer: &str,
    item: &ItemUri,
    spliced: &HashSet<String>,
    out: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => {
            if map
                .get(COMPOSE)
                .and_then(Value::as_str)
                .is_some_and(|target| ItemUri::new(target) == *item)
            {
                out.push(pointer.to_string());
            }
            for (key, child) in map {
                let path = format!("{}/{}", pointer, escape(key));
                if !spliced.contains(&path) {
                    find_placeholders(child, &path, item, spliced, out);
                }
            }
        }
        Value::Array(elements) => {
            for (index, child) in elements.iter().enumerate() {
                let path = format!("{}/{}", pointer, index);
                if !spliced.contains(&path) {
                    find_placeholders(child, &path, item, spliced, out);
                }
            }
        }
        _ => {}
    }
}

fn prefix_ids(element: &mut Value, prefix: &str) {
    let mut ids = HashSet::new();
    collect_ids(element, &mut ids);
    rewrite_ids(element, prefix, &ids);
}

fn collect_ids(value: &Value, ids: &mut HashSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get(ID) {
                ids.insert(id.clone());
            }
            map.values().for_each(|child| collect_ids(child, ids));
        }
        Value::Array(elements) => elements.iter().for_each(|child| collect_ids(child, ids)),
        _ => {}
    }
}

fn rewrite_ids(value: &mut Value, prefix: &str, ids: &HashSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    (ID, Value::String(id)) => *id = format!("{}{}", prefix, id),
                    (REF, Value::String(target)) => {
                        let (marker, bare) = match target.strip_prefix('#') {
                            Some(bare) => ("#", bare),
                            None => ("", target.as_str()),
                        };
                        if ids.contains(bare) {
                            let rewritten = format!("{}{}{}", marker, prefix, bare);
                            *target = rewritten;
                        }
                    }
                    (_, other) => rewrite_ids(other, prefix, ids),
                }
            }
        }
        Value::Array(elements) => elements
            .iter_mut()
            .for_each(|child| rewrite_ids(child, prefix, ids)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefix_rewrites_own_ids_and_refs_only() {
        let mut element = json!({
            "id": "intro",
            "children": [
                { "id": "note", "ref": "#intro" },
                { "ref": "glossary" },
                { "ref": "note" }
            ]
        });
        prefix_ids(&mut element, "footer.1.");
        assert_eq!(
            element,
            json!({
                "id": "footer.1.intro",
                "children": [
                    { "id": "footer.1.note", "ref": "#footer.1.intro" },
                    { "ref": "glossary" },
                    { "ref": "footer.1.note" }
                ]
            })
        );
    }

    #[test]
    fn test_find_placeholders_skips_spliced_content() {
        let document = json!({
            "children": [
                { "compose": "footer" },
                { "compose": "nav", "children": [ { "compose": "footer" } ] }
            ]
        });
        let footer = ItemUri::new("footer");

        let mut found = Vec::new();
        find_placeholders(&document, "", &footer, &HashSet::new(), &mut found);
        assert_eq!(found, vec!["/children/0", "/children/1/children/0"]);

        let spliced: HashSet<String> = ["/children/1/children/0".to_string()].into();
        let mut found = Vec::new();
        find_placeholders(&document, "", &footer, &spliced, &mut found);
        assert_eq!(found, vec!["/children/0"]);
    }

    #[test]
    fn test_escape_pointer_tokens() {
        assert_eq!(escape("a/b~c"), "a~1b~0c");
    }
}
