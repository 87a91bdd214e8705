use std::collections::HashMap;

use serde::Serialize;

use super::{Document, NodeKey};

/// Heading level that opens a section.
pub const SECTION_LEVEL: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub index: usize,
    pub title: String,
    /// Key of the heading that opens the section.
    pub start: NodeKey,
    /// Key of the heading that opens the next section, if any.
    pub end: Option<NodeKey>,
}

/// Ordered level-1 heading sections of `doc`. Headings are collected at any
/// depth, in document order.
pub fn index_sections(doc: &Document) -> Vec<Section> {
    let headings: Vec<(NodeKey, String)> = doc
        .walk()
        .filter(|(node, _)| node.heading_level() == Some(SECTION_LEVEL))
        .map(|(node, _)| (node.key.clone(), node.text_content().trim().to_string()))
        .collect();

    let next_starts: Vec<Option<NodeKey>> = headings
        .iter()
        .skip(1)
        .map(|(key, _)| Some(key.clone()))
        .chain(std::iter::once(None))
        .collect();

    headings
        .into_iter()
        .zip(next_starts)
        .enumerate()
        .map(|(index, ((start, title), end))| Section {
            index,
            title: if title.is_empty() {
                format!("Section {}", index + 1)
            } else {
                title
            },
            start,
            end,
        })
        .collect()
}

/// Maps every node that follows a level-1 heading (the heading included) to
/// that heading's section index. Nodes before the first heading are absent.
pub fn section_membership(doc: &Document) -> HashMap<NodeKey, usize> {
    let mut membership = HashMap::new();
    let mut current: Option<usize> = None;
    for (node, _) in doc.walk() {
        if node.heading_level() == Some(SECTION_LEVEL) {
            current = Some(current.map_or(0, |i| i + 1));
        }
        if let Some(index) = current {
            membership.insert(node.key.clone(), index);
        }
    }
    membership
}

/// Sections cached per document revision.
#[derive(Debug, Default)]
pub struct SectionCache {
    revision: Option<u64>,
    sections: Vec<Section>,
}

impl SectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, doc: &Document) -> &[Section] {
        if self.revision != Some(doc.revision()) {
            self.sections = index_sections(doc);
            self.revision = Some(doc.revision());
        }
        &self.sections
    }
}
