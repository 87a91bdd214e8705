use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{section_membership, Document, NodeKey, Section};

use super::{ElementId, RenderedDocument};

pub const SECTION_ATTR: &str = "data-study-section";
pub const HIDDEN_CLASS: &str = "study-hidden";
pub const STYLESHEET_ID: &str = "guided-study-visibility";

const HIDDEN_CSS: &str = ".study-hidden { display: none !important; }";

/// How decorator elements find the section they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorAssociation {
    /// Ask the document which section contains the node.
    #[default]
    Containment,
    /// Nearest tagged ancestor, else the last section heading rendered
    /// before the decorator.
    Positional,
}

/// Applies the visible section to a rendered document. Every pass clears
/// what it owns before applying, so repeating a pass changes nothing.
#[derive(Debug, Default)]
pub struct VisibilityProjector {
    association: DecoratorAssociation,
    containment: Option<(u64, HashMap<NodeKey, usize>)>,
}

impl VisibilityProjector {
    pub fn new(association: DecoratorAssociation) -> Self {
        Self {
            association,
            containment: None,
        }
    }

    fn membership(&mut self, doc: &Document) -> &HashMap<NodeKey, usize> {
        if matches!(&self.containment, Some((rev, _)) if *rev != doc.revision()) {
            self.containment = None;
        }
        &self
            .containment
            .get_or_insert_with(|| {
                debug!(revision = doc.revision(), "Computing section containment");
                (doc.revision(), section_membership(doc))
            })
            .1
    }

    /// Both passes at once.
    pub fn project(
        &mut self,
        rendered: &mut RenderedDocument,
        doc: &Document,
        sections: &[Section],
        visible: Option<usize>,
    ) {
        self.project_structure(rendered, doc, visible);
        self.project_decorators(rendered, doc, sections, visible);
    }

    /// Tag and hide structural elements. An element stays visible when it
    /// belongs to the visible section or contains something that does.
    pub fn project_structure(
        &mut self,
        rendered: &mut RenderedDocument,
        doc: &Document,
        visible: Option<usize>,
    ) {
        clear(rendered, false);
        let Some(section) = visible else {
            rendered.remove_stylesheet(STYLESHEET_ID);
            return;
        };

        let membership = self.membership(doc);
        let mut keep: HashSet<ElementId> = HashSet::new();
        for element in rendered.elements().iter().filter(|e| !e.decorator) {
            if membership.get(&element.node_key) == Some(&section) {
                keep.insert(element.id);
                keep.extend(rendered.ancestors(element.id).map(|a| a.id));
            }
        }
        // the editor root is never hidden
        keep.insert(ElementId(0));

        let mut hidden = 0;
        for element in rendered.elements_mut().iter_mut().filter(|e| !e.decorator) {
            if let Some(index) = membership.get(&element.node_key) {
                element
                    .attributes
                    .insert(SECTION_ATTR.to_string(), index.to_string());
            }
            if !keep.contains(&element.id) {
                hide(element);
                hidden += 1;
            }
        }
        rendered.inject_stylesheet(STYLESHEET_ID, HIDDEN_CSS);
        debug!(section, hidden, "Structure projected");
    }

    /// Associate decorators with sections and hide those outside the
    /// visible one. Runs once decorators have mounted.
    pub fn project_decorators(
        &mut self,
        rendered: &mut RenderedDocument,
        doc: &Document,
        sections: &[Section],
        visible: Option<usize>,
    ) {
        clear(rendered, true);
        let Some(section) = visible else {
            return;
        };

        let owners: Vec<(ElementId, Option<usize>)> = match self.association {
            DecoratorAssociation::Containment => {
                let membership = self.membership(doc);
                rendered
                    .elements()
                    .iter()
                    .filter(|e| e.decorator)
                    .map(|e| (e.id, membership.get(&e.node_key).copied()))
                    .collect()
            }
            DecoratorAssociation::Positional => rendered
                .elements()
                .iter()
                .filter(|e| e.decorator)
                .map(|e| (e.id, positional_owner(rendered, sections, e.id)))
                .collect(),
        };

        let mut hidden = 0;
        for (id, owner) in owners {
            let element = &mut rendered.elements_mut()[id.0];
            if let Some(index) = owner {
                element
                    .attributes
                    .insert(SECTION_ATTR.to_string(), index.to_string());
            }
            if owner != Some(section) {
                hide(element);
                hidden += 1;
            }
        }
        debug!(section, hidden, association = ?self.association, "Decorators projected");
    }

    /// Remove every tag, class and the stylesheet.
    pub fn clear(&self, rendered: &mut RenderedDocument) {
        clear(rendered, false);
        clear(rendered, true);
        rendered.remove_stylesheet(STYLESHEET_ID);
    }
}

fn positional_owner(
    rendered: &RenderedDocument,
    sections: &[Section],
    id: ElementId,
) -> Option<usize> {
    let tagged = rendered
        .ancestors(id)
        .find_map(|a| a.attributes.get(SECTION_ATTR))
        .and_then(|v| v.parse::<usize>().ok());
    if tagged.is_some() {
        return tagged;
    }
    let position = rendered.element(id)?.position;
    sections
        .iter()
        .filter_map(|s| rendered.find(&s.start).map(|e| (s.index, e.position)))
        .filter(|(_, start)| *start <= position)
        .map(|(index, _)| index)
        .last()
}

fn hide(element: &mut super::Element) {
    element.classes.insert(HIDDEN_CLASS.to_string());
    element.hidden = true;
}

fn clear(rendered: &mut RenderedDocument, decorators: bool) {
    for element in rendered
        .elements_mut()
        .iter_mut()
        .filter(|e| e.decorator == decorators)
    {
        element.attributes.remove(SECTION_ATTR);
        element.classes.remove(HIDDEN_CLASS);
        element.hidden = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::index_sections;

    fn doc() -> Document {
        Document::builder("Doc")
            .paragraph("preamble")
            .heading(1, "One")
            .paragraph("first body")
            .video("https://example.com/one")
            .heading(1, "Two")
            .paragraph("second body")
            .image("two.png", "diagram")
            .build()
    }

    fn visible_text(rendered: &RenderedDocument) -> Vec<String> {
        rendered
            .visible_elements()
            .filter(|e| !e.text.is_empty())
            .map(|e| e.text.clone())
            .collect()
    }

    fn visible_decorators(rendered: &RenderedDocument) -> Vec<&'static str> {
        rendered
            .visible_elements()
            .filter(|e| e.decorator)
            .map(|e| e.tag)
            .collect()
    }

    fn projected(association: DecoratorAssociation, visible: Option<usize>) -> RenderedDocument {
        let doc = doc();
        let sections = index_sections(&doc);
        let mut rendered = RenderedDocument::render(&doc);
        VisibilityProjector::new(association).project(&mut rendered, &doc, &sections, visible);
        rendered
    }

    #[test]
    fn only_visible_section_remains() {
        for association in [DecoratorAssociation::Containment, DecoratorAssociation::Positional] {
            let rendered = projected(association, Some(1));
            assert_eq!(visible_text(&rendered), vec!["Two", "second body"]);
            assert_eq!(visible_decorators(&rendered), vec!["img"]);
            assert_eq!(rendered.stylesheet(STYLESHEET_ID), Some(HIDDEN_CSS));
        }
    }

    #[test]
    fn preamble_is_hidden_during_study() {
        let rendered = projected(DecoratorAssociation::Containment, Some(0));
        assert_eq!(visible_text(&rendered), vec!["One", "first body"]);
        assert_eq!(visible_decorators(&rendered), vec!["iframe"]);
    }

    #[test]
    fn sections_are_tagged() {
        let rendered = projected(DecoratorAssociation::Containment, Some(0));
        let second = rendered.find(&NodeKey::from("10")).unwrap();
        assert_eq!(second.attributes[SECTION_ATTR], "1");
        assert!(second.classes.contains(HIDDEN_CLASS));
    }

    #[test]
    fn projecting_twice_changes_nothing() {
        let doc = doc();
        let sections = index_sections(&doc);
        let mut projector = VisibilityProjector::new(DecoratorAssociation::Positional);
        let mut rendered = RenderedDocument::render(&doc);
        projector.project(&mut rendered, &doc, &sections, Some(0));
        let once = rendered.clone();
        projector.project(&mut rendered, &doc, &sections, Some(0));
        assert_eq!(rendered, once);
    }

    #[test]
    fn switching_sections_leaves_no_residue() {
        let doc = doc();
        let sections = index_sections(&doc);
        let mut projector = VisibilityProjector::default();
        let mut rendered = RenderedDocument::render(&doc);
        projector.project(&mut rendered, &doc, &sections, Some(0));
        projector.project(&mut rendered, &doc, &sections, Some(1));

        let mut fresh = RenderedDocument::render(&doc);
        projector.project(&mut fresh, &doc, &sections, Some(1));
        assert_eq!(rendered, fresh);
    }

    #[test]
    fn disabling_reveals_everything() {
        let doc = doc();
        let sections = index_sections(&doc);
        let mut projector = VisibilityProjector::default();
        let mut rendered = RenderedDocument::render(&doc);
        projector.project(&mut rendered, &doc, &sections, Some(1));
        projector.project(&mut rendered, &doc, &sections, None);

        assert_eq!(rendered.visible_elements().count(), rendered.elements().len());
        assert!(rendered.elements().iter().all(|e| e.classes.is_empty()
            && !e.attributes.contains_key(SECTION_ATTR)));
        assert_eq!(rendered.stylesheet(STYLESHEET_ID), None);
        assert_eq!(rendered, RenderedDocument::render(&doc));
    }

    #[test]
    fn clear_matches_disabled_projection() {
        let doc = doc();
        let sections = index_sections(&doc);
        let mut projector = VisibilityProjector::default();
        let mut rendered = RenderedDocument::render(&doc);
        projector.project(&mut rendered, &doc, &sections, Some(0));
        projector.clear(&mut rendered);
        assert_eq!(rendered, RenderedDocument::render(&doc));
    }

    #[test]
    fn decorators_stay_visible_until_their_pass() {
        let doc = doc();
        let mut projector = VisibilityProjector::default();
        let mut rendered = RenderedDocument::render(&doc);
        projector.project_structure(&mut rendered, &doc, Some(0));
        assert_eq!(visible_decorators(&rendered), vec!["iframe", "img"]);
    }

    #[test]
    fn nested_section_keeps_its_container() {
        let state = serde_json::json!({"root": {"children": [
            {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "Top"}]},
            {"type": "table", "children": [
                {"type": "tablerow", "children": [
                    {"type": "tablecell", "children": [{"type": "text", "text": "top cell"}]},
                    {"type": "tablecell", "children": [
                        {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "Inner"}]}
                    ]}
                ]}
            ]},
            {"type": "paragraph", "children": [{"type": "text", "text": "after"}]}
        ]}});
        let doc = Document::from_lexical_value("T", &state).unwrap();
        let sections = index_sections(&doc);
        let mut rendered = RenderedDocument::render(&doc);
        VisibilityProjector::default().project(&mut rendered, &doc, &sections, Some(1));
        assert_eq!(visible_text(&rendered), vec!["Inner", "after"]);
    }

    #[test]
    fn positional_prefers_tagged_ancestor() {
        let state = serde_json::json!({"root": {"children": [
            {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "A"}]},
            {"type": "paragraph", "children": [{"type": "image", "src": "a.png"}]},
            {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "B"}]}
        ]}});
        let doc = Document::from_lexical_value("T", &state).unwrap();
        let sections = index_sections(&doc);
        let mut rendered = RenderedDocument::render(&doc);
        VisibilityProjector::new(DecoratorAssociation::Positional).project(
            &mut rendered,
            &doc,
            &sections,
            Some(0),
        );
        assert_eq!(visible_decorators(&rendered), vec!["img"]);
        let image = rendered.elements().iter().find(|e| e.decorator).unwrap();
        assert_eq!(image.attributes[SECTION_ATTR], "0");
    }

    #[test]
    fn page_break_follows_its_section() {
        let state = serde_json::json!({"root": {"children": [
            {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "A"}]},
            {"type": "paragraph", "children": [{"type": "text", "text": "end of A"}]},
            {"type": "page-break"},
            {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "B"}]},
            {"type": "paragraph", "children": [{"type": "text", "text": "body of B"}]}
        ]}});
        let doc = Document::from_lexical_value("T", &state).unwrap();
        let sections = index_sections(&doc);
        for association in [DecoratorAssociation::Containment, DecoratorAssociation::Positional] {
            let mut projector = VisibilityProjector::new(association);
            let mut rendered = RenderedDocument::render(&doc);

            projector.project(&mut rendered, &doc, &sections, Some(0));
            assert_eq!(visible_decorators(&rendered), vec!["figure"], "{:?}", association);

            projector.project(&mut rendered, &doc, &sections, Some(1));
            assert!(visible_decorators(&rendered).is_empty(), "{:?}", association);
            assert_eq!(visible_text(&rendered), vec!["B", "body of B"]);
            let figure = rendered.elements().iter().find(|e| e.tag == "figure").unwrap();
            assert!(figure.hidden);
            assert_eq!(figure.attributes[SECTION_ATTR], "0");
        }
    }
}
