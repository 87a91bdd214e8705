pub mod projector;

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Decorator, Document, Node, NodeKey, NodeKind};

pub use projector::{
    DecoratorAssociation, VisibilityProjector, HIDDEN_CLASS, SECTION_ATTR, STYLESHEET_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// One rendered block. Inline nodes do not get elements of their own; their
/// text is folded into the closest block.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ElementId,
    pub node_key: NodeKey,
    pub tag: &'static str,
    pub decorator: bool,
    pub parent: Option<ElementId>,
    /// Render order, shared by structural and decorator elements.
    pub position: usize,
    pub depth: usize,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
    pub hidden: bool,
}

/// Rendered output of one document revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    elements: Vec<Element>,
    stylesheets: BTreeMap<String, String>,
}

impl RenderedDocument {
    /// Lay out `doc`. The editor root becomes element 0. Decorators sitting
    /// directly under the root mount outside the tree and get no parent.
    pub fn render(doc: &Document) -> Self {
        let mut out = Self::default();
        let root = doc.root();
        let root_id = out.push(root, None, 0, "div", false);
        for child in &root.children {
            out.render_node(child, root_id, 0, true);
        }
        out
    }

    fn push(
        &mut self,
        node: &Node,
        parent: Option<ElementId>,
        depth: usize,
        tag: &'static str,
        decorator: bool,
    ) -> ElementId {
        let id = ElementId(self.elements.len());
        let mut attributes = BTreeMap::new();
        match &node.kind {
            NodeKind::Decorator(Decorator::Video { url }) => {
                attributes.insert("src".to_string(), url.clone());
            }
            NodeKind::Decorator(Decorator::Image { src, alt }) => {
                attributes.insert("src".to_string(), src.clone());
                attributes.insert("alt".to_string(), alt.clone());
            }
            _ => {}
        }
        self.elements.push(Element {
            id,
            node_key: node.key.clone(),
            tag,
            decorator,
            parent,
            position: id.0,
            depth,
            text: String::new(),
            attributes,
            classes: BTreeSet::new(),
            hidden: false,
        });
        id
    }

    fn render_node(&mut self, node: &Node, parent: ElementId, depth: usize, top_level: bool) {
        if node.kind.is_inline() {
            match node.kind {
                NodeKind::LineBreak => self.elements[parent.0].text.push('\n'),
                _ => self.elements[parent.0].text.push_str(&node.text),
            }
            for child in &node.children {
                self.render_node(child, parent, depth, false);
            }
            return;
        }

        let decorator = node.is_decorator();
        let element_parent = if decorator && top_level {
            None
        } else {
            Some(parent)
        };
        let id = self.push(node, element_parent, depth, tag_for(&node.kind), decorator);
        for child in &node.children {
            self.render_node(child, id, depth + 1, false);
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn find(&self, key: &NodeKey) -> Option<&Element> {
        self.elements.iter().find(|e| &e.node_key == key)
    }

    /// Parent chain of `id`, closest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = &Element> {
        let mut next = self.element(id).and_then(|e| e.parent);
        std::iter::from_fn(move || {
            let element = self.element(next?)?;
            next = element.parent;
            Some(element)
        })
    }

    /// Visible when neither the element nor any ancestor is hidden.
    pub fn is_visible(&self, id: ElementId) -> bool {
        match self.element(id) {
            Some(e) if !e.hidden => self.ancestors(id).all(|a| !a.hidden),
            _ => false,
        }
    }

    pub fn visible_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| self.is_visible(e.id))
    }

    pub fn visible_keys(&self) -> Vec<NodeKey> {
        self.visible_elements().map(|e| e.node_key.clone()).collect()
    }

    pub fn inject_stylesheet(&mut self, id: &str, css: &str) {
        self.stylesheets.insert(id.to_string(), css.to_string());
    }

    pub fn remove_stylesheet(&mut self, id: &str) -> bool {
        self.stylesheets.remove(id).is_some()
    }

    pub fn stylesheet(&self, id: &str) -> Option<&str> {
        self.stylesheets.get(id).map(String::as_str)
    }
}

fn tag_for(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Heading(1) => "h1",
        NodeKind::Heading(2) => "h2",
        NodeKind::Heading(3) => "h3",
        NodeKind::Heading(4) => "h4",
        NodeKind::Heading(5) => "h5",
        NodeKind::Heading(_) => "h6",
        NodeKind::Paragraph => "p",
        NodeKind::Quote => "blockquote",
        NodeKind::List => "ul",
        NodeKind::ListItem => "li",
        NodeKind::Table => "table",
        NodeKind::TableRow => "tr",
        NodeKind::TableCell => "td",
        NodeKind::Code => "pre",
        NodeKind::Decorator(Decorator::Video { .. }) => "iframe",
        NodeKind::Decorator(Decorator::HorizontalRule) => "hr",
        NodeKind::Decorator(Decorator::PageBreak) => "figure",
        NodeKind::Decorator(Decorator::Image { .. }) => "img",
        NodeKind::Text | NodeKind::Link => "span",
        NodeKind::LineBreak => "br",
        NodeKind::Root | NodeKind::Other(_) => "div",
    }
}
