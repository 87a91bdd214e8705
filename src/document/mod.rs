pub mod sections;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StudyError};

pub use sections::{index_sections, section_membership, Section, SectionCache};

/// Identifier of a node, unique within one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub String);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decorator {
    Video { url: String },
    HorizontalRule,
    PageBreak,
    Image { src: String, alt: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Heading(u8),
    Paragraph,
    Quote,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    Code,
    Text,
    LineBreak,
    Link,
    Decorator(Decorator),
    Other(String),
}

impl NodeKind {
    /// Inline nodes fold into their parent's rendered text.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Text | Self::LineBreak | Self::Link)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading(level) => Some(level),
            _ => None,
        }
    }

    pub fn is_decorator(&self) -> bool {
        matches!(self.kind, NodeKind::Decorator(_))
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::LineBreak => out.push('\n'),
        _ => out.push_str(&node.text),
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

/// Pre-order walk over a document, yielding `(node, depth)` pairs.
/// The root itself is not yielded; its children are at depth 0.
pub struct PreOrder<'a> {
    stack: Vec<(&'a Node, usize)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (&'a Node, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((node, depth))
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    root: Node,
    revision: u64,
}

impl Document {
    pub fn new(title: &str, children: Vec<Node>) -> Self {
        Self {
            title: title.to_string(),
            root: Node {
                key: NodeKey::from("root"),
                kind: NodeKind::Root,
                text: String::new(),
                children,
            },
            revision: 0,
        }
    }

    pub fn builder(title: &str) -> DocumentBuilder {
        DocumentBuilder {
            title: title.to_string(),
            children: Vec::new(),
            next_key: 1,
        }
    }

    /// Parse a Lexical serialized editor state (`{"root": {...}}`).
    pub fn from_lexical_json(title: &str, raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_lexical_value(title, &value)
    }

    pub fn from_lexical_value(title: &str, value: &Value) -> Result<Self> {
        let root = value
            .get("root")
            .ok_or_else(|| StudyError::Document("editor state has no root".into()))?;
        let mut next_key = 1;
        let children = root
            .get("children")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|child| parse_node(child, &mut next_key))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self::new(title, children))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.root.children.iter().rev().map(|n| (n, 0)).collect(),
        }
    }

    pub fn find(&self, key: &NodeKey) -> Option<&Node> {
        self.walk().map(|(n, _)| n).find(|n| &n.key == key)
    }

    /// Swap in freshly loaded content. Bumps the revision and returns true
    /// only when the tree actually differs.
    pub fn replace_content(&mut self, other: Document) -> bool {
        if other.root == self.root && other.title == self.title {
            return false;
        }
        self.title = other.title;
        self.root = other.root;
        self.revision += 1;
        true
    }
}

fn parse_node(val: &Value, next_key: &mut u64) -> Result<Node> {
    let key = NodeKey(next_key.to_string());
    *next_key += 1;

    let node_type = val.get("type").and_then(|v| v.as_str()).unwrap_or("");
    let str_field = |name: &str| {
        val.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let mut text = String::new();
    let kind = match node_type {
        "heading" => {
            let tag = str_field("tag");
            let level = tag
                .strip_prefix('h')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=6).contains(n))
                .ok_or_else(|| {
                    StudyError::Document(format!("heading has invalid tag '{}'", tag))
                })?;
            NodeKind::Heading(level)
        }
        "paragraph" => NodeKind::Paragraph,
        "quote" => NodeKind::Quote,
        "list" => NodeKind::List,
        "listitem" => NodeKind::ListItem,
        "table" => NodeKind::Table,
        "tablerow" => NodeKind::TableRow,
        "tablecell" => NodeKind::TableCell,
        "code" => NodeKind::Code,
        "text" | "code-highlight" => {
            text = str_field("text");
            NodeKind::Text
        }
        "tab" => {
            text = "\t".into();
            NodeKind::Text
        }
        "linebreak" => NodeKind::LineBreak,
        "link" | "autolink" => NodeKind::Link,
        "youtube" => NodeKind::Decorator(Decorator::Video {
            url: format!("https://www.youtube.com/watch?v={}", str_field("videoID")),
        }),
        "video" => NodeKind::Decorator(Decorator::Video {
            url: str_field("src"),
        }),
        "horizontalrule" => NodeKind::Decorator(Decorator::HorizontalRule),
        "page-break" => NodeKind::Decorator(Decorator::PageBreak),
        "image" => NodeKind::Decorator(Decorator::Image {
            src: str_field("src"),
            alt: str_field("altText"),
        }),
        other => NodeKind::Other(other.to_string()),
    };

    let children = val
        .get("children")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|child| parse_node(child, next_key))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(Node {
        key,
        kind,
        text,
        children,
    })
}

/// Builds documents in code. Keys are assigned in pre-order, the same way
/// the Lexical parser assigns them.
pub struct DocumentBuilder {
    title: String,
    children: Vec<Node>,
    next_key: u64,
}

impl DocumentBuilder {
    fn key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key.to_string());
        self.next_key += 1;
        key
    }

    fn text_block(&mut self, kind: NodeKind, text: &str) -> Node {
        let key = self.key();
        let children = if text.is_empty() {
            vec![]
        } else {
            vec![Node {
                key: self.key(),
                kind: NodeKind::Text,
                text: text.to_string(),
                children: vec![],
            }]
        };
        Node {
            key,
            kind,
            text: String::new(),
            children,
        }
    }

    pub fn heading(mut self, level: u8, text: &str) -> Self {
        let node = self.text_block(NodeKind::Heading(level), text);
        self.children.push(node);
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        let node = self.text_block(NodeKind::Paragraph, text);
        self.children.push(node);
        self
    }

    pub fn quote(mut self, text: &str) -> Self {
        let node = self.text_block(NodeKind::Quote, text);
        self.children.push(node);
        self
    }

    pub fn list(mut self, items: &[&str]) -> Self {
        let key = self.key();
        let children = items
            .iter()
            .map(|item| self.text_block(NodeKind::ListItem, item))
            .collect();
        self.children.push(Node {
            key,
            kind: NodeKind::List,
            text: String::new(),
            children,
        });
        self
    }

    pub fn decorator(mut self, decorator: Decorator) -> Self {
        let key = self.key();
        self.children.push(Node {
            key,
            kind: NodeKind::Decorator(decorator),
            text: String::new(),
            children: vec![],
        });
        self
    }

    pub fn video(self, url: &str) -> Self {
        self.decorator(Decorator::Video { url: url.into() })
    }

    pub fn horizontal_rule(self) -> Self {
        self.decorator(Decorator::HorizontalRule)
    }

    pub fn page_break(self) -> Self {
        self.decorator(Decorator::PageBreak)
    }

    pub fn image(self, src: &str, alt: &str) -> Self {
        self.decorator(Decorator::Image {
            src: src.into(),
            alt: alt.into(),
        })
    }

    pub fn build(self) -> Document {
        Document::new(&self.title, self.children)
    }
}
