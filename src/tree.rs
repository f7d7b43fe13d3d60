//! Structured document tree and the HTML schema seam.
//!
//! The tree is the transient hand-off between the rendered HTML and the CRDT
//! seeding step. [`DocumentSchema`] is the capability trait for the rich-text
//! schema collaborator; [`HtmlSchema`] is the default best-effort reader for
//! the HTML the default renderer produces.

/// Root of a structured document: an ordered list of block nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocTree {
    pub children: Vec<DocNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    Element {
        kind: NodeKind,
        children: Vec<DocNode>,
    },
    Text {
        text: String,
        marks: Vec<Mark>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList { start: u64 },
    ListItem,
    Blockquote,
    Preformatted,
    HardBreak,
}

/// Inline formatting applied to a text node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Link { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
}

/// Turns HTML into a structured document tree.
pub trait DocumentSchema {
    fn parse_html(&self, html: &str) -> Result<DocTree, SchemaError>;
}

/// Default schema: a small reader for renderer-produced HTML.
///
/// Handles the block and inline tags the default renderer emits. Unknown
/// tags are skipped while their text content is kept; mismatched closing
/// tags are ignored. Only structurally unreadable input (a tag or comment
/// that never terminates) is an error.
#[derive(Debug, Default)]
pub struct HtmlSchema;

impl DocumentSchema for HtmlSchema {
    fn parse_html(&self, html: &str) -> Result<DocTree, SchemaError> {
        Reader::new(html).read()
    }
}

struct OpenElement {
    kind: NodeKind,
    children: Vec<DocNode>,
}

struct Reader<'a> {
    html: &'a str,
    root: Vec<DocNode>,
    stack: Vec<OpenElement>,
    marks: Vec<Mark>,
    pre_depth: usize,
}

impl<'a> Reader<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            html,
            root: Vec::new(),
            stack: Vec::new(),
            marks: Vec::new(),
            pre_depth: 0,
        }
    }

    fn read(mut self) -> Result<DocTree, SchemaError> {
        let html = self.html;
        let mut pos = 0;
        while pos < html.len() {
            let Some(angle) = html[pos..].find('<') else {
                self.text(&html[pos..]);
                break;
            };
            if angle > 0 {
                self.text(&html[pos..pos + angle]);
            }
            pos += angle;

            if html[pos..].starts_with("<!--") {
                let Some(end) = html[pos..].find("-->") else {
                    return Err(SchemaError::UnterminatedComment(pos));
                };
                pos += end + "-->".len();
                continue;
            }

            let Some(close) = html[pos..].find('>') else {
                return Err(SchemaError::UnterminatedTag(pos));
            };
            let body = &html[pos + 1..pos + close];
            pos += close + 1;
            self.tag(body);
        }

        // Auto-close anything left open.
        while let Some(open) = self.stack.pop() {
            self.attach_element(open);
        }
        Ok(DocTree {
            children: self.root,
        })
    }

    fn tag(&mut self, body: &str) {
        if let Some(rest) = body.strip_prefix('/') {
            self.close_tag(tag_name(rest));
        } else {
            self.open_tag(tag_name(body), body);
        }
    }

    fn open_tag(&mut self, name: &str, body: &str) {
        if self.pre_depth > 0 {
            // Inside preformatted content only a nested <pre> matters.
            if name == "pre" {
                self.pre_depth += 1;
            }
            return;
        }
        match name {
            "p" => self.push_element(NodeKind::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.push_element(NodeKind::Heading { level });
            }
            "ul" => self.push_element(NodeKind::BulletList),
            "ol" => {
                let start = attr_value(body, "start")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(1);
                self.push_element(NodeKind::OrderedList { start });
            }
            "li" => self.push_element(NodeKind::ListItem),
            "blockquote" => self.push_element(NodeKind::Blockquote),
            "pre" => {
                self.push_element(NodeKind::Preformatted);
                self.pre_depth = 1;
            }
            "em" | "i" => self.marks.push(Mark::Italic),
            "strong" | "b" => self.marks.push(Mark::Bold),
            "code" => self.marks.push(Mark::Code),
            "a" => self.marks.push(Mark::Link {
                href: attr_value(body, "href").unwrap_or_default(),
            }),
            "br" => self.attach(DocNode::Element {
                kind: NodeKind::HardBreak,
                children: Vec::new(),
            }),
            _ => {
                tracing::debug!(tag = name, "skipping unknown html tag");
            }
        }
    }

    fn close_tag(&mut self, name: &str) {
        if self.pre_depth > 0 {
            if name == "pre" {
                self.pre_depth -= 1;
                if self.pre_depth == 0
                    && let Some(open) = self.stack.pop()
                {
                    self.attach_element(open);
                }
            }
            return;
        }
        match name {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "li" | "blockquote" => {
                self.close_block(name)
            }
            "em" | "i" => self.remove_mark(|mark| matches!(mark, Mark::Italic)),
            "strong" | "b" => self.remove_mark(|mark| matches!(mark, Mark::Bold)),
            "code" => self.remove_mark(|mark| matches!(mark, Mark::Code)),
            "a" => self.remove_mark(|mark| matches!(mark, Mark::Link { .. })),
            _ => {}
        }
    }

    fn close_block(&mut self, name: &str) {
        let Some(depth) = self
            .stack
            .iter()
            .rposition(|open| kind_matches(&open.kind, name))
        else {
            tracing::debug!(tag = name, "ignoring mismatched closing tag");
            return;
        };
        // Auto-close anything the matching element still has open.
        while self.stack.len() > depth {
            let open = self
                .stack
                .pop()
                .expect("stack is non-empty while deeper than the match");
            self.attach_element(open);
        }
    }

    fn push_element(&mut self, kind: NodeKind) {
        self.stack.push(OpenElement {
            kind,
            children: Vec::new(),
        });
    }

    fn attach_element(&mut self, open: OpenElement) {
        self.attach(DocNode::Element {
            kind: open.kind,
            children: open.children,
        });
    }

    fn attach(&mut self, node: DocNode) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    fn text(&mut self, raw: &str) {
        let decoded = html_escape::decode_html_entities(raw).into_owned();
        if self.pre_depth > 0 {
            self.attach(DocNode::Text {
                text: decoded,
                marks: Vec::new(),
            });
            return;
        }
        if decoded.trim().is_empty() && !self.keeps_whitespace(&decoded) {
            return;
        }
        let marks = self.marks.clone();
        self.attach(DocNode::Text {
            text: decoded,
            marks,
        });
    }

    /// Whether whitespace-only text at the current position is content.
    ///
    /// Inside a paragraph or heading every whitespace run separates inline
    /// siblings, so it is kept. Between block tags (at the root or inside a
    /// list/blockquote container) whitespace is layout. List items hold
    /// either inline content or nested blocks; there, spacing without a
    /// newline is inline content and newline runs are block layout.
    fn keeps_whitespace(&self, text: &str) -> bool {
        match self.stack.last().map(|open| &open.kind) {
            Some(NodeKind::Paragraph | NodeKind::Heading { .. }) => true,
            Some(NodeKind::ListItem) => !text.contains('\n'),
            _ => false,
        }
    }

    fn remove_mark(&mut self, is_match: impl Fn(&Mark) -> bool) {
        if let Some(index) = self.marks.iter().rposition(is_match) {
            self.marks.remove(index);
        }
    }
}

/// Leading tag name, ASCII-lowercase by construction in renderer output.
/// Attribute text and self-closing slashes are not part of the name.
fn tag_name(body: &str) -> &str {
    let end = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    &body[..end]
}

fn kind_matches(kind: &NodeKind, name: &str) -> bool {
    match kind {
        NodeKind::Paragraph => name == "p",
        NodeKind::Heading { level } => {
            name.len() == 2 && name.as_bytes()[0] == b'h' && name.as_bytes()[1] == b'0' + level
        }
        NodeKind::BulletList => name == "ul",
        NodeKind::OrderedList { .. } => name == "ol",
        NodeKind::ListItem => name == "li",
        NodeKind::Blockquote => name == "blockquote",
        NodeKind::Preformatted => name == "pre",
        NodeKind::HardBreak => false,
    }
}

/// Minimal double-quoted attribute lookup, entity-decoded.
fn attr_value(body: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = body.find(&needle)? + needle.len();
    let len = body[start..].find('"')?;
    Some(html_escape::decode_html_entities(&body[start..start + len]).into_owned())
}
