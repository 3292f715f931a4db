//! XML tree with byte ranges, built from `quick-xml` events.

use quick_xml::Reader;
use quick_xml::events::Event;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{range, size};

/// Index of an element in an [`XmlDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Category of XML error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlErrorKind {
    /// Input ended inside a tag or with elements still open
    UnexpectedEof,
    /// An end tag closed an element other than the innermost open one
    MismatchedEndTag,
    /// An end tag with no open element of that name
    UnmatchedEndTag,
    /// Attribute without `=`, without quotes, or with an unterminated value
    MalformedAttribute,
    /// More than one top-level element
    MultipleRoots,
    /// Any other tokenizer error
    Syntax,
}

/// An XML error with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    pub kind: XmlErrorKind,
    pub range: TextRange,
    pub message: String,
}

impl XmlError {
    fn new(kind: XmlErrorKind, range: TextRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
        }
    }
}

/// An attribute with the ranges of its name and (unquoted) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XAttribute {
    pub name: SmolStr,
    pub name_range: TextRange,
    /// Raw value text between the quotes, entities not expanded
    pub value: Option<String>,
    pub value_range: Option<TextRange>,
    pub range: TextRange,
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XElement {
    pub name: SmolStr,
    pub name_range: TextRange,
    /// From `<` of the start tag to `>` of the end tag (or wherever it was cut off)
    pub range: TextRange,
    pub start_tag_range: TextRange,
    pub end_name_range: Option<TextRange>,
    pub attributes: Vec<XAttribute>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Range of the text content, only set when the element has no child elements
    pub value_range: Option<TextRange>,
    pub is_self_closing: bool,
    /// False when closed implicitly by end of input or a mismatched end tag
    pub is_complete: bool,
}

impl XElement {
    pub fn attribute(&self, name: &str) -> Option<&XAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|a| a.value.as_deref())
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true if `offset` is on the start or end tag name.
    pub fn name_touches(&self, offset: TextSize) -> bool {
        crate::base::touches(self.name_range, offset)
            || self
                .end_name_range
                .is_some_and(|r| crate::base::touches(r, offset))
    }
}

/// Parsed XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    nodes: Vec<XElement>,
    root: Option<NodeId>,
    errors: Vec<XmlError>,
}

impl XmlDocument {
    /// The document element, if any element was seen.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn element(&self, id: NodeId) -> &XElement {
        &self.nodes[id.index()]
    }

    pub fn errors(&self) -> &[XmlError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &XElement)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, e)| (NodeId(i as u32), e))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &XElement)> {
        self.element(id)
            .children
            .iter()
            .map(move |&c| (c, self.element(c)))
    }

    /// Child elements with the given name (case-insensitive).
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = (NodeId, &'a XElement)> + 'a {
        self.children(id).filter(move |(_, e)| e.is_named(name))
    }

    /// Element text content, if the element holds only text.
    pub fn value<'t>(&self, text: &'t str, id: NodeId) -> Option<&'t str> {
        let r = self.element(id).value_range?;
        text.get(usize::from(r.start())..usize::from(r.end()))
    }

    /// Path of elements from the root down to the innermost element containing `offset`.
    ///
    /// An offset at the very end of an element's range still counts as inside
    /// it when the element is incomplete (the user is typing at its end).
    pub fn spine(&self, offset: TextSize) -> Vec<NodeId> {
        let mut path = Vec::new();
        let Some(root) = self.root else {
            return path;
        };
        if !self.contains(root, offset) {
            return path;
        }
        path.push(root);
        let mut current = root;
        'descend: loop {
            for &child in &self.element(current).children {
                if self.contains(child, offset) {
                    path.push(child);
                    current = child;
                    continue 'descend;
                }
            }
            break;
        }
        path
    }

    fn contains(&self, id: NodeId, offset: TextSize) -> bool {
        let element = self.element(id);
        if element.is_complete {
            element.range.contains(offset)
        } else {
            crate::base::touches(element.range, offset)
        }
    }
}

/// Parse XML text into a tree. Never fails; see [`XmlDocument::errors`].
pub fn parse_xml(text: &str) -> XmlDocument {
    let mut reader = Reader::from_str(text);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;
        config.trim_text(false);
    }

    let mut builder = TreeBuilder::new(text);
    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                let end = reader.buffer_position() as usize;
                builder.start_element(start, end, false);
            }
            Ok(Event::Empty(_)) => {
                let end = reader.buffer_position() as usize;
                builder.start_element(start, end, true);
            }
            Ok(Event::End(_)) => {
                let end = reader.buffer_position() as usize;
                builder.end_element(start, end);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let position = (reader.error_position() as usize).min(text.len());
                builder.tokenizer_error(start, position, &err.to_string());
                break;
            }
        }
    }
    builder.finish()
}

struct TreeBuilder<'t> {
    text: &'t str,
    nodes: Vec<XElement>,
    open: Vec<NodeId>,
    root: Option<NodeId>,
    errors: Vec<XmlError>,
}

impl<'t> TreeBuilder<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            nodes: Vec::new(),
            open: Vec::new(),
            root: None,
            errors: Vec::new(),
        }
    }

    fn start_element(&mut self, start: usize, end: usize, self_closing: bool) {
        // `<` + name ... (`/>` | `>`)
        let content_end = if self_closing {
            end.saturating_sub(2)
        } else {
            end.saturating_sub(1)
        };
        let id = self.push_element(start, content_end, end, self_closing, true);
        if !self_closing {
            self.open.push(id);
        }
    }

    fn push_element(
        &mut self,
        start: usize,
        content_end: usize,
        tag_end: usize,
        self_closing: bool,
        complete: bool,
    ) -> NodeId {
        let scan = scan_tag(self.text, start, content_end);
        self.errors.extend(scan.errors);
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.open.last().copied();
        self.nodes.push(XElement {
            name: SmolStr::new(&self.text[scan.name_range_usize.0..scan.name_range_usize.1]),
            name_range: range(scan.name_range_usize.0, scan.name_range_usize.1),
            range: range(start, tag_end),
            start_tag_range: range(start, tag_end),
            end_name_range: None,
            attributes: scan.attributes,
            children: Vec::new(),
            parent,
            value_range: None,
            is_self_closing: self_closing,
            is_complete: complete,
        });
        match parent {
            Some(p) => self.nodes[p.index()].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                } else {
                    self.errors.push(XmlError::new(
                        XmlErrorKind::MultipleRoots,
                        range(start, tag_end),
                        "Document has more than one root element",
                    ));
                }
            }
        }
        id
    }

    fn end_element(&mut self, start: usize, end: usize) {
        // `</` name ws* `>`
        let name_start = (start + 2).min(end);
        let mut name_end = name_start;
        let bytes = self.text.as_bytes();
        while name_end < end && is_name_byte(bytes[name_end]) {
            name_end += 1;
        }
        let name = &self.text[name_start..name_end];
        let Some(depth) = self
            .open
            .iter()
            .rposition(|&id| self.nodes[id.index()].name.as_str() == name)
        else {
            self.errors.push(XmlError::new(
                XmlErrorKind::UnmatchedEndTag,
                range(start, end),
                format!("Unexpected end tag '{name}'"),
            ));
            return;
        };

        // Anything opened after the matching element was never closed.
        while self.open.len() > depth + 1 {
            if let Some(unclosed) = self.open.pop() {
                let element = &self.nodes[unclosed.index()];
                self.errors.push(XmlError::new(
                    XmlErrorKind::MismatchedEndTag,
                    element.name_range,
                    format!("Element '{}' is not closed", element.name),
                ));
                self.close(unclosed, start, None, false);
            }
        }
        if let Some(id) = self.open.pop() {
            self.close(id, end, Some(range(name_start, name_end)), true);
            let element = &mut self.nodes[id.index()];
            if element.children.is_empty() {
                let content_start = element.start_tag_range.end();
                element.value_range = Some(TextRange::new(content_start, size(start).max(content_start)));
            }
        }
    }

    fn close(&mut self, id: NodeId, end: usize, end_name: Option<TextRange>, complete: bool) {
        let element = &mut self.nodes[id.index()];
        element.range = TextRange::new(element.range.start(), size(end).max(element.range.start()));
        element.end_name_range = end_name;
        element.is_complete = complete;
        if !complete && element.children.is_empty() {
            let content_start = element.start_tag_range.end();
            element.value_range = Some(TextRange::new(content_start, size(end).max(content_start)));
        }
    }

    fn tokenizer_error(&mut self, start: usize, position: usize, message: &str) {
        let rest = &self.text[start.min(self.text.len())..];
        let salvage = rest.starts_with('<')
            && rest[1..].bytes().next().is_some_and(is_name_start_byte);
        if salvage {
            // A tag cut off by end of input: keep it so the name and
            // attributes typed so far are still visible.
            self.errors.push(XmlError::new(
                XmlErrorKind::UnexpectedEof,
                range(start, self.text.len()),
                "Unexpected end of file in tag",
            ));
            let len = self.text.len();
            let id = self.push_element(start, len, len, false, false);
            self.open.push(id);
        } else {
            self.errors.push(XmlError::new(
                XmlErrorKind::Syntax,
                range(position, position),
                message.to_string(),
            ));
        }
    }

    fn finish(mut self) -> XmlDocument {
        let len = self.text.len();
        while let Some(id) = self.open.pop() {
            let element = &self.nodes[id.index()];
            if element.is_complete {
                self.errors.push(XmlError::new(
                    XmlErrorKind::UnexpectedEof,
                    element.name_range,
                    format!("Element '{}' is not closed", element.name),
                ));
            }
            self.close(id, len, None, false);
        }
        XmlDocument {
            nodes: self.nodes,
            root: self.root,
            errors: self.errors,
        }
    }
}

struct TagScan {
    name_range_usize: (usize, usize),
    attributes: Vec<XAttribute>,
    errors: Vec<XmlError>,
}

fn is_name_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

fn is_name_byte(b: u8) -> bool {
    is_name_start_byte(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

/// Scan `<name attr="value" ...` between `start` (the `<`) and `end`
/// (exclusive, before `>` or `/>`).
fn scan_tag(text: &str, start: usize, end: usize) -> TagScan {
    let bytes = text.as_bytes();
    let end = end.min(bytes.len());
    let mut i = (start + 1).min(end);
    let name_start = i;
    while i < end && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name_range_usize = (name_start, i);
    let mut attributes = Vec::new();
    let mut errors = Vec::new();

    loop {
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= end {
            break;
        }
        if !is_name_start_byte(bytes[i]) {
            // stray character, e.g. a lone `/` in the middle of a tag
            i += 1;
            continue;
        }
        let attr_start = i;
        while i < end && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = SmolStr::new(&text[attr_start..i]);
        let name_range = range(attr_start, i);
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= end || bytes[i] != b'=' {
            errors.push(XmlError::new(
                XmlErrorKind::MalformedAttribute,
                name_range,
                format!("Attribute '{name}' has no value"),
            ));
            attributes.push(XAttribute {
                name,
                name_range,
                value: None,
                value_range: None,
                range: name_range,
            });
            continue;
        }
        i += 1;
        while i < end && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let (value_start, value_end, closed) = if i < end && (bytes[i] == b'"' || bytes[i] == b'\'') {
            let quote = bytes[i];
            let value_start = i + 1;
            let mut j = value_start;
            while j < end && bytes[j] != quote {
                j += 1;
            }
            let closed = j < end;
            i = if closed { j + 1 } else { j };
            (value_start, j, closed)
        } else {
            let value_start = i;
            while i < end && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            (value_start, i, false)
        };
        if !closed {
            errors.push(XmlError::new(
                XmlErrorKind::MalformedAttribute,
                range(attr_start, value_end),
                format!("Value of attribute '{name}' is not quoted or not terminated"),
            ));
        }
        attributes.push(XAttribute {
            name,
            name_range,
            value: Some(text[value_start..value_end].to_string()),
            value_range: Some(range(value_start, value_end)),
            range: range(attr_start, i),
        });
    }

    TagScan {
        name_range_usize,
        attributes,
        errors,
    }
}
