use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ImportError;

/// A parsed XML element with its attributes, text and children
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    /// The name/tag of this element
    pub name: String,
    /// Map of attribute names to values
    pub attributes: HashMap<String, String>,
    /// Text content of this node (concatenated text and CDATA runs)
    pub text_content: String,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child with the given tag name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|n| n.name == name)
    }

    /// All direct children with the given tag name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |n| n.name == name)
    }

    /// All descendants (depth-first, document order) with the given tag name
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        fn walk<'a>(node: &'a XmlNode, name: &str, out: &mut Vec<&'a XmlNode>) {
            for child in &node.children {
                if child.name == name {
                    out.push(child);
                }
                walk(child, name, out);
            }
        }

        let mut found = Vec::new();
        walk(self, name, &mut found);
        found
    }
}

/// Lookup table from `id` attribute to element, used to resolve `#id` URIs
pub struct XmlIndex<'a> {
    by_id: HashMap<&'a str, &'a XmlNode>,
}

impl<'a> XmlIndex<'a> {
    pub fn build(root: &'a XmlNode) -> Self {
        fn walk<'a>(node: &'a XmlNode, by_id: &mut HashMap<&'a str, &'a XmlNode>) {
            if let Some(id) = node.attributes.get("id") {
                // first definition wins, like getElementById
                by_id.entry(id.as_str()).or_insert(node);
            }
            for child in &node.children {
                walk(child, by_id);
            }
        }

        let mut by_id = HashMap::new();
        walk(root, &mut by_id);
        XmlIndex { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a XmlNode> {
        self.by_id.get(id).copied()
    }

    /// Resolve a local URI fragment such as `#mesh-positions`
    pub fn resolve(&self, uri: &str) -> Option<&'a XmlNode> {
        self.get(uri.strip_prefix('#').unwrap_or(uri))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Parses an XML file from disk and returns the root node
///
/// # Example
/// ```ignore
/// let root = parse_xml_file("tests/fixtures/cube.dae")?;
/// println!("Root element: {}", root.name);
/// ```
pub fn parse_xml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<XmlNode> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    // Buffered reads matter for large meshes with long numeric arrays
    let reader = Reader::from_reader(BufReader::new(file));
    parse_document(reader)
}

/// Parses an XML document held in memory
pub fn parse_xml_str(xml: &str) -> anyhow::Result<XmlNode> {
    parse_document(Reader::from_reader(xml.as_bytes()))
}

fn parse_document<R: BufRead>(mut reader: Reader<R>) -> anyhow::Result<XmlNode> {
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        let maybe_root = match event {
            Event::Start(start) => Some((start.into_owned(), false)),
            Event::Empty(start) => Some((start.into_owned(), true)),
            Event::Eof => {
                anyhow::bail!("XML document is empty");
            }
            _ => None,
        };

        if let Some((start, self_closing)) = maybe_root {
            let mut node_buf = Vec::new();
            return parse_node(&mut reader, &mut node_buf, start, self_closing);
        }
    }
}

fn parse_node<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    start: BytesStart<'static>,
    self_closing: bool,
) -> anyhow::Result<XmlNode> {
    let element_name_bytes = start.name().as_ref().to_vec();
    let element_name = String::from_utf8_lossy(&element_name_bytes).to_string();
    let attributes = collect_attributes(start.attributes())?;

    let mut node = XmlNode {
        name: element_name,
        attributes,
        text_content: String::new(),
        children: Vec::new(),
    };

    if self_closing {
        return Ok(node);
    }

    loop {
        buf.clear();
        let event = reader.read_event_into(buf).map_err(xml_error)?;
        match event {
            Event::Start(child_start) => {
                let mut child_buf = Vec::new();
                let child = parse_node(reader, &mut child_buf, child_start.into_owned(), false)?;
                node.children.push(child);
            }
            Event::Empty(child_start) => {
                let mut child_buf = Vec::new();
                let child = parse_node(reader, &mut child_buf, child_start.into_owned(), true)?;
                node.children.push(child);
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(xml_error)?;
                if !value.trim().is_empty() {
                    append_text(&mut node.text_content, &value);
                }
            }
            Event::CData(text) => {
                let value = String::from_utf8_lossy(text.as_ref()).to_string();
                if !value.trim().is_empty() {
                    append_text(&mut node.text_content, &value);
                }
            }
            Event::End(end) => {
                if end.name().as_ref() != element_name_bytes.as_slice() {
                    return Err(xml_error(format!(
                        "unexpected closing tag '</{}>' while parsing '<{}>'",
                        String::from_utf8_lossy(end.name().as_ref()),
                        node.name
                    ))
                    .into());
                }
                return Ok(node);
            }
            Event::Eof => {
                return Err(xml_error(format!("unexpected end of file while parsing element '{}'", node.name)).into());
            }
            _ => {}
        }
    }
}

fn xml_error(error: impl std::fmt::Display) -> ImportError {
    ImportError::Xml(error.to_string())
}

// Trimmed text runs (split by comments or CDATA) must not glue numeric tokens together
fn append_text(content: &mut String, value: &str) {
    if !content.is_empty() {
        content.push(' ');
    }
    content.push_str(value);
}

fn collect_attributes(attributes: Attributes<'_>) -> anyhow::Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in attributes {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(xml_error)?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}
