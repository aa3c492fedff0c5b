//! Owned XML element tree for report fragments.
//!
//! Report documents are materialized into a mutable tree so preprocessors
//! can rewrite attributes, inject elements and fold classes in place before
//! the parser consumes the fragment. One document may contain several
//! fragments (concatenated runs); [`parse_fragments`] returns each top-level
//! occurrence of the requested root element separately.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Trimmed text content of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.children.iter_mut().filter(move |c| c.name == name)
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Removes and returns the direct children with the given name.
    pub fn take_children_named(&mut self, name: &str) -> Vec<XmlElement> {
        let (taken, kept) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.name == name);
        self.children = kept;
        taken
    }

    pub fn retain_children(&mut self, keep: impl FnMut(&XmlElement) -> bool) {
        self.children.retain(keep);
    }

    /// All descendants with the given name, in document order.
    pub fn descendants<'a>(&'a self, name: &'a str) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, name, &mut out);
        out
    }

    /// Applies `f` to every descendant with the given name.
    pub fn for_each_descendant_mut(&mut self, name: &str, f: &mut impl FnMut(&mut XmlElement)) {
        for child in &mut self.children {
            if child.name == name {
                f(child);
            }
            child.for_each_descendant_mut(name, f);
        }
    }
}

fn collect_descendants<'a>(element: &'a XmlElement, name: &str, out: &mut Vec<&'a XmlElement>) {
    for child in &element.children {
        if child.name == name {
            out.push(child);
        }
        collect_descendants(child, name, out);
    }
}

/// Materializes every top-level occurrence of `root` in the document.
///
/// A `root` element nested inside an already-captured fragment stays a
/// child; only outermost occurrences start new fragments.
pub fn parse_fragments(content: &str, root: &str) -> Result<Vec<XmlElement>> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut fragments: Vec<XmlElement> = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();

    loop {
        match reader.read_event().context("invalid XML")? {
            Event::Start(start) => {
                let name = element_name(start.name().as_ref())?;
                if !stack.is_empty() || name == root {
                    stack.push(element_from(&start, name)?);
                }
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref())?;
                if let Some(parent) = stack.last_mut() {
                    let element = element_from(&start, name)?;
                    parent.push_child(element);
                } else if name == root {
                    fragments.push(element_from(&start, name)?);
                }
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(element),
                        None => fragments.push(element),
                    }
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().context("invalid XML text")?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fragments)
}

fn element_name(raw: &[u8]) -> Result<String> {
    let name = std::str::from_utf8(raw).context("non-utf8 element name")?;
    // Drop namespace prefixes; report tools disagree on using them.
    Ok(name.rsplit(':').next().unwrap_or(name).to_string())
}

fn element_from(start: &quick_xml::events::BytesStart<'_>, name: String) -> Result<XmlElement> {
    let mut element = XmlElement::new(&name);

    for attribute in start.attributes() {
        let attribute = attribute.context("invalid XML attribute")?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .context("non-utf8 attribute name")?
            .to_string();
        let value = attribute
            .unescape_value()
            .context("invalid attribute value")?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}
