use crate::error::{Result, XdfError};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

/// A parsed XML element from an XDF header or footer.
///
/// XDF metadata is free-form below a handful of required fields, so the tree is
/// kept generic and walked through accessors that return `None` at the first
/// missing step instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Parse an XML document and return its root element.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let xml_str = String::from_utf8_lossy(content);
        let mut reader = XmlReader::from_str(&xml_str);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(XmlElement::new(String::from_utf8_lossy(e.name().as_ref())));
                }
                Event::Empty(e) => {
                    let element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()));
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        XdfError::ParseError("unbalanced XML end tag".to_string())
                    })?;
                    let trimmed = element.text.trim();
                    if trimmed.len() != element.text.len() {
                        element.text = trimmed.to_string();
                    }
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(current) = stack.last_mut() {
                        let name = String::from_utf8_lossy(&e);
                        match resolve_entity(&name) {
                            Some(c) => current.text.push(c),
                            None => {
                                current.text.push('&');
                                current.text.push_str(&name);
                                current.text.push(';');
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XdfError::ParseError(format!(
                "unclosed XML element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        root.ok_or_else(|| XdfError::ParseError("empty XML document".to_string()))
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Element text, or `None` when the element is empty.
    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    /// Text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(XmlElement::text)
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XdfError::ParseError(format!(
                "multiple root elements (second is <{}>)",
                element.name
            )))
        }
    }
    Ok(())
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = br#"<?xml version="1.0"?>
            <info>
                <name>BioSemi</name>
                <desc>
                    <channels>
                        <channel><label>Fp1</label></channel>
                        <channel><label>Fp2</label></channel>
                    </channels>
                </desc>
            </info>"#;

        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "info");
        assert_eq!(root.child_text("name"), Some("BioSemi"));

        let labels: Vec<_> = root
            .child("desc")
            .and_then(|d| d.child("channels"))
            .map(|c| c.children("channel").filter_map(|ch| ch.child_text("label")).collect())
            .unwrap_or_default();
        assert_eq!(labels, vec!["Fp1", "Fp2"]);
    }

    #[test]
    fn test_empty_elements_have_no_text() {
        let root = XmlElement::parse(b"<info><desc/><name></name></info>").unwrap();
        assert!(root.child("desc").is_some());
        assert_eq!(root.child_text("desc"), None);
        assert_eq!(root.child_text("name"), None);
        assert!(root.child("missing").is_none());
    }

    #[test]
    fn test_entities_are_resolved() {
        let root = XmlElement::parse(b"<name>A &amp; B &#65;</name>").unwrap();
        assert_eq!(root.text(), Some("A & B A"));
    }

    #[test]
    fn test_unclosed_document_is_rejected() {
        assert!(XmlElement::parse(b"<info><name>x</name>").is_err());
        assert!(XmlElement::parse(b"").is_err());
    }
}
