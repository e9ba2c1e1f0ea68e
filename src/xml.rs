//! A small owned element tree on top of `quick-xml`.
//!
//! Entrez documents are read whole and then queried with ElementTree-style
//! lookups: [`Element::child`] returns the first direct child with a given
//! name and [`Element::children`] iterates over all of them. Every lookup
//! returns an `Option` so callers have to decide what an absent element means.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("unexpected closing tag </{found}> (expected </{expected}>)")]
    MismatchedTag { expected: String, found: String },
    #[error("unclosed element <{0}> at end of document")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("unexpected content after the root element")]
    TrailingContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .flatten()
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
                let value = a
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(a.value.as_ref()).into_owned());
                (key, value)
            })
            .collect();
        Element {
            name,
            attributes,
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All direct children named `name`, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Follow a `/`-separated path of direct children, e.g. `"Article/Journal/Title"`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// Text content of this element and its descendants, trimmed.
    pub fn text(&self) -> String {
        self.raw_text().trim().to_string()
    }

    /// Text content exactly as written, surrounding whitespace included.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }
}

/// Parse a whole document and return its root element.
pub fn parse_document(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|source| XmlError::Syntax {
            position: reader.error_position() as u64,
            source,
        })?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                stack.push(Element::from_start(&start));
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start);
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let found = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack.pop().ok_or_else(|| XmlError::MismatchedTag {
                    expected: String::new(),
                    found: found.clone(),
                })?;
                if element.name != found {
                    return Err(XmlError::MismatchedTag {
                        expected: element.name,
                        found,
                    });
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::CData(t) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(current) = stack.last_mut() {
                    let name = String::from_utf8_lossy(r.as_ref()).into_owned();
                    match r.resolve_char_ref() {
                        Ok(Some(ch)) => current.push_text(ch.encode_utf8(&mut [0; 4])),
                        _ => match resolve_predefined_entity(&name) {
                            Some(value) => current.push_text(value),
                            None => current.push_text(&format!("&{name};")),
                        },
                    }
                }
            }
            Event::Eof => break,
            // Declarations, doctype, comments and processing instructions.
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.nodes.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::TrailingContent),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_follow_direct_children_only() {
        let root = parse_document(
            "<a><b><c>deep</c></b><c>shallow</c><c>second</c></a>",
        )
        .unwrap();
        assert_eq!(root.name(), "a");
        assert_eq!(root.child("c").unwrap().text(), "shallow");
        assert_eq!(root.children("c").count(), 2);
        assert_eq!(root.find("b/c").unwrap().text(), "deep");
        assert_eq!(root.find("b/c").unwrap().raw_text(), "deep");
        assert!(root.find("b/missing").is_none());
    }

    #[test]
    fn text_includes_inline_markup_and_entities() {
        let root = parse_document(
            "<t>  Effects of <i>E. coli</i> &amp; &#945;-helices &lt;3 &custom;  </t>",
        )
        .unwrap();
        assert_eq!(root.text(), "Effects of E. coli & \u{3b1}-helices <3 &custom;");
        assert!(root.raw_text().starts_with("  Effects"));
    }

    #[test]
    fn attributes_and_empty_elements() {
        let root = parse_document(
            r#"<list><id type="doi">10.1/abc</id><id type="pubmed"/></list>"#,
        )
        .unwrap();
        let ids: Vec<_> = root.children("id").collect();
        assert_eq!(ids[0].attr("type"), Some("doi"));
        assert_eq!(ids[1].attr("type"), Some("pubmed"));
        assert_eq!(ids[1].text(), "");
        assert_eq!(ids[1].attr("missing"), None);
    }

    #[test]
    fn skips_prolog_and_doctype() {
        let doc = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2019//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_190101.dtd">
<!-- comment -->
<PubmedArticleSet><![CDATA[raw <text>]]></PubmedArticleSet>
"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.name(), "PubmedArticleSet");
        assert_eq!(root.text(), "raw <text>");
    }

    #[test]
    fn rejects_broken_documents() {
        assert!(matches!(
            parse_document("<a><b></a>"),
            Err(XmlError::MismatchedTag { .. }) | Err(XmlError::Syntax { .. })
        ));
        assert!(parse_document("<a><b>").is_err());
        assert!(matches!(parse_document(""), Err(XmlError::NoRoot)));
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(XmlError::TrailingContent)
        ));
    }
}
