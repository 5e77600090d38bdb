/*
 * body.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Curlew, an HTTP client library.
 *
 * Curlew is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Curlew is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Curlew.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Decoded response bodies. Exactly one variant per response, chosen by the negotiator.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use scraper::{Html, Selector};

use crate::response::serialized::SerializedValue;

/// Decoded body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// JSON object or array.
    Json(serde_json::Value),
    Xml(XmlDocument),
    /// `k=v&k2=v2` form.
    Query(QueryMap),
    /// PHP `serialize()` payload.
    Serialized(SerializedValue),
    Html(HtmlDocument),
    /// Trimmed text when nothing more structured matched.
    Text(String),
}

impl Body {
    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Json(_) => BodyKind::Json,
            Body::Xml(_) => BodyKind::Xml,
            Body::Query(_) => BodyKind::Query,
            Body::Serialized(_) => BodyKind::Serialized,
            Body::Html(_) => BodyKind::Html,
            Body::Text(_) => BodyKind::Text,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&QueryMap> {
        match self {
            Body::Query(q) => Some(q),
            _ => None,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Text(String::new())
    }
}

/// Discriminant of `Body`, for callers (and the C ABI) that only need the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyKind {
    Json = 1,
    Xml = 2,
    Query = 3,
    Serialized = 4,
    Html = 5,
    Text = 6,
}

/// Ordered string map decoded from a query string. Last occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    pairs: Vec<(String, String)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = QueryMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// XML node: element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with this name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => out.push_str(&e.text()),
            }
        }
        out
    }
}

/// Deepest element nesting `XmlDocument::parse` accepts.
const MAX_DEPTH: usize = 256;

/// Parsed XML document (single root element).
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parse a complete document. Fails on malformed markup, mismatched end tags, a missing
    /// root, or elements nested deeper than `MAX_DEPTH`.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(format!("XML parse error: {}", e)),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(format!("elements nested deeper than {}", MAX_DEPTH));
                    }
                    stack.push(start_element(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let element = start_element(&e)?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or("unbalanced end tag")?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| e.to_string())?.into_owned();
                    push_text(&mut stack, text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_text(&mut stack, text);
                }
                _ => {}
            }
            buf.clear();
        }
        if !stack.is_empty() {
            return Err("unclosed element at end of document".to_string());
        }
        root.map(|root| XmlDocument { root })
            .ok_or_else(|| "document has no root element".to_string())
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

fn start_element(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn close_element(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err("more than one root element".to_string()),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: String) {
    if let Some(parent) = stack.last_mut() {
        if !text.is_empty() {
            parent.children.push(XmlNode::Text(text));
        }
    }
}

/// HTML document. The DOM is rebuilt on demand with `dom()` so the response stays `Send + Sync`.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDocument {
    source: String,
    title: Option<String>,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        let dom = Html::parse_document(source);
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| dom.select(&sel).next().map(|t| t.text().collect::<String>()))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            source: source.to_string(),
            title,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Full DOM tree.
    pub fn dom(&self) -> Html {
        Html::parse_document(&self.source)
    }

    /// Text content of every element matching a CSS selector. An invalid selector matches
    /// nothing.
    pub fn select_text(&self, selector: &str) -> Vec<String> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.dom()
            .select(&sel)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .collect()
    }
}
