//! Minimal XML element tree
//!
//! Parses a document with the pest grammar in `fetch.pest` and builds an
//! owned element tree. Entity references in attribute values and text are
//! decoded; namespaces are not interpreted.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use recordfake_core::{Error, Result};

#[derive(Parser)]
#[grammar = "translate/fetch.pest"]
struct XmlParser;

/// Parsed XML element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute parsed as a boolean (`true`/`1`), absent means false
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.attr(name), Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
    }

    /// Attribute parsed as a non-negative integer
    pub fn number(&self, name: &str) -> Result<Option<usize>> {
        match self.attr(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<usize>().map(Some).map_err(|_| {
                Error::invalid_query(format!(
                    "attribute {} on <{}> is not a number: {}",
                    name, self.name, raw
                ))
            }),
        }
    }

    /// Child elements with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a document into its root element.
///
/// # Errors
///
/// `InvalidQuery` if the text is not well-formed.
pub(crate) fn parse(input: &str) -> Result<Element> {
    let mut pairs = XmlParser::parse(Rule::document, input)
        .map_err(|e| Error::invalid_query(format!("malformed xml: {}", e)))?;
    let root = pairs
        .next()
        .and_then(|document| document.into_inner().find(|p| p.as_rule() == Rule::element))
        .ok_or_else(|| Error::invalid_query("xml document has no root element"))?;
    build(root)
}

fn build(pair: Pair<'_, Rule>) -> Result<Element> {
    let mut element = Element::default();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::name if element.name.is_empty() => element.name = part.as_str().to_string(),
            Rule::name => {
                if part.as_str() != element.name {
                    return Err(Error::invalid_query(format!(
                        "closing tag </{}> does not match <{}>",
                        part.as_str(),
                        element.name
                    )));
                }
            }
            Rule::attribute => {
                let mut inner = part.into_inner();
                let name = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                let value = inner
                    .next()
                    .and_then(|quoted| quoted.into_inner().next())
                    .map(|v| decode(v.as_str()))
                    .unwrap_or_default();
                element.attributes.push((name, value));
            }
            Rule::element => element.children.push(build(part)?),
            Rule::text => element.text.push_str(&decode(part.as_str())),
            Rule::cdata => {
                if let Some(body) = part.into_inner().next() {
                    element.text.push_str(body.as_str());
                }
            }
            _ => {}
        }
    }
    element.text = element.text.trim().to_string();
    Ok(element)
}

/// Decode the predefined entities and numeric character references
fn decode(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}
