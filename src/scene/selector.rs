//! Selector strings dispatched on their first character.
//!
//! `#id`, `.class`, `[attr=value]` and a bare tag name. There is no
//! combinator grammar.

use std::sync::LazyLock;

use regex::Regex;

use super::element::Element;

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[\s*([\w:-]+)\s*=\s*["']?([^"'\]]*?)["']?\s*\]$"#)
        .expect("attribute selector regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Attribute { name: String, value: String },
    Tag(String),
}

impl Selector {
    pub fn parse(input: &str) -> Option<Selector> {
        let input = input.trim();
        if let Some(id) = input.strip_prefix('#') {
            return (!id.is_empty()).then(|| Selector::Id(id.to_string()));
        }
        if let Some(class) = input.strip_prefix('.') {
            return (!class.is_empty()).then(|| Selector::Class(class.to_string()));
        }
        if input.starts_with('[') {
            let Some(caps) = ATTRIBUTE_RE.captures(input) else {
                log::warn!("Unsupported attribute selector {:?}", input);
                return None;
            };
            return Some(Selector::Attribute {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            });
        }
        (!input.is_empty()).then(|| Selector::Tag(input.to_ascii_lowercase()))
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Selector::Id(id) => element.id() == Some(id.as_str()),
            Selector::Class(class) => element.has_class(class),
            Selector::Attribute { name, value } => {
                element.attribute_string(name).as_deref() == Some(value.as_str())
            }
            Selector::Tag(tag) => element.node_name() == tag,
        }
    }
}
