//! Label parser: maps free-form item labels back to catalog definitions.
//!
//! Resolution walks [`CATALOG`] in order. Each definition is tried by
//! exact label first; parameterized definitions are then tried through a
//! [`LabelPattern`] compiled from their label template, where `=X` stands
//! for one or more digits and `=T` for one of the element tags.
//!
//! Parameter extraction is independent of the catalog and only recognizes
//! the fixed label shapes `n=<digits>`, `(atk|bp|hp)+=<digits>`,
//! `if enemyType=<tag>` and `atkType=<tag>`.

use codecrawl_types::{Element, ItemKind, NodeItem};

use crate::catalog::{CATALOG, ItemDefinition, NO_DESCRIPTION};
use crate::error::ParseError;

/// Concrete arguments embedded in a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parameters {
    /// Numeric argument.
    pub value: Option<u32>,
    /// Elemental argument.
    pub element: Option<Element>,
}

// ---------------------------------------------------------------------------
// Label patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Digits,
    Element,
}

/// A label template compiled into literal and placeholder segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPattern<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> LabelPattern<'a> {
    /// Compile a template. Returns `None` when it contains no placeholder.
    pub fn compile(template: &'a str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut rest = template;
        let mut found = false;

        while let Some((literal, placeholder, tail)) = next_placeholder(rest) {
            if !literal.is_empty() {
                segments.push(Segment::Literal(literal));
            }
            segments.push(placeholder);
            rest = tail;
            found = true;
        }
        if !found {
            return None;
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        Some(Self { segments })
    }

    /// Whether the whole label matches the pattern.
    pub fn matches(&self, label: &str) -> bool {
        let mut rest = label;
        for segment in &self.segments {
            let next = match segment {
                Segment::Literal(literal) => rest.strip_prefix(literal),
                Segment::Digits => {
                    let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                    (trimmed.len() < rest.len()).then_some(trimmed)
                }
                Segment::Element => Element::ALL
                    .iter()
                    .find_map(|element| rest.strip_prefix(element.as_str())),
            };
            match next {
                Some(tail) => rest = tail,
                None => return false,
            }
        }
        rest.is_empty()
    }
}

/// Split off the text before the next `=X`/`=T` placeholder.
///
/// The literal keeps the `=`. A placeholder letter only counts when it ends
/// a word, so `=searchEnemyTypes()` is plain text.
fn next_placeholder(template: &str) -> Option<(&str, Segment<'static>, &str)> {
    for (pos, _) in template.match_indices('=') {
        let (head, tail) = template.split_at_checked(pos.checked_add(1)?)?;
        let (placeholder, after) = if let Some(after) = tail.strip_prefix('X') {
            (Segment::Digits, after)
        } else if let Some(after) = tail.strip_prefix('T') {
            (Segment::Element, after)
        } else {
            continue;
        };
        let at_boundary = after
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if at_boundary {
            return Some((head, placeholder, after));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Find the first catalog definition matching `label`.
///
/// Returns `None` for unknown labels; callers treat such items as opaque.
pub fn resolve(label: &str) -> Option<&'static ItemDefinition> {
    CATALOG.iter().find(|def| {
        def.label == label
            || (def.is_parameterized()
                && LabelPattern::compile(def.label).is_some_and(|p| p.matches(label)))
    })
}

/// Extract the argument embedded in a label.
///
/// Returns empty parameters when the label has none of the known shapes.
pub fn extract_parameters(label: &str) -> Parameters {
    if let Some(value) = label.strip_prefix("n=").and_then(parse_digits) {
        return Parameters {
            value: Some(value),
            element: None,
        };
    }

    let increment = ["atk+=", "bp+=", "hp+="]
        .iter()
        .find_map(|prefix| label.strip_prefix(prefix))
        .and_then(parse_digits);
    if let Some(value) = increment {
        return Parameters {
            value: Some(value),
            element: None,
        };
    }

    let element = label
        .strip_prefix("if enemyType=")
        .or_else(|| label.strip_prefix("atkType="))
        .and_then(|tag| tag.parse::<Element>().ok());
    if element.is_some() {
        return Parameters {
            value: None,
            element,
        };
    }

    Parameters::default()
}

/// Parse a run of ASCII digits, saturating at `u32::MAX`.
pub(crate) fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(text.parse().unwrap_or(u32::MAX))
}

/// Resolve a label to a concrete item kind.
pub fn parse_item(label: &str) -> Option<ItemKind> {
    resolve(label).map(|def| def.build(&extract_parameters(label)))
}

/// Build an item card from a label.
///
/// # Errors
///
/// Returns [`ParseError::UnknownLabel`] if no catalog definition matches.
pub fn item_from_label(id: impl Into<String>, label: &str) -> Result<NodeItem, ParseError> {
    let kind = parse_item(label).ok_or_else(|| ParseError::UnknownLabel {
        label: label.to_owned(),
    })?;
    let mut item = NodeItem::new(id, kind);
    item.label = label.to_owned();
    Ok(item)
}

/// Player-facing description of a label.
pub fn describe(label: &str) -> &'static str {
    resolve(label).map_or(NO_DESCRIPTION, |def| def.description)
}

/// Attach the resolved kind to an item loaded from storage.
///
/// Items whose label no longer resolves stay opaque and execute through
/// their stored instruction text.
pub fn hydrate(mut item: NodeItem) -> NodeItem {
    item.kind = parse_item(&item.label);
    if item.kind.is_none() {
        tracing::debug!(id = %item.id, label = %item.label, "item label did not resolve");
    }
    item
}
