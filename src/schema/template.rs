/// Tag value templates — literal text with embedded `#{category}` references.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opening marker of a reference block.
const REF_OPEN: &str = "#{";
/// Closing marker of a reference block.
const REF_CLOSE: char = '}';
/// Separator between alternative phrasings of a value.
const ALTERNATION: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed reference starting at byte {position}")]
    Unclosed { position: usize },
    #[error("empty reference at byte {position}")]
    EmptyReference { position: usize },
}

/// One block of a parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedTag {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A slot filled by resolving one of these categories, tried in order.
    Reference(Vec<String>),
}

impl ParsedTag {
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// Split a value into alternating literal and reference blocks.
///
/// `"un #{arme} de #{matiere,metal}"` yields
/// `[Literal("un "), Reference(["arme"]), Literal(" de "), Reference(["matiere", "metal"])]`.
/// Category names inside a reference are trimmed.
pub fn parse(input: &str) -> Result<Vec<ParsedTag>, TemplateError> {
    let mut blocks = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while let Some(start) = rest.find(REF_OPEN) {
        if start > 0 {
            blocks.push(ParsedTag::Literal(rest[..start].to_string()));
        }

        let body_start = start + REF_OPEN.len();
        let Some(len) = rest[body_start..].find(REF_CLOSE) else {
            return Err(TemplateError::Unclosed {
                position: offset + start,
            });
        };

        let required: Vec<String> = rest[body_start..body_start + len]
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if required.is_empty() {
            return Err(TemplateError::EmptyReference {
                position: offset + start,
            });
        }
        blocks.push(ParsedTag::Reference(required));

        let consumed = body_start + len + REF_CLOSE.len_utf8();
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        blocks.push(ParsedTag::Literal(rest.to_string()));
    }

    Ok(blocks)
}

/// True when a parsed value needs expansion rather than being plain text.
pub fn is_formula(blocks: &[ParsedTag]) -> bool {
    blocks.len() > 1 || blocks.iter().any(ParsedTag::is_reference)
}

/// Every category referenced anywhere in the blocks, in order of appearance.
pub fn references(blocks: &[ParsedTag]) -> impl Iterator<Item = &str> {
    blocks
        .iter()
        .filter_map(|b| match b {
            ParsedTag::Reference(required) => Some(required),
            ParsedTag::Literal(_) => None,
        })
        .flatten()
        .map(String::as_str)
}

/// Split a value on `/` into its alternative phrasings.
///
/// Slashes inside a reference block do not split. Each alternative is kept
/// verbatim, surrounding spaces included.
pub fn alternatives(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    let bytes = value.as_bytes();

    for (i, c) in value.char_indices() {
        match c {
            '{' if i > 0 && bytes[i - 1] == b'#' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            ALTERNATION if depth == 0 => {
                parts.push(&value[last..i]);
                last = i + ALTERNATION.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[last..]);
    parts
}
