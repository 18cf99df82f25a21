//! Sérialisation des jetons d'enveloppe
//!
//! Text tokens go through `quick_xml::Writer` with full entity escaping.
//! Raw tokens bypass the writer: its sink is flushed first, then the fragment
//! is copied byte for byte.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use super::Token;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid XML element name: {0:?}")]
    InvalidName(String),

    #[error("closing tag </{found}> does not match open element {expected:?}")]
    MismatchedEnd {
        expected: Option<String>,
        found: String,
    },

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("XML writer error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error while encoding: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode une séquence de jetons dans un buffer neuf.
pub fn encode_tokens(tokens: &[Token]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(tokens, &mut buf)?;
    Ok(buf)
}

/// Encode une séquence de jetons dans `sink`.
///
/// On error the sink may already hold part of the document. [`encode_tokens`]
/// never hands out such a partial buffer.
pub fn encode_into<W: Write>(tokens: &[Token], sink: W) -> Result<(), EncodeError> {
    let mut writer = Writer::new(sink);
    let mut open: Vec<&str> = Vec::new();

    for token in tokens {
        match token {
            Token::Start { name, attributes } => {
                check_name(name)?;
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    check_name(key)?;
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                writer.write_event(Event::Start(start))?;
                open.push(name);
            }
            Token::End { name } => {
                match open.pop() {
                    Some(expected) if expected == name.as_str() => {}
                    expected => {
                        return Err(EncodeError::MismatchedEnd {
                            expected: expected.map(str::to_string),
                            found: name.clone(),
                        });
                    }
                }
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
            Token::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(escape(text.as_str()))))?;
            }
            Token::Raw(raw) => {
                let sink = writer.get_mut();
                sink.flush()?;
                sink.write_all(raw.as_bytes())?;
            }
        }
    }

    if let Some(unclosed) = open.pop() {
        return Err(EncodeError::Unclosed(unclosed.to_string()));
    }

    writer.get_mut().flush()?;
    Ok(())
}

/// Vérifie qu'un nom d'élément ou d'attribut est un nom XML plausible.
fn check_name(name: &str) -> Result<(), EncodeError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        None => false,
        Some(first) if first.is_ascii_digit() || first == '-' || first == '.' => false,
        Some(first) => is_name_char(first) && chars.all(is_name_char),
    };

    if valid {
        Ok(())
    } else {
        Err(EncodeError::InvalidName(name.to_string()))
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '<' | '>' | '&' | '"' | '\'' | '=' | '/')
}
