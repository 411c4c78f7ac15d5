//! Header and body extraction from raw messages.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::domain::{BodyPart, Header};

/// Base64url engine that accepts data with or without trailing padding.
const BASE64_URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const PLAIN_TEXT: &str = "text/plain";

/// Sender identity of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Display name, or the raw header value when no name could be parsed.
    pub name: String,
    /// Lower-cased address used as an identity key.
    pub email: String,
}

fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.is(name))
        .map(|h| h.value.as_str())
}

/// Extracts the sender from the `From` header.
///
/// `"Jane Doe" <Jane@Example.com>` yields name `Jane Doe` and email
/// `jane@example.com`. A value without a bracketed address is used verbatim
/// as the name and lower-cased as the email. Without a `From` header the
/// sender is `Unknown` / `unknown`.
pub fn extract_sender(headers: &[Header]) -> Sender {
    let Some(value) = find_header(headers, "from") else {
        return Sender {
            name: "Unknown".to_string(),
            email: "unknown".to_string(),
        };
    };

    match split_display_address(value) {
        Some((name, email)) => Sender {
            name: name.trim_end().trim_matches(['"', ' ']).to_string(),
            email: email.to_lowercase(),
        },
        None => Sender {
            name: value.to_string(),
            email: value.to_lowercase(),
        },
    }
}

/// Splits `Name <address>` at the first `<` that has a non-empty display
/// part before it and a `>` after at least one address character.
fn split_display_address(value: &str) -> Option<(&str, &str)> {
    let (open, _) = value.match_indices('<').find(|(idx, _)| *idx > 0)?;
    let rest = &value[open + 1..];
    let first_len = rest.chars().next()?.len_utf8();
    let close = rest[first_len..].find('>')? + first_len;
    Some((&value[..open], &rest[..close]))
}

/// Extracts the `Subject` header, defaulting to `(No Subject)`.
pub fn extract_subject(headers: &[Header]) -> String {
    find_header(headers, "subject")
        .unwrap_or("(No Subject)")
        .to_string()
}

/// Decodes the plain-text body of a message.
///
/// A leaf root is decoded directly whatever its type. Otherwise the tree is
/// searched depth-first for the first `text/plain` part with inline data
/// that decodes to non-empty text. Returns an empty string when nothing
/// usable exists; callers fall back to the message snippet.
pub fn decode_body(part: &BodyPart) -> String {
    match part {
        BodyPart::Leaf { data: Some(data), .. } => decode_data(data),
        BodyPart::Leaf { data: None, .. } => String::new(),
        BodyPart::Multipart { parts, .. } => first_plain_text(parts),
    }
}

fn first_plain_text(parts: &[BodyPart]) -> String {
    for part in parts {
        let text = match part {
            BodyPart::Leaf {
                mime_type,
                data: Some(data),
            } if mime_type.eq_ignore_ascii_case(PLAIN_TEXT) => decode_data(data),
            BodyPart::Multipart { parts, .. } => first_plain_text(parts),
            _ => continue,
        };
        if !text.is_empty() {
            return text;
        }
    }
    String::new()
}

/// Decodes base64url data into text, dropping invalid UTF-8 sequences.
///
/// Characters outside the base64url alphabet (whitespace, stray symbols) are
/// discarded before decoding. If what remains is still malformed, the
/// longest prefix of complete quanta is tried before giving up with an empty
/// string.
pub fn decode_data(data: &str) -> String {
    let compact: String = data.chars().filter(is_base64url_char).collect();

    let bytes = match BASE64_URL_LENIENT.decode(&compact) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "malformed body data, decoding complete quanta only");
            let whole = compact.len() - compact.len() % 4;
            BASE64_URL_LENIENT
                .decode(&compact.as_bytes()[..whole])
                .unwrap_or_default()
        }
    };

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

fn is_base64url_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')
}
