//! Shareable-state codec: documents to URL tokens and back.
//!
//! Two token formats exist and both stay decodable forever, because old
//! links never stop circulating:
//!
//! - [`Format::Compressed`]: zlib over the UTF-8 JSON, rendered in the
//!   URL-safe base64 alphabet without padding. Every new token uses it.
//! - [`Format::Legacy`]: the JSON text through [`text::to_portable`],
//!   uncompressed. Minted by the first releases of the web app.
//!
//! Decoding tries the formats in [`Format::PRIORITY`] order and accepts the
//! first result that parses into the requested shape. The format is never
//! guessed from the token's length or characters. The zlib header and
//! Adler-32 trailer make it very unlikely that a legacy token inflates
//! cleanly, and a lucky inflate still has to produce valid JSON.

use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CodecError, DecodeError};
use crate::text;

/// Upper bound on the inflated size of a compressed token.
pub const MAX_DOCUMENT_BYTES: u64 = 4 * 1024 * 1024;

/// Token format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// zlib + URL-safe base64. Current.
    Compressed,
    /// Standard base64 of the UTF-8 JSON. Read-only compatibility.
    Legacy,
}

impl Format {
    /// Decode strategies, newest first.
    pub const PRIORITY: [Self; 2] = [Self::Compressed, Self::Legacy];

    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compressed => "compressed",
            Self::Legacy => "legacy",
        }
    }

    fn render(self, json: &str) -> Result<String, CodecError> {
        match self {
            Self::Compressed => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
                encoder
                    .write_all(json.as_bytes())
                    .and_then(|()| encoder.finish())
                    .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
                    .map_err(|e| CodecError::Compression {
                        reason: e.to_string(),
                    })
            }
            Self::Legacy => Ok(text::to_portable(json)),
        }
    }

    fn recover_text(self, token: &str) -> Result<String, DecodeError> {
        match self {
            Self::Compressed => {
                let bytes = URL_SAFE_NO_PAD
                    .decode(token)
                    .map_err(|e| DecodeError::Alphabet {
                        alphabet: "url-safe base64",
                        reason: e.to_string(),
                    })?;

                let mut inflated = Vec::new();
                ZlibDecoder::new(bytes.as_slice())
                    .take(MAX_DOCUMENT_BYTES.saturating_add(1))
                    .read_to_end(&mut inflated)
                    .map_err(|e| DecodeError::Decompress {
                        reason: e.to_string(),
                    })?;
                if inflated.len() as u64 > MAX_DOCUMENT_BYTES {
                    return Err(DecodeError::Decompress {
                        reason: format!("document exceeds {MAX_DOCUMENT_BYTES} bytes"),
                    });
                }

                String::from_utf8(inflated).map_err(|e| DecodeError::Utf8 {
                    reason: e.to_string(),
                })
            }
            Self::Legacy => text::from_portable(token),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a document in the current format.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if `doc` cannot be represented as
/// JSON. Callers should treat that as a bug, not as bad input.
pub fn encode<T: Serialize + ?Sized>(doc: &T) -> Result<String, CodecError> {
    Format::Compressed.render(&to_json(doc)?)
}

/// Encode a document in the legacy, uncompressed format.
///
/// # Errors
///
/// Same as [`encode`].
pub fn encode_legacy<T: Serialize + ?Sized>(doc: &T) -> Result<String, CodecError> {
    Format::Legacy.render(&to_json(doc)?)
}

fn to_json<T: Serialize + ?Sized>(doc: &T) -> Result<String, CodecError> {
    serde_json::to_string(doc).map_err(|e| CodecError::Serialization {
        reason: e.to_string(),
    })
}

/// Decode `token` into `T`, reporting which format matched.
///
/// `T` is the structural check: a token only decodes if its JSON
/// deserializes into `T`. Use `serde_json::Value` to accept any JSON.
///
/// # Errors
///
/// Returns [`DecodeError::Empty`] for a blank token, otherwise the error
/// from the last format tried.
pub fn try_decode<T: DeserializeOwned>(token: &str) -> Result<(T, Format), DecodeError> {
    decode_checked(token, |_: &T| Ok(()))
}

/// Decode `token` into `T`, or return `fallback` if there is no token or it
/// does not decode. Never fails.
pub fn decode<T: DeserializeOwned>(token: Option<&str>, fallback: T) -> T {
    recover(token, fallback, try_decode::<T>)
}

/// Decode an untyped document whose top-level JSON kind must match `shape`
/// (object, array, string, ...).
///
/// # Errors
///
/// As [`try_decode`], plus [`DecodeError::Document`] when every format that
/// parsed produced a value of the wrong kind.
pub fn try_decode_shaped(token: &str, shape: &Value) -> Result<(Value, Format), DecodeError> {
    decode_checked(token, |doc: &Value| {
        if json_kind(doc) == json_kind(shape) {
            Ok(())
        } else {
            Err(DecodeError::Document {
                reason: format!(
                    "expected a JSON {}, found a JSON {}",
                    json_kind(shape),
                    json_kind(doc)
                ),
            })
        }
    })
}

/// Like [`decode`], accepting only values with the same top-level kind as
/// `fallback`.
pub fn decode_shaped(token: Option<&str>, fallback: Value) -> Value {
    let shape = fallback.clone();
    recover(token, fallback, |t| try_decode_shaped(t, &shape))
}

fn recover<T>(
    token: Option<&str>,
    fallback: T,
    attempt: impl FnOnce(&str) -> Result<(T, Format), DecodeError>,
) -> T {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        debug!("no token, starting from the default document");
        return fallback;
    };
    match attempt(token) {
        Ok((doc, format)) => {
            debug!(%format, len = token.len(), "decoded token");
            doc
        }
        Err(e) => {
            warn!(error = %e, len = token.len(), "link did not load, starting fresh");
            fallback
        }
    }
}

fn decode_checked<T, F>(token: &str, check: F) -> Result<(T, Format), DecodeError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), DecodeError>,
{
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    // Errors from a format that recovered text outrank transport errors.
    let mut last = DecodeError::Empty;
    let mut recovered = false;
    for format in Format::PRIORITY {
        let json = match format.recover_text(token) {
            Ok(json) => json,
            Err(e) => {
                debug!(%format, error = %e, "format did not match");
                if !recovered {
                    last = e;
                }
                continue;
            }
        };

        let attempt = serde_json::from_str::<T>(&json)
            .map_err(|e| DecodeError::Document {
                reason: e.to_string(),
            })
            .and_then(|doc| check(&doc).map(|()| doc));
        match attempt {
            Ok(doc) => return Ok((doc, format)),
            Err(e) => {
                debug!(%format, error = %e, "format did not match");
                recovered = true;
                last = e;
            }
        }
    }
    Err(last)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
