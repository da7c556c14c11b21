use std::str;

use crate::{Axis, DecodeError, MarkerSample};

/// Prefix sent by the motion-capture bridge in front of every marker message.
pub const DEFAULT_PREFIX: &str = "Marker Hand";

/// A decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<'a> {
    /// Marker label between the prefix and `:`, e.g. `"3"` in
    /// `"Marker Hand3: X=.. Y=.. Z=.."`. Informational only.
    pub label: Option<&'a str>,
    pub sample: MarkerSample,
}

/// Stateless decoder for the `"<prefix>X=<f> Y=<f> Z=<f>"` marker protocol.
#[derive(Debug, Clone)]
pub struct Decoder {
    prefix: String,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl Decoder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn decode(&self, raw: &[u8]) -> Result<MarkerSample, DecodeError> {
        self.decode_frame(raw).map(|frame| frame.sample)
    }

    /// Decode one datagram, keeping the marker label if one is present.
    ///
    /// Fields are taken in message order as x, y, z; their names are not
    /// checked.
    pub fn decode_frame<'a>(&self, raw: &'a [u8]) -> Result<Frame<'a>, DecodeError> {
        let text = str::from_utf8(raw)
            .map_err(|e| DecodeError::Framing(format!("payload is not UTF-8: {}", e)))?;

        let body = text.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
            DecodeError::Framing(format!("expected prefix {:?}", self.prefix))
        })?;

        let (label, fields) = split_label(body);

        let tokens: Vec<&str> = fields.trim().split(' ').collect();
        let [x, y, z] = tokens.as_slice() else {
            return Err(DecodeError::FieldCount {
                found: tokens.len(),
            });
        };

        let sample = MarkerSample::new(
            parse_field(x, Axis::X)?,
            parse_field(y, Axis::Y)?,
            parse_field(z, Axis::Z)?,
        );

        Ok(Frame { label, sample })
    }
}

/// Decode with the default prefix.
pub fn decode(raw: &[u8]) -> Result<MarkerSample, DecodeError> {
    Decoder::default().decode(raw)
}

// "3: X=1 Y=2 Z=3" -> (Some("3"), " X=1 Y=2 Z=3")
fn split_label(body: &str) -> (Option<&str>, &str) {
    match body.split_once(':') {
        Some((label, rest)) => {
            let label = label.trim();
            let is_label = !label.is_empty()
                && !label.contains(|c: char| c == '=' || c.is_whitespace());
            if is_label {
                (Some(label), rest)
            } else {
                (None, body)
            }
        }
        None => (None, body),
    }
}

fn parse_field(token: &str, axis: Axis) -> Result<f64, DecodeError> {
    let malformed = || DecodeError::FieldFormat {
        token: token.to_string(),
    };

    let (_name, rest) = token.split_once('=').ok_or_else(malformed)?;

    // empty segments from stray '=' carry nothing
    let mut segments = rest.split('=').filter(|segment| !segment.is_empty());
    let value = segments.next().unwrap_or_default();
    if segments.next().is_some() {
        return Err(malformed());
    }

    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(DecodeError::Parse {
            axis,
            value: value.to_string(),
        }),
    }
}
