//! Launch descriptions for the media factory.
//!
//! A media factory is configured with a textual launch description in
//! gst-launch syntax. [`PipelineDescription`] builds the capture → encode →
//! payload chain served by default; [`LaunchLine`] is a structural reader for
//! any description, used to inspect payloaders without loading the framework.
//!
//! ```text
//! ( autovideosrc ! videoconvert ! x264enc ... ! rtph264pay name=pay0 pt=96 )
//!   ^ enclosing bin                              ^ stream 0, payload type 96
//! ```
//!
//! The RTSP media factory exposes one stream per payloader named `pay0`,
//! `pay1`, ... in order.

use std::fmt;

use crate::encoder::EncoderSettings;
use crate::error::{LaunchError, ParseErrorKind, Result};

pub const DEFAULT_SOURCE: &str = "autovideosrc";
pub const DEFAULT_CONVERTER: &str = "videoconvert";
pub const H264_PAYLOADER: &str = "rtph264pay";

/// Conventional dynamic payload type for H.264.
pub const DEFAULT_PAYLOAD_TYPE: u8 = 96;

/// Dynamic RTP payload type range (RFC 3551 §6).
pub const DYNAMIC_PAYLOAD_TYPES: std::ops::RangeInclusive<u8> = 96..=127;

/// Builder for the default video-capture → H.264 → RTP chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescription {
    /// Capture element (with any properties), e.g. `autovideosrc` or
    /// `videotestsrc is-live=true`.
    pub source: String,
    /// Colorspace conversion in front of the encoder.
    pub converter: String,
    pub encoder: EncoderSettings,
    pub payload_type: u8,
}

impl Default for PipelineDescription {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            converter: DEFAULT_CONVERTER.to_string(),
            encoder: EncoderSettings::default(),
            payload_type: DEFAULT_PAYLOAD_TYPE,
        }
    }
}

impl PipelineDescription {
    /// Checks the parameters. The rendered text is not handed to the
    /// framework here; that happens lazily when the first client connects.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(LaunchError::MissingElement("source"));
        }
        if self.converter.trim().is_empty() {
            return Err(LaunchError::MissingElement("converter"));
        }
        if !DYNAMIC_PAYLOAD_TYPES.contains(&self.payload_type) {
            return Err(LaunchError::InvalidPayloadType(self.payload_type));
        }
        self.encoder.validate()
    }

    pub fn render(&self) -> String {
        format!(
            "( {} ! {} ! {} ! {} name=pay0 pt={} )",
            self.source.trim(),
            self.converter.trim(),
            self.encoder.element(),
            H264_PAYLOADER,
            self.payload_type
        )
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One element of a launch description with its properties in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub factory: String,
    pub properties: Vec<(String, String)>,
}

impl ElementDecl {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_payloader(&self) -> bool {
        self.factory.starts_with("rtp") && self.factory.ends_with("pay")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Element(ElementDecl),
    /// Caps filter, e.g. `video/x-raw,width=640`.
    Caps(String),
}

/// A payloader found in a launch description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payloader {
    pub factory: String,
    pub name: Option<String>,
    /// `None` when `pt` is not set (the element default applies).
    pub payload_type: Option<u8>,
}

/// Structural view of a launch description.
///
/// This is not a full gst-launch grammar: pad references and nested bins are
/// flattened into a single segment list. It is enough to answer which
/// elements a description names and how its payloaders are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchLine {
    /// Whether the whole description is wrapped in `( ... )`.
    pub bin: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Link,
    Word(String),
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut quote: Option<char> = None;
    // Parens inside a word belong to it, e.g. `format=(string)I420`.
    let mut word_parens = 0usize;

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for c in text.chars() {
        if let Some(q) = quote {
            word.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                word.push(c);
            }
            '!' => {
                flush(&mut word, &mut tokens);
                word_parens = 0;
                tokens.push(Token::Link);
            }
            '(' if word.is_empty() => tokens.push(Token::Open),
            '(' => {
                word_parens += 1;
                word.push(c);
            }
            ')' if word_parens > 0 => {
                word_parens -= 1;
                word.push(c);
            }
            ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Close);
            }
            c if c.is_whitespace() => {
                flush(&mut word, &mut tokens);
                word_parens = 0;
            }
            c => word.push(c),
        }
    }

    if quote.is_some() {
        return Err(LaunchError::parse(ParseErrorKind::InvalidProperty(word)));
    }
    flush(&mut word, &mut tokens);
    Ok(tokens)
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

impl LaunchLine {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;

        let mut depth = 0i32;
        for token in &tokens {
            match token {
                Token::Open => depth += 1,
                Token::Close => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(LaunchError::parse(ParseErrorKind::UnbalancedParentheses));
                    }
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(LaunchError::parse(ParseErrorKind::UnbalancedParentheses));
        }
        if !tokens.iter().any(|t| matches!(t, Token::Word(_))) {
            return Err(LaunchError::parse(ParseErrorKind::EmptyDescription));
        }

        let bin = matches!(tokens.first(), Some(Token::Open))
            && matches!(tokens.last(), Some(Token::Close));

        let mut segments = Vec::new();
        let mut current: Option<ElementDecl> = None;
        let mut linked = false;

        for token in tokens {
            match token {
                Token::Open | Token::Close => {}
                Token::Link => {
                    if linked || (current.is_none() && segments.is_empty()) {
                        return Err(LaunchError::parse(ParseErrorKind::EmptyElement));
                    }
                    if let Some(element) = current.take() {
                        segments.push(Segment::Element(element));
                    }
                    linked = true;
                }
                Token::Word(word) => {
                    if let Some((key, value)) = word.split_once('=') {
                        if key.is_empty() {
                            return Err(LaunchError::parse(ParseErrorKind::InvalidProperty(
                                word.clone(),
                            )));
                        }
                        match current.as_mut() {
                            Some(element) => element
                                .properties
                                .push((key.to_string(), unquote(value).to_string())),
                            None if key.contains('/') || word.contains(',') => {
                                segments.push(Segment::Caps(word));
                            }
                            None => {
                                return Err(LaunchError::parse(ParseErrorKind::InvalidProperty(
                                    word,
                                )));
                            }
                        }
                    } else if word.contains('/') {
                        if let Some(element) = current.take() {
                            segments.push(Segment::Element(element));
                        }
                        segments.push(Segment::Caps(word));
                    } else {
                        // A bare word starts a new element, whether linked by `!`
                        // or beginning an unlinked parallel chain.
                        if let Some(element) = current.take() {
                            segments.push(Segment::Element(element));
                        }
                        current = Some(ElementDecl {
                            factory: word,
                            properties: Vec::new(),
                        });
                    }
                    linked = false;
                }
            }
        }

        if linked {
            return Err(LaunchError::parse(ParseErrorKind::EmptyElement));
        }
        if let Some(element) = current.take() {
            segments.push(Segment::Element(element));
        }

        Ok(LaunchLine { bin, segments })
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Element(e) => Some(e),
            Segment::Caps(_) => None,
        })
    }

    /// Element factory names in order of appearance, without duplicates.
    pub fn factory_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for element in self.elements() {
            let name = element.factory.as_str();
            // `name.` is a reference to an element declared elsewhere
            if name.ends_with('.') || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
        names
    }

    pub fn payloaders(&self) -> Vec<Payloader> {
        self.elements()
            .filter(|e| e.is_payloader())
            .map(|e| Payloader {
                factory: e.factory.clone(),
                name: e.property("name").map(str::to_string),
                payload_type: e.property("pt").and_then(|pt| pt.parse().ok()),
            })
            .collect()
    }

    pub fn h264_payloader(&self) -> Option<Payloader> {
        self.payloaders()
            .into_iter()
            .find(|p| p.factory == H264_PAYLOADER)
    }

    /// Checks that streams are exposed the way the RTSP media factory
    /// collects them: elements named `payN` or `dynpayN`, numbered from 0
    /// without gaps within each prefix, in any order in the description.
    /// A `pt` set on a `payN` element must fit the 7-bit RTP range.
    pub fn check_payloaders(&self) -> Result<()> {
        let mut pay = Vec::new();
        let mut dynpay = Vec::new();

        for element in self.elements() {
            let Some(name) = element.property("name") else {
                continue;
            };
            if let Some(idx) = stream_index(name, "dynpay") {
                dynpay.push(idx);
            } else if let Some(idx) = stream_index(name, "pay") {
                if let Some(pt) = element.property("pt") {
                    match pt.parse::<u8>() {
                        Ok(pt) if pt <= 127 => {}
                        _ => {
                            return Err(LaunchError::Payloader(format!(
                                "{name} has payload type {pt:?} outside 0..=127"
                            )));
                        }
                    }
                }
                pay.push(idx);
            }
        }

        if pay.is_empty() && dynpay.is_empty() {
            return Err(LaunchError::Payloader(
                "no element named pay0 or dynpay0 in description".into(),
            ));
        }
        check_numbering(pay, "pay")?;
        check_numbering(dynpay, "dynpay")
    }
}

/// `pay3` with prefix `pay` gives 3. Signs and empty suffixes are rejected.
fn stream_index(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn check_numbering(mut indices: Vec<usize>, prefix: &str) -> Result<()> {
    indices.sort_unstable();
    for (expected, idx) in indices.into_iter().enumerate() {
        if idx != expected {
            return Err(LaunchError::Payloader(format!(
                "{prefix}{expected} missing or duplicated, found {prefix}{idx}"
            )));
        }
    }
    Ok(())
}
