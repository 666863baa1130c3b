//! Generation requests and the per-request values they carry.

use crate::config::GenerationMode;
use crate::{Result, SlidesmithError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Default upper bound for the slide count.
pub const DEFAULT_MAX_SLIDES: u8 = 20;

const COLOR_PATTERN: &str = r"^#?([0-9a-fA-F]{6})$";

static COLOR_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_color_regex() -> &'static Regex {
    COLOR_REGEX.get_or_init(|| Regex::new(COLOR_PATTERN).expect("Invalid color pattern regex"))
}

/// A 24-bit RGB color, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex digits without the leading `#`, as DrawingML expects them.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Relative luminance check used to pick a readable text color.
    pub fn is_dark(&self) -> bool {
        let luma = 299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32;
        luma < 128_000
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = SlidesmithError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = get_color_regex()
            .captures(s.trim())
            .ok_or_else(|| SlidesmithError::InvalidRequest(format!("'{}' is not a #RRGGBB color", s)))?;
        let hex = &caps[1];
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| SlidesmithError::InvalidRequest(e.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A secret API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Pick the credential for one request.
///
/// A non-blank form value wins over the fallback (normally loaded from
/// `OPENAI_API_KEY`). When both are blank the request is refused before any
/// network call is made.
pub fn resolve_credential(field: Option<&str>, fallback: Option<&ApiKey>) -> Result<ApiKey> {
    if let Some(key) = field.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(ApiKey::new(key));
    }
    fallback
        .filter(|k| !k.expose().trim().is_empty())
        .cloned()
        .ok_or(SlidesmithError::MissingCredential)
}

/// The user-supplied parameters for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Exact number of slides the deck must contain.
    pub slide_count: u8,

    /// Background color applied to every slide.
    pub background_color: Rgb,

    /// Free-text description of the deck content, passed through untouched.
    pub content_description: String,

    /// Credential typed into the form, if any.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request override of the configured generation mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GenerationMode>,
}

impl GenerationRequest {
    /// Create a request with a white background and no credential.
    pub fn new(slide_count: u8, content_description: impl Into<String>) -> Self {
        Self {
            slide_count,
            background_color: Rgb::WHITE,
            content_description: content_description.into(),
            api_key: None,
            mode: None,
        }
    }

    /// Set the background color.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.background_color = color;
        self
    }

    /// Set the credential typed by the user.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the generation mode for this request.
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Check the request against the configured slide bound.
    pub fn validate(&self, max_slides: u8) -> Result<()> {
        if self.slide_count == 0 || self.slide_count > max_slides {
            return Err(SlidesmithError::InvalidRequest(format!(
                "slide count must be between 1 and {}, got {}",
                max_slides, self.slide_count
            )));
        }
        if self.content_description.trim().is_empty() {
            return Err(SlidesmithError::InvalidRequest(
                "Please describe the content of the presentation".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        let c: Rgb = "#112233".parse().unwrap();
        assert_eq!(c, Rgb::new(0x11, 0x22, 0x33));
        assert_eq!(c.to_string(), "#112233");
        assert_eq!(c.hex(), "112233");

        let c: Rgb = "ffaa00".parse().unwrap();
        assert_eq!(c, Rgb::new(0xFF, 0xAA, 0x00));

        assert!("#12345".parse::<Rgb>().is_err());
        assert!("blue".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_color_serde() {
        let c: Rgb = serde_json::from_str("\"#0a0B0c\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#0A0B0C\"");
    }

    #[test]
    fn test_dark_colors() {
        assert!(Rgb::BLACK.is_dark());
        assert!(!Rgb::WHITE.is_dark());
        assert!("#112233".parse::<Rgb>().unwrap().is_dark());
    }

    #[test]
    fn test_credential_precedence() {
        let fallback = ApiKey::new("sk-env");
        let key = resolve_credential(Some("sk-form"), Some(&fallback)).unwrap();
        assert_eq!(key.expose(), "sk-form");

        let key = resolve_credential(Some("   "), Some(&fallback)).unwrap();
        assert_eq!(key.expose(), "sk-env");

        let key = resolve_credential(None, Some(&fallback)).unwrap();
        assert_eq!(key.expose(), "sk-env");
    }

    #[test]
    fn test_missing_credential() {
        let err = resolve_credential(Some(""), None).unwrap_err();
        assert!(matches!(err, SlidesmithError::MissingCredential));

        let blank = ApiKey::new(" ");
        let err = resolve_credential(None, Some(&blank)).unwrap_err();
        assert!(matches!(err, SlidesmithError::MissingCredential));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret");
        assert!(!format!("{:?}", key).contains("secret"));
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new(3, "Intro to cats").validate(20).is_ok());
        assert!(GenerationRequest::new(0, "Intro to cats").validate(20).is_err());
        assert!(GenerationRequest::new(21, "Intro to cats").validate(20).is_err());
        assert!(GenerationRequest::new(3, "  \n").validate(20).is_err());
    }

    #[test]
    fn test_request_never_serializes_key() {
        let request = GenerationRequest::new(3, "Intro to cats").with_api_key("sk-secret");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
