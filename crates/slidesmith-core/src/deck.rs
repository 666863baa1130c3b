//! Typed slide decks.
//!
//! A [`Deck`] is what structured mode asks the model for, and what the
//! reference presentation is built from. It is rendered by [`crate::pptx`].

use crate::provider::strip_code_fences;
use crate::validation::ValidationResult;
use crate::{Result, Rgb, SlidesmithError};
use serde::{Deserialize, Serialize};

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Deepest bullet indentation level.
pub const MAX_LEVEL: u8 = 4;

/// Smallest and largest font size OOXML accepts, in hundredths of a point.
pub const MIN_FONT_SIZE: u32 = 100;
pub const MAX_FONT_SIZE: u32 = 400_000;

/// Convert inches to EMU.
pub fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64).round() as i64
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Frame {
    pub const fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    pub fn inches(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(inches(left), inches(top), inches(width), inches(height))
    }

    /// Extents must be positive to be drawn.
    pub fn has_area(&self) -> bool {
        self.cx > 0 && self.cy > 0
    }
}

/// One bulleted paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub text: String,
    #[serde(default)]
    pub level: u8,
}

impl Bullet {
    pub fn new(text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            level: level.min(MAX_LEVEL),
        }
    }
}

fn default_code_font() -> String {
    "Consolas".to_string()
}

/// A freestanding text box holding a literal code listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub text: String,

    /// Monospace typeface.
    #[serde(default = "default_code_font")]
    pub font: String,

    /// Font size in hundredths of a point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
}

impl CodeBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: default_code_font(),
            font_size: None,
            frame: None,
        }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    pub fn with_font_size(mut self, hundredths_pt: u32) -> Self {
        self.font_size = Some(hundredths_pt);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// Title and optional subtitle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSlide {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Title, bullets and an optional code box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSlide {
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<Bullet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeBlock>,
}

impl ContentSlide {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bullets: Vec::new(),
            code: None,
        }
    }

    /// Add a top-level bullet.
    pub fn bullet(self, text: impl Into<String>) -> Self {
        self.bullet_at(text, 0)
    }

    /// Add a bullet nested one level deep.
    pub fn sub_bullet(self, text: impl Into<String>) -> Self {
        self.bullet_at(text, 1)
    }

    pub fn bullet_at(mut self, text: impl Into<String>, level: u8) -> Self {
        self.bullets.push(Bullet::new(text, level));
        self
    }

    pub fn with_code(mut self, code: CodeBlock) -> Self {
        self.code = Some(code);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Slide {
    Title(TitleSlide),
    Content(ContentSlide),
}

impl Slide {
    pub fn title(&self) -> &str {
        match self {
            Slide::Title(s) => &s.title,
            Slide::Content(s) => &s.title,
        }
    }
}

/// An ordered list of slides sharing one background color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgb>,
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }

    pub fn title_slide(mut self, title: impl Into<String>, subtitle: Option<&str>) -> Self {
        self.slides.push(Slide::Title(TitleSlide {
            title: title.into(),
            subtitle: subtitle.map(String::from),
        }));
        self
    }

    pub fn content_slide(mut self, slide: ContentSlide) -> Self {
        self.slides.push(Slide::Content(slide));
        self
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Decode a deck from model output (JSON, optionally fenced).
    pub fn from_model_output(text: &str) -> Result<Self> {
        let json = strip_code_fences(text);
        serde_json::from_str(&json)
            .map_err(|e| SlidesmithError::Validation(format!("output is not a valid deck: {}", e)))
    }

    /// Check the deck against the requested slide count.
    pub fn check(&self, expected_slides: u8) -> ValidationResult {
        if self.len() != expected_slides as usize {
            return ValidationResult::Invalid(format!(
                "expected exactly {} slides, got {}",
                expected_slides,
                self.len()
            ));
        }
        if let Some(i) = self.slides.iter().position(|s| s.title().trim().is_empty()) {
            return ValidationResult::Invalid(format!("slide {} has an empty title", i + 1));
        }
        for (i, slide) in self.slides.iter().enumerate() {
            let Slide::Content(ContentSlide { code: Some(code), .. }) = slide else {
                continue;
            };
            if let Some(size) = code.font_size {
                if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
                    return ValidationResult::Invalid(format!(
                        "slide {} code font_size {} is outside {}..={}",
                        i + 1,
                        size,
                        MIN_FONT_SIZE,
                        MAX_FONT_SIZE
                    ));
                }
            }
            if code.frame.is_some_and(|f| !f.has_area()) {
                return ValidationResult::Invalid(format!(
                    "slide {} code frame needs a positive width and height",
                    i + 1
                ));
            }
        }
        ValidationResult::Valid
    }
}
