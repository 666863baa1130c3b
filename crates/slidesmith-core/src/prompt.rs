//! Prompt construction.
//!
//! The system message pins down every hard constraint of the deck; the user
//! message is the content description exactly as typed.

use crate::config::{GenerationMode, SlidesmithConfig};
use crate::{GenerationRequest, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Library the generated program must use.
pub const REQUIRED_LIBRARY: &str = "python-pptx";

/// Filename the generated program must save to.
pub const OUTPUT_FILE: &str = "output.pptx";

/// Filename the synthesized program is written to.
pub const SCRIPT_FILE: &str = "generated_deck.py";

const SCRIPT_TEMPLATE: &str = "\
You are an expert Python developer who writes programs that build PowerPoint presentations.
Write a complete, runnable Python program that satisfies ALL of the following rules:
- The presentation must contain exactly {{slide_count}} slides.
- Every slide must use the background color {{color}}.
- You must use the {{library}} library (import from `pptx`).
- Create exactly one Presentation object.
- Save the presentation as '{{output_file}}' in the current working directory.
- Output only raw Python code. Do not include explanations, comments outside the code, or markdown code fences.";

const STRUCTURED_TEMPLATE: &str = "\
You are an expert presentation designer.
Design a slide deck that satisfies ALL of the following rules:
- The deck must contain exactly {{slide_count}} slides.
- Every slide will use the background color {{color}}; choose wording that reads well on it.
- Answer with a single JSON object and nothing else: no explanations and no markdown code fences.
The JSON object must have this shape:
{\"slides\": [
  {\"layout\": \"title\", \"title\": \"...\", \"subtitle\": \"...\"},
  {\"layout\": \"content\", \"title\": \"...\", \"bullets\": [{\"text\": \"...\", \"level\": 0}], \"code\": {\"text\": \"...\"}}
]}
`level` is the indentation depth from 0 to 4. `subtitle` and `code` are optional.";

/// A system instruction plus the user's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// Append a self-healing feedback block to the user message.
    pub fn with_feedback(&self, prefix: &str, error: &str) -> Self {
        Self {
            system: self.system.clone(),
            user: format!("{}\n\n{}{}", self.user, prefix, error),
        }
    }
}

/// Renders the system instruction for each generation mode.
pub struct PromptBuilder {
    registry: Handlebars<'static>,
}

impl PromptBuilder {
    /// Create a builder using the built-in templates.
    pub fn new() -> Result<Self> {
        Self::with_templates(None, None)
    }

    /// Create a builder using template overrides from the configuration.
    pub fn from_config(config: &SlidesmithConfig) -> Result<Self> {
        Self::with_templates(
            config.prompt_script_template.as_deref(),
            config.prompt_structured_template.as_deref(),
        )
    }

    fn with_templates(script: Option<&str>, structured: Option<&str>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string("script", script.unwrap_or(SCRIPT_TEMPLATE))?;
        registry.register_template_string("structured", structured.unwrap_or(STRUCTURED_TEMPLATE))?;
        Ok(Self { registry })
    }

    /// Build the prompt pair for a request.
    pub fn build(&self, mode: GenerationMode, request: &GenerationRequest) -> Result<PromptPair> {
        let name = match mode {
            GenerationMode::Script => "script",
            GenerationMode::Structured => "structured",
        };
        let data = json!({
            "slide_count": request.slide_count,
            "color": request.background_color.to_string(),
            "library": REQUIRED_LIBRARY,
            "output_file": OUTPUT_FILE,
        });
        let system = self.registry.render(name, &data)?;

        Ok(PromptPair {
            system,
            user: request.content_description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rgb;

    fn cats() -> GenerationRequest {
        GenerationRequest::new(3, "Intro to cats").with_color("#112233".parse::<Rgb>().unwrap())
    }

    #[test]
    fn test_script_prompt_constraints() {
        let prompt = PromptBuilder::new().unwrap().build(GenerationMode::Script, &cats()).unwrap();

        assert!(prompt.system.contains("exactly 3 slides"));
        assert!(prompt.system.contains("#112233"));
        assert!(prompt.system.contains("You must use the python-pptx library"));
        assert!(prompt.system.contains("Create exactly one Presentation object."));
        assert!(prompt.system.contains("Save the presentation as 'output.pptx'"));
        assert!(prompt.system.contains("Output only raw Python code."));
        assert_eq!(prompt.user, "Intro to cats");
    }

    #[test]
    fn test_structured_prompt_constraints() {
        let prompt = PromptBuilder::new().unwrap().build(GenerationMode::Structured, &cats()).unwrap();

        assert!(prompt.system.contains("exactly 3 slides"));
        assert!(prompt.system.contains("#112233"));
        assert!(prompt.system.contains("\"layout\": \"title\""));
    }

    #[test]
    fn test_description_is_not_escaped() {
        let request = GenerationRequest::new(2, "<b>Cats & \"dogs\"</b> {{x}}");
        let prompt = PromptBuilder::new().unwrap().build(GenerationMode::Script, &request).unwrap();
        assert_eq!(prompt.user, "<b>Cats & \"dogs\"</b> {{x}}");
    }

    #[test]
    fn test_template_override() {
        let config = SlidesmithConfig {
            prompt_script_template: Some("n={{slide_count}} c={{color}}".to_string()),
            ..SlidesmithConfig::default()
        };
        let prompt = PromptBuilder::from_config(&config)
            .unwrap()
            .build(GenerationMode::Script, &cats())
            .unwrap();
        assert_eq!(prompt.system, "n=3 c=#112233");
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let config = SlidesmithConfig {
            prompt_script_template: Some("{{missing}}".to_string()),
            ..SlidesmithConfig::default()
        };
        let builder = PromptBuilder::from_config(&config).unwrap();
        assert!(builder.build(GenerationMode::Script, &cats()).is_err());
    }

    #[test]
    fn test_feedback() {
        let prompt = PromptPair { system: "s".into(), user: "u".into() };
        let healed = prompt.with_feedback("FIX:\n", "bad syntax");
        assert_eq!(healed.system, "s");
        assert_eq!(healed.user, "u\n\nFIX:\nbad syntax");
    }
}
