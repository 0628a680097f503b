/// Sampling parameters and session settings sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub generation: GenerationConfig,
    pub system_instruction: String,
}

impl SessionConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash-lite-preview-06-17";

    pub fn from_preset(preset: Preset) -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            generation: GenerationConfig::default(),
            system_instruction: preset.system_instruction(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            response_mime_type: ResponseFormat::PlainText,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    PlainText,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
        }
    }
}

impl serde::Serialize for ResponseFormat {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

const CORRECTION_PROMPT: &str = "Input text for correction. Apply British English conventions for grammar, spelling, and punctuation. Ensure the output is clear, concise, and adheres to the established style guide.";

const CORRECTION_PROMPT_PRESERVE_EMOJI: &str = "Input text for correction. Apply British English conventions for grammar, spelling, and punctuation. Retain all original emojis in their positions. Ensure the final text is clear, concise, and adheres to the established style guide.";

const CORRECTION_PROMPT_MODERN_SEMICOLONS: &str = "Input text for correction. Apply British English conventions for grammar, spelling, and punctuation. For a modern casual style, replace semicolons with alternatives where appropriate for clarity and flow. Retain all original emojis in their positions. Ensure the final text is clear, concise, and adheres to the established style guide.";

const CORRECTION_PROMPT_MODERN_CASUAL: &str = "Input text for correction. Apply British English conventions for grammar, spelling, and punctuation. For a modern casual style, replace semicolons with alternatives where appropriate for clarity and flow. Add appropriate emojis where they naturally enhance the message. Ensure the final text is clear, concise, and adheres to the established style guide.";

const CORRECTION_STYLE_GUIDE: &str = "* Apply British English spelling, grammar, and punctuation.
* Ensure the text is clear and concise.
* Use active voice where it improves clarity and is grammatically appropriate.
* Prioritise accuracy and natural phrasing according to British English conventions.";

/// Built-in system instructions selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Preset {
    Standard,
    StyleGuide,
    PreserveEmoji,
    ModernSemicolons,
    #[default]
    ModernCasual,
}

impl Preset {
    pub fn system_instruction(&self) -> String {
        match self {
            Self::Standard => CORRECTION_PROMPT.to_string(),
            Self::StyleGuide => format!("{}\n{}", CORRECTION_PROMPT, CORRECTION_STYLE_GUIDE),
            Self::PreserveEmoji => CORRECTION_PROMPT_PRESERVE_EMOJI.to_string(),
            Self::ModernSemicolons => CORRECTION_PROMPT_MODERN_SEMICOLONS.to_string(),
            Self::ModernCasual => CORRECTION_PROMPT_MODERN_CASUAL.to_string(),
        }
    }
}
