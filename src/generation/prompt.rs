/// Positive/negative prompt pair for local image synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub positive: String,
    pub negative: String,
}

const NEGATIVE_BOILERPLATE: &str =
    "low quality, bad quality, sketches, terrible, lowres, blurring";

/// Renders the fixed synthesis template for a (room type, style) pair.
/// Pure; no randomness, identical inputs give identical prompts.
pub fn build_prompt_pair(room_type: &str, style: &str) -> PromptPair {
    PromptPair {
        positive: format!(
            "Professional interior design of a {style} {room_type}, photorealistic, 8k, \
             high quality, architectural photography, detailed, cinematic lighting and \
             make sure the output is based on the provided image"
        ),
        negative: NEGATIVE_BOILERPLATE.to_string(),
    }
}

/// Natural-language prompt for the remote critique tier.
pub fn build_critique_prompt(room_type: &str, style: &str) -> String {
    format!(
        "Act as an interior designer. Analyze this room and provide detailed suggestions \
         to redesign it in a {style} style for a {room_type}. Be specific about colors, \
         furniture, and layout."
    )
}
