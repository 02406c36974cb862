//! Prompt text sent to the vendor.
//!
//! Product-facing text (name, features, style names) is requested in
//! Simplified Chinese for display, while the visual description and style
//! keywords are requested in English because they are fed back into the
//! image model's prompt.

use crate::types::{ProductAnalysis, StyleOption};
use serde_json::{json, Value};

/// Number of styles the analysis asks for.
pub const SUGGESTED_STYLE_COUNT: usize = 4;

/// Instruction sent with the product photo when analyzing it.
pub fn analysis_prompt() -> String {
    format!(
        r#"Analyze this product image for Amazon A+ content creation.

Respond in JSON with these fields:
1. "productName": the product name and type, in Simplified Chinese (简体中文).
2. "keyFeatures": 3-4 visible key features (materials, color, design), in Simplified Chinese (简体中文).
3. "visualDescription": a concise visual description of the object in English, to be reused in image generation prompts.
4. "suggestedStyles": exactly {count} distinct, professional visual styles suited to marketing this specific product on Amazon. Each style has:
   - "id": a unique id such as "style_1"
   - "name": the style name in Simplified Chinese (e.g. "简约现代", "户外探险")
   - "description": a short description of the mood in Simplified Chinese
   - "promptModifier": descriptive English keywords to append to a generation prompt (e.g. "soft lighting, clean white background, podium")"#,
        count = SUGGESTED_STYLE_COUNT
    )
}

/// Response schema constraining the analysis JSON.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "productName": { "type": "STRING" },
            "keyFeatures": { "type": "ARRAY", "items": { "type": "STRING" } },
            "visualDescription": { "type": "STRING" },
            "suggestedStyles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "promptModifier": { "type": "STRING" }
                    },
                    "required": ["id", "name", "description", "promptModifier"]
                }
            }
        },
        "required": ["productName", "keyFeatures", "visualDescription", "suggestedStyles"]
    })
}

/// Composition prompt for one generated marketing image.
pub fn composition_prompt(
    analysis: &ProductAnalysis,
    style: &StyleOption,
    custom_instructions: Option<&str>,
) -> String {
    let mut prompt = String::from("Create a professional Amazon A+ marketing image.\n\n");

    prompt.push_str(&format!(
        "Product Description (Visuals): {}.\n\n",
        analysis.visual_description.trim().trim_end_matches('.')
    ));
    prompt.push_str(&format!(
        "Target Style: {} (Style keywords: {}).\n",
        style.name, style.prompt_modifier
    ));

    if let Some(extra) = custom_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("Additional Instructions: {}\n", extra));
    }

    prompt.push_str(
        "\nThe image should be high-resolution, photorealistic, and commercially focused. \
         Make the product the central focus. \
         Ensure high quality lighting and composition suitable for e-commerce. \
         Do not include any text or logos on the image.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (ProductAnalysis, StyleOption) {
        let style = StyleOption {
            id: "style_1".into(),
            name: "简约现代".into(),
            description: "干净明亮".into(),
            prompt_modifier: "soft lighting, marble podium".into(),
        };
        let analysis = ProductAnalysis {
            product_name: "陶瓷咖啡杯".into(),
            key_features: vec!["手工釉面".into()],
            visual_description: "A glazed ceramic coffee mug in sage green.".into(),
            suggested_styles: vec![style.clone()],
        };
        (analysis, style)
    }

    #[test]
    fn test_analysis_prompt_requests_dual_languages() {
        let prompt = analysis_prompt();
        assert!(prompt.contains("Simplified Chinese"));
        assert!(prompt.contains("visualDescription"));
        assert!(prompt.contains("in English"));
        assert!(prompt.contains("exactly 4"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = analysis_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert_eq!(
            schema["properties"]["suggestedStyles"]["items"]["required"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_composition_prompt_contents() {
        let (analysis, style) = fixture();
        let prompt = composition_prompt(&analysis, &style, None);

        assert!(prompt.contains("A glazed ceramic coffee mug in sage green."));
        assert!(!prompt.contains("green.."));
        assert!(prompt.contains("Target Style: 简约现代 (Style keywords: soft lighting, marble podium)"));
        assert!(prompt.contains("photorealistic"));
        assert!(prompt.contains("Do not include any text or logos"));
        assert!(!prompt.contains("Additional Instructions"));
    }

    #[test]
    fn test_composition_prompt_custom_instructions() {
        let (analysis, style) = fixture();
        let prompt = composition_prompt(&analysis, &style, Some("  add steam rising  "));
        assert!(prompt.contains("Additional Instructions: add steam rising\n"));

        let blank = composition_prompt(&analysis, &style, Some("   "));
        assert!(!blank.contains("Additional Instructions"));
    }
}
