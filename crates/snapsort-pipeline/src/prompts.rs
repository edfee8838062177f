//! Instruction templates sent to the vision model.

use snapsort_core::{AnalysisRecord, Item};

/// Per-image instruction; asks for one JSON object.
pub const ANALYSIS_TEMPLATE: &str = r#"Analyze this image and respond with ONLY a JSON object, no other text:
{
  "content": "short descriptive filename slug, 2-5 words joined by underscores (e.g. lunch_receipt_cafe)",
  "extractedText": "the most important visible text, at most 150 characters, empty string if none",
  "theme": "one lowercase word for the broad theme (e.g. receipts, travel, code, memes, documents)",
  "confidence": integer from 0 to 100 describing how sure you are
}"#;

/// Aggregate grouping instruction preamble.
pub const CATEGORIZE_TEMPLATE: &str = r#"You are organizing a batch of images into folders. Each image is listed below with its index, a content description, any extracted text, a theme, and its original filename.

Group the images into a small number of meaningful categories. Every image index must appear in exactly one category.

Respond with ONLY a JSON object mapping a short lowercase category name to its description and member indices, no other text:
{
  "category_name": {"description": "what these images have in common", "images": [0, 2]}
}"#;

/// Per-image instruction, optionally steered by the user's directive.
pub fn analysis_prompt(user_prompt: Option<&str>) -> String {
    with_user_directive(ANALYSIS_TEMPLATE.to_string(), user_prompt)
}

/// Aggregate instruction listing every analyzed image.
pub fn categorize_prompt(
    items: &[Item],
    records: &[AnalysisRecord],
    user_prompt: Option<&str>,
) -> String {
    let mut prompt = String::from(CATEGORIZE_TEMPLATE);
    prompt.push_str("\n\nImages:\n");
    for record in records {
        let name = items
            .get(record.index)
            .and_then(|item| item.original_name.as_deref())
            .unwrap_or("(unnamed)");
        prompt.push_str(&format!(
            "- index {}: content=\"{}\", text=\"{}\", theme=\"{}\", filename=\"{}\"\n",
            record.index,
            record.content,
            record.extracted_text.replace('"', "'"),
            record.theme,
            name
        ));
    }
    with_user_directive(prompt, user_prompt)
}

fn with_user_directive(mut prompt: String, user_prompt: Option<&str>) -> String {
    if let Some(directive) = user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str("\n\nAdditional instructions from the user:\n");
        prompt.push_str(directive);
    }
    prompt
}
