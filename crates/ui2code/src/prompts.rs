//! Fixed instructions and message builders for the four stages.

use crate::inference::{InferenceRequest, Part};
use crate::types::Stage;
use crate::upload::PreparedImage;

pub const DESCRIBE_INSTRUCTION: &str = "Describe this UI in accurate details. \
When you reference a UI element put its name and bounding box in the format: \
[object name (y_min, x_min, y_max, x_max)]. Also Describe the color of the elements.";

pub const REFINE_DESCRIPTION_INSTRUCTION: &str = "Compare the described UI elements with \
the provided image and identify any missing elements or inaccuracies. Also Describe the \
color of the elements. Provide a refined and accurate description of the UI elements \
based on this comparison.";

pub const GENERATE_MARKUP_INSTRUCTION: &str = "Create an HTML file based on the following \
UI description, using the UI elements described in the previous response. Include inline \
CSS within the HTML file to style the elements. Make sure the colors used are the same as \
the original UI. The UI needs to be responsive and mobile-first, matching the original UI \
as closely as possible. Do not include any explanations or comments. ONLY return the HTML \
code with inline CSS.";

pub const REFINE_MARKUP_INSTRUCTION: &str = "Validate the following HTML code based on the \
UI description and provide a refined version of the HTML code with inline CSS that \
improves accuracy, responsiveness, and adherence to the original design. ONLY return the \
refined HTML code with inline CSS.";

const DESCRIBE_PROMPT: &str = "Analyze this image and describe the UI elements in detail.";
const GENERATE_MARKUP_PREFIX: &str = "Generate an HTML file with inline CSS for the described UI: ";
const REFINE_MARKUP_PREFIX: &str =
    "Refine the HTML code based on the description and the initial HTML code.";

/// System instruction for a stage.
pub fn instruction(stage: Stage) -> &'static str {
    match stage {
        Stage::Describe => DESCRIBE_INSTRUCTION,
        Stage::RefineDescription => REFINE_DESCRIPTION_INSTRUCTION,
        Stage::GenerateMarkup => GENERATE_MARKUP_INSTRUCTION,
        Stage::RefineMarkup => REFINE_MARKUP_INSTRUCTION,
    }
}

fn image_part(image: &PreparedImage) -> Part {
    Part::Image {
        mime_type: image.mime_type().to_string(),
        data: image.bytes().to_vec(),
    }
}

/// Stage 1: the screenshot plus a fixed analysis prompt.
pub fn describe(image: &PreparedImage) -> InferenceRequest {
    InferenceRequest::new(
        instruction(Stage::Describe),
        vec![Part::text(DESCRIBE_PROMPT), image_part(image)],
    )
}

/// Stage 2: the stage-1 text and the same screenshot.
pub fn refine_description(description: &str, image: &PreparedImage) -> InferenceRequest {
    InferenceRequest::new(
        instruction(Stage::RefineDescription),
        vec![Part::text(description), image_part(image)],
    )
}

/// Stage 3: the refined description only, no image.
pub fn generate_markup(refined_description: &str) -> InferenceRequest {
    InferenceRequest::new(
        instruction(Stage::GenerateMarkup),
        vec![Part::text(format!(
            "{GENERATE_MARKUP_PREFIX}{refined_description}"
        ))],
    )
}

/// Stage 4: the refined description and the stage-3 markup.
pub fn refine_markup(refined_description: &str, markup: &str) -> InferenceRequest {
    InferenceRequest::new(
        instruction(Stage::RefineMarkup),
        vec![Part::text(format!(
            "{REFINE_MARKUP_PREFIX}\n\nUI description:\n{refined_description}\n\nInitial HTML code:\n{markup}"
        ))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn image() -> PreparedImage {
        PreparedImage::from_image(&DynamicImage::new_rgb8(8, 8)).unwrap()
    }

    #[test]
    fn test_describe_carries_bounding_box_convention() {
        let req = describe(&image());
        assert!(req
            .system_instruction
            .contains("[object name (y_min, x_min, y_max, x_max)]"));
        assert!(req.has_image());
        assert_eq!(req.text(), DESCRIBE_PROMPT);
    }

    #[test]
    fn test_refine_description_sends_text_then_image() {
        let req = refine_description("three buttons", &image());
        assert_eq!(req.parts[0], Part::text("three buttons"));
        assert!(matches!(req.parts[1], Part::Image { .. }));
    }

    #[test]
    fn test_markup_stages_are_text_only() {
        let generate = generate_markup("a header");
        assert!(!generate.has_image());
        assert!(generate.text().ends_with("a header"));

        let refine = refine_markup("a header", "<html></html>");
        assert!(!refine.has_image());
        assert!(refine.text().contains("a header"));
        assert!(refine.text().contains("<html></html>"));
    }

    #[test]
    fn test_each_stage_has_its_own_instruction() {
        let mut seen: Vec<_> = Stage::ALL.iter().map(|s| instruction(*s)).collect();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }
}
