//! Prompt assembly for grounded answers.
//!
//! The layout (section headers, rule wording, the `image_url`/`text` keys)
//! is what [`crate::answer::parse_reply`] relies on. Keep them in step.

use crate::models::RetrievedDocument;

/// Builds the single user message sent to the completion model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    default_image: String,
}

impl PromptBuilder {
    pub fn new(default_image: impl Into<String>) -> Self {
        Self {
            default_image: default_image.into(),
        }
    }

    pub fn build(&self, documents: &[RetrievedDocument], query: &str, language: &str) -> String {
        let numbered = documents
            .iter()
            .enumerate()
            // `{}` is the empty image slot the model is told to look for.
            .map(|(i, doc)| format!("{}. {{}}\n{}", i + 1, doc.text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Given the following information, please provide an answer based solely on one relevant \
             document that best addresses the user's query.\n\
             Reference only the most applicable document for the answer, and include any available \
             images from the same document.\n\
             If the document contains no image, use the placeholder image provided.\n\n\
             ===\nRelevant Documents\n{documents}\n\n\
             ===\nCurrent Conversation\n\
             Transcript of the current conversation, use it to determine the context of the question:\n\
             USER:{query}\n\n\
             ===\n\
             When answering, ensure that:\n\
             - The answer is grounded in the provided documents and conversation context.\n\
             - Always try to answer the query if applicable document or context is available, \
             even if no image is provided.\n\
             Keep responses concise (2 to 3 sentences) and within 200 - 300 words.\n\
             - The information from the summarised document does not lose or change any of its meanings.\n\
             - Do not refer to 'provided documents' in your response.\n\
             - If an image is available from the chosen document, include its URL.\n\
             - If no image is available in the referenced document, use the default placeholder URL:\n\
             {default_image}\n\
             If the answer is not known or cannot be determined from the provided documents or context, \
             please state that you do not know to the user.\n\
             Your response should be in a json format with 'image_url' for the appropriate image url \
             and 'text' for your answer.\n\
             Your response should be in simple {language}.",
            documents = numbered,
            query = query,
            default_image = self.default_image,
            language = language,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<RetrievedDocument> {
        texts
            .iter()
            .map(|t| RetrievedDocument { text: t.to_string() })
            .collect()
    }

    #[test]
    fn test_documents_numbered_in_rank_order() {
        let prompt = PromptBuilder::new("https://img/default.png").build(
            &docs(&["Refunds take 14 days.", "Shipping is free."]),
            "What is the refund policy?",
            "English",
        );

        assert!(prompt.contains(
            "===\nRelevant Documents\n1. {}\nRefunds take 14 days.\n2. {}\nShipping is free.\n\n==="
        ));
        assert!(prompt.find("1. {}").unwrap() < prompt.find("2. {}").unwrap());
    }

    #[test]
    fn test_query_language_and_placeholder_embedded() {
        let prompt = PromptBuilder::new("https://img/default.png").build(
            &docs(&["a"]),
            "Where is my order?",
            "Malay",
        );

        assert!(prompt.contains("USER:Where is my order?\n\n==="));
        assert!(prompt.contains("default placeholder URL:\nhttps://img/default.png\n"));
        assert!(prompt.contains("'image_url' for the appropriate image url and 'text' for your answer."));
        assert!(prompt.ends_with("Your response should be in simple Malay."));
    }

    #[test]
    fn test_deterministic_and_handles_no_documents() {
        let builder = PromptBuilder::new("https://img/default.png");
        let a = builder.build(&[], "hi", "English");
        let b = builder.build(&[], "hi", "English");

        assert_eq!(a, b);
        assert!(a.contains("Relevant Documents\n\n\n===\nCurrent Conversation"));
    }

    #[test]
    fn test_instruction_block_line_breaks() {
        let prompt = PromptBuilder::new("https://img/default.png").build(&docs(&["a"]), "q", "English");

        assert!(prompt.starts_with(
            "Given the following information, please provide an answer based solely on one relevant document"
        ));
        assert!(prompt.contains("===\nWhen answering, ensure that:\n- The answer is grounded"));
        assert!(prompt.contains("even if no image is provided.\nKeep responses concise (2 to 3 sentences)"));
        assert!(prompt.contains("- Do not refer to 'provided documents' in your response.\n"));
    }
}
