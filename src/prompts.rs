//! Prompts for VLM-based question generation.
//!
//! Every prompt lives here so the model contract (a JSON array of
//! `{"Question", "answers", "correct_answer"}` objects) is defined in exactly
//! one place, and tests can inspect the text without a live model.
//!
//! Callers can override either prompt via
//! [`crate::config::QuizConfig::system_prompt`] and
//! [`crate::config::QuizConfig::user_prompt`].

/// Default system prompt for turning page images into quiz questions.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an experienced teacher writing multiple-choice quiz questions from textbook pages.

You receive images of a few consecutive pages from one document. Follow these rules precisely:

1. CONTENT
   - Every question must be answerable from the content shown on these pages
   - Ask about concepts, facts and relationships, not page layout or numbering
   - Do not ask about figures you cannot read clearly

2. ANSWERS
   - Each question has exactly 4 answer options
   - Exactly one option is correct
   - Incorrect options must be plausible and clearly wrong to a reader of the pages
   - Do not use "all of the above" or "none of the above"

3. OUTPUT FORMAT
   - Output ONLY a JSON array, with no commentary before or after
   - Each element is an object with keys "Question" (string), "answers"
     (array of 4 strings) and "correct_answer" (integer index 0-3 of the
     correct option)"#;

/// Build the user instruction asking for `count` questions.
pub fn user_instruction(count: usize) -> String {
    let noun = if count == 1 { "question" } else { "questions" };
    format!(
        "Write {count} multiple-choice {noun} about the pages shown. \
Respond with a JSON array of exactly {count} objects in this shape:\n\
[{{\"Question\": \"...\", \"answers\": [\"...\", \"...\", \"...\", \"...\"], \"correct_answer\": 0}}]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_key() {
        for key in ["\"Question\"", "\"answers\"", "\"correct_answer\""] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(key), "missing {key}");
        }
    }

    #[test]
    fn user_instruction_counts() {
        let two = user_instruction(2);
        assert!(two.contains("Write 2 multiple-choice questions"));
        assert!(two.contains("exactly 2 objects"));
        assert!(user_instruction(1).contains("1 multiple-choice question "));
    }

    #[test]
    fn user_instruction_example_is_valid_json() {
        let text = user_instruction(2);
        let start = text.find('[').unwrap();
        let example: serde_json::Value = serde_json::from_str(&text[start..]).unwrap();
        assert!(example.is_array());
    }
}
