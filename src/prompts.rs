use crate::error::PromptError;

/// Build the linguistic analysis prompt for `word` in `language`.
///
/// The word is embedded as submitted; only the emptiness check trims it.
pub fn build_analysis_prompt(word: &str, language: &str) -> Result<String, PromptError> {
    if word.trim().is_empty() {
        return Err(PromptError::InvalidInput("word must not be empty"));
    }

    Ok(format!(
        r#"You are a professional linguist.

Analyze the word **{word}** in **{language}**.

Provide:
1. Word type
2. 5 synonyms
3. 3 antonyms
4. 5 example sentences
5. 3 meanings

Format clearly. Dictionary style only."#
    ))
}

/// Build the prompt that translates `content` into `target_language`.
///
/// Empty content is allowed and produces a prompt with an empty body.
pub fn build_translation_prompt(content: &str, target_language: &str) -> String {
    format!(
        r#"Translate the following content into **{target_language}**.
Preserve formatting and meaning.

Content:
{content}"#
    )
}
