//! Prompt templates for script generation and refinement.

/// Prompt asking for a comprehensive test script built on a recorded session.
pub fn generalize_prompt(recorded_code: &str, guidelines: &str) -> String {
    format!(
        r#"You are an expert browser-automation engineer.

Below is a recorded automation script. Use it as a basis to generate a new, more comprehensive script according to the user guidelines. The response must be a standalone script that includes only code and inline comments. Do not include any explanatory text outside of comments.

Recorded Code:
{recorded_code}

User Guidelines:
{guidelines}

Requirements:
- Use the recorded code as a foundation.
- Incorporate the user guidelines into the new script.
- Ensure proper wait conditions for page loads.
- Add error handling and retry mechanisms.
- Introduce randomness where applicable (random selections, random delays).
- Include progress indicators.
- Add any data collection or metrics the guidelines ask for.
- The final output must be pure code with inline comments; no plaintext explanations.

Return only the complete script, inside a fenced code block."#,
        recorded_code = recorded_code,
        guidelines = guidelines
    )
}

/// Prompt asking for an updated script given operator feedback and the last
/// run's error output, if any.
pub fn refine_prompt(current_code: &str, feedback: &str, error_message: Option<&str>) -> String {
    let error_section = match error_message {
        Some(err) if !err.is_empty() => {
            format!("\n\nIf the last run failed, here is the error message:\n{}", err)
        }
        _ => String::new(),
    };

    format!(
        r#"You are an expert browser-automation engineer.

Below is the current automation script:
{current_code}

User Feedback:
{feedback}{error_section}

Requirements:
- Incorporate the user feedback.
- Fix any issues that caused errors, if provided.
- Keep all existing functionality unless explicitly asked to remove it.
- Maintain randomness and robustness.
- Add any new error handling needed for new features.
- The final output must be a standalone script with inline comments; no plaintext explanations.

Return only the complete updated script, inside a fenced code block."#,
        current_code = current_code,
        feedback = feedback,
        error_section = error_section
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generalize_prompt_embeds_both_inputs() {
        let prompt = generalize_prompt("page.goto('x')", "collect stats once per second");
        assert!(prompt.contains("Recorded Code"));
        assert!(prompt.contains("page.goto('x')"));
        assert!(prompt.contains("collect stats once per second"));
    }

    #[test]
    fn refine_prompt_includes_error_only_when_present()  {
        let with = refine_prompt("code", "feedback", Some("Exit code 1"));
        assert!(with.contains("Exit code 1"));
        let without = refine_prompt("code", "feedback", None);
        assert!(!without.contains("here is the error message"));
    }
}
