//! Script generation via the Claude CLI.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::prompt::{generalize_prompt, refine_prompt};

/// Generates and refines automation scripts by prompting the Claude CLI.
pub struct ScriptGenerator {
    claude_path: String,
    model: Option<String>,
}

impl ScriptGenerator {
    pub fn new() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
        }
    }

    pub fn with_claude_path(mut self, path: String) -> Self {
        self.claude_path = path;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Generate a comprehensive script from a recorded session and free-text
    /// guidelines.
    pub async fn generate(&self, recorded_code: &str, guidelines: &str) -> Result<String> {
        let prompt = generalize_prompt(recorded_code, guidelines);
        let response = self.call_claude(&prompt).await?;
        let script = strip_code_fence(&response);
        anyhow::ensure!(!script.is_empty(), "model returned an empty script");
        Ok(script)
    }

    /// Regenerate the current script from operator feedback and the previous
    /// run's error output.
    pub async fn refine(
        &self,
        current_code: &str,
        feedback: &str,
        error_message: Option<&str>,
    ) -> Result<String> {
        let prompt = refine_prompt(current_code, feedback, error_message);
        let response = self.call_claude(&prompt).await?;
        let script = strip_code_fence(&response);
        anyhow::ensure!(!script.is_empty(), "model returned an empty script");
        Ok(script)
    }

    async fn call_claude(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.claude_path);
        cmd.arg("--print") // Non-interactive mode
            .arg("--output-format")
            .arg("json");

        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .context("Failed to spawn Claude CLI. Is 'claude' installed?")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .context("Failed to write prompt to Claude")?;
            stdin.shutdown().await.context("Failed to close stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for Claude CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Claude CLI failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let response: serde_json::Value =
            serde_json::from_str(&stdout).context("Failed to parse Claude CLI output as JSON")?;

        let text = response
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Claude response missing 'text' field"))?;

        Ok(text.to_string())
    }
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a surrounding markdown code fence (any language tag) from a model
/// response. Responses without a fence pass through trimmed.
pub fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_python_fence() {
        let response = "```python\nimport time\nprint('hi')\n```";
        assert_eq!(strip_code_fence(response), "import time\nprint('hi')");
    }

    #[test]
    fn strips_bare_fence() {
        let response = "```\ncode here\n```";
        assert_eq!(strip_code_fence(response), "code here");
    }

    #[test]
    fn passes_through_unfenced_text() {
        assert_eq!(strip_code_fence("  plain code  "), "plain code");
    }

    #[test]
    fn tolerates_missing_closing_fence() {
        let response = "```python\nimport time";
        assert_eq!(strip_code_fence(response), "import time");
    }
}
