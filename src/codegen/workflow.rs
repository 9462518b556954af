//! Interactive regeneration workflow: record (or reuse) a session script,
//! generalize it through the model, run it, then loop on feedback files until
//! the operator is satisfied.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::process::Command;

use super::generator::ScriptGenerator;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Recorder executable; invoked as `<recorder> codegen <url> -o <file>`.
    pub recorder_cmd: String,
    /// Interpreter used to run the generated script.
    pub runner_cmd: String,
    pub recordings_dir: PathBuf,
    pub generated_dir: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recorder_cmd: "playwright".to_string(),
            runner_cmd: "python3".to_string(),
            recordings_dir: PathBuf::from("recordings"),
            generated_dir: PathBuf::from("generated"),
        }
    }
}

pub struct RegenWorkflow {
    generator: ScriptGenerator,
    config: WorkflowConfig,
}

impl RegenWorkflow {
    pub fn new(generator: ScriptGenerator, config: WorkflowConfig) -> Self {
        Self { generator, config }
    }

    pub async fn run(&self) -> Result<()> {
        println!("Welcome to the script regeneration workflow!");
        println!("{}", "-".repeat(50));

        tokio::fs::create_dir_all(&self.config.recordings_dir).await?;
        tokio::fs::create_dir_all(&self.config.generated_dir).await?;

        // Step 1: an existing recording, or record a fresh one
        let existing = prompt_line(
            "If you have an existing recording file, enter its path (or press Enter to skip): ",
        )?;

        let (recording_path, name) = if existing.is_empty() {
            let url = prompt_line("Enter the URL to record against: ")?;
            anyhow::ensure!(!url.is_empty(), "a URL is required to record a session");
            let name = prompt_line("Enter the base filename (without extension): ")?;
            anyhow::ensure!(!name.is_empty(), "a base filename is required");
            let path = self.record_session(&url, &name).await?;
            (path, name)
        } else {
            let path = PathBuf::from(&existing);
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("session")
                .to_string();
            (path, name)
        };

        let recorded_code = tokio::fs::read_to_string(&recording_path)
            .await
            .with_context(|| format!("reading {}", recording_path.display()))?;

        // Step 2: guidelines
        let guidelines = self.read_optional_file_prompt(
            "Enter the path to a guidelines text file (or press Enter to skip): ",
        )?;

        // Step 3: generate and save
        println!("Sending code and guidelines to the model...");
        let mut current_code = self
            .generator
            .generate(&recorded_code, &guidelines)
            .await
            .context("script generation failed")?;

        let generated_path = self.config.generated_dir.join(format!("{}_gen.py", name));
        tokio::fs::write(&generated_path, &current_code).await?;
        println!(
            "Generated script saved to {} at {}",
            generated_path.display(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        // Step 4: run, then loop on feedback files
        let mut last_error = self.run_script(&generated_path).await;

        loop {
            let feedback = self.read_optional_file_prompt(
                "If you have feedback saved in a file, enter its path (or press Enter if satisfied): ",
            )?;
            if feedback.is_empty() {
                println!("Workflow completed. Final script: {}", generated_path.display());
                return Ok(());
            }

            println!("Updating the script from feedback...");
            match self
                .generator
                .refine(&current_code, &feedback, last_error.as_deref())
                .await
            {
                Ok(updated) => {
                    current_code = updated;
                    tokio::fs::write(&generated_path, &current_code).await?;
                    println!("Script updated and saved to {}", generated_path.display());
                }
                Err(e) => {
                    // Terminal for this step only; the operator can retry
                    // with another feedback round.
                    eprintln!("Error updating script: {}", e);
                    continue;
                }
            }

            println!("Running updated script...");
            last_error = self.run_script(&generated_path).await;
        }
    }

    /// Launch the external recorder and wait for the operator to finish the
    /// interactive session.
    async fn record_session(&self, url: &str, name: &str) -> Result<PathBuf> {
        let output_file = self.config.recordings_dir.join(format!("{}.py", name));
        println!(
            "Recording session for {} -> {}",
            url,
            output_file.display()
        );
        println!("Complete your interactions in the recorder window, then close it.");

        let status = Command::new(&self.config.recorder_cmd)
            .arg("codegen")
            .arg(url)
            .arg("-o")
            .arg(&output_file)
            .status()
            .await
            .with_context(|| format!("failed to run {}", self.config.recorder_cmd))?;

        anyhow::ensure!(
            status.success(),
            "recorder exited with {}; ensure you completed and closed the recording window",
            status
        );
        Ok(output_file)
    }

    /// Run the generated script. A failure is reportable but never fatal:
    /// the error text feeds the next refinement round.
    async fn run_script(&self, script: &Path) -> Option<String> {
        println!("Launching script: {}", script.display());
        match Command::new(&self.config.runner_cmd)
            .arg(script)
            .status()
            .await
        {
            Ok(status) if status.success() => {
                println!("Script executed successfully.");
                None
            }
            Ok(status) => {
                println!(
                    "Script completed with non-zero exit code ({}); inspect the browser window for details.",
                    status
                );
                Some(format!("Exit code {}", status))
            }
            Err(e) => {
                eprintln!("Failed to launch script: {}", e);
                Some(e.to_string())
            }
        }
    }

    /// Ask for a file path; empty input or an unreadable file yields "".
    fn read_optional_file_prompt(&self, message: &str) -> Result<String> {
        let path = prompt_line(message)?;
        if path.is_empty() {
            return Ok(String::new());
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                println!("Loaded {}", path);
                Ok(content.trim().to_string())
            }
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                Ok(String::new())
            }
        }
    }
}

/// Print a prompt and read one trimmed line from stdin.
pub fn prompt_line(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
