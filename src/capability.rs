//! External collaborators consumed by the core.
//!
//! Both capabilities are black boxes: the core hands over text and gets text
//! back, or a failure. Transport is the adapter's business.

use std::process::Stdio;

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Turns free text into JSON shaped like `{name, id, results: [{subject, score}]}`.
#[allow(async_fn_in_trait)]
pub trait TextUnderstanding {
    async fn extract(&self, text: &str) -> anyhow::Result<String>;
}

/// Produces a narrative performance summary from an encoded request.
#[allow(async_fn_in_trait)]
pub trait NarrativeSummary {
    async fn summarize(&self, request: &str) -> anyhow::Result<String>;
}

/// Runs an external program per call: the request goes to stdin and stdout is
/// the response.
#[derive(Debug, Clone)]
pub struct CommandCapability {
    program: String,
    args: Vec<String>,
}

impl CommandCapability {
    /// Splits a command line on whitespace; the first word is the program.
    pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().context("capability command is empty")?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    async fn run(&self, input: &str) -> anyhow::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start `{}`", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .context("capability stdin was not captured")?;
        // Feed stdin while draining stdout, or a chatty child fills the pipe
        // and both ends stall.
        let feed = async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{}` exited with {}: {}", self.program, output.status, stderr.trim());
        }
        fed.with_context(|| format!("failed to send the request to `{}`", self.program))?;

        String::from_utf8(output.stdout).context("capability output is not valid UTF-8")
    }
}

impl TextUnderstanding for CommandCapability {
    async fn extract(&self, text: &str) -> anyhow::Result<String> {
        self.run(text).await
    }
}

impl NarrativeSummary for CommandCapability {
    async fn summarize(&self, request: &str) -> anyhow::Result<String> {
        self.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_splits_program_and_args() {
        let capability = CommandCapability::from_command_line("extractor --model  fast").unwrap();
        assert_eq!(capability.program, "extractor");
        assert_eq!(capability.args, vec!["--model", "fast"]);
        assert!(CommandCapability::from_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echoes_through_the_program() {
        let capability = CommandCapability::from_command_line("cat").unwrap();
        let response = capability.extract("{\"name\":\"Ada\"}").await.unwrap();
        assert_eq!(response, "{\"name\":\"Ada\"}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_requests_do_not_stall() {
        let capability = CommandCapability::from_command_line("cat").unwrap();
        let request = "x".repeat(512 * 1024);
        let response = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            capability.extract(&request),
        )
        .await
        .expect("capability call stalled")
        .unwrap();
        assert_eq!(response.len(), request.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let capability = CommandCapability::from_command_line("false").unwrap();
        assert!(capability.summarize("anything").await.is_err());
    }
}
