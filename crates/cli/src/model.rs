//! Process-backed language model.
//!
//! The configured command is spawned once per completion with the prompt on
//! stdin. Its trimmed stdout is the completion.

use async_trait::async_trait;
use kangae_core::error::ModelError;
use kangae_core::model::LanguageModel;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub struct CommandModel {
    program: String,
    args: Vec<String>,
}

impl CommandModel {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `[model]` settings. `None` when no command is configured.
    pub fn from_config(config: &kangae_config::ModelConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .map(|command| Self::new(command, config.args.clone()))
    }
}

#[async_trait]
impl LanguageModel for CommandModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        debug!(program = %self.program, prompt_len = prompt.len(), "Spawning model process");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ModelError::NotConfigured(format!("command not found: {}", self.program))
                }
                _ => ModelError::Invocation(format!("failed to start {}: {e}", self.program)),
            })?;

        // Feed stdin while stdout and stderr are drained, so neither side
        // blocks on a full pipe.
        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                // Dropping stdin at the end closes the pipe so the model sees EOF.
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| ModelError::Invocation(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModelError::Invocation(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "Model exited before reading the whole prompt");
            }
            Err(e) => {
                return Err(ModelError::Invocation(format!("failed to write prompt: {e}")));
            }
            Ok(()) => {}
        }

        let completion = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if completion.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(completion)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandModel {
        CommandModel::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn stdout_is_the_completion() {
        let model = CommandModel::new("cat", vec![]);
        let reply = model.complete("  最終的な答え: 42\n").await.unwrap();
        assert_eq!(reply, "最終的な答え: 42");
    }

    #[tokio::test]
    async fn large_prompt_is_streamed_while_output_drains() {
        let prompt = "x".repeat(1_000_000);
        let reply = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            CommandModel::new("cat", vec![]).complete(&prompt),
        )
        .await
        .expect("model process deadlocked")
        .unwrap();
        assert_eq!(reply.len(), 1_000_000);
    }

    #[tokio::test]
    async fn chatty_stderr_does_not_block() {
        let prompt = "y".repeat(1_000_000);
        let reply = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            sh("cat >&2; echo 最終的な答え: ok").complete(&prompt),
        )
        .await
        .expect("model process deadlocked")
        .unwrap();
        assert_eq!(reply, "最終的な答え: ok");
    }

    #[tokio::test]
    async fn model_may_ignore_stdin() {
        let prompt = "z".repeat(1_000_000);
        let reply = sh("echo done").complete(&prompt).await.unwrap();
        assert_eq!(reply, "done");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = sh("echo boom >&2; exit 3").complete("q").await.unwrap_err();
        match err {
            ModelError::Invocation(reason) => assert!(reason.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_not_configured() {
        let model = CommandModel::new("kangae-no-such-model-binary", vec![]);
        assert!(matches!(
            model.complete("q").await,
            Err(ModelError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        assert!(matches!(
            sh("cat > /dev/null").complete("q").await,
            Err(ModelError::EmptyResponse)
        ));
    }

    #[test]
    fn from_config_requires_a_command() {
        let mut config = kangae_config::ModelConfig::default();
        assert!(CommandModel::from_config(&config).is_none());
        config.command = Some("llm".into());
        config.args = vec!["-m".into(), "local".into()];
        let model = CommandModel::from_config(&config).unwrap();
        assert_eq!(model.program, "llm");
        assert_eq!(model.args, vec!["-m", "local"]);
    }
}
