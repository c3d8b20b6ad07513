//! Runs an external command for each print job.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{BehaviourError, DocumentSink, Job, SaveToDisk};

/// Spawns `program args…` with job metadata in `IPP_*` environment variables.
#[derive(Debug, Clone)]
pub struct RunCommand {
    program: String,
    args: Vec<String>,
}

impl RunCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command once, optionally feeding `stdin` and appending `file`
    /// as the last argument.
    pub async fn run(
        &self,
        job: &Job,
        stdin: Option<&[u8]>,
        file: Option<&Path>,
    ) -> Result<(), BehaviourError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(job.environment())
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);
        if let Some(file) = file {
            command.arg(file);
        }

        tracing::debug!(job_id = job.id, command = %self.display(), "Running command");
        let mut child = command.spawn().map_err(|source| BehaviourError::Spawn {
            command: self.display(),
            source,
        })?;

        if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A command that exits without reading its input is judged by its
            // exit status, not by the broken pipe.
            match pipe.write_all(data).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(BehaviourError::Io(e)),
            }
            drop(pipe);
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(BehaviourError::CommandFailed {
                command: self.display(),
                status,
            });
        }
        tracing::info!(job_id = job.id, command = %self.display(), "Command finished");
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for RunCommand {
    async fn accept(&self, job: &Job, document: Bytes) -> Result<(), BehaviourError> {
        self.run(job, Some(&document[..]), None).await
    }
}

/// Saves the document, then runs the command with the saved path appended.
#[derive(Debug, Clone)]
pub struct SaveAndRunCommand {
    save: SaveToDisk,
    command: RunCommand,
}

impl SaveAndRunCommand {
    pub fn new(save: SaveToDisk, command: RunCommand) -> Self {
        Self { save, command }
    }
}

#[async_trait]
impl DocumentSink for SaveAndRunCommand {
    async fn accept(&self, job: &Job, document: Bytes) -> Result<(), BehaviourError> {
        let path = self.save.save(job, &document).await?;
        self.command.run(job, None, Some(&path)).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            id: 5,
            name: Some("letter".into()),
            user: None,
            document_format: None,
            extension: "ps",
        }
    }

    fn sh(script: String) -> RunCommand {
        RunCommand::new("sh", vec!["-c".into(), script])
    }

    #[tokio::test]
    async fn document_is_written_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let command = sh(format!("cat > '{}'", out.display()));

        command.accept(&job(), Bytes::from_static(b"page data")).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"page data");
    }

    #[tokio::test]
    async fn job_metadata_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("env");
        let command = sh(format!(
            "cat > /dev/null; printf '%s %s' \"$IPP_JOB_ID\" \"$IPP_JOB_NAME\" > '{}'",
            out.display()
        ));

        command.accept(&job(), Bytes::from_static(b"x")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "5 letter");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let command = sh("exit 3".into());
        let result = command.accept(&job(), Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(BehaviourError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let command = RunCommand::new("/nonexistent/ipp-server-test-binary", Vec::new());
        let result = command.accept(&job(), Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(BehaviourError::Spawn { .. })));
    }

    #[tokio::test]
    async fn save_and_run_appends_saved_path() {
        let dir = tempfile::tempdir().unwrap();
        let copy = dir.path().join("copy");
        let sink = SaveAndRunCommand::new(
            SaveToDisk::new(dir.path()),
            sh(format!("cp \"$0\" '{}'", copy.display())),
        );

        sink.accept(&job(), Bytes::from_static(b"saved document")).await.unwrap();

        assert_eq!(std::fs::read(&copy).unwrap(), b"saved document");
    }
}
