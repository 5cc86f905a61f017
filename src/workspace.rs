use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{JudgeError, Result};
use crate::language::LanguageProfile;

/// Ephemeral per-request directory holding the submitted source and one
/// input file per test case.
///
/// The directory name embeds the execution id, so concurrent requests can
/// never collide. Destruction is idempotent and happens exactly once per
/// request; `Drop` is a best-effort backstop for paths that bypass
/// [`Workspace::destroy`].
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    execution_id: String,
    destroyed: AtomicBool,
}

impl Workspace {
    /// Allocate the workspace directory. Failure here is systemic: it aborts
    /// the whole request before any execution unit is attempted.
    pub async fn create(root: &Path, execution_id: &str) -> Result<Self> {
        let dir = root.join(format!("judgebox-{execution_id}"));

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            JudgeError::workspace(format!(
                "failed to create workspace {}: {e}",
                dir.display()
            ))
        })?;

        debug!("Created workspace {}", dir.display());

        Ok(Self {
            dir,
            execution_id: execution_id.to_string(),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Write the submission to `solution.<ext>`.
    pub async fn write_source(&self, code: &str, profile: &LanguageProfile) -> Result<()> {
        let path = self.dir.join(profile.source_file_name());
        tokio::fs::write(&path, code).await.map_err(|e| {
            JudgeError::workspace(format!("failed to write source {}: {e}", path.display()))
        })
    }

    /// Write one input file, named by test index.
    pub async fn write_input(&self, index: usize, text: &str) -> Result<()> {
        let path = self.input_path(index);
        tokio::fs::write(&path, text).await.map_err(|e| {
            JudgeError::workspace(format!("failed to write input {}: {e}", path.display()))
        })
    }

    /// Read back one input file for redirection into an execution unit.
    pub async fn read_input(&self, index: usize) -> Result<Vec<u8>> {
        let path = self.input_path(index);
        tokio::fs::read(&path).await.map_err(|e| {
            JudgeError::workspace(format!("failed to read input {}: {e}", path.display()))
        })
    }

    fn input_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("input_{index}.txt"))
    }

    /// Recursively remove the directory. Safe to call more than once; only
    /// the first call does work.
    pub async fn destroy(&self) -> Result<()> {
        if self
            .destroyed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return Ok(());
        }

        tokio::fs::remove_dir_all(&self.dir).await.map_err(|e| {
            JudgeError::workspace(format!(
                "failed to remove workspace {}: {e}",
                self.dir.display()
            ))
        })?;

        debug!("Destroyed workspace {}", self.dir.display());
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self
            .destroyed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                warn!(
                    "Failed to remove workspace {} during drop: {}",
                    self.dir.display(),
                    e
                );
            }
        }
    }
}
