use std::path::PathBuf;

use async_trait::async_trait;

use crate::container::ResourceLimits;
use crate::error::Result;

/// In-container mount point of the request workspace.
pub const MOUNT_TARGET: &str = "/code";

/// Everything needed to launch one execution unit.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    /// Unit name, derived from `(execution_id, test_index)`. Deterministic,
    /// so duplicate launches collide with themselves rather than leaking.
    pub name: String,
    pub image: String,
    /// Fully resolved argument vector; never a concatenated shell string.
    pub argv: Vec<String>,
    /// Host directory bind-mounted read-only into the unit.
    pub workspace_dir: PathBuf,
    pub limits: ResourceLimits,
    /// Ceiling on captured stdout/stderr, each.
    pub max_output_bytes: usize,
}

/// Captured outcome of one execution unit run to completion.
#[derive(Debug, Clone)]
pub struct UnitOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

/// The one external capability this engine consumes: an isolation-capable
/// container runtime, treated as a black box.
///
/// Implementations must launch a named, resource-constrained,
/// network-isolated unit, feed it stdin, capture bounded output, and support
/// force-removal by name.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Launch the unit, feed `stdin`, and wait for it to exit.
    ///
    /// Callers enforce the wall-clock deadline; this future may be dropped
    /// at any point, after which [`remove_unit`](Self::remove_unit) is the
    /// teardown path.
    async fn run_unit(&self, spec: &UnitSpec, stdin: &[u8]) -> Result<UnitOutput>;

    /// Force-remove the named unit. Removing a unit that no longer exists
    /// is not an error.
    async fn remove_unit(&self, name: &str) -> Result<()>;
}
