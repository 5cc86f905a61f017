use serde::{Deserialize, Serialize};

/// Resource ceilings applied to every execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU share, in cores.
    pub cpu_cores: f64,
    pub memory_mb: u64,
    /// Process-count cap, guarding against fork bombs.
    pub pids: i64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_cores: 0.5,
            memory_mb: 256,
            pids: 64,
        }
    }
}
