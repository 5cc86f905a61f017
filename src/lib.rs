pub mod config;
pub mod container;
pub mod error;
pub mod executor;
pub mod language;
pub mod verdict;
pub mod workspace;

pub use config::{Config, SandboxConfig};
pub use container::{ContainerRuntime, DockerRuntime, ResourceLimits, UnitOutput, UnitSpec};
pub use error::{JudgeError, Result};
pub use executor::Executor;
pub use language::{CommandTemplate, LanguageProfile, LanguageRegistry};
pub use verdict::{ExecutionReport, TestCase, TestResult};
pub use workspace::Workspace;
