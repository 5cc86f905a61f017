pub mod docker;
pub mod limits;
pub mod runner;
pub mod runtime;

pub use docker::DockerRuntime;
pub use limits::ResourceLimits;
pub use runtime::{ContainerRuntime, UnitOutput, UnitSpec};
