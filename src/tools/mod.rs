mod error;
pub use error::*;

mod tool;
pub use tool::*;

#[cfg(feature = "docker")]
pub mod docker;
#[cfg(feature = "docker")]
pub use docker::{DockerCodeExecutionEngine, DockerCodeExecutionTool, DockerExecutionConfig};
