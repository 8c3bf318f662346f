pub mod classpath;
pub mod natives;
pub mod orchestrator;

pub use classpath::{assemble_classpath, classpath_separator, join_classpath, ClasspathBuilder};
pub use natives::extract_natives;
pub use orchestrator::{InstallReport, Orchestrator};
