pub mod runtime;

pub use runtime::{apply_executable_bits, resolve_runtime, runtime_platform, JavaRuntime};
