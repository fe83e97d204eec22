//! Analysis backend supervision: process handle, output diagnostics and the
//! shell-plugin spawner used by the desktop build.

pub mod diagnostics;
#[cfg(feature = "desktop")]
pub mod process;
pub mod supervisor;

pub use diagnostics::{DiagnosticBuffer, DiagnosticLine, Stream};
pub use supervisor::{
    BackendChild, BackendCommand, BackendProcessHandle, BackendStatus, BackendSupervisor,
    ProcessEvent, ProcessSpawner, ProcessStatus, StartOutcome,
};
