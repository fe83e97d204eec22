use std::fmt;

/// Failure kinds of the host shell. None of these cross the command-dispatch
/// boundary; they are logged where they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// The OS refused to create the backend process.
    BackendSpawnFailed { program: String, reason: String },
    /// The backend exited with a non-zero or unknown code.
    BackendCrashed { code: Option<i32>, recent: Vec<String> },
    /// Content-originated navigation or pop-up vetoed by policy.
    NavigationDenied { url: String },
    WindowCreationFailed(String),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::BackendSpawnFailed { program, reason } => {
                write!(f, "failed to spawn backend `{}`: {}", program, reason)
            }
            ShellError::BackendCrashed { code, recent } => {
                match code {
                    Some(code) => write!(f, "backend exited with code {}", code)?,
                    None => write!(f, "backend terminated without an exit code")?,
                }
                if !recent.is_empty() {
                    write!(f, "; last output:")?;
                    for line in recent {
                        write!(f, "\n  {}", line)?;
                    }
                }
                Ok(())
            }
            ShellError::NavigationDenied { url } => write!(f, "navigation to {} denied", url),
            ShellError::WindowCreationFailed(reason) => {
                write!(f, "failed to create main window: {}", reason)
            }
        }
    }
}

impl std::error::Error for ShellError {}
