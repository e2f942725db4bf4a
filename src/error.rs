use std::path::PathBuf;

use thiserror::Error;

use crate::constants::exit;

/// Everything that can stop a target from producing its executable.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("project directory not found: {}", .0.display())]
    ProjectDirMissing(PathBuf),

    #[error("packaging tool '{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("target script not found: {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("icon file not found: {}", .0.display())]
    IconMissing(PathBuf),

    #[error("failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("packaging tool exited with status {code}")]
    ToolFailed { code: i32 },

    #[error("packaging tool was terminated before finishing")]
    ToolTerminated,

    #[error("packaging tool reported success but no executable was written to {}", .0.display())]
    ArtifactMissing(PathBuf),
}

impl BuildError {
    /// True when the failure happened before the packaging tool ran.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BuildError::ProjectDirMissing(_)
                | BuildError::ToolNotFound(_)
                | BuildError::ScriptMissing(_)
                | BuildError::IconMissing(_)
                | BuildError::Spawn { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_precondition() {
            exit::PRECONDITION_FAILED
        } else {
            exit::BUILD_FAILED
        }
    }
}
