//! Decide which tor executable a launcher should run.
//!
//! Normally tor comes from the managed tools archive: the launcher
//! extracts the archive into a tool directory and runs the executable found
//! there.  [`TorDaemonSettings::executable_path_override`] swaps in an
//! executable that is already installed on the host, but it swaps in only
//! the executable: the base torrc and other support files still come from
//! the archive, so extraction always happens.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::TorDaemonSettings;

/// Name of the tor executable inside an extracted tools archive.
const TOR_EXECUTABLE: &str = "tor";

/// Where the tor executable to launch comes from.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum Executable {
    /// A caller-supplied executable, used verbatim.
    ///
    /// A bare name such as `tor` is left for the operating system to find
    /// on the `PATH`.
    Override(PathBuf),
    /// The executable extracted from the tools archive.
    Extracted(PathBuf),
}

impl Executable {
    /// Return the path (or bare name) to launch.
    pub fn path(&self) -> &Path {
        match self {
            Executable::Override(p) | Executable::Extracted(p) => p,
        }
    }
}

/// What a launcher needs from the tools archive, and what it should run.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub struct ToolPlan {
    /// The executable to launch.
    pub executable: Executable,
    /// Directory into which the tools archive is extracted.
    pub tool_dir: PathBuf,
    /// Whether the support files must be extracted from the archive.
    ///
    /// Always true: an executable override does not provide them.
    pub extract_support_files: bool,
}

impl ToolPlan {
    /// Plan a launch of tor as described by `settings`, with the tools
    /// archive extracted into `tool_dir`.
    pub fn for_settings(settings: &TorDaemonSettings, tool_dir: impl AsRef<Path>) -> Self {
        let tool_dir = tool_dir.as_ref().to_path_buf();
        let executable = match &settings.executable_path_override {
            Some(path) => {
                debug!("Using tor executable override {}", path.display());
                Executable::Override(path.clone())
            }
            None => Executable::Extracted(extracted_executable(&tool_dir)),
        };
        ToolPlan {
            executable,
            tool_dir,
            extract_support_files: true,
        }
    }
}

/// Return the path of the tor executable inside an extracted tool directory.
pub fn extracted_executable(tool_dir: &Path) -> PathBuf {
    tool_dir.join(format!("{}{}", TOR_EXECUTABLE, std::env::consts::EXE_SUFFIX))
}
