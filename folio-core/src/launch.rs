use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Starts external processes for remote-file, URI and launch links.
/// Implementations must not wait for the child.
pub trait Launcher: Send + Sync {
    /// Opens `path` in a new instance of this viewer.
    fn spawn_viewer(&self, path: &Path) -> Result<()>;
    /// Hands `target` to the platform's default handler.
    fn open(&self, target: &str) -> Result<()>;
}

#[cfg(target_os = "macos")]
const OPENER: (&str, &[&str]) = ("open", &[]);
#[cfg(target_os = "windows")]
const OPENER: (&str, &[&str]) = ("cmd", &["/C", "start", ""]);
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: (&str, &[&str]) = ("xdg-open", &[]);

/// Name of the program used by [`SystemLauncher::open`].
pub fn opener_program() -> &'static str {
    OPENER.0
}

pub struct SystemLauncher {
    viewer: PathBuf,
}

impl SystemLauncher {
    pub fn new(viewer: PathBuf) -> Self {
        Self { viewer }
    }

    /// Uses the running executable as the viewer.
    pub fn current() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    fn spawn(&self, mut command: Command, program: &str, target: &str) -> Result<()> {
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Launch {
                program: program.to_owned(),
                target: target.to_owned(),
                source,
            })?;
        debug!(program, target, pid = child.id(), "spawned child process");
        reap(child);
        Ok(())
    }
}

fn reap(mut child: Child) {
    thread::spawn(move || {
        if let Err(err) = child.wait() {
            warn!(?err, "failed to wait for child process");
        }
    });
}

impl Launcher for SystemLauncher {
    fn spawn_viewer(&self, path: &Path) -> Result<()> {
        let mut command = Command::new(&self.viewer);
        command.arg(path);
        self.spawn(
            command,
            &self.viewer.to_string_lossy(),
            &path.to_string_lossy(),
        )
    }

    fn open(&self, target: &str) -> Result<()> {
        let (program, args) = OPENER;
        let mut command = Command::new(program);
        command.args(args).arg(target);
        self.spawn(command, program, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_reports_launch_error() {
        let launcher = SystemLauncher::new(PathBuf::from("/nonexistent/folio-viewer"));
        let err = launcher.spawn_viewer(Path::new("doc.pdf")).unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
        assert!(err.to_string().contains("doc.pdf"));
    }
}
