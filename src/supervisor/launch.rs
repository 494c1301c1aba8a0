//! How a service command line becomes an OS process.
//!
//! The strategy is picked once at startup by [`for_host`]:
//! - Unix: the child runs in the background with its output discarded and in
//!   its own process group, so Ctrl+C on our terminal reaches only us and the
//!   supervisor decides how the children go down.
//! - Windows: the child gets its own console window through `cmd /C`, which
//!   also resolves `npx.cmd` and friends the way a shell would.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::ServiceSpec;

pub trait LaunchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the command that starts `spec`.
    fn command(&self, spec: &ServiceSpec) -> Command;

    /// Whether the child leads its own process group, so signals can be sent
    /// to the whole tree it spawns.
    fn isolates_group(&self) -> bool;
}

/// Detached background process with all stdio discarded.
#[derive(Debug, Default)]
pub struct BackgroundLaunch;

impl LaunchStrategy for BackgroundLaunch {
    fn name(&self) -> &'static str {
        "background"
    }

    fn command(&self, spec: &ServiceSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd
    }

    fn isolates_group(&self) -> bool {
        cfg!(unix)
    }
}

/// A new console window per service (Windows `CREATE_NEW_CONSOLE`).
#[derive(Debug, Default)]
pub struct ConsoleWindowLaunch;

impl LaunchStrategy for ConsoleWindowLaunch {
    fn name(&self) -> &'static str {
        "console-window"
    }

    fn command(&self, spec: &ServiceSpec) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C")
            .arg(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .kill_on_drop(false);

        #[cfg(target_os = "windows")]
        {
            const CREATE_NEW_CONSOLE: u32 = 0x00000010;
            cmd.creation_flags(CREATE_NEW_CONSOLE);
        }

        cmd
    }

    fn isolates_group(&self) -> bool {
        false
    }
}

/// The strategy for the platform we are running on.
pub fn for_host() -> Box<dyn LaunchStrategy> {
    if cfg!(target_os = "windows") {
        Box::new(ConsoleWindowLaunch)
    } else {
        Box::new(BackgroundLaunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;
    use std::ffi::OsStr;
    use std::path::Path;

    #[test]
    fn test_background_command_shape() {
        let cfg = LauncherConfig::for_project("/srv/pool");
        let cmd = BackgroundLaunch.command(&cfg.backend);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), OsStr::new("npx"));
        let args: Vec<&OsStr> = std_cmd.get_args().collect();
        assert_eq!(args, ["tsx", "watch", "src/index.ts"]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/srv/pool/backend")));
    }

    #[test]
    fn test_console_window_goes_through_cmd() {
        let cfg = LauncherConfig::for_project("/srv/pool");
        let cmd = ConsoleWindowLaunch.command(&cfg.frontend);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), OsStr::new("cmd"));
        let args: Vec<&OsStr> = std_cmd.get_args().collect();
        assert_eq!(args, ["/C", "npx", "vite", "--host"]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/srv/pool/frontend")));
        assert!(!ConsoleWindowLaunch.isolates_group());
    }

    #[test]
    fn test_for_host_matches_platform() {
        let strategy = for_host();
        if cfg!(target_os = "windows") {
            assert_eq!(strategy.name(), "console-window");
        } else {
            assert_eq!(strategy.name(), "background");
            assert!(strategy.isolates_group());
        }
    }
}
