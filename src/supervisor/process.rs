use std::io;
use std::process::Stdio;

use anyhow::Result;
use tokio::process::{Child, Command};

use crate::config::{RuntimeSpec, ServiceSpec};
use crate::node_env;
use crate::process_monitor;
use crate::utils::apply_creation_flags;

use super::launch::LaunchStrategy;

/// A launched child the supervisor can stop.
#[allow(async_fn_in_trait)]
pub trait ChildHandle {
    fn id(&self) -> Option<u32>;

    /// Ask the child to exit (SIGTERM on Unix).
    fn request_stop(&mut self) -> io::Result<()>;

    /// Wait for the child to exit.
    async fn wait(&mut self) -> io::Result<()>;

    fn force_kill(&mut self) -> io::Result<()>;
}

/// Everything the supervisor needs from the operating system.
#[allow(async_fn_in_trait)]
pub trait ProcessHost {
    type Handle: ChildHandle;

    /// Run `program version_arg`. A missing executable is `ErrorKind::NotFound`.
    async fn version_of(&self, program: &str, version_arg: &str) -> io::Result<String>;

    fn spawn(&self, spec: &ServiceSpec) -> io::Result<Self::Handle>;

    /// Best-effort bulk termination of every runtime process.
    async fn sweep(&self, runtime: &RuntimeSpec);
}

/// The real host: spawns through a [`LaunchStrategy`].
pub struct SystemHost {
    strategy: Box<dyn LaunchStrategy>,
}

impl SystemHost {
    pub fn new(strategy: Box<dyn LaunchStrategy>) -> Self {
        tracing::debug!("launch strategy: {}", strategy.name());
        Self { strategy }
    }
}

impl ProcessHost for SystemHost {
    type Handle = ServiceProcess;

    async fn version_of(&self, program: &str, version_arg: &str) -> io::Result<String> {
        node_env::query_version(program, version_arg, None).await
    }

    fn spawn(&self, spec: &ServiceSpec) -> io::Result<ServiceProcess> {
        let mut cmd = self.strategy.command(spec);
        let child = cmd.spawn()?;
        tracing::info!(
            "spawned '{}' in {} (pid: {:?})",
            spec.command_line(),
            spec.working_dir.display(),
            child.id()
        );
        Ok(ServiceProcess::new(child, self.strategy.isolates_group()))
    }

    async fn sweep(&self, runtime: &RuntimeSpec) {
        // the full process scan only feeds this log line
        if stale_count_wanted() {
            let stale = process_monitor::count_matching_async(&runtime.process_image).await;
            tracing::info!("{} process(es) match '{}' before sweep", stale, runtime.process_image);
        }

        if let Err(e) = kill_by_image(&runtime.process_image).await {
            tracing::warn!("stale instance sweep failed: {}", e);
        }
    }
}

fn stale_count_wanted() -> bool {
    tracing::enabled!(tracing::Level::INFO)
}

/// A service started by [`SystemHost`].
pub struct ServiceProcess {
    child: Child,
    /// PID captured at spawn; `Child::id` turns `None` once reaped.
    pid: Option<u32>,
    /// The child leads its own process group.
    group_leader: bool,
}

impl ServiceProcess {
    fn new(child: Child, group_leader: bool) -> Self {
        let pid = child.id();
        Self { child, pid, group_leader }
    }
}

impl ChildHandle for ServiceProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    #[cfg(unix)]
    fn request_stop(&mut self) -> io::Result<()> {
        use nix::sys::signal::Signal;
        match self.child.id() {
            Some(pid) => signal_child(pid, self.group_leader, Signal::SIGTERM),
            // already reaped
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) -> io::Result<()> {
        // console children have no graceful signal we can send
        self.child.start_kill()
    }

    async fn wait(&mut self) -> io::Result<()> {
        let status = self.child.wait().await?;
        tracing::debug!("pid {:?} exited with {}", self.pid, status);
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::Signal;
            if let (Some(pid), true) = (self.child.id(), self.group_leader) {
                // the tree npx started; the leader itself is killed below
                if let Err(e) = signal_child(pid, true, Signal::SIGKILL) {
                    tracing::debug!("SIGKILL to group {} failed: {}", pid, e);
                }
            }
        }
        self.child.start_kill()
    }
}

#[cfg(unix)]
fn signal_child(pid: u32, group: bool, signal: nix::sys::signal::Signal) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid as i32);
    tracing::debug!("sending {:?} to {} {}", signal, if group { "group" } else { "pid" }, pid);
    let res = if group {
        signal::killpg(target, signal)
    } else {
        signal::kill(target, signal)
    };
    match res {
        // gone already
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

/// Kill every process matching `image`: `taskkill /F /IM` on Windows,
/// `pkill -f` elsewhere. Output is discarded; "nothing matched" is not an error.
pub async fn kill_by_image(image: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("taskkill");
        cmd.args(["/F", "/IM", image]);
        cmd
    } else {
        let mut cmd = Command::new("pkill");
        cmd.args(["-f", image]);
        cmd
    };
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    apply_creation_flags(&mut cmd);

    let status = cmd
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run bulk kill for '{}': {}", image, e))?;
    tracing::debug!("bulk kill for '{}' exited with {}", image, status);
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Role;
    use crate::supervisor::launch::BackgroundLaunch;
    use std::time::Duration;

    fn sleeper(secs: &str) -> ServiceSpec {
        ServiceSpec {
            role: Role::Backend,
            working_dir: std::env::temp_dir(),
            program: "sleep".to_string(),
            args: vec![secs.to_string()],
            optional: false,
            install_hint: None,
        }
    }

    #[tokio::test]
    async fn test_spawn_and_graceful_stop() {
        let host = SystemHost::new(Box::new(BackgroundLaunch));
        let mut child = host.spawn(&sleeper("30")).unwrap();
        assert!(child.id().is_some());

        child.request_stop().unwrap();
        let waited = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        assert!(matches!(waited, Ok(Ok(()))), "sleep should exit on SIGTERM");
    }

    #[tokio::test]
    async fn test_force_kill() {
        let host = SystemHost::new(Box::new(BackgroundLaunch));
        let mut child = host.spawn(&sleeper("30")).unwrap();

        child.force_kill().unwrap();
        let waited = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        assert!(matches!(waited, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_stop_after_exit_is_harmless() {
        let host = SystemHost::new(Box::new(BackgroundLaunch));
        let mut child = host.spawn(&sleeper("0")).unwrap();
        child.wait().await.unwrap();

        assert!(child.request_stop().is_ok());
    }

    #[test]
    fn test_stale_count_follows_log_level() {
        // no subscriber: the info line would be dropped, so skip the scan
        assert!(!stale_count_wanted());

        let quiet = tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).finish();
        tracing::subscriber::with_default(quiet, || assert!(!stale_count_wanted()));

        let chatty = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).finish();
        tracing::subscriber::with_default(chatty, || assert!(stale_count_wanted()));
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_not_found() {
        let host = SystemHost::new(Box::new(BackgroundLaunch));
        let mut spec = sleeper("1");
        spec.program = "no-such-program-for-launcher-tests".to_string();
        let err = host.spawn(&spec).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
