//! Process Supervisor
//!
//! Starts the local TON Pool stack as independent child processes and tears it
//! down on interrupt:
//!
//! ```text
//! Idle → Preflighting → Aborted                       (node missing, exit 1)
//!                     → Launching → Running → ShuttingDown → Exited (exit 0)
//! ```
//!
//! Launch order is fixed: backend, frontend, Stripe webhook listener, and the
//! ngrok tunnel when `--ngrok` was given. The pauses between them are timing
//! heuristics only; nothing confirms a service finished starting.

pub mod error;
pub mod launch;
pub mod process;
pub mod state_machine;

pub use error::SupervisorError;
pub use launch::{BackgroundLaunch, ConsoleWindowLaunch, LaunchStrategy};
pub use process::{ChildHandle, ProcessHost, ServiceProcess, SystemHost};
pub use state_machine::{State, StateMachine, TransitionError};

use std::io;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{LauncherConfig, Role, ServiceSpec};
use crate::console::Console;
use crate::node_env;

/// Grace period for reaping a child after a forced kill.
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// A launched child, tagged with what it is for.
pub struct TrackedProcess<C> {
    pub role: Role,
    pub handle: C,
}

/// How a tracked child went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// Exited within the stop timeout after a stop request.
    Graceful,
    /// Stop request failed or timed out; the child was killed.
    Forced { reason: String },
    /// Even the kill failed.
    Failed { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// One entry per tracked child, in launch order.
    pub outcomes: Vec<(Role, TerminationOutcome)>,
}

impl ShutdownReport {
    pub fn roles(&self) -> Vec<Role> {
        self.outcomes.iter().map(|(role, _)| *role).collect()
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The runtime is missing; nothing was launched.
    Aborted,
    /// Interrupted and shut down.
    Completed(ShutdownReport),
    /// A mandatory service could not start; whatever had started was shut down.
    Failed {
        error: SupervisorError,
        report: Option<ShutdownReport>,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::Aborted | Self::Failed { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Interrupted,
}

pub struct Supervisor<H: ProcessHost> {
    host: H,
    config: LauncherConfig,
    console: Console,
    state: StateMachine,
    tracked: Vec<TrackedProcess<H::Handle>>,
    interrupt: CancellationToken,
    tunnel_requested: bool,
}

impl<H: ProcessHost> Supervisor<H> {
    /// `interrupt` is cancelled when the operator wants everything stopped.
    pub fn new(host: H, config: LauncherConfig, console: Console, interrupt: CancellationToken) -> Self {
        Self {
            host,
            config,
            console,
            state: StateMachine::new(),
            tracked: Vec::new(),
            interrupt,
            tunnel_requested: false,
        }
    }

    pub fn with_tunnel(mut self, requested: bool) -> Self {
        self.tunnel_requested = requested;
        self
    }

    /// Roles of the children currently tracked, in launch order.
    pub fn tracked_roles(&self) -> Vec<Role> {
        self.tracked.iter().map(|t| t.role).collect()
    }

    /// Run the whole lifecycle. Never returns an error: a missing runtime
    /// aborts, a mandatory spawn failure shuts down what started and fails, and
    /// missing optional tools or stubborn children are only warned about.
    pub async fn run(mut self) -> RunOutcome {
        self.console.banner(&self.config);

        match self.drive().await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!("[{}] {}", error.error_code(), error);
                self.console.fatal(format!("✗ {}", error));
                let report = match self.shutdown().await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        tracing::error!("shutdown after failure not possible: {}", e);
                        None
                    }
                };
                RunOutcome::Failed { error, report }
            }
        }
    }

    async fn drive(&mut self) -> Result<RunOutcome, SupervisorError> {
        self.state.transition(State::Preflighting)?;
        if !node_env::preflight(&self.host, &self.config.runtime, &self.console).await {
            let err = SupervisorError::MissingMandatoryTool {
                tool: self.config.runtime.program.clone(),
                hint: self.config.runtime.install_hint.clone(),
            };
            tracing::error!("[{}] {}", err.error_code(), err);
            self.console
                .fatal(format!("Install Node.js: {}", self.config.runtime.install_hint));
            self.state.transition(State::Aborted)?;
            return Ok(RunOutcome::Aborted);
        }

        self.reset_stale_instances().await;
        if self.pause(self.config.timings.settle).await == Flow::Interrupted {
            return Ok(RunOutcome::Completed(self.shutdown().await?));
        }

        self.state.transition(State::Launching)?;
        if self.launch_sequence().await? == Flow::Interrupted {
            return Ok(RunOutcome::Completed(self.shutdown().await?));
        }

        self.state.transition(State::Running)?;
        self.console.ready(&self.config, self.tunnel_requested);
        self.await_termination().await;

        Ok(RunOutcome::Completed(self.shutdown().await?))
    }

    async fn launch_sequence(&mut self) -> Result<Flow, SupervisorError> {
        let timings = self.config.timings;

        let backend = self.config.backend.clone();
        self.launch(&backend).await?;
        if self.pause(timings.backend_warmup).await == Flow::Interrupted {
            return Ok(Flow::Interrupted);
        }

        let frontend = self.config.frontend.clone();
        self.launch(&frontend).await?;
        if self.pause(timings.frontend_warmup).await == Flow::Interrupted {
            return Ok(Flow::Interrupted);
        }

        let webhook = self.config.webhook.clone();
        self.launch(&webhook).await?;

        if self.tunnel_requested {
            let tunnel = self.config.tunnel.clone();
            self.launch(&tunnel).await?;
        }

        Ok(Flow::Continue)
    }

    /// Start one service and track it. Returns whether it was started.
    ///
    /// An optional service whose tool is absent is skipped with a warning.
    /// A mandatory service that fails to spawn is an error.
    async fn launch(&mut self, spec: &ServiceSpec) -> Result<bool, SupervisorError> {
        if spec.optional && !self.tool_available(spec).await {
            self.report_missing(spec);
            return Ok(false);
        }

        self.console
            .step(format!("{} Starting {}...", spec.role.icon(), spec.role));

        match self.host.spawn(spec) {
            Ok(handle) => {
                tracing::info!("{} started (pid: {:?})", spec.role, handle.id());
                self.tracked.push(TrackedProcess {
                    role: spec.role,
                    handle,
                });
                Ok(true)
            }
            Err(e) if spec.optional && e.kind() == io::ErrorKind::NotFound => {
                self.report_missing(spec);
                Ok(false)
            }
            Err(e) if spec.optional => {
                tracing::warn!("{} failed to start: {}", spec.role, e);
                self.console
                    .warning(format!("⚠️  {} failed to start ({}). Skipped.", spec.role, e));
                Ok(false)
            }
            Err(source) => Err(SupervisorError::Spawn {
                role: spec.role,
                source,
            }),
        }
    }

    async fn tool_available(&self, spec: &ServiceSpec) -> bool {
        match self.host.version_of(&spec.program, "--version").await {
            Ok(version) => {
                tracing::debug!("{} found: {}", spec.program, version);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                // It exists; let the spawn decide.
                tracing::debug!("{} --version failed: {}", spec.program, e);
                true
            }
        }
    }

    fn report_missing(&self, spec: &ServiceSpec) {
        let err = SupervisorError::MissingOptionalTool {
            role: spec.role,
            tool: spec.program.clone(),
        };
        tracing::warn!("[{}] {}", err.error_code(), err);

        self.console.warning(format!(
            "⚠️  {} is not installed. {} skipped.",
            spec.program, spec.role
        ));
        if let Some(hint) = &spec.install_hint {
            self.console.warning(format!("   Install: {}", hint));
        }
    }

    /// Sweep leftover runtime processes from earlier runs (or, at shutdown,
    /// anything our children left behind). May hit unrelated processes that
    /// share the runtime's executable name.
    async fn reset_stale_instances(&self) {
        self.console.warning("🔄 Stopping previous processes...");
        self.host.sweep(&self.config.runtime).await;
    }

    /// Sleep for `duration` unless interrupted first.
    async fn pause(&self, duration: Duration) -> Flow {
        if self.interrupt.is_cancelled() {
            return Flow::Interrupted;
        }
        if duration.is_zero() {
            return Flow::Continue;
        }

        tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => Flow::Interrupted,
            _ = tokio::time::sleep(duration) => Flow::Continue,
        }
    }

    async fn await_termination(&self) {
        self.interrupt.cancelled().await;
    }

    /// Stop every tracked child in launch order, then sweep once more.
    ///
    /// Each child gets a stop request and `stop_timeout` to exit before it is
    /// killed. A failure on one child never prevents attempts on the rest.
    async fn shutdown(&mut self) -> Result<ShutdownReport, SupervisorError> {
        self.state.transition(State::ShuttingDown)?;
        self.console.line(crate::console::Tone::Warning, "");
        self.console.warning("🛑 Stopping services...");

        let stop_timeout = self.config.timings.stop_timeout;
        let mut report = ShutdownReport::default();
        for mut tracked in self.tracked.drain(..) {
            let outcome = terminate(tracked.role, &mut tracked.handle, stop_timeout).await;
            report.outcomes.push((tracked.role, outcome));
        }

        self.reset_stale_instances().await;
        if !self.config.timings.settle.is_zero() {
            tokio::time::sleep(self.config.timings.settle).await;
        }

        self.console.success("✅ All services stopped.");
        self.state.transition(State::Exited)?;
        Ok(report)
    }
}

/// Graceful stop with a timeout, escalating to a kill on timeout or error.
async fn terminate<C: ChildHandle>(role: Role, handle: &mut C, stop_timeout: Duration) -> TerminationOutcome {
    let reason = match handle.request_stop() {
        Ok(()) => match tokio::time::timeout(stop_timeout, handle.wait()).await {
            Ok(Ok(())) => {
                tracing::info!("{} stopped", role);
                return TerminationOutcome::Graceful;
            }
            Ok(Err(e)) => format!("wait failed: {}", e),
            Err(_) => format!("did not exit within {:?}", stop_timeout),
        },
        Err(e) => format!("stop request failed: {}", e),
    };

    let err = SupervisorError::ChildTermination {
        role,
        reason: reason.clone(),
    };
    tracing::warn!("[{}] {}, killing", err.error_code(), err);

    match handle.force_kill() {
        Ok(()) => {
            if tokio::time::timeout(REAP_TIMEOUT, handle.wait()).await.is_err() {
                tracing::warn!("{} not reaped within {:?} after kill", role, REAP_TIMEOUT);
            }
            TerminationOutcome::Forced { reason }
        }
        Err(e) => {
            tracing::error!("{}: kill failed: {}", role, e);
            TerminationOutcome::Failed {
                reason: format!("{}; kill failed: {}", reason, e),
            }
        }
    }
}
