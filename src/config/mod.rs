//! Compiled-in launcher layout.
//!
//! The launcher reads no configuration file. Everything it starts is described
//! here as typed values so the supervisor never hard-codes a command line, and
//! tests can swap in their own [`LauncherConfig`] with zeroed [`Timings`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BACKEND_PORT: u16 = 3001;
pub const FRONTEND_PORT: u16 = 3000;

/// Directories that mark the project root.
const ROOT_MARKERS: [&str; 2] = ["backend", "frontend"];
const ROOT_SEARCH_DEPTH: usize = 5;

/// The part a launched process plays in the local stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Backend,
    Frontend,
    WebhookForwarder,
    Tunnel,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Backend => "Backend",
            Self::Frontend => "Frontend",
            Self::WebhookForwarder => "Stripe Webhook Listener",
            Self::Tunnel => "ngrok tunnel",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Backend => "🚀",
            Self::Frontend => "🎨",
            Self::WebhookForwarder => "💳",
            Self::Tunnel => "🌐",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One external process the supervisor may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub role: Role,
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    /// Optional services are checked first and skipped with a warning when absent.
    pub optional: bool,
    /// Where to get the tool when it is missing.
    pub install_hint: Option<String>,
}

impl ServiceSpec {
    fn new(role: Role, working_dir: PathBuf, program: &str, args: &[&str]) -> Self {
        Self {
            role,
            working_dir,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            optional: false,
            install_hint: None,
        }
    }

    fn optional(mut self, install_hint: &str) -> Self {
        self.optional = true;
        self.install_hint = Some(install_hint.to_string());
        self
    }

    /// `program arg1 arg2 ...` for status output.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The mandatory runtime every service depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSpec {
    pub program: String,
    pub version_arg: String,
    /// Name handed to the bulk-kill command (`taskkill /IM` or `pkill -f`).
    pub process_image: String,
    pub install_hint: String,
    /// Oldest version the dev tooling is known to work with.
    pub min_version: (u32, u32),
}

impl Default for RuntimeSpec {
    fn default() -> Self {
        let process_image = if cfg!(target_os = "windows") { "node.exe" } else { "node" };
        Self {
            program: "node".to_string(),
            version_arg: "--version".to_string(),
            process_image: process_image.to_string(),
            install_hint: "https://nodejs.org/".to_string(),
            min_version: (18, 0),
        }
    }
}

/// Startup-ordering heuristics. None of these confirm a service is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause after the stale-instance sweep.
    pub settle: Duration,
    /// Pause after the backend starts so it can bind its port.
    pub backend_warmup: Duration,
    pub frontend_warmup: Duration,
    /// How long a child gets to exit after a graceful stop request.
    pub stop_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            backend_warmup: Duration::from_secs(3),
            frontend_warmup: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl Timings {
    /// Every interval set to zero.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            backend_warmup: Duration::ZERO,
            frontend_warmup: Duration::ZERO,
            stop_timeout: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub root: PathBuf,
    pub runtime: RuntimeSpec,
    pub backend: ServiceSpec,
    pub frontend: ServiceSpec,
    pub webhook: ServiceSpec,
    pub tunnel: ServiceSpec,
    pub timings: Timings,
}

impl LauncherConfig {
    /// The TON Pool stack rooted at `root`.
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let webhook_target = format!("localhost:{}/api/webhook/stripe", BACKEND_PORT);
        let frontend_port = FRONTEND_PORT.to_string();

        Self {
            runtime: RuntimeSpec::default(),
            backend: ServiceSpec::new(
                Role::Backend,
                root.join("backend"),
                "npx",
                &["tsx", "watch", "src/index.ts"],
            ),
            frontend: ServiceSpec::new(
                Role::Frontend,
                root.join("frontend"),
                "npx",
                &["vite", "--host"],
            ),
            webhook: ServiceSpec::new(
                Role::WebhookForwarder,
                root.clone(),
                "stripe",
                &["listen", "--forward-to", &webhook_target],
            )
            .optional("https://stripe.com/docs/stripe-cli"),
            tunnel: ServiceSpec::new(Role::Tunnel, root.clone(), "ngrok", &["http", &frontend_port])
                .optional("https://ngrok.com/download"),
            timings: Timings::default(),
            root,
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn backend_url(&self) -> String {
        format!("http://localhost:{}", BACKEND_PORT)
    }

    pub fn frontend_url(&self) -> String {
        format!("http://localhost:{}", FRONTEND_PORT)
    }

    pub fn admin_url(&self) -> String {
        format!("{}/admin", self.frontend_url())
    }
}

/// Locate the project root: the nearest of `start` and its ancestors holding
/// both `backend/` and `frontend/`. Falls back to `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    let mut candidate = start.to_path_buf();
    for _ in 0..=ROOT_SEARCH_DEPTH {
        if ROOT_MARKERS.iter().all(|m| candidate.join(m).is_dir()) {
            return candidate;
        }
        match candidate.parent() {
            Some(p) => candidate = p.to_path_buf(),
            None => break,
        }
    }

    tracing::debug!(
        "no backend/ + frontend/ pair above {}, using it as the root",
        start.display()
    );
    start.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let cfg = LauncherConfig::for_project("/srv/pool");
        assert_eq!(cfg.backend.working_dir, PathBuf::from("/srv/pool/backend"));
        assert_eq!(cfg.backend.command_line(), "npx tsx watch src/index.ts");
        assert_eq!(cfg.frontend.working_dir, PathBuf::from("/srv/pool/frontend"));
        assert_eq!(cfg.frontend.command_line(), "npx vite --host");
        assert!(!cfg.backend.optional);
        assert!(!cfg.frontend.optional);
    }

    #[test]
    fn test_optional_tools() {
        let cfg = LauncherConfig::for_project("/srv/pool");
        assert!(cfg.webhook.optional);
        assert_eq!(
            cfg.webhook.command_line(),
            "stripe listen --forward-to localhost:3001/api/webhook/stripe"
        );
        assert_eq!(cfg.webhook.working_dir, PathBuf::from("/srv/pool"));

        assert!(cfg.tunnel.optional);
        assert_eq!(cfg.tunnel.command_line(), "ngrok http 3000");
        assert!(cfg.tunnel.install_hint.is_some());
    }

    #[test]
    fn test_default_timings() {
        let t = Timings::default();
        assert_eq!(t.settle, Duration::from_secs(2));
        assert_eq!(t.backend_warmup, Duration::from_secs(3));
        assert_eq!(t.frontend_warmup, Duration::from_secs(2));
        assert_eq!(t.stop_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_urls() {
        let cfg = LauncherConfig::for_project(".");
        assert_eq!(cfg.backend_url(), "http://localhost:3001");
        assert_eq!(cfg.admin_url(), "http://localhost:3000/admin");
    }

    #[test]
    fn test_find_project_root_from_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("backend/src")).unwrap();
        std::fs::create_dir_all(tmp.path().join("frontend")).unwrap();

        let found = find_project_root(&tmp.path().join("backend/src"));
        assert_eq!(found, tmp.path());
    }

    #[test]
    fn test_find_project_root_needs_both_markers() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("backend")).unwrap();
        let start = tmp.path().join("backend");

        // only backend/ exists, so nothing above qualifies
        assert_eq!(find_project_root(&start), start);
    }
}
