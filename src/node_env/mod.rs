//! Node.js preflight.
//!
//! Every service in the stack runs on Node.js (through `npx`), so the launcher
//! refuses to start anything unless `node --version` answers. An old Node.js
//! only earns a warning; vite and tsx report their own errors in that case.

use std::io;
use std::path::Path;

use tokio::process::Command;

use crate::config::RuntimeSpec;
use crate::console::Console;
use crate::supervisor::ProcessHost;
use crate::utils::apply_creation_flags;

/// Result of probing the mandatory runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Found { version: String },
    /// The executable is not on PATH.
    Missing,
}

/// Run `<program> <version_arg>` and return its trimmed stdout.
///
/// A missing executable surfaces as `io::ErrorKind::NotFound`.
pub async fn query_version(program: &str, version_arg: &str, cwd: Option<&Path>) -> io::Result<String> {
    let mut cmd = Command::new(program);
    cmd.arg(version_arg)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    apply_creation_flags(&mut cmd);

    let output = cmd.output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        Ok(String::from_utf8_lossy(&output.stderr).trim().to_string())
    } else {
        Ok(stdout)
    }
}

/// Ask the runtime for its version through `host`.
pub async fn detect_runtime<H: ProcessHost>(host: &H, runtime: &RuntimeSpec) -> RuntimeStatus {
    match host.version_of(&runtime.program, &runtime.version_arg).await {
        Ok(version) => RuntimeStatus::Found { version },
        Err(e) if e.kind() == io::ErrorKind::NotFound => RuntimeStatus::Missing,
        Err(e) => {
            // Present but misbehaving: it exists, so let the services try.
            tracing::warn!("{} {} failed: {}", runtime.program, runtime.version_arg, e);
            RuntimeStatus::Found {
                version: "unknown".to_string(),
            }
        }
    }
}

/// Check that the runtime is installed and report it on the console.
///
/// Returns `false` when it is missing; the caller must not launch anything then.
pub async fn preflight<H: ProcessHost>(host: &H, runtime: &RuntimeSpec, console: &Console) -> bool {
    match detect_runtime(host, runtime).await {
        RuntimeStatus::Found { version } => {
            console.success(format!("✓ Node.js: {}", version));
            match parse_node_version(&version) {
                Some(found) if found < runtime.min_version => {
                    console.warning(format!(
                        "⚠️  Node.js {}.{} is older than {}.{}; the dev servers may refuse to start",
                        found.0, found.1, runtime.min_version.0, runtime.min_version.1
                    ));
                }
                Some(_) => {}
                None => {
                    tracing::debug!("could not parse Node.js version '{}'", version);
                }
            }
            true
        }
        RuntimeStatus::Missing => {
            console.fatal("✗ Node.js is not installed!");
            false
        }
    }
}

/// "v22.14.0" → (22, 14)
pub fn parse_node_version(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let ver_part = s.strip_prefix('v').unwrap_or(s);
    let parts: Vec<&str> = ver_part.split('.').collect();
    if parts.len() >= 2 {
        let major = parts[0].trim().parse().ok()?;
        let minor = parts[1].trim().parse().ok()?;
        Some((major, minor))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_version() {
        assert_eq!(parse_node_version("v22.14.0"), Some((22, 14)));
        assert_eq!(parse_node_version("v18.0.0"), Some((18, 0)));
        assert_eq!(parse_node_version("  v20.11.1  "), Some((20, 11)));
        assert_eq!(parse_node_version("16.20.2"), Some((16, 20)));
        assert_eq!(parse_node_version("garbage"), None);
        assert_eq!(parse_node_version(""), None);
    }

    #[tokio::test]
    async fn test_query_version_missing_program_is_not_found() {
        let err = query_version("definitely-not-a-real-runtime-binary", "--version", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_query_version_system_node() {
        // node may or may not be installed on the test machine
        match query_version("node", "--version", None).await {
            Ok(v) => assert!(
                parse_node_version(&v).is_some(),
                "unparseable node version: {:?}",
                v
            ),
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound, "unexpected error: {}", e),
        }
    }
}
