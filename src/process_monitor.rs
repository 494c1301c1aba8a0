use sysinfo::System;

#[derive(Debug, Clone)]
pub struct RunningProcess {
    pub pid: u32,
    pub name: String,
    /// Command-line arguments, e.g. ["node", "vite.js", "--host"]
    pub cmd: Vec<String>,
}

/// Snapshot of every process visible to this user.
pub fn get_running_processes() -> Vec<RunningProcess> {
    let mut sys = System::new();
    sys.refresh_processes();

    let processes: Vec<RunningProcess> = sys
        .processes()
        .iter()
        .map(|(pid, process)| RunningProcess {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            cmd: process.cmd().to_vec(),
        })
        .collect();

    tracing::debug!("Found {} running processes", processes.len());
    processes
}

/// Processes a bulk kill for `pattern` would hit: the image name matches, or
/// (like `pkill -f`) the full command line contains it. Our own PID is excluded.
pub fn find_matching(processes: &[RunningProcess], pattern: &str) -> Vec<RunningProcess> {
    let pattern = pattern.to_lowercase();
    let own_pid = std::process::id();

    processes
        .iter()
        .filter(|p| p.pid != own_pid)
        .filter(|p| {
            p.name.to_lowercase().contains(&pattern)
                || p.cmd.join(" ").to_lowercase().contains(&pattern)
        })
        .cloned()
        .collect()
}

/// How many running processes match `pattern`. Scans the process table on a
/// blocking thread since sysinfo walks it synchronously.
pub async fn count_matching_async(pattern: &str) -> usize {
    let pattern = pattern.to_string();
    tokio::task::spawn_blocking(move || find_matching(&get_running_processes(), &pattern).len())
        .await
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: u32, name: &str, cmd: &[&str]) -> RunningProcess {
        RunningProcess {
            pid,
            name: name.to_string(),
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_find_matching_by_name_and_cmdline() {
        let table = vec![
            entry(u32::MAX - 3, "node", &["node", "server.js"]),
            entry(u32::MAX - 2, "npm exec tsx", &["/usr/bin/node", "/usr/lib/npx-cli.js", "tsx"]),
            entry(u32::MAX - 1, "bash", &["bash"]),
            entry(u32::MAX, "NODE.EXE", &[]),
        ];

        let pids: Vec<u32> = find_matching(&table, "node").iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![u32::MAX - 3, u32::MAX - 2, u32::MAX]);
    }

    #[test]
    fn test_find_matching_skips_self() {
        let me = std::process::id();
        let table = vec![entry(me, "node", &["node"])];
        assert!(find_matching(&table, "node").is_empty());
    }

    #[test]
    fn test_process_table_is_readable() {
        // at minimum this test process is visible
        assert!(!get_running_processes().is_empty());
    }
}
