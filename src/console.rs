//! Operator-facing status output.
//!
//! Every step the launcher takes prints one line here. Diagnostics that only
//! matter when something goes wrong go through `tracing` instead.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crossterm::style::{StyledContent, Stylize};

use crate::config::LauncherConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Something is about to happen.
    Step,
    Success,
    Warning,
    Fatal,
}

impl Tone {
    fn paint(self, text: &str) -> StyledContent<&str> {
        match self {
            Self::Step => text.blue(),
            Self::Success => text.green(),
            Self::Warning => text.yellow(),
            Self::Fatal => text.red(),
        }
    }
}

/// Lines written to a captured console, in order.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<(Tone, String)>>>);

impl Transcript {
    pub fn lines(&self) -> Vec<(Tone, String)> {
        self.0.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any line of `tone` contains `needle`.
    pub fn contains(&self, tone: Tone, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(t, line)| *t == tone && line.contains(needle))
    }

    fn push(&self, tone: Tone, line: &str) {
        if let Ok(mut lines) = self.0.lock() {
            lines.push((tone, line.to_string()));
        }
    }
}

enum Sink {
    Stdout,
    Captured(Transcript),
}

pub struct Console {
    sink: Sink,
}

impl Console {
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    /// A console that records lines instead of printing them.
    pub fn captured() -> (Self, Transcript) {
        let transcript = Transcript::default();
        let console = Self {
            sink: Sink::Captured(transcript.clone()),
        };
        (console, transcript)
    }

    pub fn line(&self, tone: Tone, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match &self.sink {
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout must not take the supervisor down with it.
                let _ = writeln!(out, "{}", tone.paint(msg));
                let _ = out.flush();
            }
            Sink::Captured(transcript) => transcript.push(tone, msg),
        }
    }

    pub fn step(&self, msg: impl AsRef<str>) {
        self.line(Tone::Step, msg)
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.line(Tone::Success, msg)
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        self.line(Tone::Warning, msg)
    }

    pub fn fatal(&self, msg: impl AsRef<str>) {
        self.line(Tone::Fatal, msg)
    }

    pub fn banner(&self, cfg: &LauncherConfig) {
        let rows = [
            format!("  Backend:  {}", cfg.backend_url()),
            format!("  Frontend: {}", cfg.frontend_url()),
            format!("  Admin:    {}", cfg.admin_url()),
        ];
        self.line(Tone::Step, "");
        self.line(Tone::Step, "═══════════════ 🌊 TON POOL STARTER 🌊 ═══════════════");
        for row in &rows {
            self.line(Tone::Step, row);
        }
        self.line(Tone::Step, "═════════════════════════════════════════════════════");
        self.line(Tone::Step, "");
    }

    pub fn ready(&self, cfg: &LauncherConfig, tunnel_requested: bool) {
        self.line(Tone::Success, "");
        self.line(Tone::Success, "✅ All services started!");
        self.line(Tone::Success, "");
        self.line(Tone::Success, format!("📱 Open in the browser: {}", cfg.frontend_url()));
        self.line(Tone::Success, format!("👨‍💼 Admin panel: {}", cfg.admin_url()));
        self.line(Tone::Success, "💳 Stripe test card: 4242 4242 4242 4242");
        if !tunnel_requested {
            self.line(Tone::Success, "");
            self.line(Tone::Success, "🔑 For a mobile wallet, rerun with the --ngrok flag:");
            self.line(Tone::Success, "   ton-pool-starter --ngrok");
        }
        self.line(Tone::Success, "");
        self.line(Tone::Warning, "Press Ctrl+C to stop all services...");
    }
}
