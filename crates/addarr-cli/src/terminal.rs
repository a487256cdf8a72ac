use std::io::Write;

use addarr_core::notifier::{NotificationKind, UpdateInfo};
use addarr_core::toast::{Toast, ToastKind};
use addarr_runtime::NotificationSink;

/// Prints notifications to stdout.
pub struct TerminalSink {
    /// Show the key hints used by `watch`.
    interactive: bool,
}

impl TerminalSink {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    fn emit(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

/// Render an announcement card.
pub fn render(kind: NotificationKind, info: &UpdateInfo) -> String {
    let mut lines = Vec::new();
    let mut title = format!("{kind}: {}", info.new_version);
    if let Some(current) = &info.current_version {
        title.push_str(&format!(" (running {current})"));
    }
    if let Some(at) = info.applied_at {
        title.push_str(&format!(" on {}", at.format("%Y-%m-%d %H:%M UTC")));
    }
    lines.push(format!("+ {title}"));
    for change in &info.changes {
        lines.push(format!("|   - {change}"));
    }
    lines.join("\n")
}

/// One status line for a toast.
pub fn render_toast(toast: &Toast) -> String {
    let marker = match toast.kind {
        ToastKind::Success => "ok",
        ToastKind::Error => "error",
    };
    format!("[{marker}] {}", toast.message)
}

impl NotificationSink for TerminalSink {
    fn announce(&self, kind: NotificationKind, info: &UpdateInfo) {
        let mut text = render(kind, info);
        if self.interactive {
            let hint = match kind {
                NotificationKind::Available => "[a] apply now  [d] dismiss",
                NotificationKind::Applied => "[d] dismiss",
            };
            text.push_str(&format!("\n+ {hint}"));
        }
        self.emit(&text);
    }

    fn withdraw(&self, kind: NotificationKind) {
        self.emit(&format!("- {kind} dismissed"));
    }

    fn toast(&self, toast: Toast) {
        self.emit(&render_toast(&toast));
    }

    fn reload(&self) {
        self.emit("Reloading...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_available() {
        let info = UpdateInfo {
            new_version: "1.0.142".into(),
            current_version: Some("1.0.140".into()),
            changes: vec!["Fix poster fallback".into(), "Add season picker".into()],
            applied_at: None,
        };
        assert_eq!(
            render(NotificationKind::Available, &info),
            "+ Update available: 1.0.142 (running 1.0.140)\n\
             |   - Fix poster fallback\n\
             |   - Add season picker"
        );
    }

    #[test]
    fn test_render_toast() {
        assert_eq!(
            render_toast(&Toast::error("Update failed: dirty worktree")),
            "[error] Update failed: dirty worktree"
        );
        assert_eq!(render_toast(&Toast::success("Update applied")), "[ok] Update applied");
    }
}
