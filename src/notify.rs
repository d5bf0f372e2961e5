use crate::model::{BuildResult, SummarySnapshot};
use notify_rust::{Notification, Urgency};

/// Announces a finished build run on the desktop.
pub fn send_desktop(title: &str, summary: &SummarySnapshot) {
    let stats = summary.stats.clone().unwrap_or_default();
    let failed = stats.count(&BuildResult::Failed);
    let (headline, icon, urgency) = if failed > 0 {
        ("Synth build finished with failures", "dialog-error", Urgency::Critical)
    } else {
        ("Synth build finished", "dialog-information", Urgency::Normal)
    };

    let mut body = format!(
        "{}: {} built, {failed} failed",
        title,
        stats.count(&BuildResult::Built)
    );
    if !summary.profile.is_empty() {
        body.push_str(&format!(" ({})", summary.profile));
    }

    if let Err(e) = Notification::new()
        .summary(headline)
        .body(&body)
        .icon(icon)
        .urgency(urgency)
        .show()
    {
        tracing::debug!("desktop notification failed: {e}");
    }
}
