//! Message text for status announcements and on-demand status reports.

use streamwatch_vkvideo::{Channel, StreamStatus};

use crate::registry::Snapshot;

/// Rich-text dialect the recipient's client renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Html,
    Plain,
}

/// Escape text for Telegram HTML (also safe inside a quoted attribute).
#[must_use]
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a link with the given visible text.
#[must_use]
pub fn link(format: TextFormat, text: &str, url: &str) -> String {
    match format {
        TextFormat::Html => format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(text)),
        TextFormat::Plain => format!("{text} ({url})"),
    }
}

/// Plain text in the given format (escaped as needed).
#[must_use]
pub fn text(format: TextFormat, text: &str) -> String {
    match format {
        TextFormat::Html => escape_html(text),
        TextFormat::Plain => text.to_string(),
    }
}

/// Announcement for a channel whose status just changed to `channel.status`.
#[must_use]
pub fn status_change_message(channel: &Channel, watch_base_url: &str, format: TextFormat) -> String {
    let link = link(format, &channel.nick, &channel.watch_url(watch_base_url));
    if channel.status.is_online() {
        format!("🔥 {link} {}", text(format, "started streaming"))
    } else {
        format!("🏁 {link} {}", text(format, "finished streaming"))
    }
}

fn status_marker(status: &StreamStatus, format: TextFormat) -> String {
    match status {
        StreamStatus::Online => "🟢".to_string(),
        StreamStatus::Offline => "🔴".to_string(),
        StreamStatus::Other(other) => format!("🔵 {}", text(format, other)),
    }
}

/// One line per channel in snapshot order.
#[must_use]
pub fn status_report(snapshot: &Snapshot, watch_base_url: &str, format: TextFormat) -> String {
    if snapshot.is_empty() {
        return text(format, "No channel data yet, try again in a minute.");
    }
    snapshot
        .iter()
        .map(|channel| {
            format!(
                "{} {}",
                status_marker(&channel.status, format),
                link(format, &channel.nick, &channel.watch_url(watch_base_url))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {rstest::rstest, super::*};

    const WATCH: &str = "https://live.vkvideo.ru";

    fn channel(id: &str, nick: &str, status: &str) -> Channel {
        Channel {
            id: id.into(),
            nick: nick.into(),
            status: status.into(),
        }
    }

    #[test]
    fn online_announcement_uses_started_phrasing() {
        let msg = status_change_message(&channel("lobby", "Lobby", "online"), WATCH, TextFormat::Html);
        assert_eq!(
            msg,
            "🔥 <a href=\"https://live.vkvideo.ru/lobby\">Lobby</a> started streaming"
        );
    }

    #[rstest]
    #[case("offline")]
    #[case("planned")]
    fn non_online_announcement_uses_finished_phrasing(#[case] status: &str) {
        let msg = status_change_message(&channel("lobby", "Lobby", status), WATCH, TextFormat::Html);
        assert!(msg.starts_with("🏁 "));
        assert!(msg.ends_with("finished streaming"));
    }

    #[test]
    fn html_link_escapes_nickname() {
        assert_eq!(
            link(TextFormat::Html, "<b>&co", "https://x/y"),
            "<a href=\"https://x/y\">&lt;b&gt;&amp;co</a>"
        );
    }

    #[rstest]
    #[case(TextFormat::Html, "<a href=\"https://x/a_b\">a_b</a>")]
    #[case(TextFormat::Plain, "a_b (https://x/a_b)")]
    fn link_per_format(#[case] format: TextFormat, #[case] expected: &str) {
        assert_eq!(link(format, "a_b", "https://x/a_b"), expected);
    }

    #[test]
    fn report_lists_channels_with_markers() {
        let snapshot = Snapshot::from_channels([
            channel("a", "Alpha", "online"),
            channel("b", "Beta", "offline"),
            channel("c", "Gamma", "planned"),
        ]);
        let report = status_report(&snapshot, WATCH, TextFormat::Plain);
        assert_eq!(
            report,
            "🟢 Alpha (https://live.vkvideo.ru/a)\n\
             🔴 Beta (https://live.vkvideo.ru/b)\n\
             🔵 planned Gamma (https://live.vkvideo.ru/c)"
        );
    }

    #[test]
    fn empty_report_is_not_blank() {
        let report = status_report(&Snapshot::default(), WATCH, TextFormat::Html);
        assert!(!report.trim().is_empty());
    }
}
