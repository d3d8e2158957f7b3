use std::io::Write;

use anyhow::{Context, Result};
use folio_core::{Command, DocumentProvider, NotificationLevel, Session, SessionEvent};
use folio_tty::status_label;
use tracing::debug;

/// Parses one script line. A leading number is the repeat count, as typed
/// before a key binding: `"3 navigate next"`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (count, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) if head.chars().all(|c| c.is_ascii_digit()) => {
            (head.parse::<u32>().ok(), rest.trim_start())
        }
        _ => (None, line),
    };
    let command = rest
        .parse::<Command>()
        .with_context(|| format!("invalid command `{}`", line))?;
    Ok(Some(match count {
        Some(count) => command.with_count(count),
        None => command,
    }))
}

/// Runs `lines` against `session`, writing one status line per command and
/// every notification raised along the way.
pub async fn run_script<P, W>(
    session: &mut Session,
    provider: &P,
    lines: &[String],
    out: &mut W,
) -> Result<()>
where
    P: DocumentProvider + ?Sized,
    W: Write,
{
    let events = session.events();
    for line in lines {
        let Some(command) = parse_line(line)? else {
            continue;
        };
        let name = command.to_string();
        let handled = session.execute(command, None);
        debug!(command = %name, handled, "script step");
        if session.reload_pending() {
            session.reload_with(provider).await?;
        }

        let drained = std::mem::take(&mut *events.lock());
        for event in drained {
            if let SessionEvent::Notification { level, message } = event {
                let tag = match level {
                    NotificationLevel::Info => "info",
                    NotificationLevel::Warning => "warning",
                    NotificationLevel::Error => "error",
                };
                writeln!(out, "{}: {}", tag, message)?;
            }
        }
        writeln!(
            out,
            "{} -> {} | {}",
            name,
            if handled { "ok" } else { "ignored" },
            status_label(session, None)
        )?;
    }
    out.flush()?;
    Ok(())
}
