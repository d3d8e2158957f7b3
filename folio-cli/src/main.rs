mod manifest;
mod script;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use directories::ProjectDirs;
use folio_core::command::GotoTarget;
use folio_core::launch::SystemLauncher;
use folio_core::{
    Command, FileStateStore, Mode, Outline, Rect, RenderQueue, Session, SessionEvent, Settings,
    StateStore, WindowGeometry,
};
use folio_tty::{status_label, write_status_line, Bindings, EventMapper, UiEvent};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::manifest::ManifestProvider;

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "keyboard-driven viewer for paginated documents"
)]
struct Args {
    /// Page to open the document on (1-based)
    #[arg(short = 'P', long = "page")]
    page: Option<u32>,

    /// Configuration file to use instead of the default location
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Run a command without the terminal UI; may be repeated
    #[arg(short = 'e', long = "exec")]
    exec: Vec<String>,

    /// Run the commands listed in a file without the terminal UI
    #[arg(long = "script", conflicts_with = "exec")]
    script: Option<PathBuf>,

    /// Page manifest describing the document
    file: PathBuf,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(
            stdout,
            DisableMouseCapture,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "folio", "folio")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let scripted = !args.exec.is_empty() || args.script.is_some();
    let _log_guard = init_logging(&project_dirs, scripted)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Settings::default_path(&project_dirs));
    let settings = Settings::load(&config_path)?;
    let bindings = Bindings::with_overrides(&settings.bindings)
        .with_context(|| format!("invalid [bindings] in {:?}", config_path))?;

    let state_dir = project_dirs.data_local_dir().join("state");
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(state_dir)?);
    let renderer = RenderQueue::new();
    let launcher = SystemLauncher::current()?;
    let mut session = Session::new(
        settings,
        store,
        Arc::new(renderer.clone()),
        Arc::new(launcher),
    );

    let provider = ManifestProvider::new();
    if !scripted {
        session.set_window(terminal_window()?.0);
    }
    session
        .open_with(&provider, args.file.clone())
        .await
        .with_context(|| format!("failed to open {:?}", args.file))?;

    if let Some(page) = args.page {
        session.execute(
            Command::Goto {
                target: GotoTarget::Top,
                count: page,
            },
            None,
        );
    }

    if scripted {
        let lines = match &args.script {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read script {:?}", path))?
                .lines()
                .map(str::to_owned)
                .collect(),
            None => args.exec.clone(),
        };
        let mut stdout = io::stdout();
        script::run_script(&mut session, &provider, &lines, &mut stdout).await?;
    } else {
        run_interactive(&mut session, &provider, &renderer, bindings).await?;
    }

    session.persist()?;
    Ok(())
}

enum LoopAction {
    Continue,
    ContinueRedraw,
    Quit,
}

async fn run_interactive(
    session: &mut Session,
    provider: &ManifestProvider,
    renderer: &RenderQueue,
    bindings: Bindings,
) -> Result<()> {
    let _raw = RawModeGuard::new()?;
    let mut stdout = io::stdout();
    let mut mapper = EventMapper::with_bindings(bindings);
    let (window, mut cell) = terminal_window()?;
    mapper.set_cell_size(cell.0, cell.1);
    session.set_window(window);

    let events = session.events();
    let mut message: Option<String> = None;
    let mut dirty = true;

    loop {
        let requests = renderer.drain();
        if dirty || !requests.is_empty() {
            let pending = mapper.pending_input();
            redraw(&mut stdout, session, cell, pending.as_deref(), message.as_deref())?;
            dirty = false;
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let ui_event = mapper.map_event(event::read()?);
        match handle_event(ui_event, session, &mut mapper, &mut cell, &mut message)? {
            LoopAction::Continue => {}
            LoopAction::ContinueRedraw => dirty = true,
            LoopAction::Quit => break,
        }

        if session.reload_pending() {
            if let Err(err) = session.reload_with(provider).await {
                warn!(?err, "reload failed");
                message = Some(format!("Reload failed: {}", err));
            }
            dirty = true;
        }
        mapper.follow_session_mode(session.mode());

        let drained = std::mem::take(&mut *events.lock());
        for session_event in drained {
            if let SessionEvent::Notification { message: text, .. } = session_event {
                message = Some(text);
                dirty = true;
            }
        }
    }
    Ok(())
}

fn handle_event(
    event: UiEvent,
    session: &mut Session,
    mapper: &mut EventMapper,
    cell: &mut (f64, f64),
    message: &mut Option<String>,
) -> Result<LoopAction> {
    match event {
        UiEvent::Command(command) => {
            *message = None;
            session.execute(command, None);
            Ok(LoopAction::ContinueRedraw)
        }
        UiEvent::Pointer { command, event } => {
            if session.execute(command, Some(&event)) {
                Ok(LoopAction::ContinueRedraw)
            } else {
                Ok(LoopAction::Continue)
            }
        }
        UiEvent::BeginSearch(_) | UiEvent::SearchQueryChanged { .. } | UiEvent::SearchCancel => {
            Ok(LoopAction::ContinueRedraw)
        }
        UiEvent::Resize { .. } => {
            let (window, resized) = terminal_window()?;
            *cell = resized;
            mapper.set_cell_size(cell.0, cell.1);
            session.set_window(window);
            Ok(LoopAction::ContinueRedraw)
        }
        UiEvent::Quit => Ok(LoopAction::Quit),
        UiEvent::None => Ok(LoopAction::Continue),
    }
}

/// Drawing area in pixels, minus the status row, and the pixel size of a
/// cell. Terminals that do not report pixels get an 8x16 cell.
fn terminal_window() -> Result<(WindowGeometry, (f64, f64))> {
    let size = terminal::window_size()?;
    let columns = f64::from(size.columns.max(1));
    let rows = f64::from(size.rows.max(2));
    let cell = if size.width > 0 && size.height > 0 {
        (f64::from(size.width) / columns, f64::from(size.height) / rows)
    } else {
        (8.0, 16.0)
    };
    let window = WindowGeometry {
        width: columns * cell.0,
        height: (rows - 1.0) * cell.1,
        inputbar_height: cell.1,
        inputbar_visible: false,
    };
    Ok((window, cell))
}

fn redraw(
    out: &mut impl Write,
    session: &Session,
    cell: (f64, f64),
    pending: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    let (columns, rows) = terminal::size()?;
    let page_rows = rows.saturating_sub(1);
    crossterm::queue!(out, Clear(ClearType::All))?;

    let outline = match session.mode() {
        Mode::Index => session.document().and_then(|doc| doc.outline()),
        _ => None,
    };
    if let Some(outline) = outline {
        draw_outline(out, outline, columns, page_rows)?;
    } else if let Some(doc) = session.document() {
        let origin = doc.position();
        let to_cells = |rect: Rect| {
            (
                ((rect.x1 - origin.x) / cell.0).floor() as i64,
                ((rect.y1 - origin.y) / cell.1).floor() as i64,
                ((rect.x2 - origin.x) / cell.0).ceil() as i64,
                ((rect.y2 - origin.y) / cell.1).ceil() as i64,
            )
        };
        let selecting_link = matches!(session.mode(), Mode::LinkSelect(_));
        let mut link_number = 0;
        for page in doc.document.pages().iter().filter(|page| page.visible) {
            let Some(bounds) = doc.layout().page_rect(page.index) else {
                continue;
            };
            let frame = to_cells(bounds);
            draw_frame(out, frame, columns, page_rows)?;
            let label = format!(" {} ", page.index + 1);
            put_text(out, frame.0 + 2, frame.1, &label, columns, page_rows)?;

            let (page_width, page_height) = (page.width, page.height);
            let place = |rect: Rect| {
                let view = rect.to_view(page_width, page_height, doc.view.scale, doc.view.rotation);
                to_cells(Rect::new(
                    view.x1 + bounds.x1,
                    view.y1 + bounds.y1,
                    view.x2 + bounds.x1,
                    view.y2 + bounds.y1,
                ))
            };
            // link numbers take the place of search highlights
            if selecting_link {
                for link in &page.links {
                    let (x, y, _, _) = place(link.position());
                    put_text(out, x, y, &format!("[{}]", link_number), columns, page_rows)?;
                    link_number += 1;
                }
            } else {
                for (index, rect) in page.matches.rects.iter().enumerate() {
                    let marker = if page.matches.current == Some(index) { "#" } else { "=" };
                    let (x, y, _, _) = place(*rect);
                    put_text(out, x, y, marker, columns, page_rows)?;
                }
            }
        }
    }

    let mut status = status_label(session, pending);
    if let Some(message) = message {
        status.push_str(" | ");
        status.push_str(message);
    }
    let status: String = status.chars().take(usize::from(columns)).collect();
    crossterm::queue!(
        out,
        cursor::MoveTo(0, page_rows),
        SetAttribute(Attribute::Reverse)
    )?;
    write_status_line(out, &format!("{:<width$}", status, width = usize::from(columns)))?;
    crossterm::execute!(out, SetAttribute(Attribute::Reset))?;
    Ok(())
}

/// Lists the shown outline rows, scrolled so the selected one is visible.
fn draw_outline(out: &mut impl Write, outline: &Outline, columns: u16, rows: u16) -> Result<()> {
    let entries = outline.visible_rows();
    let selected = entries
        .iter()
        .position(|(path, _)| path.as_slice() == outline.cursor())
        .unwrap_or(0);
    let first = (selected + 1).saturating_sub(usize::from(rows.max(1)));
    for (row, (path, entry)) in entries.iter().enumerate().skip(first).take(usize::from(rows)) {
        let marker = if entry.children.is_empty() {
            ' '
        } else if outline.is_expanded(path) {
            '-'
        } else {
            '+'
        };
        let cursor = if path.as_slice() == outline.cursor() { '>' } else { ' ' };
        let line = format!(
            "{}{}{} {}  p.{}",
            cursor,
            "  ".repeat(path.len().saturating_sub(1)),
            marker,
            entry.title,
            entry.destination.page + 1
        );
        put_text(out, 0, (row - first) as i64, &line, columns, rows)?;
    }
    Ok(())
}

fn draw_frame(
    out: &mut impl Write,
    (x1, y1, x2, y2): (i64, i64, i64, i64),
    columns: u16,
    rows: u16,
) -> Result<()> {
    let width = (x2 - x1).max(2) as usize;
    let edge = format!("+{}+", "-".repeat(width.saturating_sub(2)));
    let side = format!("|{}|", " ".repeat(width.saturating_sub(2)));
    for y in y1..=y2 {
        let line = if y == y1 || y == y2 { &edge } else { &side };
        put_text(out, x1, y, line, columns, rows)?;
    }
    Ok(())
}

/// Prints the part of `text` that falls inside the page area.
fn put_text(out: &mut impl Write, x: i64, y: i64, text: &str, columns: u16, rows: u16) -> Result<()> {
    if y < 0 || y >= i64::from(rows) {
        return Ok(());
    }
    let skip = usize::try_from(-x.min(0)).unwrap_or_default();
    let start = x.max(0);
    let room = usize::try_from(i64::from(columns) - start).unwrap_or_default();
    let visible: String = text.chars().skip(skip).take(room).collect();
    if visible.is_empty() {
        return Ok(());
    }
    crossterm::queue!(out, cursor::MoveTo(start as u16, y as u16), Print(visible))?;
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs, console: bool) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "folio.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    // The terminal UI owns stdout, so console output only accompanies scripts.
    let console_layer = console.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    info!("logging initialised");
    Ok(guard)
}
