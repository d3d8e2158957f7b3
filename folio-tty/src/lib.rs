pub mod bindings;

use std::io::{self, Write};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use folio_core::command::GotoTarget;
use folio_core::{Command, Direction, IndexMove, Mode, PointerEvent, ScrollDirection, Session};

pub use bindings::{BindingError, Bindings, KeyBinding};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    /// A command that needs the pointer event that triggered it.
    Pointer {
        command: Command,
        event: PointerEvent,
    },
    BeginSearch(Direction),
    SearchQueryChanged { query: String },
    SearchCancel,
    Resize { columns: u16, rows: u16 },
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search(Direction),
    /// Typing the number of a highlighted link.
    LinkSelect,
    /// Moving through the outline.
    Index,
}

#[derive(Debug)]
pub struct EventMapper {
    bindings: Bindings,
    pending_count: Option<u32>,
    pending_digits: String,
    char_stack: String,
    mode: InputMode,
    search_buffer: String,
    link_buffer: String,
    cell_size: (f64, f64),
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::with_bindings(Bindings::default())
    }
}

impl EventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: Bindings) -> Self {
        Self {
            bindings,
            pending_count: None,
            pending_digits: String::new(),
            char_stack: String::new(),
            mode: InputMode::Normal,
            search_buffer: String::new(),
            link_buffer: String::new(),
            cell_size: (1.0, 1.0),
        }
    }

    /// Pixel size of one terminal cell, used to turn mouse positions into
    /// window coordinates.
    pub fn set_cell_size(&mut self, width: f64, height: f64) {
        self.cell_size = (width.max(1.0), height.max(1.0));
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.reset_count();
            self.reset_char_stack();
            self.search_buffer.clear();
            self.link_buffer.clear();
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Enters or leaves link selection and the outline to match the session
    /// after a command ran. Search input is left alone.
    pub fn follow_session_mode(&mut self, mode: Mode) {
        match (mode, self.mode) {
            (Mode::LinkSelect(_), InputMode::Normal) => self.set_mode(InputMode::LinkSelect),
            (Mode::Index, InputMode::Normal) => self.set_mode(InputMode::Index),
            (Mode::Normal | Mode::Fullscreen, InputMode::LinkSelect | InputMode::Index) => {
                self.set_mode(InputMode::Normal)
            }
            _ => {}
        }
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) => match self.mode {
                InputMode::Normal => self.map_key_normal(key),
                InputMode::Search(direction) => self.map_key_search(key, direction),
                InputMode::LinkSelect => self.map_key_link_select(key),
                InputMode::Index => self.map_key_index(key),
            },
            Event::Mouse(mouse) if self.mode == InputMode::Normal => self.map_mouse(mouse),
            Event::Resize(columns, rows) => UiEvent::Resize { columns, rows },
            _ => UiEvent::None,
        }
    }

    fn map_key_normal(&mut self, key: KeyEvent) -> UiEvent {
        let KeyEvent {
            code, modifiers, ..
        } = key;
        let plain = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;

        if let KeyCode::Char(c) = code {
            if plain {
                match self.char_stack.as_str() {
                    "m" => {
                        self.reset_char_stack();
                        self.reset_count();
                        return UiEvent::Command(Command::PutMark { key: c });
                    }
                    "'" => {
                        self.reset_char_stack();
                        self.reset_count();
                        return UiEvent::Command(Command::GotoMark { key: c });
                    }
                    "g" => {
                        self.reset_char_stack();
                        if c == 'g' {
                            let count = self.take_count();
                            return UiEvent::Command(Command::Goto {
                                target: GotoTarget::Top,
                                count,
                            });
                        }
                        self.reset_count();
                        return UiEvent::None;
                    }
                    _ => {}
                }

                match c {
                    '1'..='9' => {
                        self.push_digit(c);
                        return UiEvent::None;
                    }
                    '0' if self.pending_count.is_some() => {
                        self.push_digit(c);
                        return UiEvent::None;
                    }
                    'm' | '\'' | 'g' => {
                        self.push_char(c);
                        return UiEvent::None;
                    }
                    '/' => {
                        self.set_mode(InputMode::Search(Direction::Forward));
                        return UiEvent::BeginSearch(Direction::Forward);
                    }
                    '?' => {
                        self.set_mode(InputMode::Search(Direction::Backward));
                        return UiEvent::BeginSearch(Direction::Backward);
                    }
                    'q' => {
                        self.reset_count();
                        return UiEvent::Quit;
                    }
                    _ => {}
                }
            }
        }

        self.reset_char_stack();
        match self.bindings.lookup(code, modifiers).cloned() {
            Some(command) => {
                let count = self.take_count();
                UiEvent::Command(command.with_count(count))
            }
            None => {
                self.reset_count();
                UiEvent::None
            }
        }
    }

    fn map_key_search(&mut self, key: KeyEvent, direction: Direction) -> UiEvent {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                self.set_mode(InputMode::Normal);
                UiEvent::SearchCancel
            }
            (KeyCode::Enter, _) => {
                let query = std::mem::take(&mut self.search_buffer);
                self.set_mode(InputMode::Normal);
                if query.is_empty() {
                    UiEvent::SearchCancel
                } else {
                    UiEvent::Command(Command::Search { query, direction })
                }
            }
            (KeyCode::Backspace, _) => {
                if self.search_buffer.pop().is_none() {
                    self.set_mode(InputMode::Normal);
                    return UiEvent::SearchCancel;
                }
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            (KeyCode::Char(c), mods) if mods.is_empty() || mods == KeyModifiers::SHIFT => {
                self.search_buffer.push(c);
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            _ => UiEvent::None,
        }
    }

    fn map_key_link_select(&mut self, key: KeyEvent) -> UiEvent {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.link_buffer.push(c);
                UiEvent::None
            }
            KeyCode::Backspace => {
                self.link_buffer.pop();
                UiEvent::None
            }
            KeyCode::Enter => {
                let index = self.link_buffer.parse::<usize>().ok();
                self.set_mode(InputMode::Normal);
                match index {
                    Some(index) => UiEvent::Command(Command::SelectLink { index }),
                    None => UiEvent::Command(Command::Abort),
                }
            }
            KeyCode::Esc => {
                self.set_mode(InputMode::Normal);
                UiEvent::Command(Command::Abort)
            }
            _ => UiEvent::None,
        }
    }

    fn map_key_index(&mut self, key: KeyEvent) -> UiEvent {
        let movement = match key.code {
            KeyCode::Char('k') | KeyCode::Up => IndexMove::Up,
            KeyCode::Char('j') | KeyCode::Down => IndexMove::Down,
            KeyCode::Char('h') | KeyCode::Left => IndexMove::Collapse,
            KeyCode::Char('l') | KeyCode::Right => IndexMove::Expand,
            KeyCode::Char('H') => IndexMove::CollapseAll,
            KeyCode::Char('L') => IndexMove::ExpandAll,
            KeyCode::Enter | KeyCode::Char(' ') => IndexMove::Select,
            KeyCode::Tab => return UiEvent::Command(Command::ToggleIndex),
            KeyCode::Esc => return UiEvent::Command(Command::Abort),
            KeyCode::Char('q') => return UiEvent::Quit,
            _ => return UiEvent::None,
        };
        UiEvent::Command(Command::NavigateIndex(movement))
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> UiEvent {
        let position = (
            f64::from(mouse.column) * self.cell_size.0,
            f64::from(mouse.row) * self.cell_size.1,
        );
        let zoom = mouse.modifiers.contains(KeyModifiers::CONTROL);
        let wheel = |event: PointerEvent, direction: ScrollDirection| {
            let command = if zoom && matches!(event, PointerEvent::ScrollUp | PointerEvent::ScrollDown) {
                Command::MouseZoom { count: 0 }
            } else {
                Command::MouseScroll {
                    direction,
                    count: 0,
                }
            };
            UiEvent::Pointer { command, event }
        };
        // Drags pan the view through the same command as the wheel.
        let drag = |event: PointerEvent| UiEvent::Pointer {
            command: Command::MouseScroll {
                direction: ScrollDirection::Down,
                count: 0,
            },
            event,
        };
        match mouse.kind {
            MouseEventKind::ScrollUp => wheel(PointerEvent::ScrollUp, ScrollDirection::Up),
            MouseEventKind::ScrollDown => wheel(PointerEvent::ScrollDown, ScrollDirection::Down),
            MouseEventKind::ScrollLeft => wheel(PointerEvent::ScrollLeft, ScrollDirection::Left),
            MouseEventKind::ScrollRight => wheel(PointerEvent::ScrollRight, ScrollDirection::Right),
            MouseEventKind::Down(MouseButton::Left) => drag(PointerEvent::ButtonPress {
                x: position.0,
                y: position.1,
            }),
            MouseEventKind::Drag(MouseButton::Left) => drag(PointerEvent::Motion {
                x: position.0,
                y: position.1,
            }),
            MouseEventKind::Up(MouseButton::Left) => drag(PointerEvent::ButtonRelease),
            _ => UiEvent::None,
        }
    }

    fn push_digit(&mut self, digit: char) {
        let Some(value) = digit.to_digit(10) else {
            return;
        };
        let current = self.pending_count.unwrap_or(0);
        self.pending_count = Some(current.saturating_mul(10).saturating_add(value));
        self.pending_digits.push(digit);
    }

    /// Zero means no count was typed.
    fn take_count(&mut self) -> u32 {
        let count = self.pending_count.take().unwrap_or(0);
        self.pending_digits.clear();
        count
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    fn push_char(&mut self, c: char) {
        self.char_stack.push(c);
    }

    fn reset_char_stack(&mut self) {
        self.char_stack.clear();
    }

    pub fn pending_input(&self) -> Option<String> {
        match self.mode {
            InputMode::Search(Direction::Forward) => return Some(format!("/{}", self.search_buffer)),
            InputMode::Search(Direction::Backward) => {
                return Some(format!("?{}", self.search_buffer))
            }
            InputMode::LinkSelect => return Some(format!("link: {}", self.link_buffer)),
            InputMode::Normal | InputMode::Index => {}
        }
        let pending = format!("{}{}", self.pending_digits, self.char_stack);
        if pending.is_empty() {
            None
        } else {
            Some(pending)
        }
    }
}

/// One-line summary of the session: file, page, zoom, adjust mode and any
/// pending input.
pub fn status_label(session: &Session, pending: Option<&str>) -> String {
    let mut label = match session.document() {
        Some(doc) => {
            let name = doc
                .info
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| doc.info.path.display().to_string());
            format!(
                "{} [{}/{}] {:.0}% {}",
                name,
                doc.view.current_page + 1,
                doc.page_count(),
                doc.view.scale * 100.0,
                doc.view.adjust_mode
            )
        }
        None => String::from("[no document]"),
    };
    match session.mode() {
        Mode::Normal => {}
        Mode::Fullscreen => label.push_str(" (fullscreen)"),
        Mode::LinkSelect(_) => label.push_str(" (links)"),
        Mode::Index => label.push_str(" (index)"),
    }
    if let Some(pending) = pending {
        label.push_str("  ");
        label.push_str(pending);
    }
    label
}

pub fn write_status_line<W: Write>(writer: &mut W, label: &str) -> io::Result<()> {
    write!(writer, "{}", label)?;
    writer.flush()
}
