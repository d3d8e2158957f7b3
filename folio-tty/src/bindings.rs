use std::collections::{BTreeMap, HashMap};

use crossterm::event::{KeyCode, KeyModifiers};
use folio_core::command::{GotoTarget, LinkPurpose, PageDirection, RotateDirection};
use folio_core::{AdjustMode, Command, Direction, ScrollDirection, ZoomKind};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("unrecognized key `{0}`")]
    UnknownKey(String),
    #[error("invalid command for key `{key}`")]
    Command {
        key: String,
        #[source]
        source: folio_core::Error,
    },
}

/// A key plus the modifiers that matter for lookup. Shift is folded into
/// the character for printable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Parses names such as `j`, `<C-d>`, `<Space>` or `<PageDown>`.
    pub fn parse(name: &str) -> Result<Self, BindingError> {
        let unknown = || BindingError::UnknownKey(name.to_owned());
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Self::plain(KeyCode::Char(c)));
        }

        let inner = name
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(unknown)?;
        let (modifiers, key) = match inner.split_once('-') {
            Some((prefix, key)) if !key.is_empty() => {
                let modifiers = match prefix {
                    "C" => KeyModifiers::CONTROL,
                    "A" | "M" => KeyModifiers::ALT,
                    "S" => KeyModifiers::SHIFT,
                    _ => return Err(unknown()),
                };
                (modifiers, key)
            }
            _ => (KeyModifiers::NONE, inner),
        };

        let code = match key {
            "Space" => KeyCode::Char(' '),
            "Tab" => KeyCode::Tab,
            "Esc" => KeyCode::Esc,
            "Enter" | "Return" => KeyCode::Enter,
            "BackSpace" => KeyCode::Backspace,
            "Up" => KeyCode::Up,
            "Down" => KeyCode::Down,
            "Left" => KeyCode::Left,
            "Right" => KeyCode::Right,
            "PageUp" => KeyCode::PageUp,
            "PageDown" => KeyCode::PageDown,
            "Home" => KeyCode::Home,
            "End" => KeyCode::End,
            other => {
                if let Some(n) = other.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                    KeyCode::F(n)
                } else {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => KeyCode::Char(c),
                        _ => return Err(unknown()),
                    }
                }
            }
        };
        Ok(Self::new(code, modifiers))
    }
}

/// Maps keys to command templates. Counts are applied when the key fires.
#[derive(Debug, Clone)]
pub struct Bindings {
    table: HashMap<KeyBinding, Command>,
}

fn scroll(direction: ScrollDirection) -> Command {
    Command::Scroll {
        direction,
        count: 0,
    }
}

impl Default for Bindings {
    fn default() -> Self {
        use KeyCode::*;

        let plain = KeyBinding::plain;
        let ch = |c| KeyBinding::plain(Char(c));
        let ctrl = KeyBinding::ctrl;

        let entries = [
            (ch('j'), scroll(ScrollDirection::Down)),
            (plain(Down), scroll(ScrollDirection::Down)),
            (ch('k'), scroll(ScrollDirection::Up)),
            (plain(Up), scroll(ScrollDirection::Up)),
            (ch('h'), scroll(ScrollDirection::Left)),
            (plain(Left), scroll(ScrollDirection::Left)),
            (ch('l'), scroll(ScrollDirection::Right)),
            (plain(Right), scroll(ScrollDirection::Right)),
            (ctrl('d'), scroll(ScrollDirection::HalfDown)),
            (ctrl('u'), scroll(ScrollDirection::HalfUp)),
            (ctrl('f'), scroll(ScrollDirection::FullDown)),
            (ctrl('b'), scroll(ScrollDirection::FullUp)),
            (ch(' '), scroll(ScrollDirection::FullDown)),
            (plain(Home), scroll(ScrollDirection::Top)),
            (plain(End), scroll(ScrollDirection::Bottom)),
            (
                ch('J'),
                Command::Navigate {
                    direction: PageDirection::Next,
                    count: 0,
                },
            ),
            (
                plain(PageDown),
                Command::Navigate {
                    direction: PageDirection::Next,
                    count: 0,
                },
            ),
            (
                ch('K'),
                Command::Navigate {
                    direction: PageDirection::Previous,
                    count: 0,
                },
            ),
            (
                plain(PageUp),
                Command::Navigate {
                    direction: PageDirection::Previous,
                    count: 0,
                },
            ),
            (
                ch('G'),
                Command::Goto {
                    target: GotoTarget::Bottom,
                    count: 0,
                },
            ),
            (
                ch('+'),
                Command::Zoom {
                    kind: ZoomKind::In,
                    count: 0,
                },
            ),
            (
                ch('-'),
                Command::Zoom {
                    kind: ZoomKind::Out,
                    count: 0,
                },
            ),
            (
                ch('='),
                Command::Zoom {
                    kind: ZoomKind::Specific(0),
                    count: 0,
                },
            ),
            (ch('a'), Command::AdjustWindow(AdjustMode::BestFit)),
            (ch('s'), Command::AdjustWindow(AdjustMode::Width)),
            (
                ch('r'),
                Command::Rotate {
                    direction: RotateDirection::Clockwise,
                    count: 0,
                },
            ),
            (ch('R'), Command::Reload),
            (ctrl('o'), Command::Jumplist(Direction::Backward)),
            (ctrl('i'), Command::Jumplist(Direction::Forward)),
            (plain(Tab), Command::ToggleIndex),
            (
                ch('['),
                Command::Bisect {
                    direction: Direction::Backward,
                    count: 0,
                },
            ),
            (
                ch(']'),
                Command::Bisect {
                    direction: Direction::Forward,
                    count: 0,
                },
            ),
            (
                ch('n'),
                Command::SearchNext {
                    direction: Direction::Forward,
                    count: 0,
                },
            ),
            (
                ch('N'),
                Command::SearchNext {
                    direction: Direction::Backward,
                    count: 0,
                },
            ),
            (ch('f'), Command::ShowLinks(LinkPurpose::Follow)),
            (ch('F'), Command::ShowLinks(LinkPurpose::Display)),
            (ch('d'), Command::TogglePageMode),
            (plain(F(5)), Command::ToggleFullscreen),
            (ctrl('r'), Command::Recolor),
            (plain(Esc), Command::Abort),
            (ctrl('['), Command::Abort),
        ];

        Self {
            table: entries.into_iter().collect(),
        }
    }
}

impl Bindings {
    /// Default table with entries from the `[bindings]` config section
    /// layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, BindingError> {
        let mut bindings = Self::default();
        for (key, command) in overrides {
            let binding = KeyBinding::parse(key)?;
            let command = command
                .parse::<Command>()
                .map_err(|source| BindingError::Command {
                    key: key.clone(),
                    source,
                })?;
            debug!(key = %key, command = %command, "binding override");
            bindings.table.insert(binding, command);
        }
        Ok(bindings)
    }

    pub fn lookup(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<&Command> {
        self.table.get(&KeyBinding::new(code, modifiers))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_names() {
        assert_eq!(
            KeyBinding::parse("j").unwrap(),
            KeyBinding::plain(KeyCode::Char('j'))
        );
        assert_eq!(KeyBinding::parse("<C-d>").unwrap(), KeyBinding::ctrl('d'));
        assert_eq!(
            KeyBinding::parse("<Space>").unwrap(),
            KeyBinding::plain(KeyCode::Char(' '))
        );
        assert_eq!(
            KeyBinding::parse("<F5>").unwrap(),
            KeyBinding::plain(KeyCode::F(5))
        );
        assert!(KeyBinding::parse("<Hyper-x>").is_err());
        assert!(KeyBinding::parse("jj").is_err());
    }

    #[test]
    fn shift_is_folded_into_characters() {
        let bindings = Bindings::default();
        assert_eq!(
            bindings.lookup(KeyCode::Char('J'), KeyModifiers::SHIFT),
            Some(&Command::Navigate {
                direction: PageDirection::Next,
                count: 0
            })
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("j".to_owned(), "navigate next".to_owned());
        overrides.insert("<C-x>".to_owned(), "bisect backward".to_owned());
        let bindings = Bindings::with_overrides(&overrides).unwrap();
        assert_eq!(
            bindings.lookup(KeyCode::Char('j'), KeyModifiers::NONE),
            Some(&Command::Navigate {
                direction: PageDirection::Next,
                count: 0
            })
        );
        assert!(bindings
            .lookup(KeyCode::Char('x'), KeyModifiers::CONTROL)
            .is_some());

        overrides.insert("k".to_owned(), "teleport".to_owned());
        assert!(matches!(
            Bindings::with_overrides(&overrides),
            Err(BindingError::Command { .. })
        ));
    }
}
