//! Navigation commands understood by [`Session::execute`](crate::Session::execute).
//!
//! Commands carry their argument and a repeat count (`0` means "no count
//! given"). Key bindings name commands with short strings such as
//! `"scroll half-down"`, parsed through [`FromStr`].

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::outline::IndexMove;
use crate::viewport::{AdjustMode, ScrollDirection, ZoomKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn inverted(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoTarget {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPurpose {
    Follow,
    Display,
}

/// Raw pointer input forwarded by the host for mouse-driven commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    ButtonPress { x: f64, y: f64 },
    ButtonRelease,
    Motion { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Abort,
    AdjustWindow(AdjustMode),
    ShowLinks(LinkPurpose),
    SelectLink { index: usize },
    Goto { target: GotoTarget, count: u32 },
    Navigate { direction: PageDirection, count: u32 },
    Scroll { direction: ScrollDirection, count: u32 },
    MouseScroll { direction: ScrollDirection, count: u32 },
    Zoom { kind: ZoomKind, count: u32 },
    MouseZoom { count: u32 },
    Rotate { direction: RotateDirection, count: u32 },
    Jumplist(Direction),
    Bisect { direction: Direction, count: u32 },
    Search { query: String, direction: Direction },
    SearchNext { direction: Direction, count: u32 },
    TogglePageMode,
    ToggleFullscreen,
    Recolor,
    PutMark { key: char },
    GotoMark { key: char },
    BookmarkCreate { id: String },
    BookmarkDelete { id: String },
    BookmarkOpen { id: String },
    ToggleIndex,
    NavigateIndex(IndexMove),
    Reload,
}

impl Command {
    /// Applies a numeric prefix typed before the command.
    pub fn with_count(self, count: u32) -> Self {
        match self {
            Command::Goto { target, .. } => Command::Goto { target, count },
            Command::Navigate { direction, .. } => Command::Navigate { direction, count },
            Command::Scroll { direction, .. } => Command::Scroll { direction, count },
            Command::MouseScroll { direction, .. } => Command::MouseScroll { direction, count },
            Command::Zoom {
                kind: ZoomKind::Specific(0),
                ..
            } => Command::Zoom {
                kind: ZoomKind::Specific(count),
                count,
            },
            Command::Zoom { kind, .. } => Command::Zoom { kind, count },
            Command::MouseZoom { .. } => Command::MouseZoom { count },
            Command::Rotate { direction, .. } => Command::Rotate { direction, count },
            Command::Bisect { direction, .. } => Command::Bisect { direction, count },
            Command::SearchNext { direction, .. } => Command::SearchNext { direction, count },
            Command::SelectLink { .. } => Command::SelectLink {
                index: count as usize,
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Abort => "abort",
            Command::AdjustWindow(_) => "adjust",
            Command::ShowLinks(LinkPurpose::Follow) => "follow",
            Command::ShowLinks(LinkPurpose::Display) => "display-link",
            Command::SelectLink { .. } => "select-link",
            Command::Goto { .. } => "goto",
            Command::Navigate { .. } => "navigate",
            Command::Scroll { .. } => "scroll",
            Command::MouseScroll { .. } => "mouse-scroll",
            Command::Zoom { .. } => "zoom",
            Command::MouseZoom { .. } => "mouse-zoom",
            Command::Rotate { .. } => "rotate",
            Command::Jumplist(_) => "jumplist",
            Command::Bisect { .. } => "bisect",
            Command::Search { .. } => "search",
            Command::SearchNext { .. } => "search-next",
            Command::TogglePageMode => "toggle-page-mode",
            Command::ToggleFullscreen => "toggle-fullscreen",
            Command::Recolor => "recolor",
            Command::PutMark { .. } => "mark-add",
            Command::GotoMark { .. } => "mark-evaluate",
            Command::BookmarkCreate { .. } => "bmark",
            Command::BookmarkDelete { .. } => "bdelete",
            Command::BookmarkOpen { .. } => "blist",
            Command::ToggleIndex => "toggle-index",
            Command::NavigateIndex(_) => "navigate-index",
            Command::Reload => "reload",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_direction(command: &str, argument: Option<&str>) -> Result<Direction, Error> {
    match argument.unwrap_or("forward") {
        "forward" | "next" => Ok(Direction::Forward),
        "backward" | "previous" => Ok(Direction::Backward),
        other => Err(invalid(command, other)),
    }
}

fn parse_char(command: &str, argument: Option<&str>) -> Result<char, Error> {
    let raw = argument.unwrap_or_default();
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => Ok(key),
        _ => Err(invalid(command, raw)),
    }
}

fn required<'a>(command: &str, argument: Option<&'a str>) -> Result<&'a str, Error> {
    argument
        .filter(|arg| !arg.is_empty())
        .ok_or_else(|| invalid(command, ""))
}

fn invalid(command: &str, argument: &str) -> Error {
    Error::InvalidArgument {
        command: command.to_owned(),
        argument: argument.to_owned(),
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| Error::UnknownCommand(s.to_owned()))?;
        let rest: Vec<&str> = parts.collect();
        let argument = rest.first().copied();
        // search patterns and bookmark names take every remaining word
        let joined = rest.join(" ");
        let text = Some(joined.as_str());

        let command = match name {
            "abort" => Command::Abort,
            "adjust" => Command::AdjustWindow(
                argument
                    .unwrap_or("best-fit")
                    .parse()
                    .map_err(|_| invalid(name, argument.unwrap_or_default()))?,
            ),
            "follow" => Command::ShowLinks(LinkPurpose::Follow),
            "display-link" => Command::ShowLinks(LinkPurpose::Display),
            "goto" => Command::Goto {
                target: match argument.unwrap_or("top") {
                    "top" => GotoTarget::Top,
                    "bottom" => GotoTarget::Bottom,
                    other => return Err(invalid(name, other)),
                },
                count: 0,
            },
            "navigate" => Command::Navigate {
                direction: match argument.unwrap_or("next") {
                    "next" => PageDirection::Next,
                    "previous" => PageDirection::Previous,
                    other => return Err(invalid(name, other)),
                },
                count: 0,
            },
            "scroll" | "mouse-scroll" => {
                let direction = argument
                    .unwrap_or("down")
                    .parse()
                    .map_err(|_| invalid(name, argument.unwrap_or_default()))?;
                if name == "scroll" {
                    Command::Scroll { direction, count: 0 }
                } else {
                    Command::MouseScroll { direction, count: 0 }
                }
            }
            "zoom" => Command::Zoom {
                kind: match argument.unwrap_or("default") {
                    "in" => ZoomKind::In,
                    "out" => ZoomKind::Out,
                    "default" => ZoomKind::Default,
                    "specific" => {
                        let percent = rest
                            .get(1)
                            .map(|raw| raw.parse::<u32>().map_err(|_| invalid(name, raw)))
                            .transpose()?
                            .unwrap_or(0);
                        ZoomKind::Specific(percent)
                    }
                    other => return Err(invalid(name, other)),
                },
                count: 0,
            },
            "mouse-zoom" => Command::MouseZoom { count: 0 },
            "rotate" => Command::Rotate {
                direction: match argument.unwrap_or("cw") {
                    "cw" | "rotate-cw" => RotateDirection::Clockwise,
                    "ccw" | "rotate-ccw" => RotateDirection::CounterClockwise,
                    other => return Err(invalid(name, other)),
                },
                count: 0,
            },
            "jumplist" => Command::Jumplist(parse_direction(name, argument)?),
            "bisect" => Command::Bisect {
                direction: parse_direction(name, argument)?,
                count: 0,
            },
            "search" => Command::Search {
                query: required(name, text)?.to_owned(),
                direction: Direction::Forward,
            },
            "search-backward" => Command::Search {
                query: required(name, text)?.to_owned(),
                direction: Direction::Backward,
            },
            "search-next" => Command::SearchNext {
                direction: parse_direction(name, argument)?,
                count: 0,
            },
            "toggle-page-mode" => Command::TogglePageMode,
            "toggle-fullscreen" => Command::ToggleFullscreen,
            "recolor" => Command::Recolor,
            "mark-add" => Command::PutMark {
                key: parse_char(name, argument)?,
            },
            "mark-evaluate" => Command::GotoMark {
                key: parse_char(name, argument)?,
            },
            "bmark" => Command::BookmarkCreate {
                id: required(name, text)?.to_owned(),
            },
            "bdelete" => Command::BookmarkDelete {
                id: required(name, argument)?.to_owned(),
            },
            "blist" => Command::BookmarkOpen {
                id: required(name, argument)?.to_owned(),
            },
            "toggle-index" => Command::ToggleIndex,
            "navigate-index" => Command::NavigateIndex(
                argument
                    .unwrap_or("down")
                    .parse()
                    .map_err(|_| invalid(name, argument.unwrap_or_default()))?,
            ),
            "reload" => Command::Reload,
            other => return Err(Error::UnknownCommand(other.to_owned())),
        };
        Ok(command)
    }
}
