use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::command::{
    Command, Direction, GotoTarget, LinkPurpose, PageDirection, PointerEvent, RotateDirection,
};
use crate::config::Settings;
use crate::document::{Document, Layout};
use crate::geometry::PageOffset;
use crate::jumplist::{plan_bisect, BisectStep, Jump, Jumplist};
use crate::launch::{opener_program, Launcher};
use crate::link::{resolve_against_document, Destination, DestinationKind, Link, LinkAction};
use crate::outline::{IndexMove, Outline};
use crate::render::Renderer;
use crate::search::{self, SearchHit, SearchMatches, SearchState};
use crate::store::{Bookmark, FileInfo, StateStore};
use crate::viewport::{
    fit_scale, scroll_target, zoom_scale, AdjustMode, FitGeometry, PageSpan, ScrollDirection,
    ScrollOptions, ViewState, Viewport, WindowGeometry, ZoomKind,
};
use crate::{DocumentBackend, DocumentId, DocumentInfo, DocumentProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Fullscreen,
    LinkSelect(LinkPurpose),
    /// The outline is shown instead of the pages.
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentOpened(DocumentId),
    DocumentClosed(DocumentId),
    ModeChanged(Mode),
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

/// Quick mark set with `m<key>`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Mark {
    page: usize,
    x: f64,
    y: f64,
    scale: f64,
}

/// Everything tied to one open document.
pub struct DocumentInstance {
    pub info: DocumentInfo,
    pub backend: Arc<dyn DocumentBackend>,
    pub document: Document,
    pub view: ViewState,
    pub viewport: Viewport,
    pub jumplist: Jumplist,
    pub search: SearchState,
    layout: Layout,
    marks: HashMap<char, Mark>,
    drag: Option<(f64, f64)>,
    adjust_before_links: Option<AdjustMode>,
    outline: Option<Outline>,
    /// Position to return to when the outline is closed.
    index_return: Option<PageOffset>,
}

impl DocumentInstance {
    fn new(
        info: DocumentInfo,
        backend: Arc<dyn DocumentBackend>,
        document: Document,
        settings: &Settings,
        window: WindowGeometry,
    ) -> Self {
        let view = ViewState::new(settings);
        let layout = Layout::compute(
            &document,
            view.scale,
            view.rotation,
            view.grid_shape(),
            f64::from(settings.page_padding),
            (window.width, window.height),
        );
        Self {
            info,
            backend,
            document,
            view,
            viewport: Viewport::new(window),
            jumplist: Jumplist::new(settings.jumplist_size),
            search: SearchState::default(),
            layout,
            marks: HashMap::new(),
            drag: None,
            adjust_before_links: None,
            outline: None,
            index_return: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The outline, once it has been opened.
    pub fn outline(&self) -> Option<&Outline> {
        self.outline.as_ref()
    }

    /// Top-left corner of the visible area on the canvas.
    pub fn position(&self) -> PageOffset {
        PageOffset {
            x: self.viewport.horizontal.value,
            y: self.viewport.vertical.value,
        }
    }

    pub fn current_jump(&self) -> Jump {
        let scale = self.view.scale;
        Jump::new(
            self.view.current_page,
            self.viewport.horizontal.value / scale,
            self.viewport.vertical.value / scale,
        )
    }

    pub fn file_info(&self) -> FileInfo {
        FileInfo {
            current_page: self.view.current_page,
            page_offset: self.view.page_offset,
            scale: self.view.scale,
            rotation: self.view.rotation,
            pages_per_row: self.view.pages_per_row,
            first_page_column: self.view.first_page_column,
            position_x: self.viewport.horizontal.ratio(),
            position_y: self.viewport.vertical.ratio(),
        }
    }

    fn recompute_layout(&mut self, settings: &Settings) {
        let window = self.viewport.window;
        self.layout = Layout::compute(
            &self.document,
            self.view.scale,
            self.view.rotation,
            self.view.grid_shape(),
            f64::from(settings.page_padding),
            (window.width, window.height),
        );
    }

    /// Recomputes the layout, keeping the viewport centre ratio.
    fn relayout(&mut self, settings: &Settings) {
        self.recompute_layout(settings);
        self.viewport.relayout(self.layout.canvas_size());
        self.update_visibility();
    }

    /// Applies the current adjust mode to the scale. Returns whether the
    /// scale changed.
    fn adjust(&mut self, settings: &Settings) -> bool {
        let (cell_width, cell_height) = self.document.cell_size(1.0, self.view.rotation);
        let shape = self.view.grid_shape();
        let geometry = FitGeometry {
            cell_width,
            cell_height,
            columns: shape.columns,
            rows: shape.rows(self.page_count()),
            padding: f64::from(settings.page_padding),
        };
        let scrollbar = settings
            .show_scrollbars
            .then_some(settings.scrollbar_width);
        let changed = match fit_scale(
            self.view.adjust_mode,
            &geometry,
            &self.viewport.window,
            settings.scrollbar_spacing,
            scrollbar,
        ) {
            Some(scale) if scale > 0.0 && scale.is_finite() => {
                let changed = (scale - self.view.scale).abs() > f64::EPSILON;
                self.view.scale = scale;
                changed
            }
            _ => false,
        };
        self.relayout(settings);
        changed
    }

    fn page_span(&self, horizontal: bool) -> Option<PageSpan> {
        let rect = self.layout.page_rect(self.view.current_page)?;
        Some(if horizontal {
            PageSpan {
                offset: rect.x1,
                size: rect.width(),
            }
        } else {
            PageSpan {
                offset: rect.y1,
                size: rect.height(),
            }
        })
    }

    /// Shows the top of `page`, centred horizontally.
    fn goto_page(&mut self, page: usize) -> bool {
        let Some(rect) = self.layout.page_rect(page) else {
            return false;
        };
        self.view.current_page = page;
        let horizontal = &mut self.viewport.horizontal;
        horizontal.set_value((rect.x1 + rect.x2) / 2.0 - horizontal.page_size / 2.0);
        self.viewport.vertical.set_value(rect.y1);
        self.update_visibility();
        true
    }

    fn scroll_to(&mut self, x: Option<f64>, y: Option<f64>) {
        if let Some(x) = x {
            self.viewport.horizontal.set_value(x);
        }
        if let Some(y) = y {
            self.viewport.vertical.set_value(y);
        }
        self.update_visibility();
    }

    /// Makes the page under the viewport centre the current page.
    fn sync_current_page(&mut self) {
        let (x, y) = self.viewport.centre();
        if let Some(page) = self.layout.page_at(x, y) {
            self.view.current_page = page;
        }
    }

    fn update_visibility(&mut self) {
        let visible = crate::geometry::Rect::new(
            self.viewport.horizontal.value,
            self.viewport.vertical.value,
            self.viewport.horizontal.value + self.viewport.horizontal.page_size,
            self.viewport.vertical.value + self.viewport.vertical.page_size,
        );
        for page in self.document.pages_mut() {
            page.visible = self
                .layout
                .page_rect(page.index)
                .map(|rect| rect.intersects(&visible))
                .unwrap_or(false);
        }
    }

    fn restore_jump(&mut self, jump: Jump) -> bool {
        if jump.page >= self.page_count() {
            return false;
        }
        self.view.current_page = jump.page;
        let scale = self.view.scale;
        self.scroll_to(Some(jump.x * scale), Some(jump.y * scale));
        true
    }

    fn save_jump(&mut self) {
        let jump = self.current_jump();
        self.jumplist.save(jump);
    }

    fn add_jump(&mut self) {
        let jump = self.current_jump();
        self.jumplist.add(jump);
    }

    /// Links of visible pages in display order, numbered from zero.
    fn visible_links(&self) -> impl Iterator<Item = (usize, &Link)> {
        self.document
            .pages()
            .iter()
            .filter(|page| page.visible)
            .flat_map(|page| page.links.iter().map(move |link| (page.index, link)))
    }

    fn apply_file_info(&mut self, info: &FileInfo, settings: &Settings) {
        let count = self.page_count();
        self.view.current_page = info.current_page.min(count.saturating_sub(1));
        self.view.page_offset = info.page_offset;
        if info.scale > 0.0 {
            let (min, max) = settings.zoom_bounds();
            self.view.scale = info.scale.clamp(min, max);
        }
        self.view.rotation = info.rotation;
        self.view.pages_per_row = info.pages_per_row.max(1);
        self.view.first_page_column = info.first_page_column.max(1);
        self.view.adjust_mode = AdjustMode::None;
    }
}

pub struct Session {
    settings: Settings,
    document: Option<DocumentInstance>,
    store: Arc<dyn StateStore>,
    renderer: Arc<dyn Renderer>,
    launcher: Arc<dyn Launcher>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
    window: WindowGeometry,
    mode: Mode,
    pending_reload: bool,
}

impl Session {
    pub fn new(
        settings: Settings,
        store: Arc<dyn StateStore>,
        renderer: Arc<dyn Renderer>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            settings,
            document: None,
            store,
            renderer,
            launcher,
            events: Arc::new(Mutex::new(Vec::new())),
            window: WindowGeometry::default(),
            mode: Mode::Normal,
            pending_reload: false,
        }
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SessionEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> Option<&DocumentInstance> {
        self.document.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn window(&self) -> WindowGeometry {
        self.window
    }

    /// Set by the reload command; the host performs the reload with
    /// [`Session::reload_with`] once the command has returned.
    pub fn reload_pending(&self) -> bool {
        self.pending_reload
    }

    fn push_event(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.push_event(SessionEvent::Notification {
            level,
            message: message.into(),
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.push_event(SessionEvent::ModeChanged(mode));
        }
    }

    /// Mode to fall back to when a transient mode ends.
    fn resting_mode(&self) -> Mode {
        match &self.document {
            Some(doc) if doc.view.is_fullscreen() => Mode::Fullscreen,
            _ => Mode::Normal,
        }
    }

    fn report_position(&self) {
        if let Some(doc) = &self.document {
            self.renderer.scroll_to(doc.position());
        }
    }

    /// Resizes the drawing area and refits the pages.
    pub fn set_window(&mut self, window: WindowGeometry) {
        self.window = window;
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        doc.viewport.window = window;
        doc.adjust(&self.settings);
        self.renderer.request_repaint_all();
        self.report_position();
    }

    #[instrument(skip(self, provider))]
    pub async fn open_with<P: DocumentProvider + ?Sized>(
        &mut self,
        provider: &P,
        path: PathBuf,
    ) -> Result<()> {
        if self.document.is_some() {
            self.close();
        }
        let backend = provider.open(&path).await?;
        let info = backend.info().clone();
        let document = Document::load(backend.as_ref())?;
        let restored = match self.store.file_info(&info.path) {
            Ok(restored) => restored,
            Err(err) => {
                warn!(?err, path = ?info.path, "failed to read stored file info");
                None
            }
        };

        let mut doc = DocumentInstance::new(info.clone(), backend, document, &self.settings, self.window);
        match &restored {
            Some(file_info) => {
                doc.apply_file_info(file_info, &self.settings);
                doc.recompute_layout(&self.settings);
                let canvas = doc.layout.canvas_size();
                doc.viewport.horizontal.set_bounds(canvas.0, self.window.width);
                doc.viewport.vertical.set_bounds(canvas.1, self.window.height);
                doc.viewport.horizontal.set_ratio(file_info.position_x);
                doc.viewport.vertical.set_ratio(file_info.position_y);
                doc.update_visibility();
            }
            None => {
                doc.adjust(&self.settings);
                let canvas = doc.layout.canvas_size();
                doc.viewport.horizontal.set_bounds(canvas.0, self.window.width);
                doc.viewport.vertical.set_bounds(canvas.1, self.window.height);
                doc.goto_page(0);
            }
        }
        doc.add_jump();

        info!(pages = info.page_count, restored = restored.is_some(), "document opened");
        self.document = Some(doc);
        self.set_mode(Mode::Normal);
        self.push_event(SessionEvent::DocumentOpened(info.id));
        self.renderer.request_repaint_all();
        self.report_position();
        Ok(())
    }

    /// Writes the current view of the open document to the store.
    pub fn persist(&self) -> Result<()> {
        if let Some(doc) = &self.document {
            self.store.set_file_info(&doc.info.path, &doc.file_info())?;
        }
        Ok(())
    }

    /// Persists and drops the open document. Returns `false` when nothing
    /// was open.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> bool {
        if let Err(err) = self.persist() {
            warn!(?err, "failed to persist file info");
        }
        let Some(doc) = self.document.take() else {
            return false;
        };
        self.mode = Mode::Normal;
        self.push_event(SessionEvent::DocumentClosed(doc.info.id));
        true
    }

    /// Closes and reopens the current document through `provider`.
    #[instrument(skip(self, provider))]
    pub async fn reload_with<P: DocumentProvider + ?Sized>(&mut self, provider: &P) -> Result<()> {
        self.pending_reload = false;
        let Some(path) = self.document.as_ref().map(|doc| doc.info.path.clone()) else {
            return Ok(());
        };
        self.close();
        self.open_with(provider, path).await
    }

    /// Runs one command. Returns whether it was handled; commands that
    /// cannot apply leave all state untouched and return `false`.
    pub fn execute(&mut self, command: Command, event: Option<&PointerEvent>) -> bool {
        debug!(%command, ?event, "execute");
        match command {
            Command::Abort => self.abort(),
            Command::AdjustWindow(mode) => self.adjust_window(mode),
            Command::ShowLinks(purpose) => self.show_links(purpose),
            Command::SelectLink { index } => self.select_link(index),
            Command::Goto { target, count } => self.goto(target, count),
            Command::Navigate { direction, count } => self.navigate(direction, count),
            Command::Scroll { direction, count } => self.scroll(direction, count),
            Command::MouseScroll { direction, count } => self.mouse_scroll(direction, count, event),
            Command::Zoom { kind, count } => self.zoom(kind, count),
            Command::MouseZoom { count } => match event {
                Some(PointerEvent::ScrollUp) => self.zoom(ZoomKind::In, count),
                Some(PointerEvent::ScrollDown) => self.zoom(ZoomKind::Out, count),
                _ => false,
            },
            Command::Rotate { direction, count } => self.rotate(direction, count),
            Command::Jumplist(direction) => self.jumplist(direction),
            Command::Bisect { direction, count } => self.bisect(direction, count),
            Command::Search { query, direction } => self.search(&query, direction),
            Command::SearchNext { direction, count } => self.search_next(direction, count),
            Command::TogglePageMode => self.toggle_page_mode(),
            Command::ToggleFullscreen => self.toggle_fullscreen(),
            Command::Recolor => self.recolor(),
            Command::PutMark { key } => self.put_mark(key),
            Command::GotoMark { key } => self.goto_mark(key),
            Command::BookmarkCreate { id } => self.bookmark_create(id),
            Command::BookmarkDelete { id } => self.bookmark_delete(&id),
            Command::BookmarkOpen { id } => self.bookmark_open(&id),
            Command::ToggleIndex => self.toggle_index(),
            Command::NavigateIndex(movement) => self.navigate_index(movement),
            Command::Reload => {
                if self.document.is_none() {
                    return false;
                }
                self.pending_reload = true;
                true
            }
        }
    }

    fn abort(&mut self) -> bool {
        if let Some(doc) = self.document.as_mut() {
            for page in doc.document.pages() {
                self.renderer.set_page_offset_markers(page.index, None);
            }
            if self.settings.abort_clear_search {
                search::clear_matches(doc.document.pages_mut());
            }
            if let Some(mode) = doc.adjust_before_links.take() {
                doc.view.adjust_mode = mode;
            }
            if let Some(position) = doc.index_return.take() {
                doc.scroll_to(Some(position.x), Some(position.y));
                doc.sync_current_page();
            }
        }
        let mode = self.resting_mode();
        self.set_mode(mode);
        self.renderer.request_repaint_all();
        false
    }

    fn adjust_window(&mut self, mode: AdjustMode) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        doc.view.adjust_mode = mode;
        if doc.adjust(&self.settings) {
            self.renderer.request_repaint_all();
            self.report_position();
        }
        true
    }

    fn show_links(&mut self, purpose: LinkPurpose) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        if doc.visible_links().next().is_none() {
            return false;
        }
        let mut number = 0;
        for page in doc.document.pages() {
            if page.visible {
                self.renderer.set_page_offset_markers(page.index, Some(number));
                number += page.links.len();
            } else {
                self.renderer.set_page_offset_markers(page.index, None);
            }
        }
        doc.adjust_before_links.get_or_insert(doc.view.adjust_mode);
        doc.view.adjust_mode = AdjustMode::Inputbar;
        self.set_mode(Mode::LinkSelect(purpose));
        true
    }

    fn leave_link_mode(&mut self) {
        if let Some(doc) = self.document.as_mut() {
            for page in doc.document.pages() {
                self.renderer.set_page_offset_markers(page.index, None);
            }
            if let Some(mode) = doc.adjust_before_links.take() {
                doc.view.adjust_mode = mode;
            }
        }
        let mode = self.resting_mode();
        self.set_mode(mode);
    }

    fn select_link(&mut self, index: usize) -> bool {
        let Mode::LinkSelect(purpose) = self.mode else {
            return false;
        };
        let link = self
            .document
            .as_ref()
            .and_then(|doc| doc.visible_links().nth(index).map(|(_, link)| link.clone()));
        self.leave_link_mode();
        let Some(link) = link else {
            return false;
        };
        match purpose {
            LinkPurpose::Follow => self.evaluate_link(&link),
            LinkPurpose::Display => {
                self.notify(NotificationLevel::Info, link.display());
                true
            }
        }
    }

    /// Performs the action of `link`.
    pub fn evaluate_link(&mut self, link: &Link) -> bool {
        let Some(doc) = self.document.as_ref() else {
            return false;
        };
        let document_path = doc.info.path.clone();
        match link.action() {
            LinkAction::None => false,
            LinkAction::GotoDestination(destination) => self.goto_destination(destination),
            LinkAction::GotoRemote { file } => {
                let path = resolve_against_document(&document_path, file);
                if let Err(err) = self.launcher.spawn_viewer(&path) {
                    warn!(?err, "failed to open remote document");
                    self.notify(NotificationLevel::Error, format!("Failed to open {}.", path.display()));
                }
                true
            }
            LinkAction::Uri { uri } => {
                self.open_external(uri);
                true
            }
            LinkAction::Launch { path } => {
                let resolved = resolve_against_document(&document_path, path);
                self.open_external(&resolved.to_string_lossy());
                true
            }
            LinkAction::Named { name } => match doc.backend.resolve_named_destination(name) {
                Some(destination) => self.goto_destination(&destination),
                None => {
                    self.notify(
                        NotificationLevel::Warning,
                        format!("Unknown named destination: {}", name),
                    );
                    false
                }
            },
        }
    }

    fn open_external(&self, target: &str) {
        if let Err(err) = self.launcher.open(target) {
            warn!(?err, target, "failed to run opener");
            self.notify(
                NotificationLevel::Error,
                format!("Failed to run {}.", opener_program()),
            );
        }
    }

    fn goto_destination(&mut self, destination: &Destination) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        if destination.kind == DestinationKind::Unknown || destination.page >= doc.page_count() {
            return false;
        }
        doc.save_jump();
        if destination.scale != 0.0 {
            let (min, max) = self.settings.zoom_bounds();
            doc.view.scale = destination.scale.clamp(min, max);
            doc.view.adjust_mode = AdjustMode::None;
            doc.relayout(&self.settings);
        }
        let Some(page_offset) = doc.layout.page_offset(destination.page) else {
            return false;
        };
        let target = destination.offset_on(page_offset, doc.view.scale);
        doc.view.current_page = destination.page;
        let x = self.settings.link_hadjust.then_some(target.x);
        doc.scroll_to(x, Some(target.y));
        doc.add_jump();
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn goto(&mut self, target: GotoTarget, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let pages = doc.page_count() as i64;
        let page = if count != 0 {
            i64::from(count) + doc.view.page_offset - 1
        } else {
            match target {
                GotoTarget::Top => 0,
                GotoTarget::Bottom => pages - 1,
            }
        };
        if page < 0 || page >= pages {
            return false;
        }
        doc.save_jump();
        doc.goto_page(page as usize);
        doc.add_jump();
        self.report_position();
        true
    }

    fn navigate(&mut self, direction: PageDirection, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let pages = doc.page_count() as i64;
        if pages == 0 {
            return false;
        }
        let step = if count != 0 {
            i64::from(count)
        } else if self.settings.advance_pages_per_row {
            doc.view.pages_per_row as i64
        } else {
            1
        };
        let current = doc.view.current_page as i64;
        let mut page = match direction {
            PageDirection::Next => current + step,
            PageDirection::Previous => current - step,
        };
        if self.settings.scroll_wrap {
            page = page.rem_euclid(pages);
        } else if page < 0 || page >= pages {
            return false;
        }
        doc.goto_page(page as usize);
        self.report_position();
        true
    }

    fn scroll(&mut self, direction: ScrollDirection, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let horizontal = direction.is_horizontal();
        let options = ScrollOptions::from_settings(&self.settings);
        let span = doc.page_span(horizontal);
        let target = scroll_target(doc.viewport.axis(horizontal), direction, count, &options, span);
        doc.viewport.axis_mut(horizontal).set_value(target);
        doc.update_visibility();
        doc.sync_current_page();
        self.report_position();
        true
    }

    fn mouse_scroll(
        &mut self,
        direction: ScrollDirection,
        count: u32,
        event: Option<&PointerEvent>,
    ) -> bool {
        let Some(event) = event else {
            return self.scroll(direction, count);
        };
        match *event {
            PointerEvent::ScrollUp => self.scroll(ScrollDirection::Up, count),
            PointerEvent::ScrollDown => self.scroll(ScrollDirection::Down, count),
            PointerEvent::ScrollLeft => self.scroll(ScrollDirection::Left, count),
            PointerEvent::ScrollRight => self.scroll(ScrollDirection::Right, count),
            PointerEvent::ButtonPress { x, y } => match self.document.as_mut() {
                Some(doc) => {
                    doc.drag = Some((x, y));
                    true
                }
                None => false,
            },
            PointerEvent::ButtonRelease => match self.document.as_mut() {
                Some(doc) => doc.drag.take().is_some(),
                None => false,
            },
            PointerEvent::Motion { x, y } => {
                let Some(doc) = self.document.as_mut() else {
                    return false;
                };
                let Some((anchor_x, anchor_y)) = doc.drag else {
                    return false;
                };
                let position = doc.position();
                doc.scroll_to(
                    Some(position.x - (x - anchor_x)),
                    Some(position.y - (y - anchor_y)),
                );
                doc.drag = Some((x, y));
                doc.sync_current_page();
                self.report_position();
                true
            }
        }
    }

    fn zoom(&mut self, kind: ZoomKind, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let scale = zoom_scale(
            doc.view.scale,
            kind,
            self.settings.zoom_step,
            count,
            self.settings.zoom_bounds(),
        );
        if (scale - doc.view.scale).abs() < f64::EPSILON {
            return false;
        }
        doc.view.adjust_mode = AdjustMode::None;
        doc.view.scale = scale;
        doc.relayout(&self.settings);
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn rotate(&mut self, direction: RotateDirection, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let angle = match direction {
            RotateDirection::Clockwise => 90,
            RotateDirection::CounterClockwise => 270,
        };
        let page = doc.view.current_page;
        doc.view.rotation = doc.view.rotation.rotated(angle, count.max(1));
        doc.adjust(&self.settings);
        doc.goto_page(page);
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn jumplist(&mut self, direction: Direction) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let available = match direction {
            Direction::Forward => doc.jumplist.has_next(),
            Direction::Backward => doc.jumplist.has_previous(),
        };
        if !available {
            return false;
        }
        doc.save_jump();
        match direction {
            Direction::Forward => doc.jumplist.forward(),
            Direction::Backward => doc.jumplist.backward(),
        };
        let moved = doc
            .jumplist
            .current()
            .map(|jump| doc.restore_jump(jump))
            .unwrap_or(false);
        if moved {
            self.report_position();
        }
        moved
    }

    fn bisect(&mut self, direction: Direction, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let pages = doc.page_count();
        let mut direction = direction;
        let mut moved = false;

        doc.save_jump();
        if count != 0 && (count as usize) <= pages {
            let previous = doc.view.current_page;
            let target = count as usize - 1;
            doc.goto_page(target);
            doc.add_jump();
            direction = if target > previous {
                Direction::Backward
            } else {
                Direction::Forward
            };
            moved = true;
        }

        let current = doc.view.current_page;
        let (prev, prev2) = doc.jumplist.previous_pages();
        match plan_bisect(direction, current, prev, prev2, pages) {
            BisectStep::Stay => {}
            BisectStep::Add(page) => {
                doc.goto_page(page);
                doc.add_jump();
                moved = true;
            }
            BisectStep::Replace(page) => {
                let here = doc.current_jump();
                doc.jumplist.backward();
                doc.jumplist.save(here);
                doc.jumplist.forward();
                doc.goto_page(page);
                doc.save_jump();
                moved = true;
            }
        }
        if moved {
            self.report_position();
        }
        moved
    }

    fn search(&mut self, query: &str, direction: Direction) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        if query.is_empty() {
            return false;
        }
        for page in doc.document.pages_mut() {
            let rects = match doc.backend.search_page(page.index, query) {
                Ok(rects) => rects,
                Err(err) => {
                    warn!(?err, page = page.index, "search failed");
                    Vec::new()
                }
            };
            page.matches = SearchMatches::new(rects);
        }
        doc.search = SearchState {
            query: Some(query.to_owned()),
            direction,
        };
        let start = doc.view.current_page;
        match search::first_match_from(doc.document.pages_mut(), start, direction) {
            Some(hit) => {
                self.focus_hit(hit, start);
                true
            }
            None => {
                self.notify(
                    NotificationLevel::Warning,
                    format!("Pattern not found: {}", query),
                );
                self.renderer.request_repaint_all();
                false
            }
        }
    }

    fn search_next(&mut self, direction: Direction, count: u32) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let direction = doc.search.effective(direction);
        let start = doc.view.current_page;
        let mut page = start;
        let mut found = None;
        for _ in 0..count.max(1) {
            match search::next_match(doc.document.pages_mut(), page, direction) {
                Some(hit) => {
                    page = hit.page;
                    found = Some(hit);
                }
                None => break,
            }
        }
        match found {
            Some(hit) => {
                self.focus_hit(hit, start);
                true
            }
            None => false,
        }
    }

    /// Centres the viewport on a search hit, recording a jump when the hit
    /// is on another page than `start`.
    fn focus_hit(&mut self, hit: SearchHit, start: usize) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let Some(page) = doc.document.page(hit.page) else {
            return;
        };
        let rect = hit
            .rect
            .to_view(page.width, page.height, doc.view.scale, doc.view.rotation);
        let Some(offset) = doc.layout.page_offset(hit.page) else {
            return;
        };
        let changes_page = hit.page != start;
        if changes_page {
            doc.save_jump();
        }
        let y = offset.y - doc.viewport.vertical.page_size / 2.0 + rect.y1;
        let x = self
            .settings
            .search_hadjust
            .then(|| offset.x - doc.viewport.horizontal.page_size / 2.0 + rect.x1);
        doc.view.current_page = hit.page;
        doc.scroll_to(x, Some(y));
        if changes_page {
            doc.add_jump();
        }
        self.renderer.request_repaint(hit.page);
        self.report_position();
    }

    fn toggle_page_mode(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let page = doc.view.current_page;
        doc.view.toggle_page_mode();
        doc.adjust(&self.settings);
        doc.goto_page(page);
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn toggle_fullscreen(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let page = doc.view.current_page;
        let mode = if doc.view.leave_fullscreen() {
            Mode::Normal
        } else {
            doc.view.enter_fullscreen();
            Mode::Fullscreen
        };
        doc.adjust(&self.settings);
        doc.goto_page(page);
        self.set_mode(mode);
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn recolor(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        doc.view.recolor = !doc.view.recolor;
        self.renderer.request_repaint_all();
        true
    }

    fn put_mark(&mut self, key: char) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let jump = doc.current_jump();
        doc.marks.insert(
            key,
            Mark {
                page: jump.page,
                x: jump.x,
                y: jump.y,
                scale: doc.view.scale,
            },
        );
        true
    }

    fn goto_mark(&mut self, key: char) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let Some(mark) = doc.marks.get(&key).copied() else {
            return false;
        };
        doc.save_jump();
        if (mark.scale - doc.view.scale).abs() > f64::EPSILON {
            doc.view.scale = mark.scale;
            doc.view.adjust_mode = AdjustMode::None;
            doc.relayout(&self.settings);
        }
        if !doc.restore_jump(Jump::new(mark.page, mark.x, mark.y)) {
            return false;
        }
        doc.add_jump();
        self.renderer.request_repaint_all();
        self.report_position();
        true
    }

    fn bookmark_create(&mut self, id: String) -> bool {
        let Some(doc) = self.document.as_ref() else {
            return false;
        };
        let bookmark = Bookmark::new(id, doc.view.current_page);
        match self.store.add_bookmark(&doc.info.path, &bookmark) {
            Ok(()) => {
                self.notify(
                    NotificationLevel::Info,
                    format!("Added bookmark: {}", bookmark.id),
                );
                true
            }
            Err(err) => {
                warn!(?err, id = %bookmark.id, "failed to add bookmark");
                self.notify(
                    NotificationLevel::Error,
                    format!("Could not add bookmark: {}", bookmark.id),
                );
                false
            }
        }
    }

    fn bookmark_delete(&mut self, id: &str) -> bool {
        let Some(doc) = self.document.as_ref() else {
            return false;
        };
        match self.store.remove_bookmark(&doc.info.path, id) {
            Ok(true) => {
                self.notify(NotificationLevel::Info, format!("Removed bookmark: {}", id));
                true
            }
            Ok(false) => {
                self.notify(NotificationLevel::Warning, format!("No such bookmark: {}", id));
                false
            }
            Err(err) => {
                warn!(?err, id, "failed to remove bookmark");
                false
            }
        }
    }

    fn bookmark_open(&mut self, id: &str) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let bookmarks = match self.store.bookmarks(&doc.info.path) {
            Ok(bookmarks) => bookmarks,
            Err(err) => {
                warn!(?err, "failed to load bookmarks");
                return false;
            }
        };
        let Some(bookmark) = bookmarks.into_iter().find(|b| b.id == id) else {
            self.notify(NotificationLevel::Warning, format!("No such bookmark: {}", id));
            return false;
        };
        if bookmark.page >= doc.page_count() {
            return false;
        }
        doc.save_jump();
        doc.goto_page(bookmark.page);
        doc.add_jump();
        self.report_position();
        true
    }

    /// Opens the outline, remembering the position and saving the jumplist,
    /// or closes it and returns to that position.
    fn toggle_index(&mut self) -> bool {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        if self.mode == Mode::Index {
            if let Some(position) = doc.index_return.take() {
                doc.scroll_to(Some(position.x), Some(position.y));
                doc.sync_current_page();
            }
            let mode = self.resting_mode();
            self.set_mode(mode);
            self.renderer.request_repaint_all();
            self.report_position();
            return true;
        }

        if doc.outline.is_none() {
            let entries = doc.backend.outline().unwrap_or_else(|err| {
                warn!(?err, "failed to read outline");
                Vec::new()
            });
            doc.outline = Outline::new(entries);
        }
        if doc.outline.is_none() {
            self.notify(
                NotificationLevel::Warning,
                "This document does not contain any index",
            );
            return false;
        }
        doc.index_return = Some(doc.position());
        doc.save_jump();
        self.set_mode(Mode::Index);
        self.renderer.request_repaint_all();
        true
    }

    fn navigate_index(&mut self, movement: IndexMove) -> bool {
        if self.mode != Mode::Index {
            return false;
        }
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let Some(outline) = doc.outline.as_mut() else {
            return false;
        };
        if movement != IndexMove::Select {
            let changed = outline.apply(movement);
            if changed {
                self.renderer.request_repaint_all();
            }
            return changed;
        }

        let Some(destination) = outline.selected().map(|entry| entry.destination) else {
            return false;
        };
        doc.index_return = None;
        let mode = self.resting_mode();
        self.set_mode(mode);
        self.renderer.request_repaint_all();
        self.goto_destination(&destination)
    }

    /// Bookmarks of the open document, ordered by id.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        let Some(doc) = &self.document else {
            return Vec::new();
        };
        self.store.bookmarks(&doc.info.path).unwrap_or_else(|err| {
            warn!(?err, "failed to load bookmarks");
            Vec::new()
        })
    }
}
