//! View state and the pure scroll, zoom and fit computations behind it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::document::GridShape;
use crate::geometry::Rotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustMode {
    None,
    Width,
    #[default]
    BestFit,
    Inputbar,
}

impl AdjustMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdjustMode::None => "none",
            AdjustMode::Width => "width",
            AdjustMode::BestFit => "best-fit",
            AdjustMode::Inputbar => "inputbar",
        }
    }
}

impl fmt::Display for AdjustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized name `{0}`")]
pub struct ParseNameError(pub String);

impl FromStr for AdjustMode {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AdjustMode::None),
            "width" => Ok(AdjustMode::Width),
            "best-fit" | "bestfit" => Ok(AdjustMode::BestFit),
            "inputbar" => Ok(AdjustMode::Inputbar),
            other => Err(ParseNameError(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
    Up,
    Down,
    FullUp,
    FullDown,
    FullLeft,
    FullRight,
    HalfUp,
    HalfDown,
    HalfLeft,
    HalfRight,
    Top,
    Bottom,
}

impl ScrollDirection {
    pub fn is_horizontal(self) -> bool {
        matches!(
            self,
            ScrollDirection::Left
                | ScrollDirection::Right
                | ScrollDirection::FullLeft
                | ScrollDirection::FullRight
                | ScrollDirection::HalfLeft
                | ScrollDirection::HalfRight
        )
    }

    fn is_page_sized_forward(self) -> bool {
        matches!(self, ScrollDirection::FullDown | ScrollDirection::HalfDown)
    }

    fn is_page_sized_backward(self) -> bool {
        matches!(self, ScrollDirection::FullUp | ScrollDirection::HalfUp)
    }
}

impl FromStr for ScrollDirection {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let direction = match s {
            "left" => ScrollDirection::Left,
            "right" => ScrollDirection::Right,
            "up" => ScrollDirection::Up,
            "down" => ScrollDirection::Down,
            "full-up" => ScrollDirection::FullUp,
            "full-down" => ScrollDirection::FullDown,
            "full-left" => ScrollDirection::FullLeft,
            "full-right" => ScrollDirection::FullRight,
            "half-up" => ScrollDirection::HalfUp,
            "half-down" => ScrollDirection::HalfDown,
            "half-left" => ScrollDirection::HalfLeft,
            "half-right" => ScrollDirection::HalfRight,
            "top" => ScrollDirection::Top,
            "bottom" => ScrollDirection::Bottom,
            other => return Err(ParseNameError(other.to_owned())),
        };
        Ok(direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomKind {
    In,
    Out,
    /// Absolute zoom in percent; `0` resets to 100%.
    Specific(u32),
    Default,
}

/// One scroll axis: the visible window of size `page_size` positioned at
/// `value` inside `[0, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Adjustment {
    pub value: f64,
    pub upper: f64,
    pub page_size: f64,
}

impl Adjustment {
    pub fn new(upper: f64, page_size: f64) -> Self {
        Self {
            value: 0.0,
            upper,
            page_size,
        }
    }

    pub fn max_value(&self) -> f64 {
        (self.upper - self.page_size).max(0.0)
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(0.0, self.max_value());
    }

    /// Position of the viewport centre relative to the full extent.
    pub fn ratio(&self) -> f64 {
        if self.upper <= 0.0 {
            0.0
        } else {
            (self.value + self.page_size / 2.0) / self.upper
        }
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.set_value(ratio * self.upper - self.page_size / 2.0);
    }

    pub fn set_bounds(&mut self, upper: f64, page_size: f64) {
        self.upper = upper;
        self.page_size = page_size;
        self.set_value(self.value);
    }
}

/// Size of the host's drawing area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub inputbar_height: f64,
    #[serde(default)]
    pub inputbar_visible: bool,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            inputbar_height: 0.0,
            inputbar_visible: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub window: WindowGeometry,
    pub horizontal: Adjustment,
    pub vertical: Adjustment,
}

impl Viewport {
    pub fn new(window: WindowGeometry) -> Self {
        Self {
            window,
            horizontal: Adjustment::new(window.width, window.width),
            vertical: Adjustment::new(window.height, window.height),
        }
    }

    pub fn axis(&self, horizontal: bool) -> &Adjustment {
        if horizontal {
            &self.horizontal
        } else {
            &self.vertical
        }
    }

    pub fn axis_mut(&mut self, horizontal: bool) -> &mut Adjustment {
        if horizontal {
            &mut self.horizontal
        } else {
            &mut self.vertical
        }
    }

    /// Resizes both axes to a new canvas, keeping the centre ratio.
    pub fn relayout(&mut self, canvas: (f64, f64)) {
        let ratios = (self.horizontal.ratio(), self.vertical.ratio());
        self.horizontal.set_bounds(canvas.0, self.window.width);
        self.vertical.set_bounds(canvas.1, self.window.height);
        self.horizontal.set_ratio(ratios.0);
        self.vertical.set_ratio(ratios.1);
    }

    /// Centre of the visible area in canvas coordinates.
    pub fn centre(&self) -> (f64, f64) {
        (
            self.horizontal.value + self.horizontal.page_size / 2.0,
            self.vertical.value + self.vertical.page_size / 2.0,
        )
    }
}

/// Layout to return to when leaving fullscreen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedLayout {
    pub pages_per_row: usize,
    pub first_page_column: usize,
    pub scale: f64,
    pub adjust_mode: AdjustMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub current_page: usize,
    pub scale: f64,
    pub rotation: Rotation,
    pub adjust_mode: AdjustMode,
    pub pages_per_row: usize,
    pub first_page_column: usize,
    /// Difference between printed page labels and page indices.
    pub page_offset: i64,
    pub recolor: bool,
    multi_column: usize,
    fullscreen: Option<SavedLayout>,
}

impl ViewState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            current_page: 0,
            scale: 1.0,
            rotation: Rotation::Deg0,
            adjust_mode: settings.adjust_open,
            pages_per_row: settings.pages_per_row.max(1),
            first_page_column: settings.first_page_column.max(1),
            page_offset: 0,
            recolor: false,
            multi_column: if settings.pages_per_row > 1 {
                settings.pages_per_row
            } else {
                2
            },
            fullscreen: None,
        }
    }

    pub fn grid_shape(&self) -> GridShape {
        GridShape::new(self.pages_per_row, self.first_page_column)
    }

    /// Switches between a single column and the last multi-column layout.
    pub fn toggle_page_mode(&mut self) {
        if self.pages_per_row == 1 {
            self.pages_per_row = self.multi_column;
        } else {
            self.multi_column = self.pages_per_row;
            self.pages_per_row = 1;
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_some()
    }

    pub fn enter_fullscreen(&mut self) {
        if self.fullscreen.is_some() {
            return;
        }
        self.fullscreen = Some(SavedLayout {
            pages_per_row: self.pages_per_row,
            first_page_column: self.first_page_column,
            scale: self.scale,
            adjust_mode: self.adjust_mode,
        });
        self.pages_per_row = 1;
        self.first_page_column = 1;
        self.adjust_mode = AdjustMode::BestFit;
    }

    /// Restores the layout saved on entry. Returns `false` when not in
    /// fullscreen.
    pub fn leave_fullscreen(&mut self) -> bool {
        match self.fullscreen.take() {
            Some(saved) => {
                self.pages_per_row = saved.pages_per_row;
                self.first_page_column = saved.first_page_column;
                self.scale = saved.scale;
                self.adjust_mode = saved.adjust_mode;
                true
            }
            None => false,
        }
    }
}

/// New scale for a zoom request, clamped to `bounds`.
pub fn zoom_scale(current: f64, kind: ZoomKind, step_percent: u32, count: u32, bounds: (f64, f64)) -> f64 {
    let step = f64::from(step_percent) / 100.0 * f64::from(count.max(1));
    let scale = match kind {
        ZoomKind::In => current + step,
        ZoomKind::Out => current - step,
        ZoomKind::Specific(0) | ZoomKind::Default => 1.0,
        ZoomKind::Specific(percent) => f64::from(percent) / 100.0,
    };
    scale.clamp(bounds.0, bounds.1)
}

/// Grid geometry at scale 1.0, used to fit pages into the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitGeometry {
    pub cell_width: f64,
    pub cell_height: f64,
    pub columns: usize,
    pub rows: usize,
    pub padding: f64,
}

impl FitGeometry {
    fn document_width(&self) -> f64 {
        let columns = self.columns as f64;
        columns * self.cell_width + (columns - 1.0) * self.padding
    }

    fn document_height(&self, scale: f64) -> f64 {
        let rows = self.rows as f64;
        rows * self.cell_height * scale + (rows - 1.0).max(0.0) * self.padding
    }

    fn width_scale(&self, width: f64) -> f64 {
        let columns = self.columns as f64;
        (width - (columns - 1.0) * self.padding) / (columns * self.cell_width)
    }
}

/// Scale that fits the grid into the window for `mode`, or `None` when the
/// mode does not change the scale.
pub fn fit_scale(
    mode: AdjustMode,
    geometry: &FitGeometry,
    window: &WindowGeometry,
    scrollbar_spacing: f64,
    scrollbar_width: Option<f64>,
) -> Option<f64> {
    if !matches!(mode, AdjustMode::Width | AdjustMode::BestFit) {
        return None;
    }
    if geometry.cell_width <= 0.0 || geometry.cell_height <= 0.0 {
        return None;
    }
    let mut width = window.width - scrollbar_spacing;
    let mut height = window.height;
    if window.inputbar_visible {
        height += window.inputbar_height;
    }
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let page_ratio = geometry.cell_height / geometry.document_width();
    let window_ratio = height / width;

    if mode == AdjustMode::Width || page_ratio < window_ratio {
        let mut scale = geometry.width_scale(width);
        if let Some(bar) = scrollbar_width {
            if height < geometry.document_height(scale) {
                width -= bar;
                scale = geometry.width_scale(width);
            }
        }
        Some(scale)
    } else {
        height = height.max(1.0);
        Some(height / geometry.cell_height)
    }
}

/// Location and size of the current page along the scrolled axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpan {
    pub offset: f64,
    pub size: f64,
}

/// Step sizes and behaviour switches for [`scroll_target`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOptions {
    pub step: f64,
    pub horizontal_step: f64,
    pub full_overlap: f64,
    pub padding: f64,
    pub wrap: bool,
    pub page_aware: bool,
}

impl ScrollOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            step: settings.scroll_step,
            horizontal_step: settings.horizontal_step(),
            full_overlap: settings.scroll_full_overlap,
            padding: f64::from(settings.page_padding),
            wrap: settings.scroll_wrap,
            page_aware: settings.scroll_page_aware,
        }
    }
}

/// Unclamped value the scrolled axis should move to. `page` is the current
/// page's span on that axis and only matters for page-aware scrolling.
pub fn scroll_target(
    axis: &Adjustment,
    direction: ScrollDirection,
    count: u32,
    options: &ScrollOptions,
    page: Option<PageSpan>,
) -> f64 {
    let view = axis.page_size;
    let value = axis.value;
    let max = axis.max_value();
    let times = f64::from(count.max(1));
    let padding = options.padding;
    let full = (1.0 - options.full_overlap) * view + padding;
    let half = (view + padding) / 2.0;

    let mut target = match direction {
        ScrollDirection::FullUp | ScrollDirection::FullLeft => value - full,
        ScrollDirection::FullDown | ScrollDirection::FullRight => value + full,
        ScrollDirection::HalfUp | ScrollDirection::HalfLeft => value - half,
        ScrollDirection::HalfDown | ScrollDirection::HalfRight => value + half,
        ScrollDirection::Left => value - options.horizontal_step * times,
        ScrollDirection::Right => value + options.horizontal_step * times,
        ScrollDirection::Up => value - options.step * times,
        ScrollDirection::Down => value + options.step * times,
        ScrollDirection::Top => 0.0,
        ScrollDirection::Bottom => max,
    };

    if options.wrap {
        if target < 0.0 {
            target = max;
        } else if target > max {
            target = 0.0;
        }
    }

    if let (true, Some(span)) = (options.page_aware, page) {
        let start = span.offset - (padding / 2.0).floor();
        let size = span.size + padding;
        let end = start + size;
        if direction.is_page_sized_forward() {
            if start > value && start < value + view {
                target = start;
            } else if start <= value && end < value + view {
                target = end + 1.0;
            } else if start <= value && end < target + view {
                target = end - view + 1.0;
            }
        } else if direction.is_page_sized_backward() {
            if start + 1.0 >= value && start < value + view {
                target = start - view;
            } else if start <= value && end + 1.0 < value + view {
                target = end - view;
            } else if start <= value && start > target {
                target = start;
            }
        }
    }

    target
}
