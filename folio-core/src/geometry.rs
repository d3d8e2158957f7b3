use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in document units, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Maps a rectangle given in unrotated page units into the scaled,
    /// rotated coordinate space of the displayed page.
    pub fn to_view(&self, page_width: f64, page_height: f64, scale: f64, rotation: Rotation) -> Rect {
        match rotation {
            Rotation::Deg90 => Rect {
                x1: (page_height - self.y2) * scale,
                x2: (page_height - self.y1) * scale,
                y1: self.x1 * scale,
                y2: self.x2 * scale,
            },
            Rotation::Deg180 => Rect {
                x1: (page_width - self.x2) * scale,
                x2: (page_width - self.x1) * scale,
                y1: (page_height - self.y2) * scale,
                y2: (page_height - self.y1) * scale,
            },
            Rotation::Deg270 => Rect {
                x1: self.y1 * scale,
                x2: self.y2 * scale,
                y1: (page_width - self.x2) * scale,
                y2: (page_width - self.x1) * scale,
            },
            Rotation::Deg0 => Rect {
                x1: self.x1 * scale,
                x2: self.x2 * scale,
                y1: self.y1 * scale,
                y2: self.y2 * scale,
            },
        }
    }
}

/// Position of a page's top-left corner on the scrollable canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageOffset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Self {
        match (degrees % 360) / 90 {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Adds `angle * times` degrees, wrapping at a full turn.
    pub fn rotated(self, angle: u32, times: u32) -> Self {
        let turns = (u64::from(angle) * u64::from(times)) % 360;
        Self::from_degrees(((u64::from(self.degrees()) + turns) % 360) as u32)
    }

    /// Width and height trade places at 90 and 270 degrees.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl From<u32> for Rotation {
    fn from(degrees: u32) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_and_normalizes() {
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
        assert_eq!(Rotation::Deg270.rotated(90, 1), Rotation::Deg0);
        assert_eq!(Rotation::Deg0.rotated(270, 3), Rotation::Deg90);
        assert!(Rotation::Deg270.is_sideways());
        assert!(!Rotation::Deg180.is_sideways());
    }

    #[test]
    fn rect_maps_through_rotation() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(
            rect.to_view(100.0, 200.0, 2.0, Rotation::Deg0),
            Rect::new(20.0, 40.0, 60.0, 80.0)
        );
        assert_eq!(
            rect.to_view(100.0, 200.0, 1.0, Rotation::Deg90),
            Rect::new(160.0, 10.0, 180.0, 30.0)
        );
        assert_eq!(
            rect.to_view(100.0, 200.0, 1.0, Rotation::Deg180),
            Rect::new(70.0, 160.0, 90.0, 180.0)
        );
        assert_eq!(
            rect.to_view(100.0, 200.0, 1.0, Rotation::Deg270),
            Rect::new(20.0, 70.0, 40.0, 90.0)
        );
    }
}
