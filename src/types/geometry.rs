use std::fmt;

use serde::{Deserialize, Serialize};

/// A pointer position in viewport coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the host window's layout viewport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Absolute pixel rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns true if the whole rectangle lies inside the viewport and has a
    /// non-negative size.
    pub fn fits_within(&self, viewport: &Viewport) -> bool {
        self.width >= 0.0
            && self.height >= 0.0
            && self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= viewport.width
            && self.bottom() <= viewport.height
    }
}

/// A CSS length as stored in the settings (`"90vw"`, `"50%"`, `"640px"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
    Px(f64),
    Percent(f64),
    Vw(f64),
    Vh(f64),
}

impl CssLength {
    /// Parses a CSS dimension string. A bare number is read as pixels.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        let (number, ctor): (&str, fn(f64) -> CssLength) = if let Some(n) = s.strip_suffix("px") {
            (n, CssLength::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            (n, CssLength::Percent)
        } else if let Some(n) = s.strip_suffix("vw") {
            (n, CssLength::Vw)
        } else if let Some(n) = s.strip_suffix("vh") {
            (n, CssLength::Vh)
        } else {
            (s, CssLength::Px)
        };
        let value: f64 = number.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(ctor(value))
    }

    /// Resolves to pixels. Percentages are relative to `axis`, the viewport
    /// extent along the property's axis.
    pub fn resolve(&self, axis: f64, viewport: &Viewport) -> f64 {
        match *self {
            CssLength::Px(v) => v,
            CssLength::Percent(v) => axis * v / 100.0,
            CssLength::Vw(v) => viewport.width * v / 100.0,
            CssLength::Vh(v) => viewport.height * v / 100.0,
        }
    }

    pub fn is_percent(&self) -> bool {
        matches!(self, CssLength::Percent(_))
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssLength::Px(v) => write!(f, "{}px", v),
            CssLength::Percent(v) => write!(f, "{}%", v),
            CssLength::Vw(v) => write!(f, "{}vw", v),
            CssLength::Vh(v) => write!(f, "{}vh", v),
        }
    }
}

/// Placement of the overlay window.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryState {
    /// Position expressed in CSS units. With `centered` set, the box is
    /// translated by half its size so `top`/`left` address its center.
    Relative {
        top: CssLength,
        left: CssLength,
        width: CssLength,
        height: CssLength,
        centered: bool,
    },
    /// Position expressed in viewport pixels.
    Absolute(Rect),
}

impl GeometryState {
    /// Computes the live bounding box for the given viewport.
    pub fn bounding_box(&self, viewport: &Viewport) -> Rect {
        match self {
            GeometryState::Absolute(rect) => *rect,
            GeometryState::Relative {
                top,
                left,
                width,
                height,
                centered,
            } => {
                let w = width.resolve(viewport.width, viewport);
                let h = height.resolve(viewport.height, viewport);
                let mut x = left.resolve(viewport.width, viewport);
                let mut y = top.resolve(viewport.height, viewport);
                if *centered {
                    x -= w / 2.0;
                    y -= h / 2.0;
                }
                Rect::new(x, y, w, h)
            }
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, GeometryState::Absolute(_))
    }
}

/// A set of active resize directions. The eight overlay handles are the four
/// single edges plus the four corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub struct ResizeEdges {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl ResizeEdges {
    /// Handle names in the order they are mounted.
    pub const HANDLES: [&'static str; 8] = ["n", "s", "e", "w", "ne", "nw", "se", "sw"];

    /// Parses a handle name such as `"se"`. Unknown letters yield `None`.
    pub fn parse(handle: &str) -> Option<Self> {
        if handle.is_empty() {
            return None;
        }
        let mut edges = ResizeEdges::default();
        for c in handle.chars() {
            match c {
                'n' => edges.north = true,
                's' => edges.south = true,
                'e' => edges.east = true,
                'w' => edges.west = true,
                _ => return None,
            }
        }
        if (edges.north && edges.south) || (edges.east && edges.west) {
            return None;
        }
        Some(edges)
    }

    /// All eight handles.
    pub fn all_handles() -> Vec<ResizeEdges> {
        Self::HANDLES.iter().filter_map(|h| Self::parse(h)).collect()
    }
}
