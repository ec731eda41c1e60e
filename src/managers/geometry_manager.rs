//! Geometry controller: overlay placement, drag and resize.
//!
//! The overlay starts in relative CSS units (optionally centered on its
//! top/left point) and is converted to absolute pixels the first time the
//! user drags or resizes it. Drag positions are clamped to the viewport;
//! resizes keep the opposite edge fixed and never go below [`MIN_SIZE`].

use serde_json::{json, Value};
use tracing::debug;

use crate::platform::Surface;
use crate::types::errors::SurfaceError;
use crate::types::geometry::{CssLength, GeometryState, Point, Rect, ResizeEdges, Viewport};
use crate::types::input::{HitRegion, MouseButton, PointerEvent};
use crate::types::settings::PreviewSettings;

pub const STAGE_WIDTH: CssLength = CssLength::Vw(90.0);
pub const STAGE_HEIGHT: CssLength = CssLength::Vh(90.0);
pub const STAGE_TOP: CssLength = CssLength::Percent(50.0);
pub const STAGE_LEFT: CssLength = CssLength::Percent(50.0);

/// Smallest width or height a resize may produce, in pixels.
pub const MIN_SIZE: f64 = 100.0;

/// Settings updates produced by an interaction, ready for the settings store.
pub type GeometryUpdates = Vec<(String, Value)>;

/// The centered, maximized presentation.
pub fn stage_geometry() -> GeometryState {
    GeometryState::Relative {
        top: STAGE_TOP,
        left: STAGE_LEFT,
        width: STAGE_WIDTH,
        height: STAGE_HEIGHT,
        centered: true,
    }
}

/// True if the geometry carries the centering flag or its values equal the
/// stage defaults.
pub fn is_centered_stage(geometry: &GeometryState) -> bool {
    match geometry {
        GeometryState::Absolute(_) => false,
        GeometryState::Relative {
            top,
            left,
            width,
            height,
            centered,
        } => {
            *centered
                || (*width == STAGE_WIDTH
                    && *height == STAGE_HEIGHT
                    && *top == STAGE_TOP
                    && *left == STAGE_LEFT)
        }
    }
}

/// Clamps a `width` x `height` box proposed at (`left`, `top`) so it stays
/// inside the viewport. The top-left corner wins if the box is larger than
/// the viewport.
pub fn clamp_to_viewport(left: f64, top: f64, width: f64, height: f64, viewport: &Viewport) -> (f64, f64) {
    let left = left.min(viewport.width - width).max(0.0);
    let top = top.min(viewport.height - height).max(0.0);
    (left, top)
}

/// Computes the rectangle for a resize from `start_rect` by `delta`, keeping
/// the edges opposite to the active ones fixed.
pub fn resize_rect(start_rect: &Rect, edges: ResizeEdges, delta: Point) -> Rect {
    let mut rect = *start_rect;
    if edges.east {
        rect.width = (start_rect.width + delta.x).max(MIN_SIZE);
    }
    if edges.west {
        rect.width = (start_rect.width - delta.x).max(MIN_SIZE);
        rect.left = start_rect.right() - rect.width;
    }
    if edges.south {
        rect.height = (start_rect.height + delta.y).max(MIN_SIZE);
    }
    if edges.north {
        rect.height = (start_rect.height - delta.y).max(MIN_SIZE);
        rect.top = start_rect.bottom() - rect.height;
    }
    rect
}

fn px(value: f64) -> Value {
    json!(format!("{}px", value))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Interaction {
    Drag { offset: Point },
    Resize { edges: ResizeEdges, start: Point, start_rect: Rect },
}

#[derive(Debug, Clone)]
pub struct GeometryController {
    state: GeometryState,
    interaction: Option<Interaction>,
    expanded: bool,
}

impl GeometryController {
    pub fn new(state: GeometryState, expanded: bool) -> Self {
        Self {
            state,
            interaction: None,
            expanded,
        }
    }

    pub fn from_settings(settings: &PreviewSettings) -> Self {
        Self::new(Self::initial_geometry(settings), settings.is_expanded)
    }

    /// Picks the opening geometry.
    ///
    /// Stored user geometry is used when it is not expanded and its position
    /// was written in pixels by a drag or resize. Otherwise the stage
    /// settings apply. A `%` in top or left centers the box on that point.
    pub fn initial_geometry(settings: &PreviewSettings) -> GeometryState {
        let user = [
            &settings.user_top,
            &settings.user_left,
            &settings.user_width,
            &settings.user_height,
        ]
        .map(|v| CssLength::parse(v));
        if !settings.is_expanded {
            if let [Some(top @ CssLength::Px(_)), Some(left @ CssLength::Px(_)), Some(width), Some(height)] = user {
                return GeometryState::Relative {
                    top,
                    left,
                    width,
                    height,
                    centered: false,
                };
            }
        }

        let top = CssLength::parse(&settings.top).unwrap_or(STAGE_TOP);
        let left = CssLength::parse(&settings.left).unwrap_or(STAGE_LEFT);
        GeometryState::Relative {
            width: CssLength::parse(&settings.width).unwrap_or(STAGE_WIDTH),
            height: CssLength::parse(&settings.height).unwrap_or(STAGE_HEIGHT),
            centered: top.is_percent() || left.is_percent(),
            top,
            left,
        }
    }

    pub fn state(&self) -> &GeometryState {
        &self.state
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, Some(Interaction::Drag { .. }))
    }

    pub fn is_centered_stage(&self) -> bool {
        is_centered_stage(&self.state)
    }

    /// Rewrites relative geometry as absolute pixels from its live bounding
    /// box. Returns false if already absolute.
    pub fn to_absolute(&mut self, viewport: &Viewport) -> bool {
        if self.state.is_absolute() {
            return false;
        }
        let rect = self.state.bounding_box(viewport);
        debug!(?rect, "geometry converted to pixels");
        self.state = GeometryState::Absolute(rect);
        true
    }

    fn current_rect(&self, viewport: &Viewport) -> Rect {
        self.state.bounding_box(viewport)
    }

    /// Starts moving the overlay. Non-primary buttons and presses on chrome
    /// buttons are ignored.
    pub fn begin_drag(&mut self, surface: &mut dyn Surface, event: &PointerEvent) -> Result<bool, SurfaceError> {
        if event.button != MouseButton::Primary || matches!(event.region, HitRegion::ChromeButton(_)) {
            return Ok(false);
        }
        let viewport = surface.viewport();
        self.to_absolute(&viewport);
        let rect = self.current_rect(&viewport);
        self.interaction = Some(Interaction::Drag {
            offset: Point::new(event.position.x - rect.left, event.position.y - rect.top),
        });
        surface.apply_geometry(&self.state)?;
        surface.set_content_pointer_events(false);
        Ok(true)
    }

    pub fn begin_resize(
        &mut self,
        surface: &mut dyn Surface,
        event: &PointerEvent,
        edges: ResizeEdges,
    ) -> Result<bool, SurfaceError> {
        if event.button != MouseButton::Primary {
            return Ok(false);
        }
        let viewport = surface.viewport();
        self.to_absolute(&viewport);
        self.interaction = Some(Interaction::Resize {
            edges,
            start: event.position,
            start_rect: self.current_rect(&viewport),
        });
        surface.apply_geometry(&self.state)?;
        surface.set_content_pointer_events(false);
        Ok(true)
    }

    /// Applies a pointer move to the active interaction. Returns false when
    /// no interaction is running.
    pub fn pointer_move(&mut self, surface: &mut dyn Surface, position: Point) -> Result<bool, SurfaceError> {
        let Some(interaction) = self.interaction else {
            return Ok(false);
        };
        let viewport = surface.viewport();
        let rect = match interaction {
            Interaction::Drag { offset } => {
                let current = self.current_rect(&viewport);
                let (left, top) = clamp_to_viewport(
                    position.x - offset.x,
                    position.y - offset.y,
                    current.width,
                    current.height,
                    &viewport,
                );
                Rect::new(left, top, current.width, current.height)
            }
            Interaction::Resize {
                edges,
                start,
                start_rect,
            } => resize_rect(
                &start_rect,
                edges,
                Point::new(position.x - start.x, position.y - start.y),
            ),
        };
        self.state = GeometryState::Absolute(rect);
        surface.apply_geometry(&self.state)?;
        Ok(true)
    }

    /// Finishes the interaction and returns the keys to persist, or `None`
    /// when nothing was running.
    pub fn end_interaction(&mut self, surface: &mut dyn Surface) -> Option<GeometryUpdates> {
        self.interaction.take()?;
        surface.set_content_pointer_events(true);
        self.expanded = false;

        // Drags store the size too so the next preview reopens as it was left.
        let rect = self.current_rect(&surface.viewport());
        debug!(?rect, "interaction ended");
        Some(vec![
            ("userTop".to_string(), px(rect.top)),
            ("userLeft".to_string(), px(rect.left)),
            ("userWidth".to_string(), px(rect.width)),
            ("userHeight".to_string(), px(rect.height)),
            ("isExpanded".to_string(), json!(false)),
        ])
    }

    /// Abandons an interaction without persisting anything.
    pub fn cancel_interaction(&mut self, surface: &mut dyn Surface) {
        if self.interaction.take().is_some() {
            surface.set_content_pointer_events(true);
        }
    }

    /// Returns the overlay to stage geometry and yields the keys to persist.
    pub fn restore_stage(&mut self, surface: &mut dyn Surface) -> Result<GeometryUpdates, SurfaceError> {
        self.interaction = None;
        self.state = stage_geometry();
        self.expanded = true;
        surface.apply_geometry(&self.state)?;
        Ok(vec![
            ("width".to_string(), json!(STAGE_WIDTH.to_string())),
            ("height".to_string(), json!(STAGE_HEIGHT.to_string())),
            ("top".to_string(), json!(STAGE_TOP.to_string())),
            ("left".to_string(), json!(STAGE_LEFT.to_string())),
            ("isExpanded".to_string(), json!(true)),
        ])
    }

    /// Pulls the overlay back inside the viewport after a window resize:
    /// offsets are clamped into the viewport, then the box shrinks to fit. Centered
    /// geometry is left alone. Returns whether anything changed.
    pub fn check_in_bounds(&mut self, surface: &mut dyn Surface) -> Result<bool, SurfaceError> {
        if matches!(self.state, GeometryState::Relative { centered: true, .. }) || self.interaction.is_some() {
            return Ok(false);
        }
        let viewport = surface.viewport();
        let before = self.current_rect(&viewport);
        let mut rect = before;
        // An edge past the far side comes back far enough to leave room for
        // the floor size, or to zero on a viewport smaller than the floor.
        rect.left = rect.left.min(viewport.width - MIN_SIZE).max(0.0);
        rect.top = rect.top.min(viewport.height - MIN_SIZE).max(0.0);
        if rect.right() > viewport.width {
            rect.width = (viewport.width - rect.left).max(0.0);
        }
        if rect.bottom() > viewport.height {
            rect.height = (viewport.height - rect.top).max(0.0);
        }
        if rect == before && self.state.is_absolute() {
            return Ok(false);
        }
        self.state = GeometryState::Absolute(rect);
        surface.apply_geometry(&self.state)?;
        Ok(rect != before)
    }
}
