use glam::Vec2;

use crate::callbacks::CallbackBus;

/// Channels carried by [`PointerEvents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerChannel {
    Move,
}

/// A pointer-move notification in host window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMove {
    pub x: f32,
    pub y: f32,
    /// Window viewport the coordinates are relative to.
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl PointerMove {
    pub fn new(x: f32, y: f32, viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            x,
            y,
            viewport_width,
            viewport_height,
        }
    }

    /// Position in `[0, 1]²` with the origin at the bottom-left corner.
    pub fn normalized(&self) -> Option<Vec2> {
        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return None;
        }
        let position = Vec2::new(
            self.x / self.viewport_width,
            1.0 - self.y / self.viewport_height,
        );
        Some(position.clamp(Vec2::ZERO, Vec2::ONE))
    }
}

/// Pointer listeners for the host window.
pub type PointerEvents = CallbackBus<PointerChannel, PointerMove>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_centre_normalizes_to_half() {
        let event = PointerMove::new(400.0, 300.0, 800.0, 600.0);
        assert_eq!(event.normalized(), Some(Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn y_axis_is_flipped() {
        let top_left = PointerMove::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(top_left.normalized(), Some(Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn positions_outside_the_window_are_clamped() {
        let event = PointerMove::new(-20.0, 900.0, 800.0, 600.0);
        assert_eq!(event.normalized(), Some(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn empty_viewport_has_no_position() {
        assert_eq!(PointerMove::new(1.0, 1.0, 0.0, 600.0).normalized(), None);
    }
}
