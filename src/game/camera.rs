//! Camera
//!
//! Follows the focus point published by characters. X tracks the target
//! exactly; Y eases toward it in small steps and never trails by more than
//! `max_offset`. The view is clamped to the level once its size is known.

use tracing::debug;

use crate::core::{Rect, StateHasher, Vec2};
use crate::game::bus::{EventQueue, Listener};
use crate::game::events::Event;

/// Default view width in pixels.
pub const DEFAULT_VIEW_WIDTH: f32 = 1280.0;

/// Default view height in pixels.
pub const DEFAULT_VIEW_HEIGHT: f32 = 720.0;

/// Default maximum vertical trail.
pub const DEFAULT_MAX_OFFSET: f32 = 100.0;

/// Vertical distance treated as centered.
const Y_DEAD_ZONE: f32 = 1.0;

/// Vertical easing steps: `(distance threshold, step)`, accumulated.
const Y_STEPS_DOWN: [(f32, f32); 3] = [(0.0, 2.0), (10.0, 2.0), (20.0, 4.0)];
const Y_STEPS_UP: [(f32, f32); 3] = [(0.0, 2.0), (10.0, 2.0), (20.0, 5.0)];

/// View follower.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Visible region in level pixels
    pub rect: Rect,
    /// Maximum vertical distance between view center and target
    pub max_offset: f32,
    /// Level size, once built
    pub bounds: Option<Vec2>,
    /// Horizontal scrolling allowed
    pub scroll_x: bool,
    /// Vertical scrolling allowed
    pub scroll_y: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT, DEFAULT_MAX_OFFSET)
    }
}

impl Camera {
    /// Camera at the origin with the given view size.
    pub fn new(width: f32, height: f32, max_offset: f32) -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, width, height),
            max_offset,
            bounds: None,
            scroll_x: true,
            scroll_y: true,
        }
    }

    /// Top-left of the view.
    pub fn topleft(&self) -> Vec2 {
        self.rect.topleft()
    }

    /// Level was built: remember its size and lock axes it fits on.
    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.bounds = Some(Vec2::new(width, height));
        self.scroll_x = width > self.rect.w;
        self.scroll_y = height > self.rect.h;
        if !self.scroll_x {
            self.rect.x = 0.0;
        }
        if !self.scroll_y {
            self.rect.y = 0.0;
        }
        debug!(width, height, scroll_x = self.scroll_x, scroll_y = self.scroll_y, "camera bounds");
    }

    /// Move toward `pos` and publish the new view.
    pub fn center_on(&mut self, pos: Vec2, xscroll: bool, yscroll: bool, queue: &mut EventQueue) {
        if yscroll && self.scroll_y {
            self.follow_y(pos.y);
        }
        if xscroll && self.scroll_x {
            self.follow_x(pos.x);
        }
        queue.post(Event::CameraMove { topleft: self.topleft() });
    }

    fn follow_y(&mut self, target: f32) {
        let mut ydist = self.rect.centery() - target;
        if ydist.abs() <= Y_DEAD_ZONE {
            ydist = 0.0;
        }

        let mut centery = self.rect.centery();
        if ydist < 0.0 {
            for (threshold, step) in Y_STEPS_DOWN {
                if -ydist > threshold {
                    centery += step;
                }
            }
            if ydist < -self.max_offset {
                centery = target - self.max_offset;
            }
        } else if ydist > 0.0 {
            for (threshold, step) in Y_STEPS_UP {
                if ydist > threshold {
                    centery -= step;
                }
            }
            if ydist > self.max_offset {
                centery = target + self.max_offset;
            }
        }
        self.rect.y = centery - self.rect.h / 2.0;

        if self.rect.top() < 0.0 {
            self.rect.y = 0.0;
        } else if let Some(bounds) = self.bounds {
            if self.rect.bottom() > bounds.y {
                self.rect.y = bounds.y - self.rect.h;
            }
        }
    }

    fn follow_x(&mut self, target: f32) {
        self.rect.x = target - self.rect.w / 2.0;

        if self.rect.left() < 0.0 {
            self.rect.x = 0.0;
        } else if let Some(bounds) = self.bounds {
            if self.rect.right() > bounds.x {
                self.rect.x = bounds.x - self.rect.w;
            }
        }
    }

    /// Add camera state to a hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_rect(&self.rect);
        hasher.update_bool(self.scroll_x);
        hasher.update_bool(self.scroll_y);
    }
}

impl Listener for Camera {
    fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
        match event {
            Event::LevelBuild { width, height, .. } => self.set_bounds(*width, *height),
            Event::CameraCenterRequest { pos, xscroll, yscroll } => {
                self.center_on(*pos, *xscroll, *yscroll, queue);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(queue: &mut EventQueue) -> Vec<Vec2> {
        queue
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CameraMove { topleft } => Some(topleft),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_x_tracks_exactly() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();
        camera.center_on(Vec2::new(1000.0, 360.0), true, true, &mut queue);
        assert_eq!(camera.rect.x, 360.0);
        assert_eq!(moved(&mut queue), vec![Vec2::new(360.0, 0.0)]);
    }

    #[test]
    fn test_y_eases_in_steps() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();

        // 40 below center: 2 + 2 + 4
        camera.center_on(Vec2::new(640.0, 400.0), true, true, &mut queue);
        assert_eq!(camera.rect.centery(), 368.0);

        // 5 below: 2
        camera.center_on(Vec2::new(640.0, 373.0), true, true, &mut queue);
        assert_eq!(camera.rect.centery(), 370.0);

        // Within the dead zone: no motion
        camera.center_on(Vec2::new(640.0, 371.0), true, true, &mut queue);
        assert_eq!(camera.rect.centery(), 370.0);

        // 30 above: 2 + 2 + 5
        camera.center_on(Vec2::new(640.0, 340.0), true, true, &mut queue);
        assert_eq!(camera.rect.centery(), 361.0);
    }

    #[test]
    fn test_y_trail_is_bounded() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();
        camera.center_on(Vec2::new(640.0, 900.0), true, true, &mut queue);
        assert_eq!(camera.rect.centery(), 800.0);
    }

    #[test]
    fn test_clamped_to_level() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();
        camera.notify(&Event::LevelBuild { width: 2000.0, height: 1000.0, backgrounds: Vec::new() }, &mut queue);

        camera.center_on(Vec2::new(10.0, 0.0), true, true, &mut queue);
        assert_eq!(camera.topleft(), Vec2::ZERO);

        camera.center_on(Vec2::new(1990.0, 2000.0), true, true, &mut queue);
        assert_eq!(camera.rect.right(), 2000.0);
        assert_eq!(camera.rect.bottom(), 1000.0);
    }

    #[test]
    fn test_small_level_locks_axis() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();
        camera.set_bounds(640.0, 4000.0);
        assert!(!camera.scroll_x);
        assert!(camera.scroll_y);

        camera.center_on(Vec2::new(600.0, 2000.0), true, true, &mut queue);
        assert_eq!(camera.rect.x, 0.0);
        assert!(camera.rect.y > 0.0);
    }

    #[test]
    fn test_posts_move_even_when_still() {
        let mut camera = Camera::default();
        let mut queue = EventQueue::default();
        camera.notify(&Event::CameraCenterRequest { pos: Vec2::new(640.0, 360.0), xscroll: false, yscroll: false }, &mut queue);
        assert_eq!(moved(&mut queue), vec![Vec2::ZERO]);
    }
}
