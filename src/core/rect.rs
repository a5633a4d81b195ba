//! Axis-Aligned Rectangles
//!
//! Every collidable thing is an axis-aligned box anchored at its top-left
//! corner. Edges that only touch do not intersect, and a rectangle with zero
//! width or height never intersects anything.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::vec2::Vec2;

/// Axis-aligned rectangle (top-left origin, Y downward).
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle at `topleft` with the given size.
    #[inline]
    pub const fn at(topleft: Vec2, size: Vec2) -> Self {
        Self::new(topleft.x, topleft.y, size.x, size.y)
    }

    /// Left edge.
    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Top edge.
    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Horizontal center.
    #[inline]
    pub fn centerx(&self) -> f32 {
        self.x + self.w / 2.0
    }

    /// Vertical center.
    #[inline]
    pub fn centery(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.centerx(), self.centery())
    }

    /// Top-left corner.
    #[inline]
    pub fn topleft(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Size as a vector.
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// True if either dimension is zero or negative.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Strict overlap test.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Union of all rectangles, `None` if the iterator is empty.
    pub fn union_all<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rect({:.2}, {:.2}, {:.2}x{:.2})", self.x, self.y, self.w, self.h)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 32.0, 60.0);
        assert_eq!(r.right(), 42.0);
        assert_eq!(r.bottom(), 80.0);
        assert_eq!(r.center(), Vec2::new(26.0, 50.0));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(8.0, 0.0, 8.0, 8.0);
        assert!(!a.intersects(&b));

        let c = Rect::new(7.5, 0.0, 8.0, 8.0);
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn test_empty_rect_never_intersects() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let band = Rect::new(2.0, 4.0, 4.0, 0.0);
        assert!(!a.intersects(&band));
        assert!(!band.intersects(&a));
    }

    #[test]
    fn test_union() {
        let a = Rect::new(0.0, 0.0, 8.0, 8.0);
        let b = Rect::new(16.0, 8.0, 8.0, 8.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 24.0, 16.0));

        let all = [a, b, Rect::new(-8.0, 0.0, 8.0, 8.0)];
        assert_eq!(Rect::union_all(all.iter()), Some(Rect::new(-8.0, 0.0, 32.0, 16.0)));
        assert_eq!(Rect::union_all(std::iter::empty()), None);
    }
}
