//! Geometric primitives for coordinate assignment.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in layout space
//! - [`Size`] - Width and height of a node
//! - [`Bounds`] - An axis-aligned box defined by minimum and maximum coordinates
//!
//! # Coordinate System
//!
//! ```text
//!   (0,0) ────────► +X   (layering axis: layers are columns)
//!     │
//!     │
//!     ▼
//!    +Y                  (placement axis: order inside a layer)
//! ```
//!
//! Node positions are top-left corners. All values are `f64`.

/// A 2D point in layout space.
///
/// # Examples
///
/// ```
/// # use strata_core::geometry::Point;
/// let p = Point::new(10.0, 20.0).with_y(5.0);
/// assert_eq!(p.x(), 10.0);
/// assert_eq!(p.y(), 5.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    /// Returns a copy with the x-coordinate replaced.
    pub fn with_x(self, x: f64) -> Self {
        Self { x, ..self }
    }

    /// Returns a copy with the y-coordinate replaced.
    pub fn with_y(self, y: f64) -> Self {
        Self { y, ..self }
    }

    /// Returns true if both coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Dimensions of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f64 {
        self.width
    }

    pub fn height(self) -> f64 {
        self.height
    }

    /// Returns true if both dimensions are finite and non-negative.
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    /// Creates bounds from a top-left corner and a size.
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    pub fn min_x(self) -> f64 {
        self.min_x
    }

    pub fn min_y(self) -> f64 {
        self.min_y
    }

    pub fn max_x(self) -> f64 {
        self.max_x
    }

    pub fn max_y(self) -> f64 {
        self.max_y
    }

    pub fn width(self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns true if the vertical extents of both bounds come closer than
    /// `clearance`.
    ///
    /// Boxes that are exactly `clearance` apart do not overlap.
    ///
    /// # Examples
    ///
    /// ```
    /// # use strata_core::geometry::{Bounds, Point, Size};
    /// let a = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(10.0, 10.0));
    /// let b = Bounds::new_from_top_left(Point::new(0.0, 15.0), Size::new(10.0, 10.0));
    /// assert!(!a.overlaps_vertically(&b, 5.0));
    /// assert!(a.overlaps_vertically(&b, 6.0));
    /// ```
    pub fn overlaps_vertically(&self, other: &Self, clearance: f64) -> bool {
        self.min_y < other.max_y + clearance && other.min_y < self.max_y + clearance
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn bounds_strategy() -> impl Strategy<Value = Bounds> {
        (
            -1000.0f64..1000.0,
            -1000.0f64..1000.0,
            0.0f64..500.0,
            0.0f64..500.0,
        )
            .prop_map(|(x, y, w, h)| Bounds::new_from_top_left(Point::new(x, y), Size::new(w, h)))
    }

    /// Vertical overlap should be symmetric and ignore horizontal placement.
    fn check_vertical_overlap_is_symmetric(
        b1: Bounds,
        b2: Bounds,
        shift: f64,
        clearance: f64,
    ) -> Result<(), TestCaseError> {
        let forward = b1.overlaps_vertically(&b2, clearance);
        let backward = b2.overlaps_vertically(&b1, clearance);
        let moved = Bounds::new_from_top_left(
            Point::new(b1.min_x() + shift, b1.min_y()),
            Size::new(b1.width(), b1.height()),
        );
        let shifted = moved.overlaps_vertically(&b2, clearance);

        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward, shifted);
        Ok(())
    }

    proptest! {
        #[test]
        fn vertical_overlap_is_symmetric(
            b1 in bounds_strategy(),
            b2 in bounds_strategy(),
            shift in -500.0f64..500.0,
            clearance in 0.0f64..50.0,
        ) {
            check_vertical_overlap_is_symmetric(b1, b2, shift, clearance)?;
        }
    }
}
