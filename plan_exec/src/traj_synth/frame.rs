//! Vehicle relative reference frame used for curve fitting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry2, Point2, Vector2};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A 2D frame placed at `origin_m` in the map frame with its X axis along `heading_rad`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ReferenceFrame {
    pub origin_m: Vector2<f64>,
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReferenceFrame {
    pub fn new(origin_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            origin_m,
            heading_rad,
        }
    }

    /// The transform from this frame into the map frame.
    fn isometry(&self) -> Isometry2<f64> {
        Isometry2::new(self.origin_m, self.heading_rad)
    }

    /// Express a map frame point in this frame.
    pub fn to_local(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        self.isometry()
            .inverse_transform_point(&Point2::from(*point_m))
            .coords
    }

    /// Express a point in this frame in the map frame.
    pub fn to_global(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        self.isometry().transform_point(&Point2::from(*point_m)).coords
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frame_transforms() {
        let frame = ReferenceFrame::new(Vector2::new(10.0, 5.0), FRAC_PI_2);

        // Origin maps onto zero
        assert!(frame.to_local(&Vector2::new(10.0, 5.0)).norm() < 1e-12);

        // A point ahead along the heading is on the local X axis
        let local = frame.to_local(&Vector2::new(10.0, 8.0));
        assert!((local - Vector2::new(3.0, 0.0)).norm() < 1e-12);

        // A point to the left of the heading has positive local Y
        let local = frame.to_local(&Vector2::new(8.0, 5.0));
        assert!((local - Vector2::new(0.0, 2.0)).norm() < 1e-12);

        let p = Vector2::new(-123.4, 56.7);
        assert!((frame.to_global(&frame.to_local(&p)) - p).norm() < 1e-9);
    }
}
