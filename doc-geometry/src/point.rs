/// A point in pixel coordinates, y growing downward as in image conventions.
pub type Point = nalgebra::Point2<f64>;

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a - b).norm()
}
