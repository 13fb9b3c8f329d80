use crate::errors::{Error, Result};
use crate::point::{distance, Point};

/// Fraction of the shorter image side below which two corners are
/// considered coincident (spec.md §3, `Quad` invariant).
pub const MIN_SEPARATION_FRACTION: f64 = 0.01;

/// A document-boundary quadrilateral, always stored in canonical
/// top-left, top-right, bottom-right, bottom-left order.
///
/// Constructing a [`Quad`] validates the corner-order, convexity and
/// minimum-separation invariants from spec.md §3; there is no way to hold
/// an invalid quad in this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    corners: [Point; 4],
}

impl Quad {
    /// Canonicalize four unordered corners into TL, TR, BR, BL using the
    /// sum/difference rule from spec.md §4.3: TL minimizes x+y, BR
    /// maximizes x+y, TR maximizes x-y, BL minimizes x-y.
    pub fn from_unordered(points: [Point; 4], shorter_side: f64) -> Result<Self> {
        let mut by_sum = points;
        by_sum.sort_by(|a, b| (a.x + a.y).partial_cmp(&(b.x + b.y)).unwrap());
        let tl = by_sum[0];
        let br = by_sum[3];

        let mut by_diff = points;
        by_diff.sort_by(|a, b| (a.x - a.y).partial_cmp(&(b.x - b.y)).unwrap());
        let bl = by_diff[0];
        let tr = by_diff[3];

        Self::new(tl, tr, br, bl, shorter_side)
    }

    /// Build a quad already known to be in TL, TR, BR, BL order, validating
    /// the invariants.
    pub fn new(tl: Point, tr: Point, br: Point, bl: Point, shorter_side: f64) -> Result<Self> {
        let corners = [tl, tr, br, bl];
        let min_sep = shorter_side * MIN_SEPARATION_FRACTION;
        for i in 0..4 {
            for j in (i + 1)..4 {
                if distance(corners[i], corners[j]) < min_sep {
                    return Err(Error::DegenerateQuad);
                }
            }
        }
        let quad = Self { corners };
        if !quad.is_convex() {
            return Err(Error::NotConvex);
        }
        if quad.signed_area() <= 0.0 {
            return Err(Error::NotConvex);
        }
        Ok(quad)
    }

    /// Corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn top_left(&self) -> Point {
        self.corners[0]
    }
    pub fn top_right(&self) -> Point {
        self.corners[1]
    }
    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }
    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Signed area under image coordinate conventions (y grows downward).
    /// Positive for the canonical CW winding required by spec.md §3.
    pub fn signed_area(&self) -> f64 {
        let c = &self.corners;
        let mut acc = 0.0;
        for i in 0..4 {
            let (x1, y1) = (c[i].x, c[i].y);
            let (x2, y2) = (c[(i + 1) % 4].x, c[(i + 1) % 4].y);
            acc += x1 * y2 - x2 * y1;
        }
        -0.5 * acc
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// True iff all cross products of consecutive edge vectors share sign.
    pub fn is_convex(&self) -> bool {
        let c = &self.corners;
        let mut sign = 0.0_f64;
        for i in 0..4 {
            let p0 = c[i];
            let p1 = c[(i + 1) % 4];
            let p2 = c[(i + 2) % 4];
            let e1 = p1 - p0;
            let e2 = p2 - p1;
            let cross = e1.x * e2.y - e1.y * e2.x;
            if cross.abs() < 1e-9 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    pub fn centroid(&self) -> Point {
        let c = &self.corners;
        Point::new(
            (c[0].x + c[1].x + c[2].x + c[3].x) / 4.0,
            (c[0].y + c[1].y + c[2].y + c[3].y) / 4.0,
        )
    }

    /// Edge lengths in order TL-TR, TR-BR, BR-BL, BL-TL.
    pub fn edge_lengths(&self) -> [f64; 4] {
        let c = &self.corners;
        [
            distance(c[0], c[1]),
            distance(c[1], c[2]),
            distance(c[2], c[3]),
            distance(c[3], c[0]),
        ]
    }

    pub fn min_edge_length(&self) -> f64 {
        self.edge_lengths()
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    pub fn perimeter(&self) -> f64 {
        self.edge_lengths().iter().sum()
    }

    /// Diagonal of the axis-aligned bounding box, used to normalize
    /// per-corner drift throughout the tracker (spec.md §4.6).
    pub fn bounding_box_diagonal(&self) -> f64 {
        let xs = self.corners.map(|p| p.x);
        let ys = self.corners.map(|p| p.y);
        let (min_x, max_x) = (
            xs.iter().cloned().fold(f64::INFINITY, f64::min),
            xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        );
        let (min_y, max_y) = (
            ys.iter().cloned().fold(f64::INFINITY, f64::min),
            ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        );
        ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt()
    }

    /// `true` if two or more corners sit within `margin_px` of any frame
    /// edge (spec.md §3, `Detection.isPartialDocument`).
    pub fn is_partial_document(&self, width: f64, height: f64, margin_px: f64) -> bool {
        let near_edge = |p: Point| {
            p.x <= margin_px
                || p.y <= margin_px
                || p.x >= width - margin_px
                || p.y >= height - margin_px
        };
        self.corners.iter().filter(|&&p| near_edge(p)).count() >= 2
    }

    /// Mean per-corner Euclidean distance to `other`, in the same
    /// TL/TR/BR/BL correspondence used throughout the tracker.
    pub fn mean_corner_distance(&self, other: &Quad) -> f64 {
        let a = self.corners;
        let b = other.corners;
        (0..4).map(|i| distance(a[i], b[i])).sum::<f64>() / 4.0
    }

    /// Per-corner arithmetic mean of a non-empty slice of quads, used by
    /// `QuadSmoother` (spec.md §4.6.1). Does not itself re-validate
    /// convexity; callers fall back to the previous smoothed quad if the
    /// mean happens to be degenerate (practically never, since averaging
    /// convex quads close to each other stays convex).
    pub fn mean(quads: &[Quad]) -> Option<Quad> {
        if quads.is_empty() {
            return None;
        }
        let n = quads.len() as f64;
        let mut sums = [Point::origin(); 4];
        for q in quads {
            for (i, c) in q.corners.iter().enumerate() {
                sums[i].x += c.x;
                sums[i].y += c.y;
            }
        }
        for p in &mut sums {
            p.x /= n;
            p.y /= n;
        }
        Some(Quad { corners: sums })
    }

    /// Normalized corner positions in `[0,1]` display-oriented coordinates
    /// (spec.md §6, detection stream).
    pub fn normalized(&self, width: f64, height: f64) -> [(f64, f64); 4] {
        self.corners.map(|p| (p.x / width, p.y / height))
    }
}
