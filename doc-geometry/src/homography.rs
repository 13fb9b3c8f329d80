use nalgebra::{Matrix3, SVector};

use crate::errors::{Error, Result};
use crate::point::Point;

/// A 2D projective transform mapping source-image points to
/// destination-image points, used to warp a detected quad onto a
/// rectangular output canvas (spec.md §4.7).
#[derive(Debug, Clone, Copy)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Solve for the unique homography taking `src[i]` to `dst[i]` for all
    /// four correspondences, via direct linear transform.
    pub fn from_point_correspondences(src: &[Point], dst: &[Point]) -> Result<Self> {
        if src.len() != 4 || dst.len() != 4 {
            return Err(Error::WrongCorrespondenceCount {
                expected: 4,
                got: src.len().min(dst.len()).max(src.len().max(dst.len())),
            });
        }

        // Each correspondence contributes two rows to A h = b, solving for
        // the 8 free parameters of H with h33 fixed to 1.
        let mut a = nalgebra::SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);

            let row = 2 * i;
            a[(row, 0)] = x;
            a[(row, 1)] = y;
            a[(row, 2)] = 1.0;
            a[(row, 3)] = 0.0;
            a[(row, 4)] = 0.0;
            a[(row, 5)] = 0.0;
            a[(row, 6)] = -x * u;
            a[(row, 7)] = -y * u;
            b[row] = u;

            let row = row + 1;
            a[(row, 0)] = 0.0;
            a[(row, 1)] = 0.0;
            a[(row, 2)] = 0.0;
            a[(row, 3)] = x;
            a[(row, 4)] = y;
            a[(row, 5)] = 1.0;
            a[(row, 6)] = -x * v;
            a[(row, 7)] = -y * v;
            b[row] = v;
        }

        let decomp = a.lu();
        let h = decomp.solve(&b).ok_or(Error::SingularHomography)?;

        let matrix = Matrix3::new(
            h[0], h[1], h[2], //
            h[3], h[4], h[5], //
            h[6], h[7], 1.0,
        );
        Ok(Self { matrix })
    }

    /// Apply the transform to a single point.
    pub fn transform(&self, p: Point) -> Point {
        let v = self.matrix * nalgebra::Vector3::new(p.x, p.y, 1.0);
        Point::new(v.x / v.z, v.y / v.z)
    }

    /// Invert the transform, e.g. to map output-canvas pixels back into
    /// source-frame coordinates for resampling.
    pub fn inverse(&self) -> Result<Self> {
        self.matrix
            .try_inverse()
            .map(|matrix| Self { matrix })
            .ok_or(Error::SingularHomography)
    }

    pub fn as_matrix(&self) -> Matrix3<f64> {
        self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_mapping_roundtrips() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let h = Homography::from_point_correspondences(&src, &src).unwrap();
        for p in src {
            let q = h.transform(p);
            assert_relative_eq!(q.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(q.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn maps_skewed_quad_to_unit_square() {
        let src = [
            Point::new(150.0, 50.0),
            Point::new(650.0, 80.0),
            Point::new(630.0, 550.0),
            Point::new(140.0, 520.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(500.0, 0.0),
            Point::new(500.0, 700.0),
            Point::new(0.0, 700.0),
        ];
        let h = Homography::from_point_correspondences(&src, &dst).unwrap();
        for i in 0..4 {
            let mapped = h.transform(src[i]);
            assert_relative_eq!(mapped.x, dst[i].x, epsilon = 1e-6);
            assert_relative_eq!(mapped.y, dst[i].y, epsilon = 1e-6);
        }
    }

    #[test]
    fn inverse_undoes_forward_transform() {
        let src = [
            Point::new(150.0, 50.0),
            Point::new(650.0, 80.0),
            Point::new(630.0, 550.0),
            Point::new(140.0, 520.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(500.0, 0.0),
            Point::new(500.0, 700.0),
            Point::new(0.0, 700.0),
        ];
        let h = Homography::from_point_correspondences(&src, &dst).unwrap();
        let inv = h.inverse().unwrap();
        let p = Point::new(300.0, 250.0);
        let roundtrip = inv.transform(h.transform(p));
        assert_relative_eq!(roundtrip.x, p.x, epsilon = 1e-6);
        assert_relative_eq!(roundtrip.y, p.y, epsilon = 1e-6);
    }

    #[test]
    fn rejects_wrong_correspondence_count() {
        let src = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let dst = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert!(Homography::from_point_correspondences(&src, &dst).is_err());
    }
}
