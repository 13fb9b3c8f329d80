use doc_geometry::{Point, Quad};

use crate::imageops::{morph_close, GrayImage};
use crate::lines::hough_lines;

/// Fraction of `max(width, height)` a spanning line must reach before it
/// is suppressed.
const SPANNING_LINE_LENGTH_FRACTION: f64 = 0.70;
/// Both endpoints of a spanning line must lie within this many pixels of
/// an image border.
const SPANNING_LINE_BORDER_MARGIN: f64 = 15.0;
const SPANNING_LINE_BAND_PX: i64 = 2;

const MIN_CONTOUR_AREA_FRACTION: f64 = 0.02;
const MIN_QUAD_EDGE_FRACTION: f64 = 0.05;
const PARTIAL_DOCUMENT_MARGIN_PX: f64 = 5.0;

/// Zero out any line whose endpoints both touch the image border and
/// whose length reaches `SPANNING_LINE_LENGTH_FRACTION` of the longer
/// side, then heal the gaps this leaves in real document edges with a
/// morphological close.
pub fn suppress_spanning_lines(edges: &GrayImage) -> GrayImage {
    let w = edges.width as f64;
    let h = edges.height as f64;
    let max_side = w.max(h);

    let lines = hough_lines(edges, 180, 64, (max_side * 0.3) as u32);
    let mut out = edges.clone();

    for line in lines {
        let Some((x0, y0, x1, y1)) = line.endpoints(w, h) else {
            continue;
        };
        let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        if length < SPANNING_LINE_LENGTH_FRACTION * max_side {
            continue;
        }
        let near_border = |x: f64, y: f64| {
            x <= SPANNING_LINE_BORDER_MARGIN
                || y <= SPANNING_LINE_BORDER_MARGIN
                || x >= w - SPANNING_LINE_BORDER_MARGIN
                || y >= h - SPANNING_LINE_BORDER_MARGIN
        };
        if !near_border(x0, y0) || !near_border(x1, y1) {
            continue;
        }
        suppress_band(&mut out, x0, y0, x1, y1, SPANNING_LINE_BAND_PX);
    }

    morph_close(&out, 5)
}

fn suppress_band(img: &mut GrayImage, x0: f64, y0: f64, x1: f64, y1: f64, band: i64) {
    let steps = (((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt().ceil() as usize).max(1);
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let cx = x0 + (x1 - x0) * t;
        let cy = y0 + (y1 - y0) * t;
        for dy in -band..=band {
            for dx in -band..=band {
                let px = cx as i64 + dx;
                let py = cy as i64 + dy;
                if px >= 0 && py >= 0 && (px as usize) < img.width && (py as usize) < img.height {
                    img.set(px as usize, py as usize, 0);
                }
            }
        }
    }
}

/// Extract external contours from a (spanning-line-suppressed) edge map
/// and return every candidate that reduces to a valid, convex
/// quadrilateral.
pub fn extract_quad_candidates(edges: &GrayImage) -> Vec<Quad> {
    let shorter_side = (edges.width.min(edges.height)) as f64;
    let image_area = (edges.width * edges.height) as f64;
    let min_edge = shorter_side * MIN_QUAD_EDGE_FRACTION;

    connected_components(edges)
        .into_iter()
        .filter_map(|component| {
            let hull = convex_hull(&component);
            if hull.len() < 4 {
                return None;
            }
            if polygon_area(&hull) < MIN_CONTOUR_AREA_FRACTION * image_area {
                return None;
            }
            let quad_points = simplify_to_quadrilateral(&hull)?;
            let corners = quad_points.map(|(x, y)| Point::new(x, y));
            let quad = Quad::from_unordered(corners, shorter_side).ok()?;
            if quad.min_edge_length() < min_edge {
                return None;
            }
            Some(quad)
        })
        .collect()
}

pub fn is_partial_document(quad: &Quad, width: f64, height: f64) -> bool {
    quad.is_partial_document(width, height, PARTIAL_DOCUMENT_MARGIN_PX)
}

/// 8-connected flood fill over nonzero pixels, returning each component's
/// member coordinates as `(x, y)` pairs.
fn connected_components(img: &GrayImage) -> Vec<Vec<(f64, f64)>> {
    let w = img.width;
    let h = img.height;
    let mut visited = vec![false; w * h];
    let mut components = Vec::new();

    for start_y in 0..h {
        for start_x in 0..w {
            let start_idx = start_y * w + start_x;
            if visited[start_idx] || img.get(start_x, start_y) != 255 {
                continue;
            }
            let mut stack = vec![(start_x, start_y)];
            visited[start_idx] = true;
            let mut component = Vec::new();
            while let Some((x, y)) = stack.pop() {
                component.push((x as f64, y as f64));
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                            continue;
                        }
                        let nidx = ny as usize * w + nx as usize;
                        if !visited[nidx] && img.get(nx as usize, ny as usize) == 255 {
                            visited[nidx] = true;
                            stack.push((nx as usize, ny as usize));
                        }
                    }
                }
            }
            components.push(component);
        }
    }
    components
}

/// Enclosed area of a simple polygon via the shoelace formula.
fn polygon_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let sum: f64 = (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    sum.abs() / 2.0
}

/// Andrew's monotone chain convex hull, returned in counter-clockwise
/// order (screen coordinates, so visually clockwise).
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Reduce a convex polygon to exactly 4 vertices by repeatedly dropping
/// the vertex contributing the smallest triangular area to its neighbors
/// (Visvalingam-Whyatt), which for a convex input always leaves another
/// convex polygon. Mirrors the spec's adaptive polygon approximation
/// without needing an explicit epsilon schedule.
fn simplify_to_quadrilateral(hull: &[(f64, f64)]) -> Option<[(f64, f64); 4]> {
    let mut polygon = hull.to_vec();
    if polygon.len() < 4 {
        return None;
    }
    while polygon.len() > 4 {
        let n = polygon.len();
        let (min_idx, _) = (0..n)
            .map(|i| {
                let prev = polygon[(i + n - 1) % n];
                let cur = polygon[i];
                let next = polygon[(i + 1) % n];
                let area = ((cur.0 - prev.0) * (next.1 - prev.1) - (next.0 - prev.0) * (cur.1 - prev.1)).abs() / 2.0;
                (i, area)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())?;
        polygon.remove(min_idx);
    }
    Some([polygon[0], polygon[1], polygon[2], polygon[3]])
}
