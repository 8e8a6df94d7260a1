//! Bowyer-Watson Delaunay triangulation of 2D points.

use glam::{DVec2, Vec2};

/// Circumcircle of a triangle, radius squared
#[derive(Debug, Clone, Copy)]
struct Circle {
    center: DVec2,
    radius_sq: f64,
}

impl Circle {
    fn through(a: DVec2, b: DVec2, c: DVec2) -> Option<Self> {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < f64::EPSILON {
            return None;
        }
        let (la, lb, lc) = (a.length_squared(), b.length_squared(), c.length_squared());
        let center = DVec2::new(
            (la * (b.y - c.y) + lb * (c.y - a.y) + lc * (a.y - b.y)) / d,
            (la * (c.x - b.x) + lb * (a.x - c.x) + lc * (b.x - a.x)) / d,
        );
        Some(Self {
            center,
            radius_sq: center.distance_squared(a),
        })
    }

    fn contains(&self, p: DVec2) -> bool {
        p.distance_squared(self.center) < self.radius_sq * (1.0 - 1e-12)
    }
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    circle: Circle,
}

/// Triangulate `points`, returning index triplets into it.
///
/// Every triangle is wound with a positive signed area in the input
/// coordinates, so face normals computed from it agree. Points that coincide with an earlier point are left out of the mesh.
/// Fewer than three distinct, non-collinear points give no triangles.
pub(crate) fn triangulate(points: &[Vec2]) -> Vec<[u32; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let mut pts: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
    let (min, max) = pts.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    let span = (max - min).max_element().max(1.0);
    let mid = (min + max) * 0.5;

    // Enclosing triangle, far enough out that it never clips hull edges
    pts.push(mid + DVec2::new(-100.0 * span, -100.0 * span));
    pts.push(mid + DVec2::new(0.0, 100.0 * span));
    pts.push(mid + DVec2::new(100.0 * span, -100.0 * span));

    let mut triangles = Vec::new();
    if let Some(circle) = Circle::through(pts[n], pts[n + 1], pts[n + 2]) {
        triangles.push(Triangle {
            v: [n, n + 1, n + 2],
            circle,
        });
    }

    for i in 0..n {
        let p = pts[i];
        if pts[..i].iter().any(|q| q.distance_squared(p) < 1e-12) {
            continue;
        }

        let (bad, good): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.circle.contains(p));
        triangles = good;

        // Cavity boundary: edges of exactly one bad triangle
        let mut edges: Vec<[usize; 2]> = Vec::with_capacity(bad.len() * 3);
        for t in &bad {
            for k in 0..3 {
                edges.push([t.v[k], t.v[(k + 1) % 3]]);
            }
        }
        let shared = |e: &[usize; 2]| {
            edges
                .iter()
                .filter(|o| (o[0] == e[0] && o[1] == e[1]) || (o[0] == e[1] && o[1] == e[0]))
                .count()
                > 1
        };
        let boundary: Vec<[usize; 2]> = edges.iter().copied().filter(|e| !shared(e)).collect();

        for [a, b] in boundary {
            if let Some(circle) = Circle::through(pts[a], pts[b], p) {
                triangles.push(Triangle {
                    v: [a, b, i],
                    circle,
                });
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .map(|t| {
            let [a, b, c] = t.v;
            if (pts[b] - pts[a]).perp_dot(pts[c] - pts[a]) < 0.0 {
                [a as u32, c as u32, b as u32]
            } else {
                [a as u32, b as u32, c as u32]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Square corners plus well-spread interior points
    fn square_cloud(interior: usize) -> Vec<Vec2> {
        let mut points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        for i in 1..=interior {
            let x = (i as f32 * 0.618_034).fract();
            let y = (i as f32 * 0.414_214).fract();
            points.push(Vec2::new(1.0 + 8.0 * x, 1.0 + 8.0 * y));
        }
        points
    }

    fn area(points: &[Vec2], t: &[u32; 3]) -> f32 {
        let (a, b, c) = (
            points[t[0] as usize],
            points[t[1] as usize],
            points[t[2] as usize],
        );
        (b - a).perp_dot(c - a).abs() * 0.5
    }

    #[test]
    fn test_too_few_points() {
        assert!(triangulate(&[Vec2::ZERO, Vec2::X]).is_empty());
    }

    #[test]
    fn test_single_triangle() {
        let tris = triangulate(&[Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::new(0.0, 3.0)]);
        assert_eq!(tris.len(), 1);
        let mut v = tris[0];
        v.sort();
        assert_eq!(v, [0, 1, 2]);
    }

    #[test]
    fn test_square_cloud_covers_hull() {
        let points = square_cloud(20);
        let tris = triangulate(&points);

        // 2n - 2 - h triangles for n points with h on the hull
        assert_eq!(tris.len(), 2 * points.len() - 2 - 4);
        let total: f32 = tris.iter().map(|t| area(&points, t)).sum();
        assert!((total - 100.0).abs() < 1e-2, "area {}", total);
    }

    #[test]
    fn test_consistent_winding() {
        let points = square_cloud(12);
        for t in triangulate(&points) {
            let [a, b, c] = t.map(|i| points[i as usize]);
            assert!((b - a).perp_dot(c - a) > 0.0, "{:?} wound clockwise", t);
        }
    }

    #[test]
    fn test_empty_circumcircles() {
        let points = square_cloud(30);
        for t in triangulate(&points) {
            let [a, b, c] = t.map(|i| points[i as usize].as_dvec2());
            let circle = Circle::through(a, b, c).unwrap();
            for (i, p) in points.iter().enumerate() {
                if t.contains(&(i as u32)) {
                    continue;
                }
                let d = p.as_dvec2().distance_squared(circle.center);
                assert!(d >= circle.radius_sq - 1e-6, "point {} inside {:?}", i, t);
            }
        }
    }

    #[test]
    fn test_duplicate_point_left_out() {
        let mut points = square_cloud(5);
        points.push(points[6]);
        let dup = (points.len() - 1) as u32;
        let tris = triangulate(&points);
        assert!(tris.iter().all(|t| !t.contains(&dup)));
        let total: f32 = tris.iter().map(|t| area(&points, t)).sum();
        assert!((total - 100.0).abs() < 1e-2);
    }
}
