//! Centripetal Catmull-Rom curve through a line's scene points.
//!
//! Parameterisation follows the usual WebGL-engine convention: `point(t)`
//! walks the control segments uniformly in `t`, while `point_at(u)` walks the
//! curve by arc length using a precomputed table of cumulative lengths.

use foundation::math::Vec3;

/// Samples used to build the arc-length table.
pub const ARC_LENGTH_DIVISIONS: usize = 200;

const TANGENT_DELTA: f64 = 1e-4;
const MIN_KNOT_SPACING: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveError {
    TooFewPoints { got: usize },
    NonFinitePoint { index: usize },
}

impl std::fmt::Display for CurveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveError::TooFewPoints { got } => {
                write!(f, "curve needs at least 2 points, got {got}")
            }
            CurveError::NonFinitePoint { index } => {
                write!(f, "curve point {index} is not finite")
            }
        }
    }
}

impl std::error::Error for CurveError {}

#[derive(Debug, Clone, PartialEq)]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    arc_lengths: Vec<f64>,
}

impl CatmullRomCurve {
    pub fn new(points: Vec<Vec3>) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewPoints { got: points.len() });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(CurveError::NonFinitePoint { index });
        }

        let mut curve = Self {
            points,
            arc_lengths: Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1),
        };
        curve.arc_lengths = curve.compute_arc_lengths();
        Ok(curve)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Approximate arc length (sum of chords over the sample table).
    pub fn length(&self) -> f64 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// Position at curve parameter `t ∈ [0, 1]` (uniform in segments).
    pub fn point(&self, t: f64) -> Vec3 {
        let pts = &self.points;
        let l = pts.len();
        let p = (l - 1) as f64 * t.clamp(0.0, 1.0);
        let mut seg = p.floor() as usize;
        let mut weight = p - seg as f64;
        if seg >= l - 1 {
            seg = l - 2;
            weight = 1.0;
        }

        let p1 = pts[seg];
        let p2 = pts[seg + 1];
        let p0 = if seg > 0 {
            pts[seg - 1]
        } else {
            p1 * 2.0 - p2
        };
        let p3 = if seg + 2 < l {
            pts[seg + 2]
        } else {
            p2 * 2.0 - p1
        };

        // Centripetal knot spacing: |Δp|^0.5.
        let mut dt0 = p0.distance(p1).sqrt();
        let mut dt1 = p1.distance(p2).sqrt();
        let mut dt2 = p2.distance(p3).sqrt();
        if dt1 < MIN_KNOT_SPACING {
            dt1 = 1.0;
        }
        if dt0 < MIN_KNOT_SPACING {
            dt0 = dt1;
        }
        if dt2 < MIN_KNOT_SPACING {
            dt2 = dt1;
        }

        Vec3::new(
            nonuniform_cubic(p0.x, p1.x, p2.x, p3.x, dt0, dt1, dt2, weight),
            nonuniform_cubic(p0.y, p1.y, p2.y, p3.y, dt0, dt1, dt2, weight),
            nonuniform_cubic(p0.z, p1.z, p2.z, p3.z, dt0, dt1, dt2, weight),
        )
    }

    /// Position at arc-length fraction `u ∈ [0, 1]`.
    pub fn point_at(&self, u: f64) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at arc-length fraction `u`.
    ///
    /// Degenerate curves (all points coincident) have no direction; they report
    /// the chord direction if there is one, else +x.
    pub fn tangent_at(&self, u: f64) -> Vec3 {
        let t = self.u_to_t(u);
        let t1 = (t - TANGENT_DELTA).max(0.0);
        let t2 = (t + TANGENT_DELTA).min(1.0);
        (self.point(t2) - self.point(t1))
            .try_normalize()
            .or_else(|| self.chord_direction())
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0))
    }

    /// Maps an arc-length fraction to the segment parameter `t`.
    pub fn u_to_t(&self, u: f64) -> f64 {
        let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
        let total = self.length();
        if total <= f64::EPSILON {
            return u;
        }

        let target = u * total;
        let last = self.arc_lengths.len() - 1;
        let idx = self.arc_lengths.partition_point(|&len| len < target);
        if idx == 0 {
            return 0.0;
        }
        if idx > last {
            return 1.0;
        }
        if self.arc_lengths[idx] == target {
            return idx as f64 / last as f64;
        }

        let i = idx - 1;
        let before = self.arc_lengths[i];
        let segment = self.arc_lengths[idx] - before;
        let fraction = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };
        (i as f64 + fraction) / last as f64
    }

    fn chord_direction(&self) -> Option<Vec3> {
        let first = *self.points.first()?;
        let last = *self.points.last()?;
        (last - first).try_normalize()
    }

    fn compute_arc_lengths(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut last = self.point(0.0);
        let mut sum = 0.0;
        out.push(0.0);
        for i in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(i as f64 / ARC_LENGTH_DIVISIONS as f64);
            sum += current.distance(last);
            out.push(sum);
            last = current;
        }
        out
    }
}

#[allow(clippy::too_many_arguments)]
fn nonuniform_cubic(
    x0: f64,
    x1: f64,
    x2: f64,
    x3: f64,
    dt0: f64,
    dt1: f64,
    dt2: f64,
    t: f64,
) -> f64 {
    let mut t1 = (x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1;
    let mut t2 = (x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2;
    t1 *= dt1;
    t2 *= dt1;

    let c0 = x1;
    let c1 = t1;
    let c2 = -3.0 * x1 + 3.0 * x2 - 2.0 * t1 - t2;
    let c3 = 2.0 * x1 - 2.0 * x2 + t1 + t2;
    let t_sq = t * t;
    c0 + c1 * t + c2 * t_sq + c3 * t_sq * t
}

#[cfg(test)]
mod tests {
    use super::{CatmullRomCurve, CurveError};
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        assert_close(a.x, b.x, eps);
        assert_close(a.y, b.y, eps);
        assert_close(a.z, b.z, eps);
    }

    #[test]
    fn rejects_fewer_than_two_points() {
        assert_eq!(
            CatmullRomCurve::new(vec![]),
            Err(CurveError::TooFewPoints { got: 0 })
        );
        assert_eq!(
            CatmullRomCurve::new(vec![Vec3::new(1.0, 2.0, 3.0)]),
            Err(CurveError::TooFewPoints { got: 1 })
        );
    }

    #[test]
    fn rejects_non_finite_points() {
        let err = CatmullRomCurve::new(vec![Vec3::ZERO, Vec3::new(f64::NAN, 0.0, 0.0)]);
        assert_eq!(err, Err(CurveError::NonFinitePoint { index: 1 }));
    }

    #[test]
    fn two_points_make_a_straight_segment() {
        let a = Vec3::new(-3.0, -8.0, 1.0);
        let b = Vec3::new(5.0, -8.0, -5.0);
        let curve = CatmullRomCurve::new(vec![a, b]).expect("curve");

        assert_close(curve.length(), a.distance(b), 1e-9);
        assert_vec_close(curve.point_at(0.0), a, 1e-12);
        assert_vec_close(curve.point_at(1.0), b, 1e-12);
        assert_vec_close(curve.point_at(0.5), a.lerp(b, 0.5), 1e-9);

        let dir = (b - a).try_normalize().expect("dir");
        assert_vec_close(curve.tangent_at(0.3), dir, 1e-9);
    }

    #[test]
    fn curve_passes_through_control_points() {
        let pts = vec![
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(2.0, 4.0, 1.0),
            Vec3::new(3.0, 4.0, 4.0),
            Vec3::new(7.0, 4.0, 5.0),
        ];
        let curve = CatmullRomCurve::new(pts.clone()).expect("curve");
        for (i, p) in pts.iter().enumerate() {
            let t = i as f64 / (pts.len() - 1) as f64;
            assert_vec_close(curve.point(t), *p, 1e-9);
        }
    }

    #[test]
    fn arc_length_parameter_is_monotonic() {
        let curve = CatmullRomCurve::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.1, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 3.0),
            Vec3::new(11.0, 0.0, 9.0),
        ])
        .expect("curve");
        let mut prev = -1.0;
        for i in 0..=50 {
            let t = curve.u_to_t(i as f64 / 50.0);
            assert!(t >= prev, "t went backwards at {i}");
            prev = t;
        }
        assert_close(curve.u_to_t(0.0), 0.0, 0.0);
        assert_close(curve.u_to_t(1.0), 1.0, 1e-12);
    }

    #[test]
    fn arc_length_sampling_is_uniform_in_distance() {
        let curve = CatmullRomCurve::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(9.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        ])
        .expect("curve");
        // Collinear, so arc length equals x travelled.
        assert_close(curve.point_at(0.25).x, 2.5, 1e-2);
        assert_close(curve.point_at(0.75).x, 7.5, 1e-2);
    }

    #[test]
    fn duplicate_points_give_zero_length_without_nan() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let curve = CatmullRomCurve::new(vec![p, p, p]).expect("curve");
        assert_eq!(curve.length(), 0.0);
        assert_vec_close(curve.point_at(0.7), p, 1e-12);
        let tangent = curve.tangent_at(0.7);
        assert!(tangent.is_finite());
        assert_close(tangent.length(), 1.0, 1e-12);
    }

    #[test]
    fn out_of_range_parameters_are_clamped() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let curve = CatmullRomCurve::new(vec![a, b]).expect("curve");
        assert_vec_close(curve.point_at(-2.0), a, 1e-12);
        assert_vec_close(curve.point_at(3.0), b, 1e-12);
        assert_vec_close(curve.point_at(f64::NAN), a, 1e-12);
    }
}
