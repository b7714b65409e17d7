//! Trains running along line curves.
//!
//! One agent per curve-capable line. Progress is an arc-length fraction that
//! wraps (never bounces) at the ends, and the per-frame advance is divided by
//! the curve length so long and short lines look equally busy.

use foundation::math::Vec3;
use rand::Rng;
use runtime::frame::Frame;

use crate::curve::CatmullRomCurve;
use crate::model::MetroLine;

/// Base speed multiplier; each train draws a factor from [`SPEED_FACTOR_RANGE`].
pub const TRAIN_SPEED_BASE: f64 = 0.1;
pub const SPEED_FACTOR_RANGE: std::ops::Range<f64> = 0.5..1.0;
/// Curve length (scene units) is divided by this before normalizing speed.
pub const LENGTH_NORMALIZATION: f64 = 1000.0;

const MIN_CURVE_LENGTH: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainAgent {
    pub line_id: String,
    /// Arc-length fraction along the line's curve, always in `[0, 1]`.
    pub progress: f64,
    pub direction: Direction,
    pub speed: f64,
}

impl TrainAgent {
    /// Randomised start so trains are not in lockstep.
    pub fn spawn<R: Rng + ?Sized>(line_id: impl Into<String>, rng: &mut R) -> Self {
        let progress = rng.gen_range(0.0..1.0);
        let speed = rng.gen_range(SPEED_FACTOR_RANGE) * TRAIN_SPEED_BASE;
        let direction = if rng.gen_bool(0.5) {
            Direction::Forward
        } else {
            Direction::Backward
        };
        Self {
            line_id: line_id.into(),
            progress,
            direction,
            speed,
        }
    }

    /// Advances progress by `delta_s` seconds on a curve of `curve_length`.
    pub fn step(&mut self, delta_s: f64, curve_length: f64) {
        if !delta_s.is_finite() || delta_s <= 0.0 {
            return;
        }
        if !curve_length.is_finite() || curve_length <= MIN_CURVE_LENGTH {
            // Nowhere to go on a zero-length curve.
            return;
        }
        let advance = (delta_s * self.speed) / (curve_length / LENGTH_NORMALIZATION);
        self.progress = wrap_progress(self.progress + advance * self.direction.sign());
    }
}

/// Wraps a progress value that stepped past either end back onto the line.
pub fn wrap_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else if progress > 1.0 {
        0.0
    } else if progress < 0.0 {
        1.0
    } else {
        progress
    }
}

/// Where a train is this frame and which way it faces.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainPose {
    pub line_id: String,
    pub color: String,
    pub position: Vec3,
    /// Unit tangent along the direction of the curve parameter.
    pub tangent: Vec3,
    /// Point the train mesh should look at (`position + tangent`).
    pub look_at: Vec3,
}

#[derive(Debug, Clone)]
struct Route {
    color: String,
    curve: CatmullRomCurve,
}

#[derive(Debug, Clone, Default)]
pub struct MotionModel {
    routes: Vec<Route>,
    agents: Vec<TrainAgent>,
}

impl MotionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one curve and one train per line with at least two points.
    pub fn from_lines<R: Rng + ?Sized>(lines: &[MetroLine], rng: &mut R) -> Self {
        let mut model = Self::new();
        for line in lines.iter().filter(|l| l.supports_curve()) {
            let Ok(curve) = CatmullRomCurve::new(line.points.clone()) else {
                continue;
            };
            model.routes.push(Route {
                color: line.train_color().to_string(),
                curve,
            });
            model.agents.push(TrainAgent::spawn(line.id.clone(), rng));
        }
        model
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[TrainAgent] {
        &self.agents
    }

    pub fn curve(&self, index: usize) -> Option<&CatmullRomCurve> {
        self.routes.get(index).map(|r| &r.curve)
    }

    /// Per-frame update; call once per rendered frame.
    pub fn update(&mut self, delta_s: f64) {
        for (agent, route) in self.agents.iter_mut().zip(&self.routes) {
            agent.step(delta_s, route.curve.length());
        }
    }

    pub fn update_frame(&mut self, frame: &Frame) {
        self.update(frame.dt_s);
    }

    pub fn poses(&self) -> Vec<TrainPose> {
        self.agents
            .iter()
            .zip(&self.routes)
            .map(|(agent, route)| {
                let position = route.curve.point_at(agent.progress);
                let tangent = route.curve.tangent_at(agent.progress);
                TrainPose {
                    line_id: agent.line_id.clone(),
                    color: route.color.clone(),
                    position,
                    tangent,
                    look_at: position + tangent,
                }
            })
            .collect()
    }
}
