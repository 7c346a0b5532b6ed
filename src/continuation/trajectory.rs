//! Recorded continuation paths.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Direction of an enzyme-level sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
}

/// One accepted continuation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Absolute level of the swept enzyme
    pub enzyme_level: f64,
    /// Concentrations of the balanced metabolites
    pub concentrations: DVector<f64>,
}

/// Accepted states of one (member, enzyme, direction) sweep.
///
/// The first point is always the reference state. A sweep that ran to
/// completion holds `n_steps + 1` points; an early stop leaves it shorter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub enzyme: usize,
    pub direction: Direction,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(enzyme: usize, direction: Direction, reference: TrajectoryPoint) -> Self {
        Self {
            enzyme,
            direction,
            points: vec![reference],
        }
    }

    pub fn push(&mut self, point: TrajectoryPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of steps accepted after the reference state
    pub fn completed_steps(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Reference enzyme level the sweep started from
    pub fn reference_level(&self) -> Option<f64> {
        self.points.first().map(|p| p.enzyme_level)
    }

    /// Enzyme level of the last accepted step, i.e. the feasible bound
    pub fn final_level(&self) -> Option<f64> {
        self.points.last().map(|p| p.enzyme_level)
    }

    /// The point after `step` accepted steps, if the sweep got that far
    pub fn point(&self, step: usize) -> Option<&TrajectoryPoint> {
        self.points.get(step)
    }
}

/// Both sweeps of one enzyme in one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeResponse {
    pub enzyme: usize,
    pub down: Trajectory,
    pub up: Trajectory,
}

impl EnzymeResponse {
    pub fn trajectory(&self, direction: Direction) -> &Trajectory {
        match direction {
            Direction::Down => &self.down,
            Direction::Up => &self.up,
        }
    }
}

/// All sweeps of one retained ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub member: usize,
    pub responses: Vec<EnzymeResponse>,
}

impl MemberResponse {
    pub fn response(&self, enzyme: usize) -> Option<&EnzymeResponse> {
        self.responses.iter().find(|r| r.enzyme == enzyme)
    }
}

/// Continuation results of a whole ensemble, ordered by member index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationResults {
    pub n_steps: usize,
    /// Reaction indices whose enzymes were swept
    pub enzymes: Vec<usize>,
    /// Members that passed the stability screen
    pub members: Vec<MemberResponse>,
    /// Members rejected at the reference state
    pub unstable: Vec<usize>,
}

impl PerturbationResults {
    /// Responses of every retained member to perturbing `enzyme`, in member order
    pub fn responses_for(&self, enzyme: usize) -> Vec<&EnzymeResponse> {
        self.members
            .iter()
            .filter_map(|m| m.response(enzyme))
            .collect()
    }

    pub fn n_retained(&self) -> usize {
        self.members.len()
    }
}
