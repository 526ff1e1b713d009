//! Dubins path planner
//!
//! Shortest forward-only path between two poses for a vehicle with a
//! bounded turning radius. Every such path is one of six words made of
//! left arcs (L), right arcs (R) and straight lines (S).

use std::f64::consts::PI;
use std::fmt;

use crate::common::{PlanningError, PlanningResult, Pose2D};

/// Tolerance under which two candidate words count as equally long
const WORD_TIE_EPSILON: f64 = 1e-12;
/// Positions and headings closer than this are treated as the same pose
const COINCIDENT_POSE_EPSILON: f64 = 1e-12;
/// Rounding slack on the feasibility conditions of tangent-touching words
const FEASIBILITY_EPSILON: f64 = 1e-10;

/// Wrap an angle to [0, 2pi), snapping values just below 2pi to 0
fn mod2pi(theta: f64) -> f64 {
    let v = theta.rem_euclid(2.0 * PI);
    if v > 2.0 * PI - 1e-10 {
        0.0
    } else {
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    Left,
    Straight,
    Right,
}

impl SegmentType {
    pub fn as_char(&self) -> char {
        match self {
            SegmentType::Left => 'L',
            SegmentType::Straight => 'S',
            SegmentType::Right => 'R',
        }
    }
}

/// The six Dubins words, declared in tie-break priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DubinsWord {
    LSL,
    RSR,
    LSR,
    RSL,
    RLR,
    LRL,
}

impl DubinsWord {
    pub const ALL: [DubinsWord; 6] = [
        DubinsWord::LSL,
        DubinsWord::RSR,
        DubinsWord::LSR,
        DubinsWord::RSL,
        DubinsWord::RLR,
        DubinsWord::LRL,
    ];

    pub fn segment_types(&self) -> [SegmentType; 3] {
        use SegmentType::*;
        match self {
            DubinsWord::LSL => [Left, Straight, Left],
            DubinsWord::RSR => [Right, Straight, Right],
            DubinsWord::LSR => [Left, Straight, Right],
            DubinsWord::RSL => [Right, Straight, Left],
            DubinsWord::RLR => [Right, Left, Right],
            DubinsWord::LRL => [Left, Right, Left],
        }
    }

    /// Segment lengths (t, p, q) in units of the turning radius, `None` if infeasible
    ///
    /// `alpha` and `beta` are the start and goal headings relative to the
    /// start→goal direction, `d` the distance divided by the turning radius.
    fn normalized_lengths(&self, alpha: f64, beta: f64, d: f64) -> Option<[f64; 3]> {
        let (sa, sb) = (alpha.sin(), beta.sin());
        let (ca, cb) = (alpha.cos(), beta.cos());
        let c_ab = (alpha - beta).cos();

        match self {
            DubinsWord::LSL => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sa - sb);
                if p_sq < -FEASIBILITY_EPSILON {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let tmp = (cb - ca).atan2(d + sa - sb);
                Some([mod2pi(-alpha + tmp), p_sq.sqrt(), mod2pi(beta - tmp)])
            }
            DubinsWord::RSR => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sb - sa);
                if p_sq < -FEASIBILITY_EPSILON {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let tmp = (ca - cb).atan2(d - sa + sb);
                Some([mod2pi(alpha - tmp), p_sq.sqrt(), mod2pi(-beta + tmp)])
            }
            DubinsWord::LSR => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab + 2.0 * d * (sa + sb);
                if p_sq < -FEASIBILITY_EPSILON {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let p = p_sq.sqrt();
                let tmp = (-ca - cb).atan2(d + sa + sb) - (-2.0f64).atan2(p);
                Some([mod2pi(-alpha + tmp), p, mod2pi(-beta + tmp)])
            }
            DubinsWord::RSL => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab - 2.0 * d * (sa + sb);
                if p_sq < -FEASIBILITY_EPSILON {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let p = p_sq.sqrt();
                let tmp = (ca + cb).atan2(d - sa - sb) - 2.0f64.atan2(p);
                Some([mod2pi(alpha - tmp), p, mod2pi(beta - tmp)])
            }
            DubinsWord::RLR => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sa - sb)) / 8.0;
                if tmp.abs() > 1.0 + FEASIBILITY_EPSILON {
                    return None;
                }
                let tmp = tmp.clamp(-1.0, 1.0);
                let p = mod2pi(2.0 * PI - tmp.acos());
                let t = mod2pi(alpha - (ca - cb).atan2(d - sa + sb) + p / 2.0);
                Some([t, p, mod2pi(alpha - beta - t + p)])
            }
            DubinsWord::LRL => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sb - sa)) / 8.0;
                if tmp.abs() > 1.0 + FEASIBILITY_EPSILON {
                    return None;
                }
                let tmp = tmp.clamp(-1.0, 1.0);
                let p = mod2pi(2.0 * PI - tmp.acos());
                let t = mod2pi(-alpha - (ca - cb).atan2(d + sa - sb) + p / 2.0);
                Some([t, p, mod2pi(beta - alpha - t + p)])
            }
        }
    }
}

impl fmt::Display for DubinsWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word: String = self.segment_types().iter().map(|s| s.as_char()).collect();
        write!(f, "{}", word)
    }
}

/// One primitive of a Dubins path, `length` is arc length in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DubinsSegment {
    pub kind: SegmentType,
    pub length: f64,
}

/// Move `pose` by arc length `s` along one primitive of turning radius `rho`
pub fn propagate(pose: &Pose2D, kind: SegmentType, s: f64, rho: f64) -> Pose2D {
    let (x, y, yaw) = (pose.x, pose.y, pose.yaw);
    match kind {
        SegmentType::Straight => Pose2D::new(x + s * yaw.cos(), y + s * yaw.sin(), yaw),
        SegmentType::Left => {
            let new_yaw = yaw + s / rho;
            Pose2D::new(
                x + rho * (new_yaw.sin() - yaw.sin()),
                y + rho * (yaw.cos() - new_yaw.cos()),
                new_yaw,
            )
        }
        SegmentType::Right => {
            let new_yaw = yaw - s / rho;
            Pose2D::new(
                x + rho * (yaw.sin() - new_yaw.sin()),
                y + rho * (new_yaw.cos() - yaw.cos()),
                new_yaw,
            )
        }
    }
}

/// A Dubins path: up to three segments from `start` to `end`
#[derive(Debug, Clone, PartialEq)]
pub struct DubinsPath {
    start: Pose2D,
    end: Pose2D,
    rho: f64,
    word: DubinsWord,
    segments: Vec<DubinsSegment>,
    length: f64,
}

impl DubinsPath {
    fn from_word(start: Pose2D, end: Pose2D, rho: f64, word: DubinsWord, lengths: [f64; 3]) -> Self {
        let segments: Vec<DubinsSegment> = word
            .segment_types()
            .iter()
            .zip(lengths.iter())
            .map(|(&kind, &l)| DubinsSegment { kind, length: l * rho })
            .collect();
        let length = segments.iter().map(|s| s.length).sum();
        DubinsPath { start, end, rho, word, segments, length }
    }

    pub fn start(&self) -> Pose2D {
        self.start
    }

    pub fn end(&self) -> Pose2D {
        self.end
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn word(&self) -> DubinsWord {
        self.word
    }

    pub fn segments(&self) -> &[DubinsSegment] {
        &self.segments
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Pose after travelling arc length `s` (clamped to [0, length]) from the start
    pub fn pose_at(&self, s: f64) -> Pose2D {
        let mut remaining = s.clamp(0.0, self.length);
        let mut pose = self.start;
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            if remaining <= segment.length || i == last {
                return propagate(&pose, segment.kind, remaining.min(segment.length), self.rho);
            }
            pose = propagate(&pose, segment.kind, segment.length, self.rho);
            remaining -= segment.length;
        }
        pose
    }

    /// Prefix of this path with length `max_len`
    ///
    /// Returns the whole path unchanged if it is already short enough. The
    /// end pose of a truncated path is recomputed by propagation.
    pub fn truncated(&self, max_len: f64) -> DubinsPath {
        if max_len >= self.length {
            return self.clone();
        }
        let max_len = max_len.max(0.0);

        let mut segments = Vec::with_capacity(self.segments.len());
        let mut remaining = max_len;
        for segment in &self.segments {
            if remaining <= 0.0 {
                break;
            }
            let length = segment.length.min(remaining);
            segments.push(DubinsSegment { kind: segment.kind, length });
            remaining -= length;
        }

        DubinsPath {
            start: self.start,
            end: self.pose_at(max_len),
            rho: self.rho,
            word: self.word,
            segments,
            length: max_len,
        }
    }

    /// Sampled poses at arc length 0, step, 2*step, ... then the exact end pose
    ///
    /// The iterator is lazy and can be cloned to restart. A non-positive
    /// `step` yields only the start and end poses.
    pub fn poses(&self, step: f64) -> DubinsPoses<'_> {
        DubinsPoses { path: self, step, index: 0, finished: false }
    }
}

/// Iterator over sampled poses of a [`DubinsPath`]
#[derive(Debug, Clone)]
pub struct DubinsPoses<'a> {
    path: &'a DubinsPath,
    step: f64,
    index: usize,
    finished: bool,
}

impl<'a> Iterator for DubinsPoses<'a> {
    type Item = Pose2D;

    fn next(&mut self) -> Option<Pose2D> {
        if self.finished {
            return None;
        }
        let index = self.index;
        self.index += 1;

        if index == 0 {
            return Some(self.path.start);
        }
        let s = index as f64 * self.step;
        if self.step > 0.0 && s < self.path.length {
            Some(self.path.pose_at(s))
        } else {
            self.finished = true;
            Some(self.path.end)
        }
    }
}

/// Every feasible Dubins word between two poses, in priority order
pub fn candidate_paths(start: &Pose2D, goal: &Pose2D, rho: f64) -> PlanningResult<Vec<DubinsPath>> {
    if !rho.is_finite() || rho <= 0.0 {
        return Err(PlanningError::InvalidParameter(format!(
            "turning radius must be finite and positive, got {}",
            rho
        )));
    }
    if !start.is_finite() || !goal.is_finite() {
        return Err(PlanningError::InvalidParameter(
            "start and goal poses must be finite".to_string(),
        ));
    }

    let dx = goal.x - start.x;
    let dy = goal.y - start.y;
    let dist = dx.hypot(dy);

    let heading_gap = (goal.yaw - start.yaw).sin().abs() + (1.0 - (goal.yaw - start.yaw).cos());
    if dist <= COINCIDENT_POSE_EPSILON && heading_gap <= COINCIDENT_POSE_EPSILON {
        return Ok(vec![DubinsPath::from_word(*start, *goal, rho, DubinsWord::LSL, [0.0; 3])]);
    }

    let d = dist / rho;
    let theta = mod2pi(dy.atan2(dx));
    let alpha = mod2pi(start.yaw - theta);
    let beta = mod2pi(goal.yaw - theta);

    Ok(DubinsWord::ALL
        .iter()
        .filter_map(|&word| {
            word.normalized_lengths(alpha, beta, d)
                .filter(|lengths| lengths.iter().all(|l| l.is_finite()))
                .map(|lengths| DubinsPath::from_word(*start, *goal, rho, word, lengths))
        })
        .collect())
}

/// Shortest Dubins path from `start` to `goal` with turning radius `rho`
///
/// Equal-length words are resolved by the order of [`DubinsWord::ALL`].
pub fn shortest_path(start: &Pose2D, goal: &Pose2D, rho: f64) -> PlanningResult<DubinsPath> {
    let mut best: Option<DubinsPath> = None;
    for path in candidate_paths(start, goal, rho)? {
        let better = match &best {
            Some(b) => path.length < b.length - WORD_TIE_EPSILON,
            None => true,
        };
        if better {
            best = Some(path);
        }
    }
    best.ok_or(PlanningError::NoPathExists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_pose_eq(a: &Pose2D, b: &Pose2D, tol: f64) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = tol);
        assert_abs_diff_eq!(a.y, b.y, epsilon = tol);
        assert_abs_diff_eq!((a.yaw - b.yaw).sin(), 0.0, epsilon = tol);
        assert!((a.yaw - b.yaw).cos() > 0.0);
    }

    #[test]
    fn test_straight_line() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(5.0, 0.0, 0.0);
        let path = shortest_path(&start, &goal, 1.0).unwrap();
        assert_eq!(path.word(), DubinsWord::LSL);
        assert_abs_diff_eq!(path.length(), 5.0, epsilon = 1e-9);
        assert_pose_eq(&path.pose_at(2.5), &Pose2D::new(2.5, 0.0, 0.0), 1e-9);
    }

    #[test]
    fn test_quarter_turn_left() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(1.0, 1.0, PI / 2.0);
        let path = shortest_path(&start, &goal, 1.0).unwrap();
        assert_abs_diff_eq!(path.length(), PI / 2.0, epsilon = 1e-6);
        assert_pose_eq(&path.pose_at(path.length()), &goal, 1e-6);
        let mid = path.pose_at(PI / 4.0);
        assert_abs_diff_eq!(mid.x, (PI / 4.0).sin(), epsilon = 1e-6);
        assert_abs_diff_eq!(mid.y, 1.0 - (PI / 4.0).cos(), epsilon = 1e-6);
    }

    #[test]
    fn test_reversed_heading_uses_turns() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(0.0, 0.0, PI);
        let path = shortest_path(&start, &goal, 1.0).unwrap();
        assert!(path.length() > 0.0);
        assert_pose_eq(&path.pose_at(path.length()), &goal, 1e-9);
    }

    #[test]
    fn test_all_candidates_reach_goal() {
        let start = Pose2D::new(1.0, -2.0, 0.7);
        let goal = Pose2D::new(-1.5, 0.5, -2.3);
        let candidates = candidate_paths(&start, &goal, 0.8).unwrap();
        assert!(!candidates.is_empty());
        for path in &candidates {
            assert_pose_eq(&path.pose_at(path.length()), &goal, 1e-7);
        }
        let shortest = shortest_path(&start, &goal, 0.8).unwrap();
        assert!(candidates.iter().all(|p| p.length() >= shortest.length() - 1e-12));
    }

    #[test]
    fn test_coincident_poses_give_zero_length() {
        let pose = Pose2D::new(3.0, 4.0, 1.0);
        let path = shortest_path(&pose, &pose, 1.0).unwrap();
        assert_eq!(path.length(), 0.0);
        let samples: Vec<Pose2D> = path.poses(0.1).collect();
        assert_eq!(samples, vec![pose, pose]);
    }

    #[test]
    fn test_invalid_turning_radius() {
        let a = Pose2D::origin();
        let b = Pose2D::new(1.0, 0.0, 0.0);
        assert!(matches!(shortest_path(&a, &b, 0.0), Err(PlanningError::InvalidParameter(_))));
        assert!(matches!(shortest_path(&a, &b, f64::NAN), Err(PlanningError::InvalidParameter(_))));
        let bad = Pose2D::new(f64::NAN, 0.0, 0.0);
        assert!(matches!(shortest_path(&bad, &b, 1.0), Err(PlanningError::InvalidParameter(_))));
    }

    #[test]
    fn test_truncated_path() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(4.0, 3.0, PI / 2.0);
        let path = shortest_path(&start, &goal, 1.0).unwrap();

        let short = path.truncated(1.5);
        assert_abs_diff_eq!(short.length(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(short.segments().iter().map(|s| s.length).sum::<f64>(), 1.5, epsilon = 1e-12);
        assert_pose_eq(&short.end(), &path.pose_at(1.5), 1e-12);
        assert_eq!(short.start(), path.start());

        assert_eq!(path.truncated(100.0), path);
        assert_eq!(path.truncated(-1.0).length(), 0.0);
    }

    #[test]
    fn test_poses_sampling() {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let goal = Pose2D::new(1.0, 0.0, 0.0);
        let path = shortest_path(&start, &goal, 1.0).unwrap();

        let iter = path.poses(0.3);
        let samples: Vec<Pose2D> = iter.clone().collect();
        // 0.0, 0.3, 0.6, 0.9 and the end
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], start);
        assert_eq!(*samples.last().unwrap(), goal);
        assert_abs_diff_eq!(samples[2].x, 0.6, epsilon = 1e-12);

        // restartable
        assert_eq!(iter.collect::<Vec<_>>(), samples);
        assert_eq!(path.poses(0.0).count(), 2);
    }

    fn length_of(candidates: &[DubinsPath], word: DubinsWord) -> f64 {
        candidates.iter().find(|p| p.word() == word).map(|p| p.length()).unwrap()
    }

    #[test]
    fn test_equal_length_words_follow_priority() {
        let start = Pose2D::new(0.0, 0.0, 0.0);

        // LSR and RSL mirror each other here with different segment lengths
        let goal = Pose2D::new(3.0, 0.0, PI);
        let candidates = candidate_paths(&start, &goal, 1.0).unwrap();
        let lsr = length_of(&candidates, DubinsWord::LSR);
        assert_abs_diff_eq!(lsr, length_of(&candidates, DubinsWord::RSL), epsilon = 1e-12);
        let best = shortest_path(&start, &goal, 1.0).unwrap();
        assert_eq!(best.word(), DubinsWord::LSR);
        assert_abs_diff_eq!(best.length(), 6.837115943543516, epsilon = 1e-9);

        // RLR and LRL differ only by rounding; the earlier word wins
        let goal = Pose2D::new(1.0, 0.0, PI);
        let candidates = candidate_paths(&start, &goal, 1.0).unwrap();
        let rlr = length_of(&candidates, DubinsWord::RLR);
        assert_abs_diff_eq!(rlr, length_of(&candidates, DubinsWord::LRL), epsilon = 1e-12);
        let best = shortest_path(&start, &goal, 1.0).unwrap();
        assert_eq!(best.word(), DubinsWord::RLR);
        for candidate in &candidates {
            assert!(best.length() <= candidate.length() + 1e-12);
        }
    }

    #[test]
    fn test_word_display() {
        assert_eq!(DubinsWord::LSR.to_string(), "LSR");
        assert_eq!(DubinsWord::RLR.to_string(), "RLR");
        assert!(DubinsWord::LSL < DubinsWord::LRL);
    }
}
