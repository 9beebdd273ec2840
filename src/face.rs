//! Face state analysis
//!
//! Eye closure comes from the Eye Aspect Ratio (EAR): eye-opening height over
//! width, averaged over both eyes. Gaze is the iris offset from the eye-corner
//! midpoint divided by half the eye width. Both are ratios, so neither needs
//! calibration for face size or camera distance.

use crate::config::FaceConfig;
use crate::landmarks::{face_indices, FaceLandmarks, LandmarkPoint};
use serde::{Deserialize, Serialize};

/// Per-frame face reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceState {
    pub avg_ear: f64,
    pub eyes_closed: bool,
    /// Signed horizontal gaze deflection, 0 without iris landmarks
    pub gaze_x: f64,
}

/// Stateless face analyzer
#[derive(Debug, Clone, Default)]
pub struct FaceAnalyzer {
    config: FaceConfig,
}

impl FaceAnalyzer {
    pub fn new(config: FaceConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, face: &FaceLandmarks) -> FaceState {
        let left = eye_aspect_ratio(&face_indices::LEFT_EYE.map(|i| *face.point(i)));
        let right = eye_aspect_ratio(&face_indices::RIGHT_EYE.map(|i| *face.point(i)));
        let avg_ear = (left + right) / 2.0;

        FaceState {
            avg_ear,
            eyes_closed: avg_ear < self.config.ear_threshold,
            gaze_x: self.gaze_deflection(face),
        }
    }

    fn gaze_deflection(&self, face: &FaceLandmarks) -> f64 {
        if !face.has_iris() {
            return 0.0;
        }

        let inner = face.point(face_indices::RIGHT_EYE_INNER);
        let outer = face.point(face_indices::RIGHT_EYE_OUTER);
        let iris = face.point(face_indices::RIGHT_IRIS_CENTER);

        let width = inner.dist(outer);
        if width <= 0.0 {
            return 0.0;
        }

        let center_x = (inner.x + outer.x) / 2.0;
        (iris.x - center_x) / (width / 2.0) * self.config.gaze_sensitivity
    }
}

/// EAR of one eye given its six contour points
///
/// Order: corner, top 1, top 2, opposite corner, bottom 2, bottom 1.
pub fn eye_aspect_ratio(eye: &[LandmarkPoint; 6]) -> f64 {
    let vertical_1 = eye[1].dist(&eye[5]);
    let vertical_2 = eye[2].dist(&eye[4]);
    let horizontal = eye[0].dist(&eye[3]);
    if horizontal <= 0.0 {
        return 0.0;
    }
    (vertical_1 + vertical_2) / (2.0 * horizontal)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::landmarks::FACE_POINTS_WITH_IRIS;

    #[test]
    fn test_open_and_closed_eyes() {
        let analyzer = FaceAnalyzer::default();

        let open = analyzer.analyze(&open_face());
        assert!((open.avg_ear - 0.5).abs() < 1e-9);
        assert!(!open.eyes_closed);

        let closed = analyzer.analyze(&closed_face());
        assert!((closed.avg_ear - 0.1).abs() < 1e-9);
        assert!(closed.eyes_closed);
    }

    #[test]
    fn test_ear_monotonic_and_threshold_crossing() {
        let analyzer = FaceAnalyzer::default();
        let mut previous = f64::INFINITY;
        let mut crossed_at = None;

        for step in (0..=60).rev() {
            let opening = step as f64 * 0.001;
            let state = analyzer.analyze(&face_with_opening(opening, false));
            assert!(state.avg_ear < previous);
            previous = state.avg_ear;
            if state.eyes_closed && crossed_at.is_none() {
                crossed_at = Some(opening);
            }
        }

        // EAR = 10 × opening, so eyes close around an opening of 0.03
        let crossed_at = crossed_at.unwrap();
        assert!((crossed_at - 0.03).abs() < 0.0015);
    }

    #[test]
    fn test_gaze_requires_iris() {
        let analyzer = FaceAnalyzer::default();
        assert_eq!(analyzer.analyze(&open_face()).gaze_x, 0.0);
    }

    #[test]
    fn test_gaze_deflection() {
        let analyzer = FaceAnalyzer::default();
        let mut points: Vec<_> = face_with_opening(0.05, true).into();
        assert_eq!(points.len(), FACE_POINTS_WITH_IRIS);

        // Right eye corners at 0.55 and 0.65; iris shifted 0.01 right of center
        points[face_indices::RIGHT_IRIS_CENTER].x = 0.61;
        let face = FaceLandmarks::new(points).unwrap();
        let state = analyzer.analyze(&face);
        assert!((state.gaze_x - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_eye() {
        let eye = [LandmarkPoint::default(); 6];
        assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }
}
