//! Landmark types
//!
//! Normalized 2-D keypoints produced by the external hand/face detector. Points
//! are relative to the video frame in `[0,1]×[0,1]`; the optional depth
//! component is carried but never used by the engine.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};

// Hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Number of points in a hand landmark set
pub const HAND_POINTS: usize = 21;
/// Face mesh size without iris refinement
pub const FACE_POINTS: usize = 468;
/// Face mesh size with iris refinement
pub const FACE_POINTS_WITH_IRIS: usize = 478;

/// Face mesh indices
pub mod face_indices {
    /// Left eye contour in EAR order: outer, top 1, top 2, inner, bottom 2, bottom 1
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    /// Right eye contour in EAR order: inner, top 1, top 2, outer, bottom 2, bottom 1
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const RIGHT_IRIS_CENTER: usize = 473;
}

/// A single normalized keypoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Squared 2-D distance
    pub fn dist_sq(&self, other: &LandmarkPoint) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    /// Euclidean 2-D distance
    pub fn dist(&self, other: &LandmarkPoint) -> f64 {
        self.dist_sq(other).sqrt()
    }
}

/// The 21 keypoints of one detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LandmarkPoint>", into = "Vec<LandmarkPoint>")]
pub struct HandLandmarks([LandmarkPoint; HAND_POINTS]);

impl HandLandmarks {
    pub fn new(points: [LandmarkPoint; HAND_POINTS]) -> Self {
        Self(points)
    }

    pub fn point(&self, index: usize) -> &LandmarkPoint {
        &self.0[index]
    }

    pub fn points(&self) -> &[LandmarkPoint; HAND_POINTS] {
        &self.0
    }

    pub fn wrist(&self) -> &LandmarkPoint {
        &self.0[WRIST]
    }
}

impl TryFrom<Vec<LandmarkPoint>> for HandLandmarks {
    type Error = FlowError;

    fn try_from(points: Vec<LandmarkPoint>) -> Result<Self, Self::Error> {
        let len = points.len();
        let array: [LandmarkPoint; HAND_POINTS] = points.try_into().map_err(|_| {
            FlowError::InvalidLandmarks(format!(
                "hand set needs {HAND_POINTS} points, got {len}"
            ))
        })?;
        Ok(Self(array))
    }
}

impl From<HandLandmarks> for Vec<LandmarkPoint> {
    fn from(hand: HandLandmarks) -> Self {
        hand.0.to_vec()
    }
}

/// Face mesh keypoints (468, or 478 with iris refinement)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LandmarkPoint>", into = "Vec<LandmarkPoint>")]
pub struct FaceLandmarks(Vec<LandmarkPoint>);

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Result<Self, FlowError> {
        if points.len() < FACE_POINTS {
            return Err(FlowError::InvalidLandmarks(format!(
                "face set needs at least {FACE_POINTS} points, got {}",
                points.len()
            )));
        }
        Ok(Self(points))
    }

    pub fn point(&self, index: usize) -> &LandmarkPoint {
        &self.0[index]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the refined iris landmarks are available
    pub fn has_iris(&self) -> bool {
        self.0.len() > face_indices::RIGHT_IRIS_CENTER
    }
}

impl TryFrom<Vec<LandmarkPoint>> for FaceLandmarks {
    type Error = FlowError;

    fn try_from(points: Vec<LandmarkPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<FaceLandmarks> for Vec<LandmarkPoint> {
    fn from(face: FaceLandmarks) -> Self {
        face.0
    }
}

/// One frame of detector output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Zero, one or two detected hands
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
    /// At most one detected face
    #[serde(default)]
    pub face: Option<FaceLandmarks>,
}

impl Detection {
    /// A frame in which nothing was detected
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_requires_21_points() {
        let short = vec![LandmarkPoint::new(0.5, 0.5); 20];
        assert!(matches!(
            HandLandmarks::try_from(short),
            Err(FlowError::InvalidLandmarks(_))
        ));

        let full = vec![LandmarkPoint::new(0.5, 0.5); HAND_POINTS];
        assert!(HandLandmarks::try_from(full).is_ok());
    }

    #[test]
    fn test_face_iris_detection() {
        let plain = FaceLandmarks::new(vec![LandmarkPoint::default(); FACE_POINTS]).unwrap();
        assert!(!plain.has_iris());

        let iris =
            FaceLandmarks::new(vec![LandmarkPoint::default(); FACE_POINTS_WITH_IRIS]).unwrap();
        assert!(iris.has_iris());

        assert!(FaceLandmarks::new(vec![LandmarkPoint::default(); 10]).is_err());
    }

    #[test]
    fn test_detection_json_rejects_bad_hand() {
        let json = r#"{"hands": [[{"x": 0.1, "y": 0.2}]]}"#;
        assert!(Detection::from_json(json).is_err());
    }

    #[test]
    fn test_detection_json_defaults() {
        let detection = Detection::from_json("{}").unwrap();
        assert!(detection.hands.is_empty());
        assert!(detection.face.is_none());
    }

    #[test]
    fn test_distance() {
        let a = LandmarkPoint::new(0.0, 0.0);
        let b = LandmarkPoint::new(0.3, 0.4);
        assert!((a.dist(&b) - 0.5).abs() < 1e-12);
    }
}
