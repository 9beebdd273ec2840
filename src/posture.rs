//! Hand posture classification
//!
//! Tip-to-tip distances are divided by the hand scale (wrist to middle
//! fingertip), so the result does not depend on how large the hand appears.
//! A finger counts as extended when its tip is farther from the wrist than
//! its PIP joint.
//!
//! Postures are tested in a fixed order (Gyan, Prana, Apana, Surya, Varun) and
//! the first match is returned. The order is a tie-break policy for landmark
//! sets that satisfy several postures at once; it does not rank confidence.

use crate::config::PostureConfig;
use crate::landmarks::{
    HandLandmarks, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP,
    RING_TIP, THUMB_TIP, WRIST,
};
use crate::types::Posture;

/// Guards the hand scale against a degenerate (zero-size) hand
const SCALE_EPSILON: f64 = 1e-6;

/// Stateless posture classifier
#[derive(Debug, Clone, Default)]
pub struct PostureClassifier {
    config: PostureConfig,
}

impl PostureClassifier {
    pub fn new(config: PostureConfig) -> Self {
        Self { config }
    }

    /// Classify one hand. Returns the highest-priority matching posture.
    pub fn classify(&self, hand: &HandLandmarks) -> Option<Posture> {
        let geometry = HandGeometry::new(hand, self.config.proximity_threshold);
        Posture::SINGLE_HAND
            .into_iter()
            .find(|posture| geometry.matches(*posture))
    }

    /// Two-hand Namaste check on the first two hands.
    ///
    /// Compared in raw normalized frame units, not hand-scale units, so its
    /// sensitivity changes with distance from the camera.
    pub fn is_namaste(&self, hands: &[HandLandmarks]) -> bool {
        match hands {
            [first, second, ..] => first.wrist().dist(second.wrist()) < self.config.namaste_threshold,
            _ => false,
        }
    }

    /// Frame-level raw posture: Namaste wins, otherwise the first hand that matches
    pub fn classify_frame(&self, hands: &[HandLandmarks]) -> Option<Posture> {
        if self.is_namaste(hands) {
            return Some(Posture::Namaste);
        }
        hands.iter().find_map(|hand| self.classify(hand))
    }
}

struct HandGeometry<'a> {
    hand: &'a HandLandmarks,
    scale: f64,
    threshold: f64,
}

impl<'a> HandGeometry<'a> {
    fn new(hand: &'a HandLandmarks, threshold: f64) -> Self {
        let scale = hand.wrist().dist(hand.point(MIDDLE_TIP)) + SCALE_EPSILON;
        Self {
            hand,
            scale,
            threshold,
        }
    }

    /// Scale-normalized proximity of two landmarks
    fn close(&self, a: usize, b: usize) -> bool {
        self.hand.point(a).dist(self.hand.point(b)) / self.scale < self.threshold
    }

    fn extended(&self, tip: usize, pip: usize) -> bool {
        let wrist = self.hand.point(WRIST);
        self.hand.point(tip).dist_sq(wrist) > self.hand.point(pip).dist_sq(wrist)
    }

    fn folded(&self, tip: usize, pip: usize) -> bool {
        let wrist = self.hand.point(WRIST);
        self.hand.point(tip).dist_sq(wrist) < self.hand.point(pip).dist_sq(wrist)
    }

    fn matches(&self, posture: Posture) -> bool {
        match posture {
            // Thumb touches index, the other three fingers stay open
            Posture::Gyan => {
                self.close(THUMB_TIP, INDEX_TIP)
                    && self.extended(MIDDLE_TIP, MIDDLE_PIP)
                    && self.extended(RING_TIP, RING_PIP)
                    && self.extended(PINKY_TIP, PINKY_PIP)
            }
            Posture::Prana => {
                self.close(THUMB_TIP, RING_TIP)
                    && self.close(THUMB_TIP, PINKY_TIP)
                    && self.extended(INDEX_TIP, INDEX_PIP)
                    && self.extended(MIDDLE_TIP, MIDDLE_PIP)
            }
            Posture::Apana => {
                self.close(THUMB_TIP, MIDDLE_TIP)
                    && self.close(THUMB_TIP, RING_TIP)
                    && self.extended(INDEX_TIP, INDEX_PIP)
                    && self.extended(PINKY_TIP, PINKY_PIP)
            }
            // Ring finger folded under the thumb
            Posture::Surya => self.folded(RING_TIP, RING_PIP) && self.close(THUMB_TIP, RING_PIP),
            Posture::Varun => {
                self.close(THUMB_TIP, PINKY_TIP)
                    && self.extended(INDEX_TIP, INDEX_PIP)
                    && self.extended(MIDDLE_TIP, MIDDLE_PIP)
                    && self.extended(RING_TIP, RING_PIP)
            }
            Posture::Namaste => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic hands built from a wrist at (0.5, 0.8) with fingers pointing up.

    use crate::landmarks::{HandLandmarks, LandmarkPoint, HAND_POINTS};

    /// Column x offset of each finger (thumb, index, middle, ring, pinky)
    const FINGER_X: [f64; 5] = [-0.24, -0.10, 0.0, 0.10, 0.20];

    /// An open hand: every finger extended straight up
    pub fn open_hand() -> [LandmarkPoint; HAND_POINTS] {
        let mut points = [LandmarkPoint::new(0.5, 0.8); HAND_POINTS];
        for (finger, dx) in FINGER_X.iter().enumerate() {
            for joint in 0..4 {
                let index = 1 + finger * 4 + joint;
                let reach = 0.08 + 0.05 * joint as f64;
                points[index] = LandmarkPoint::new(0.5 + dx, 0.8 - reach);
            }
        }
        points
    }

    pub fn hand(points: [LandmarkPoint; HAND_POINTS]) -> HandLandmarks {
        HandLandmarks::new(points)
    }

    /// Bend the thumb so its tip lands on another landmark
    pub fn touch_thumb_to(points: &mut [LandmarkPoint; HAND_POINTS], target: usize) {
        points[4] = points[target];
    }

    /// Fold a finger so its tip sits between wrist and PIP
    pub fn fold(points: &mut [LandmarkPoint; HAND_POINTS], tip: usize) {
        let wrist = points[0];
        let mcp = points[tip - 3];
        points[tip] = LandmarkPoint::new((wrist.x + mcp.x) / 2.0, (wrist.y + mcp.y) / 2.0);
    }

    pub fn gyan() -> HandLandmarks {
        let mut p = open_hand();
        touch_thumb_to(&mut p, 8);
        hand(p)
    }

    pub fn prana() -> HandLandmarks {
        let mut p = open_hand();
        // Ring and pinky tips meet the thumb tip in the palm
        let meet = LandmarkPoint::new(0.55, 0.70);
        p[4] = meet;
        p[16] = meet;
        p[20] = LandmarkPoint::new(0.56, 0.70);
        hand(p)
    }

    pub fn apana() -> HandLandmarks {
        let mut p = open_hand();
        let meet = LandmarkPoint::new(0.52, 0.66);
        p[4] = meet;
        p[12] = meet;
        p[16] = LandmarkPoint::new(0.53, 0.66);
        hand(p)
    }

    pub fn surya() -> HandLandmarks {
        let mut p = open_hand();
        fold(&mut p, 16);
        touch_thumb_to(&mut p, 14);
        hand(p)
    }

    pub fn varun() -> HandLandmarks {
        let mut p = open_hand();
        touch_thumb_to(&mut p, 20);
        hand(p)
    }

    /// Translate a hand so its wrist sits at (x, y)
    pub fn moved_to(hand: &HandLandmarks, x: f64, y: f64) -> HandLandmarks {
        let wrist = *hand.wrist();
        let mut points = *hand.points();
        for p in points.iter_mut() {
            p.x += x - wrist.x;
            p.y += y - wrist.y;
        }
        HandLandmarks::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::landmarks::LandmarkPoint;
    use proptest::prelude::*;

    fn classifier() -> PostureClassifier {
        PostureClassifier::default()
    }

    #[test]
    fn test_open_hand_is_no_posture() {
        assert_eq!(classifier().classify(&hand(open_hand())), None);
    }

    #[test]
    fn test_each_posture_is_recognized() {
        let c = classifier();
        assert_eq!(c.classify(&gyan()), Some(Posture::Gyan));
        assert_eq!(c.classify(&prana()), Some(Posture::Prana));
        assert_eq!(c.classify(&apana()), Some(Posture::Apana));
        assert_eq!(c.classify(&surya()), Some(Posture::Surya));
        assert_eq!(c.classify(&varun()), Some(Posture::Varun));
    }

    #[test]
    fn test_priority_tie_break() {
        // Index and pinky tips crossed above the palm with the thumb tip between
        // them, so both the Gyan and Varun checks hold.
        let mut p = open_hand();
        p[8] = LandmarkPoint::new(0.49, 0.45);
        p[20] = LandmarkPoint::new(0.51, 0.45);
        p[4] = LandmarkPoint::new(0.50, 0.45);
        let h = hand(p);
        let geometry = HandGeometry::new(&h, 0.35);
        assert!(geometry.matches(Posture::Gyan));
        assert!(geometry.matches(Posture::Varun));

        let c = classifier();
        for _ in 0..10 {
            assert_eq!(c.classify(&h), Some(Posture::Gyan));
        }
    }

    #[test]
    fn test_namaste_uses_raw_wrist_distance() {
        let c = classifier();
        let left = moved_to(&hand(open_hand()), 0.45, 0.8);
        let right = moved_to(&hand(open_hand()), 0.55, 0.8);
        assert!(c.is_namaste(&[left.clone(), right]));

        let far = moved_to(&hand(open_hand()), 0.9, 0.8);
        assert!(!c.is_namaste(&[left.clone(), far]));
        assert!(!c.is_namaste(&[left]));
    }

    #[test]
    fn test_frame_namaste_overrides_single_hand() {
        let c = classifier();
        let a = moved_to(&gyan(), 0.45, 0.8);
        let b = moved_to(&varun(), 0.55, 0.8);
        assert_eq!(c.classify_frame(&[a, b]), Some(Posture::Namaste));
    }

    #[test]
    fn test_frame_first_matching_hand_wins() {
        let c = classifier();
        let a = moved_to(&hand(open_hand()), 0.2, 0.8);
        let b = moved_to(&varun(), 0.8, 0.8);
        assert_eq!(c.classify_frame(&[a, b]), Some(Posture::Varun));
        assert_eq!(c.classify_frame(&[]), None);
    }

    fn scaled_about_wrist(hand: &HandLandmarks, factor: f64) -> HandLandmarks {
        let wrist = *hand.wrist();
        let mut points = *hand.points();
        for p in points.iter_mut() {
            p.x = wrist.x + (p.x - wrist.x) * factor;
            p.y = wrist.y + (p.y - wrist.y) * factor;
        }
        HandLandmarks::new(points)
    }

    proptest! {
        #[test]
        fn prop_hand_scale_invariance(factor in 0.2f64..3.0, which in 0usize..6) {
            let hands = [hand(open_hand()), gyan(), prana(), apana(), surya(), varun()];
            let original = &hands[which];
            let c = classifier();
            prop_assert_eq!(c.classify(original), c.classify(&scaled_about_wrist(original, factor)));
        }
    }
}
