use crate::config::DetectionSettings;
use crate::detect::result::{Detection, Prediction};

const SCORE_WEIGHT: f32 = 0.6;
const AREA_WEIGHT: f32 = 0.4;
/// Box area is normalized against one megapixel.
const AREA_NORMALIZER: f32 = 1_000_000.0;

/// Doorway candidate predicate and selector.
///
/// A prediction survives when its class is relevant, its score reaches
/// `min_confidence`, both sides lie in `[min_size, max_size]`, and its
/// height/width ratio lies in `[min_aspect_ratio, max_aspect_ratio]`.
#[derive(Clone, Debug)]
pub struct DoorwayFilter {
    relevant_classes: Vec<String>,
    min_confidence: f32,
    min_size: f32,
    max_size: f32,
    min_aspect_ratio: f32,
    max_aspect_ratio: f32,
}

impl DoorwayFilter {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            relevant_classes: settings
                .relevant_classes
                .iter()
                .map(|c| c.to_lowercase())
                .collect(),
            min_confidence: settings.min_confidence,
            min_size: settings.min_size,
            max_size: settings.max_size,
            min_aspect_ratio: settings.min_aspect_ratio,
            max_aspect_ratio: settings.max_aspect_ratio,
        }
    }

    pub fn is_relevant_class(&self, class: &str) -> bool {
        let class = class.to_lowercase();
        self.relevant_classes.iter().any(|c| *c == class)
    }

    /// Full predicate over an already-built detection.
    pub fn accepts(&self, det: &Detection) -> bool {
        if !self.is_relevant_class(&det.class) {
            return false;
        }
        if det.score.is_nan() || det.score < self.min_confidence {
            return false;
        }
        let (w, h) = (det.bbox.width, det.bbox.height);
        let size_ok = |v: f32| v >= self.min_size && v <= self.max_size;
        if !size_ok(w) || !size_ok(h) {
            return false;
        }
        let aspect = h / w;
        aspect >= self.min_aspect_ratio && aspect <= self.max_aspect_ratio
    }

    /// Keep doorway candidates, in detector order.
    pub fn filter(&self, predictions: &[Prediction]) -> Vec<Detection> {
        predictions
            .iter()
            .map(Detection::from)
            .filter(|det| self.accepts(det))
            .collect()
    }

    /// `0.6 * score + 0.4 * area / 1e6`.
    pub fn rank(det: &Detection) -> f32 {
        SCORE_WEIGHT * det.score + AREA_WEIGHT * det.bbox.area() / AREA_NORMALIZER
    }

    /// Highest-ranked candidate; the first one wins ties.
    pub fn select_best(candidates: &[Detection]) -> Option<&Detection> {
        let mut best: Option<(&Detection, f32)> = None;
        for det in candidates {
            let rank = Self::rank(det);
            match best {
                Some((_, best_rank)) if rank <= best_rank => {}
                _ => best = Some((det, rank)),
            }
        }
        best.map(|(det, _)| det)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArConfig;
    use crate::detect::result::BoundingBox;

    fn filter() -> DoorwayFilter {
        DoorwayFilter::new(&ArConfig::default().detection)
    }

    fn tall(class: &str, score: f32) -> Prediction {
        Prediction::new(class, score, [10.0, 10.0, 200.0, 400.0])
    }

    #[test]
    fn irrelevant_classes_are_dropped_regardless_of_score() {
        let kept = filter().filter(&[tall("car", 0.99), tall("door", 0.6)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class, "door");
    }

    #[test]
    fn class_match_ignores_case() {
        assert!(filter().is_relevant_class("Person"));
        assert!(!filter().is_relevant_class("doorway"));
    }

    #[test]
    fn low_scores_are_dropped() {
        let f = filter();
        assert!(f.filter(&[tall("door", 0.49)]).is_empty());
        assert_eq!(f.filter(&[tall("door", 0.5)]).len(), 1);
    }

    #[test]
    fn size_bounds_apply_to_both_sides() {
        let f = filter();
        let narrow = Prediction::new("door", 0.9, [0.0, 0.0, 40.0, 100.0]);
        let huge = Prediction::new("door", 0.9, [0.0, 0.0, 1000.0, 2500.0]);
        assert!(f.filter(&[narrow, huge]).is_empty());
    }

    #[test]
    fn aspect_ratio_bounds_apply() {
        let f = filter();
        let square = Prediction::new("door", 0.9, [0.0, 0.0, 200.0, 200.0]);
        let sliver = Prediction::new("door", 0.9, [0.0, 0.0, 60.0, 300.0]);
        let door = Prediction::new("door", 0.9, [0.0, 0.0, 100.0, 240.0]);
        let kept = f.filter(&[square, sliver, door]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].aspect_ratio, 2.4);
    }

    #[test]
    fn selection_weighs_score_over_area() {
        let a = Detection::new(
            "door",
            0.9,
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
            },
        );
        let b = Detection::new(
            "door",
            0.5,
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 300.0,
                height: 300.0,
            },
        );
        assert!((DoorwayFilter::rank(&a) - 0.544).abs() < 1e-6);
        assert!((DoorwayFilter::rank(&b) - 0.336).abs() < 1e-6);
        let candidates = [b, a];
        let best = DoorwayFilter::select_best(&candidates).unwrap();
        assert_eq!(best.score, 0.9);
    }

    #[test]
    fn ties_keep_first_encountered() {
        let first = Detection::new(
            "door",
            0.8,
            BoundingBox {
                x: 1.0,
                y: 0.0,
                width: 100.0,
                height: 200.0,
            },
        );
        let mut second = first.clone();
        second.bbox.x = 2.0;
        let candidates = [first, second];
        let best = DoorwayFilter::select_best(&candidates).unwrap();
        assert_eq!(best.bbox.x, 1.0);
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(DoorwayFilter::select_best(&[]).is_none());
    }
}
