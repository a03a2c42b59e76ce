use std::{collections::VecDeque, time::Instant};

use crate::types::{BreathingPattern, MarkerPair};

/// Mean difference past which chest and abdomen are considered out of step.
const ASYNC_THRESHOLD: f32 = 5.0;

/// Rolling chest/abdomen displacement magnitudes. Both channels are pushed and
/// evicted together so they always have the same length.
#[derive(Clone, Debug)]
pub struct MovementHistory {
    capacity: usize,
    chest: VecDeque<u32>,
    abdomen: VecDeque<u32>,
}

impl MovementHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chest: VecDeque::with_capacity(capacity + 1),
            abdomen: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, chest: u32, abdomen: u32) {
        self.chest.push_back(chest);
        self.abdomen.push_back(abdomen);

        while self.chest.len() > self.capacity {
            self.chest.pop_front();
            self.abdomen.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.chest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chest.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn chest_mean(&self) -> f32 {
        mean(&self.chest)
    }

    pub fn abdomen_mean(&self) -> f32 {
        mean(&self.abdomen)
    }

    #[allow(dead_code)]
    pub fn chest(&self) -> impl Iterator<Item = u32> + '_ {
        self.chest.iter().copied()
    }

    #[allow(dead_code)]
    pub fn abdomen(&self) -> impl Iterator<Item = u32> + '_ {
        self.abdomen.iter().copied()
    }

    pub fn clear(&mut self) {
        self.chest.clear();
        self.abdomen.clear();
    }
}

fn mean(values: &VecDeque<u32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f32).sum::<f32>() / values.len() as f32
}

/// Rule set applied to the two rolling means.
///
/// The asynchronous branch can never fire: any pair of unequal means is
/// already claimed by the first two rules. It is kept so the reachable
/// outcomes stay exactly as they are.
pub fn classify_means(chest: f32, abdomen: f32) -> BreathingPattern {
    if abdomen > chest {
        BreathingPattern::Diaphragmatic
    } else if chest > abdomen {
        BreathingPattern::ChestShallow
    } else if (chest - abdomen).abs() > ASYNC_THRESHOLD {
        BreathingPattern::Asynchronous
    } else {
        BreathingPattern::Normal
    }
}

pub struct BreathingClassifier {
    previous: Option<MarkerPair>,
    history: MovementHistory,
    last_warning: Option<Instant>,
}

impl BreathingClassifier {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            previous: None,
            history: MovementHistory::with_capacity(history_capacity),
            last_warning: None,
        }
    }

    pub fn observe(&mut self, current: MarkerPair, now: Instant) -> BreathingPattern {
        if let Some(previous) = self.previous {
            let chest = current.chest.y.abs_diff(previous.chest.y);
            let abdomen = current.abdomen.y.abs_diff(previous.abdomen.y);
            self.history.push(chest, abdomen);
        }
        self.previous = Some(current);

        let pattern = classify_means(self.history.chest_mean(), self.history.abdomen_mean());
        if pattern == BreathingPattern::Asynchronous {
            self.last_warning = Some(now);
        }
        pattern
    }

    pub fn history(&self) -> &MovementHistory {
        &self.history
    }

    #[allow(dead_code)]
    pub fn previous(&self) -> Option<MarkerPair> {
        self.previous
    }

    #[allow(dead_code)]
    pub fn last_warning(&self) -> Option<Instant> {
        self.last_warning
    }

    #[allow(dead_code)]
    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
        self.last_warning = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::HISTORY_CAPACITY, types::MarkerPosition};

    fn pair(chest_y: i32, abdomen_y: i32) -> MarkerPair {
        MarkerPair {
            chest: MarkerPosition::new(50, chest_y),
            abdomen: MarkerPosition::new(50, abdomen_y),
        }
    }

    #[test]
    fn rules_follow_the_means() {
        assert_eq!(classify_means(1.0, 3.0), BreathingPattern::Diaphragmatic);
        assert_eq!(classify_means(3.0, 1.0), BreathingPattern::ChestShallow);
        assert_eq!(classify_means(0.0, 0.0), BreathingPattern::Normal);
        assert_eq!(classify_means(7.5, 7.5), BreathingPattern::Normal);
    }

    #[test]
    fn large_gaps_never_reach_the_asynchronous_rule() {
        assert_eq!(classify_means(0.0, 40.0), BreathingPattern::Diaphragmatic);
        assert_eq!(classify_means(40.0, 0.0), BreathingPattern::ChestShallow);
    }

    #[test]
    fn history_is_bounded_and_in_step() {
        let mut history = MovementHistory::with_capacity(HISTORY_CAPACITY);
        for i in 0..45u32 {
            history.push(i, i * 2);
            assert!(history.len() <= HISTORY_CAPACITY);
            assert_eq!(history.chest().count(), history.abdomen().count());
        }
        assert_eq!(history.len(), 30);
        // oldest 15 samples evicted
        assert_eq!(history.chest().next(), Some(15));
        assert_eq!(history.abdomen().next(), Some(30));
        assert_eq!(history.chest().last(), Some(44));
    }

    #[test]
    fn empty_history_means_are_zero() {
        let history = MovementHistory::with_capacity(30);
        assert!(history.is_empty());
        assert_eq!(history.chest_mean(), 0.0);
        assert_eq!(history.abdomen_mean(), 0.0);
    }

    #[test]
    fn first_observation_records_no_sample() {
        let mut classifier = BreathingClassifier::new(HISTORY_CAPACITY);
        let pattern = classifier.observe(pair(40, 90), Instant::now());
        assert_eq!(pattern, BreathingPattern::Normal);
        assert!(classifier.history().is_empty());
        assert_eq!(classifier.previous(), Some(pair(40, 90)));
    }

    #[test]
    fn repeated_pair_gives_zero_displacement() {
        let mut classifier = BreathingClassifier::new(HISTORY_CAPACITY);
        classifier.observe(pair(40, 90), Instant::now());
        classifier.observe(pair(40, 90), Instant::now());
        assert_eq!(classifier.history().chest().collect::<Vec<_>>(), vec![0]);
        assert_eq!(classifier.history().abdomen().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn displacement_is_absolute() {
        let mut classifier = BreathingClassifier::new(HISTORY_CAPACITY);
        classifier.observe(pair(40, 90), Instant::now());
        let pattern = classifier.observe(pair(38, 100), Instant::now());
        assert_eq!(pattern, BreathingPattern::Diaphragmatic);
        let pattern = classifier.observe(pair(40, 90), Instant::now());
        assert_eq!(pattern, BreathingPattern::Diaphragmatic);
        assert_eq!(classifier.history().chest().collect::<Vec<_>>(), vec![2, 2]);
        assert_eq!(classifier.history().abdomen().collect::<Vec<_>>(), vec![10, 10]);
    }

    #[test]
    fn chest_dominant_motion_is_shallow() {
        let mut classifier = BreathingClassifier::new(HISTORY_CAPACITY);
        classifier.observe(pair(40, 90), Instant::now());
        let pattern = classifier.observe(pair(52, 91), Instant::now());
        assert_eq!(pattern, BreathingPattern::ChestShallow);
        assert!(pattern.is_alert());
        assert_eq!(classifier.last_warning(), None);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut classifier = BreathingClassifier::new(HISTORY_CAPACITY);
        classifier.observe(pair(40, 90), Instant::now());
        classifier.observe(pair(45, 99), Instant::now());
        classifier.reset();
        assert!(classifier.history().is_empty());
        assert_eq!(classifier.previous(), None);
        assert_eq!(
            classifier.observe(pair(1, 2), Instant::now()),
            BreathingPattern::Normal
        );
    }
}
