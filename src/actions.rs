//! Simulated user actions injected into the YouTube sampling loop.

use rand::Rng;

/// One of the player interactions the probe can fake between samples.
/// Seeking forward is weighted three times heavier than the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    SeekForward,
    PlayPause,
    SeekBackward,
}

const WEIGHTED: [PlayerAction; 5] = [
    PlayerAction::SeekForward,
    PlayerAction::SeekForward,
    PlayerAction::SeekForward,
    PlayerAction::PlayPause,
    PlayerAction::SeekBackward,
];

impl PlayerAction {
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        WEIGHTED[rng.gen_range(0..WEIGHTED.len())]
    }

    /// YouTube player keyboard shortcut for this action.
    pub fn key(self) -> &'static str {
        match self {
            PlayerAction::SeekForward => "l",
            PlayerAction::PlayPause => "k",
            PlayerAction::SeekBackward => "j",
        }
    }

    /// Seeks press their key 1-3 times (10 seconds per press); play/pause
    /// presses once.
    pub fn presses<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            PlayerAction::PlayPause => 1,
            _ => rng.gen_range(1..=3),
        }
    }
}

/// Per-tick action probability.
#[derive(Debug, Clone, Copy)]
pub struct ActionPolicy {
    pub probability: f64,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self { probability: 0.3 }
    }
}

impl ActionPolicy {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn should_act<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.probability > 0.0 && rng.gen_bool(self.probability.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seek_forward_dominates_the_weighting() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0u32; 3];
        for _ in 0..5000 {
            match PlayerAction::choose(&mut rng) {
                PlayerAction::SeekForward => counts[0] += 1,
                PlayerAction::PlayPause => counts[1] += 1,
                PlayerAction::SeekBackward => counts[2] += 1,
            }
        }
        assert!(counts[0] > counts[1] * 2);
        assert!(counts[0] > counts[2] * 2);
        assert!(counts[1] > 0 && counts[2] > 0);
    }

    #[test]
    fn press_counts_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let n = PlayerAction::SeekForward.presses(&mut rng);
            assert!((1..=3).contains(&n));
        }
        assert_eq!(PlayerAction::PlayPause.presses(&mut rng), 1);
    }

    #[test]
    fn zero_probability_never_acts() {
        let mut rng = StdRng::seed_from_u64(3);
        let policy = ActionPolicy::new(0.0);
        assert!((0..100).all(|_| !policy.should_act(&mut rng)));
    }
}
