//! Bounded emotional state for one agent.
//!
//! A single integer mood value, always clamped to the shared
//! `[-100, 100]` scale. The discrete label is derived on demand via
//! [`MoodLabel::from_value`] and never stored.

use terrarium_types::{MoodLabel, clamp_scale};

/// One agent's mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionState {
    mood: i32,
}

impl EmotionState {
    /// Create a state with the given initial mood, clamped to scale.
    pub const fn new(initial_mood: i32) -> Self {
        Self {
            mood: clamp_scale(initial_mood),
        }
    }

    /// Add `delta` to the mood, clamping the result to `[-100, 100]`.
    pub const fn update(&mut self, delta: i32) {
        self.mood = clamp_scale(self.mood.saturating_add(delta));
    }

    /// The raw mood value.
    pub const fn value(self) -> i32 {
        self.mood
    }

    /// The derived five-bucket label.
    pub const fn label(self) -> MoodLabel {
        MoodLabel::from_value(self.mood)
    }
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn update_clamps_at_both_ends() {
        let mut state = EmotionState::new(0);
        state.update(250);
        assert_eq!(state.value(), 100);
        state.update(-500);
        assert_eq!(state.value(), -100);
    }

    #[test]
    fn clamping_holds_for_extreme_deltas() {
        let mut state = EmotionState::new(90);
        state.update(i32::MAX);
        assert_eq!(state.value(), 100);
        state.update(i32::MIN);
        assert_eq!(state.value(), -100);
    }

    #[test]
    fn initial_mood_is_clamped() {
        assert_eq!(EmotionState::new(1_000).value(), 100);
        assert_eq!(EmotionState::new(-1_000).value(), -100);
    }

    #[test]
    fn label_tracks_value() {
        let mut state = EmotionState::new(0);
        assert_eq!(state.label(), MoodLabel::Neutral);
        state.update(20);
        assert_eq!(state.label(), MoodLabel::Good);
        state.update(-110);
        assert_eq!(state.label(), MoodLabel::Terrible);
    }
}
