//! Engagement-to-tone feedback.
//!
//! The only learning signal that crosses cycles: a platform whose engagement
//! rate falls below the low threshold moves one step along the tone ladder
//! (toward its far end), clamped at the last tone. A rate above the high
//! threshold reinforces the current tone.

use std::collections::HashMap;

use crate::config::{AdaptationMode, Config};
use crate::domain::{Platform, Tone};

/// Classification of one platform's rate against the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Low,
    Neutral,
    High,
}

/// Tone ladder walker, one streak counter per platform
#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    ladder: Vec<Tone>,
    mode: AdaptationMode,
    low_threshold: f64,
    high_threshold: f64,

    /// Consecutive below-threshold cycles (streak mode only)
    low_streaks: HashMap<Platform, u32>,
}

impl FeedbackLoop {
    pub fn new(ladder: Vec<Tone>, mode: AdaptationMode, low_threshold: f64, high_threshold: f64) -> Self {
        Self {
            ladder,
            mode,
            low_threshold,
            high_threshold,
            low_streaks: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.feedback.tone_ladder.clone(),
            config.feedback.adaptation,
            config.engagement.low_threshold,
            config.engagement.high_threshold,
        )
    }

    pub fn ladder(&self) -> &[Tone] {
        &self.ladder
    }

    pub fn signal(&self, rate: f64) -> Signal {
        if rate < self.low_threshold {
            Signal::Low
        } else if rate > self.high_threshold {
            Signal::High
        } else {
            Signal::Neutral
        }
    }

    /// One step further along the ladder, clamped at the end.
    /// Tones not on the ladder enter it at the first rung.
    pub fn shift(&self, tone: Tone) -> Tone {
        let Some(last) = self.ladder.len().checked_sub(1) else {
            return tone;
        };
        let next = match self.ladder.iter().position(|&t| t == tone) {
            Some(index) => (index + 1).min(last),
            None => 0,
        };
        self.ladder[next]
    }

    /// Next cycle's tone for `platform`, or `None` when it stays `current`
    pub fn adapt(&mut self, platform: Platform, current: Tone, rate: f64) -> Option<Tone> {
        if self.signal(rate) != Signal::Low {
            self.low_streaks.remove(&platform);
            return None;
        }

        let step = match self.mode {
            AdaptationMode::Step => true,
            AdaptationMode::Streak { cycles } => {
                let streak = self.low_streaks.entry(platform).or_insert(0);
                *streak += 1;
                if *streak >= cycles {
                    *streak = 0;
                    true
                } else {
                    false
                }
            }
        };
        if !step {
            return None;
        }

        let next = self.shift(current);
        (next != current).then_some(next)
    }

    /// Current low streak for `platform`
    pub fn streak(&self, platform: Platform) -> u32 {
        self.low_streaks.get(&platform).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_loop() -> FeedbackLoop {
        FeedbackLoop::new(Tone::default_ladder(), AdaptationMode::Step, 0.03, 0.05)
    }

    #[test]
    fn test_signal_thresholds() {
        let feedback = step_loop();
        assert_eq!(feedback.signal(0.01), Signal::Low);
        assert_eq!(feedback.signal(0.03), Signal::Neutral);
        assert_eq!(feedback.signal(0.05), Signal::Neutral);
        assert_eq!(feedback.signal(0.09), Signal::High);
    }

    #[test]
    fn test_shift_clamps_at_end() {
        let feedback = step_loop();
        assert_eq!(feedback.shift(Tone::Technical), Tone::Professional);
        assert_eq!(feedback.shift(Tone::Casual), Tone::Creative);
        assert_eq!(feedback.shift(Tone::Creative), Tone::Creative);
    }

    #[test]
    fn test_step_mode() {
        let mut feedback = step_loop();
        assert_eq!(feedback.adapt(Platform::Twitter, Tone::Professional, 0.01), Some(Tone::Casual));
        assert_eq!(feedback.adapt(Platform::Twitter, Tone::Creative, 0.01), None);
        assert_eq!(feedback.adapt(Platform::Twitter, Tone::Professional, 0.2), None);
    }

    #[test]
    fn test_streak_mode_resets() {
        let mut feedback = FeedbackLoop::new(
            Tone::default_ladder(),
            AdaptationMode::Streak { cycles: 2 },
            0.03,
            0.05,
        );
        let p = Platform::Linkedin;

        assert_eq!(feedback.adapt(p, Tone::Technical, 0.01), None);
        assert_eq!(feedback.streak(p), 1);
        assert_eq!(feedback.adapt(p, Tone::Technical, 0.04), None);
        assert_eq!(feedback.streak(p), 0);

        assert_eq!(feedback.adapt(p, Tone::Technical, 0.01), None);
        assert_eq!(feedback.adapt(p, Tone::Technical, 0.01), Some(Tone::Professional));
        assert_eq!(feedback.streak(p), 0);
    }
}
