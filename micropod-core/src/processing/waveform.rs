//! Decorative waveform for the player bar.
//!
//! Bar heights are random and unrelated to the audio; they are regenerated
//! whenever a different episode becomes current.

use rand::Rng;

use crate::models::config::PlayerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Waveform {
    bars: Vec<u32>,
}

impl Waveform {
    /// `count` heights drawn uniformly from `min..max`.
    pub fn generate<R: Rng>(rng: &mut R, count: usize, min: u32, max: u32) -> Self {
        let bars = if max <= min {
            vec![min; count]
        } else {
            (0..count).map(|_| rng.random_range(min..max)).collect()
        };
        Self { bars }
    }

    pub fn random(config: &PlayerConfig) -> Self {
        Self::generate(
            &mut rand::rng(),
            config.waveform_bars,
            config.waveform_min_height,
            config.waveform_max_height,
        )
    }

    pub fn bars(&self) -> &[u32] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of bars drawn as already played for a progress in `[0, 1]`.
    pub fn lit_bars(&self, progress: f64) -> usize {
        if !progress.is_finite() || progress <= 0.0 {
            return 0;
        }
        let lit = (self.bars.len() as f64 * progress.min(1.0)).ceil() as usize;
        lit.min(self.bars.len())
    }
}
