//! Procedural effect catalog.
//!
//! Every effect is a function of a [`FrameContext`] (plus the lyric progress
//! where it matters). None of them keep state between frames; where an
//! effect looks random it draws from an RNG reseeded from the frame index, so
//! a given moment of the song always renders the same way.

use serde::{Deserialize, Serialize};

mod background;
mod keyword;
mod overlay;
mod text;
mod transition;

pub use background::{
    draw_bachelorettes, draw_cracks, draw_grid, draw_neon_lights, draw_pulsating_sky,
    draw_sidewalk, NEON_COLORS,
};
pub use keyword::draw_keyword_effect;
pub use overlay::{draw_starburst, draw_timers, TimerReadout};
pub use text::{draw_lyric_text, LyricLayout};
pub use transition::{apply_transition, transition_progress};

/// Inputs shared by every effect for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Seconds of playback.
    pub elapsed: f32,
    /// `elapsed` quantised to the target frame rate.
    pub frame: u64,
    pub seed: u64,
    /// Loudness of the track around `elapsed`, in `[0, 1]`.
    pub energy: f32,
    /// Spectral centroid around `elapsed` relative to the song's brightest
    /// moment, in `[0, 1]`.
    pub brightness: f32,
}

impl FrameContext {
    pub fn new(elapsed: f32, fps: u32, seed: u64) -> Self {
        Self {
            elapsed,
            frame: (elapsed.max(0.0) * fps as f32) as u64,
            seed,
            energy: 0.0,
            brightness: 0.0,
        }
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = energy.clamp(0.0, 1.0);
        self
    }

    pub fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness.clamp(0.0, 1.0);
        self
    }

    /// RNG for one effect in this frame. `salt` keeps effects that share a
    /// frame from drawing identical sequences.
    pub fn rng(&self, salt: u64) -> fastrand::Rng {
        let mixed = self
            .seed
            .wrapping_add(self.frame.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add(salt.wrapping_mul(0xBF58_476D_1CE4_E5B9));
        fastrand::Rng::with_seed(mixed)
    }
}

/// Keyword effect attached to a lyric line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTag {
    /// "mouth" together with "kendrick": pulsating silhouette.
    KendrickSilhouette,
    /// "mouth": rocking megaphone.
    Megaphone,
    /// "grammy": trophy flying along a sine path.
    FlyingGrammy,
    /// "uncle": pulsing search light.
    SearchLight,
    /// "man of the house": shaking house.
    ShakingHouse,
    /// "fades": spinning clippers.
    SpinningClippers,
    /// "ass whoopin'": scattered rotated gloves.
    BoxingGloves,
    /// "pharrell": bouncing hat.
    BouncingHat,
    /// "legacy": breathing owl.
    BreathingOwl,
    /// No keyword matched.
    Plain,
}

impl EffectTag {
    /// Picks the effect for a lyric line. Matching is a case-insensitive
    /// substring test and the first keyword in the list wins.
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("mouth") {
            if text.contains("kendrick") {
                Self::KendrickSilhouette
            } else {
                Self::Megaphone
            }
        } else if text.contains("grammy") {
            Self::FlyingGrammy
        } else if text.contains("uncle") {
            Self::SearchLight
        } else if text.contains("man of the house") {
            Self::ShakingHouse
        } else if text.contains("fades") {
            Self::SpinningClippers
        } else if text.contains("ass whoopin'") {
            Self::BoxingGloves
        } else if text.contains("pharrell") {
            Self::BouncingHat
        } else if text.contains("legacy") {
            Self::BreathingOwl
        } else {
            Self::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_family_matters_lines() {
        let cases = [
            ("Ay, Kendrick just opened his mouth", EffectTag::KendrickSilhouette),
            ("Shut your MOUTH", EffectTag::Megaphone),
            ("Someone go hand him a Grammy right now", EffectTag::FlyingGrammy),
            ("Where is your uncle at?", EffectTag::SearchLight),
            ("'Cause I wanna talk to the man of the house", EffectTag::ShakingHouse),
            ("West Coast niggas do fades, right?", EffectTag::SpinningClippers),
            ("Come get this ass whoopin', I'm handin' 'em out", EffectTag::BoxingGloves),
            ("You wanna take up for Pharrell?", EffectTag::BouncingHat),
            ("Then come get his legacy out of my house", EffectTag::BreathingOwl),
            ("Got so drunk, he hit his head on the sidewalk", EffectTag::Plain),
        ];
        for (text, expected) in cases {
            assert_eq!(EffectTag::classify(text), expected, "{text}");
        }
    }

    #[test]
    fn first_keyword_wins() {
        // "mouth" is tested before "grammy".
        assert_eq!(
            EffectTag::classify("grammy in his mouth"),
            EffectTag::Megaphone
        );
    }

    #[test]
    fn frame_rng_is_reproducible() {
        let a = FrameContext::new(12.34, 60, 7);
        let b = FrameContext::new(12.34, 60, 7);
        assert_eq!(a.rng(1).u64(..), b.rng(1).u64(..));
        assert_ne!(a.rng(1).u64(..), a.rng(2).u64(..));
    }

    #[test]
    fn frame_index_follows_elapsed_time() {
        assert_eq!(FrameContext::new(1.0, 60, 0).frame, 60);
        assert_eq!(FrameContext::new(-3.0, 60, 0).frame, 0);
    }
}
