//! Live audio effects expressed as filter-graph descriptions.
//!
//! Effects are never applied by this crate directly. Each effect knows how to
//! describe itself as one node of a filter chain, and an [`EffectSet`] tracks
//! which values the running graph was built from so the pipeline can tell when
//! a rebuild is needed.
//!
//! # Example
//!
//! ```rust,ignore
//! use audio_relay::effects::*;
//!
//! let mut effects = EffectSet::new();
//! effects.set(Effect::Volume(0.5))?;
//! assert!(effects.any_changed());
//!
//! effects.commit();
//! assert_eq!(effects.chain(48_000).as_deref(), Some("volume=0.500000"));
//! ```

pub mod error;
pub mod set;

pub use error::{EffectError, EffectResult};
pub use set::{EffectSet, EffectSlot};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One equalizer band: centre frequency in Hz and gain in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    /// Band frequency in Hz.
    pub band: f64,
    /// Gain in dB.
    pub gain: f64,
}

impl EqualizerBand {
    /// Create a band.
    pub fn new(band: f64, gain: f64) -> Self {
        Self { band, gain }
    }
}

/// The effect family, in the order effects appear in a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Playback rate (pitch and speed together).
    Rate,
    /// Tempo without pitch change.
    Tempo,
    /// Amplitude modulation.
    Tremolo,
    /// Linear gain.
    Volume,
    /// Multi-band FIR equalizer.
    Equalizer,
}

impl EffectKind {
    /// Every kind, in chain order.
    pub const ALL: [EffectKind; 5] = [
        EffectKind::Rate,
        EffectKind::Tempo,
        EffectKind::Tremolo,
        EffectKind::Volume,
        EffectKind::Equalizer,
    ];

    /// Position in the chain.
    pub fn index(self) -> usize {
        match self {
            EffectKind::Rate => 0,
            EffectKind::Tempo => 1,
            EffectKind::Tremolo => 2,
            EffectKind::Volume => 3,
            EffectKind::Equalizer => 4,
        }
    }

    /// Lower-case name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Rate => "rate",
            EffectKind::Tempo => "tempo",
            EffectKind::Tremolo => "tremolo",
            EffectKind::Volume => "volume",
            EffectKind::Equalizer => "equalizer",
        }
    }

    /// The value that leaves audio untouched.
    pub fn identity(self) -> Effect {
        match self {
            EffectKind::Rate => Effect::Rate(1.0),
            EffectKind::Tempo => Effect::Tempo(1.0),
            EffectKind::Tremolo => Effect::Tremolo {
                depth: 0.0,
                rate: 0.0,
            },
            EffectKind::Volume => Effect::Volume(1.0),
            EffectKind::Equalizer => Effect::Equalizer(Vec::new()),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A requested effect value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Resample-style rate change; `1.0` is unchanged.
    Rate(f64),
    /// Time stretch; `1.0` is unchanged.
    Tempo(f64),
    /// Tremolo; inactive when either parameter is zero.
    Tremolo {
        /// Modulation depth in `[0, 1]`.
        depth: f64,
        /// Modulation frequency in Hz.
        rate: f64,
    },
    /// Linear gain; `1.0` is unchanged.
    Volume(f64),
    /// Equalizer bands; empty is unchanged.
    Equalizer(Vec<EqualizerBand>),
}

impl Effect {
    /// Which slot this value belongs to.
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Rate(_) => EffectKind::Rate,
            Effect::Tempo(_) => EffectKind::Tempo,
            Effect::Tremolo { .. } => EffectKind::Tremolo,
            Effect::Volume(_) => EffectKind::Volume,
            Effect::Equalizer(_) => EffectKind::Equalizer,
        }
    }

    /// Reject values a filter graph cannot honour.
    pub fn validate(&self) -> EffectResult<()> {
        match self {
            Effect::Rate(rate) => EffectError::check("rate", "factor", *rate, "> 0", |v| v > 0.0),
            Effect::Tempo(tempo) => {
                EffectError::check("tempo", "factor", *tempo, "> 0", |v| v > 0.0)
            }
            Effect::Tremolo { depth, rate } => {
                EffectError::check("tremolo", "depth", *depth, "0..=1", |v| {
                    (0.0..=1.0).contains(&v)
                })?;
                EffectError::check("tremolo", "rate", *rate, ">= 0", |v| v >= 0.0)
            }
            Effect::Volume(gain) => EffectError::check("volume", "gain", *gain, ">= 0", |v| v >= 0.0),
            Effect::Equalizer(bands) => bands.iter().try_for_each(|band| {
                EffectError::check("equalizer", "band", band.band, ">= 0", |v| v >= 0.0)?;
                EffectError::check("equalizer", "gain", band.gain, "finite", |_| true)
            }),
        }
    }

    /// Whether this value alters the audio.
    pub fn is_active(&self) -> bool {
        match self {
            Effect::Rate(value) | Effect::Tempo(value) | Effect::Volume(value) => *value != 1.0,
            Effect::Tremolo { depth, rate } => *depth != 0.0 && *rate != 0.0,
            Effect::Equalizer(bands) => !bands.is_empty(),
        }
    }

    /// The filter node for this value, given the input sample rate.
    pub fn describe(&self, input_sample_rate: u32) -> String {
        match self {
            Effect::Rate(rate) => format!("asetrate={:.6}", rate * f64::from(input_sample_rate)),
            Effect::Tempo(tempo) => format!("atempo={tempo:.6}"),
            Effect::Tremolo { depth, rate } => format!("tremolo=f={rate:.6}:d={depth:.6}"),
            Effect::Volume(gain) => format!("volume={gain:.6}"),
            Effect::Equalizer(bands) => {
                let entries: Vec<String> = bands
                    .iter()
                    .map(|band| format!("entry({:.6},{:.6})", band.band, band.gain))
                    .collect();
                format!("firequalizer=gain_entry='{}'", entries.join(";"))
            }
        }
    }
}
