//! Committed/pending effect state and filter-chain assembly.

use super::{Effect, EffectKind, EffectResult};
use serde::{Deserialize, Serialize};

/// Holder for one effect: the value the running graph uses and the value
/// most recently requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSlot {
    committed: Effect,
    pending: Effect,
}

impl EffectSlot {
    fn new(kind: EffectKind) -> Self {
        Self {
            committed: kind.identity(),
            pending: kind.identity(),
        }
    }

    /// The value the current graph was built from.
    pub fn committed(&self) -> &Effect {
        &self.committed
    }

    /// The latest requested value.
    pub fn pending(&self) -> &Effect {
        &self.pending
    }

    /// The requested value alters the audio.
    pub fn is_set(&self) -> bool {
        self.pending.is_active()
    }

    /// The requested value differs from the committed one.
    pub fn is_changed(&self) -> bool {
        self.committed != self.pending
    }

    /// Adopt the requested value.
    pub fn commit(&mut self) {
        if self.is_changed() {
            self.committed = self.pending.clone();
        }
    }
}

/// All effects of one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSet {
    slots: [EffectSlot; 5],
}

impl EffectSet {
    /// A set with every effect at identity.
    pub fn new() -> Self {
        Self {
            slots: EffectKind::ALL.map(EffectSlot::new),
        }
    }

    /// Request a new value. Invalid values leave the set untouched.
    pub fn set(&mut self, effect: Effect) -> EffectResult<()> {
        effect.validate()?;
        let index = effect.kind().index();
        self.slots[index].pending = effect;
        Ok(())
    }

    /// Request identity for one effect.
    pub fn clear(&mut self, kind: EffectKind) {
        self.slots[kind.index()].pending = kind.identity();
    }

    /// Request identity for every effect.
    pub fn clear_all(&mut self) {
        for kind in EffectKind::ALL {
            self.clear(kind);
        }
    }

    /// The slot for `kind`.
    pub fn slot(&self, kind: EffectKind) -> &EffectSlot {
        &self.slots[kind.index()]
    }

    /// Any requested value alters the audio.
    pub fn any_set(&self) -> bool {
        self.slots.iter().any(EffectSlot::is_set)
    }

    /// Any requested value differs from its committed one.
    pub fn any_changed(&self) -> bool {
        self.slots.iter().any(EffectSlot::is_changed)
    }

    /// Adopt every requested value.
    pub fn commit(&mut self) {
        self.slots.iter_mut().for_each(EffectSlot::commit);
    }

    /// Comma-separated filter chain from the committed values, in fixed order.
    ///
    /// `None` when no committed value alters the audio.
    pub fn chain(&self, input_sample_rate: u32) -> Option<String> {
        let nodes: Vec<String> = self
            .slots
            .iter()
            .map(EffectSlot::committed)
            .filter(|effect| effect.is_active())
            .map(|effect| effect.describe(input_sample_rate))
            .collect();

        if nodes.is_empty() {
            None
        } else {
            Some(nodes.join(","))
        }
    }
}

impl Default for EffectSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{EffectError, EqualizerBand};
    use super::*;

    #[test]
    fn test_new_set_is_identity() {
        let effects = EffectSet::new();
        assert!(!effects.any_set());
        assert!(!effects.any_changed());
        assert_eq!(effects.chain(48_000), None);
    }

    #[test]
    fn test_set_and_changed_are_independent() {
        let mut effects = EffectSet::new();

        effects.set(Effect::Volume(0.5)).unwrap();
        assert!(effects.slot(EffectKind::Volume).is_set());
        assert!(effects.slot(EffectKind::Volume).is_changed());

        effects.commit();
        assert!(effects.any_set());
        assert!(!effects.any_changed());

        // Back to identity: not set, but changed until the next commit.
        effects.set(Effect::Volume(1.0)).unwrap();
        assert!(!effects.any_set());
        assert!(effects.any_changed());
    }

    #[test]
    fn test_repeating_committed_value_is_not_a_change() {
        let mut effects = EffectSet::new();
        effects.set(Effect::Tempo(1.25)).unwrap();
        effects.commit();

        effects.set(Effect::Tempo(1.25)).unwrap();
        assert!(!effects.any_changed());
    }

    #[test]
    fn test_chain_uses_committed_values_in_fixed_order() {
        let mut effects = EffectSet::new();
        effects
            .set(Effect::Equalizer(vec![
                EqualizerBand::new(100.0, 3.0),
                EqualizerBand::new(1000.0, -2.5),
            ]))
            .unwrap();
        effects.set(Effect::Volume(0.5)).unwrap();
        effects
            .set(Effect::Tremolo {
                depth: 0.5,
                rate: 4.0,
            })
            .unwrap();
        effects.set(Effect::Tempo(1.5)).unwrap();
        effects.set(Effect::Rate(1.1)).unwrap();

        // Nothing committed yet.
        assert_eq!(effects.chain(48_000), None);

        effects.commit();
        assert_eq!(
            effects.chain(48_000).unwrap(),
            "asetrate=52800.000000,atempo=1.500000,tremolo=f=4.000000:d=0.500000,\
             volume=0.500000,firequalizer=gain_entry='entry(100.000000,3.000000);\
             entry(1000.000000,-2.500000)'"
        );
    }

    #[test]
    fn test_tremolo_needs_depth_and_rate() {
        let mut effects = EffectSet::new();
        effects
            .set(Effect::Tremolo {
                depth: 0.5,
                rate: 0.0,
            })
            .unwrap();
        assert!(!effects.any_set());
        assert!(effects.any_changed());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut effects = EffectSet::new();

        assert!(matches!(
            effects.set(Effect::Volume(-1.0)),
            Err(EffectError::OutOfRange { .. })
        ));
        assert!(matches!(
            effects.set(Effect::Rate(f64::NAN)),
            Err(EffectError::NonFinite { .. })
        ));
        assert!(effects.set(Effect::Tempo(0.0)).is_err());
        assert!(
            effects
                .set(Effect::Tremolo {
                    depth: 1.5,
                    rate: 2.0
                })
                .is_err()
        );
        assert!(
            effects
                .set(Effect::Equalizer(vec![EqualizerBand::new(100.0, f64::INFINITY)]))
                .is_err()
        );

        assert!(!effects.any_changed());
    }

    #[test]
    fn test_clear_all_requests_identity() {
        let mut effects = EffectSet::new();
        effects.set(Effect::Volume(2.0)).unwrap();
        effects.set(Effect::Rate(0.8)).unwrap();
        effects.commit();

        effects.clear_all();
        assert!(!effects.any_set());
        assert!(effects.any_changed());

        effects.commit();
        assert_eq!(effects.chain(44_100), None);
    }
}
