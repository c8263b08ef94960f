//! Stochastic per-box disabling of embedding channels.

use crate::common::*;

/// Policy controlling whether image and/or text embedding channels are
/// stochastically disabled per box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropoutMode {
    /// Keep every modality of every valid slot.
    None,
    /// Drop the image embedding of a valid slot on a fair coin; text is
    /// never dropped.
    Image,
    /// Per valid slot, keep both modalities on a fair coin; otherwise drop
    /// exactly one of them, chosen uniformly.
    Both,
}

impl Default for DropoutMode {
    fn default() -> Self {
        DropoutMode::None
    }
}

impl DropoutMode {
    /// Derive per-slot image/text availability masks from the validity
    /// masks. Coins are drawn for valid slots only; pad slots stay zero in
    /// both outputs.
    ///
    /// A valid slot never ends up with both modalities dropped.
    pub fn apply(&self, masks: &[f32], rng: &mut impl Rng) -> (Vec<f32>, Vec<f32>) {
        let mut image_masks = masks.to_vec();
        let mut text_masks = masks.to_vec();

        match *self {
            DropoutMode::None => {}
            DropoutMode::Image => {
                for (slot, &mask) in masks.iter().enumerate() {
                    if mask > 0.0 && rng.gen::<f64>() <= 0.5 {
                        image_masks[slot] = 0.0;
                    }
                }
            }
            DropoutMode::Both => {
                for (slot, &mask) in masks.iter().enumerate() {
                    if mask > 0.0 && rng.gen::<f64>() < 0.5 {
                        if rng.gen_range(0..2) == 0 {
                            image_masks[slot] = 0.0;
                        } else {
                            text_masks[slot] = 0.0;
                        }
                    }
                }
            }
        }

        (image_masks, text_masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    // StepRng(0, 0) draws 0.0 coins, StepRng(u64::MAX, 0) draws coins
    // close to 1.0.
    fn all_heads() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn all_tails() -> StepRng {
        StepRng::new(0, 0)
    }

    #[test]
    fn none_mode_keeps_masks_unchanged() {
        let masks = [1.0, 1.0, 0.0];
        let mut rng = all_tails();
        let (image_masks, text_masks) = DropoutMode::None.apply(&masks, &mut rng);
        assert_eq!(image_masks, masks);
        assert_eq!(text_masks, masks);
    }

    #[test]
    fn image_mode_never_touches_text() {
        let masks = [1.0, 1.0, 0.0];

        let (image_masks, text_masks) = DropoutMode::Image.apply(&masks, &mut all_tails());
        assert_eq!(image_masks, [0.0, 0.0, 0.0]);
        assert_eq!(text_masks, masks);

        let (image_masks, text_masks) = DropoutMode::Image.apply(&masks, &mut all_heads());
        assert_eq!(image_masks, masks);
        assert_eq!(text_masks, masks);
    }

    #[test]
    fn image_mode_coins_are_drawn_per_slot() {
        let masks = [1.0, 1.0, 0.0];

        // the wrapping step yields u64::MAX then 2^63 - 1, so the first
        // coin lands above 0.5 (keep) and the second at ~0.4999 (drop)
        let mut rng = StepRng::new(u64::MAX, 1 << 63);
        let (image_masks, text_masks) = DropoutMode::Image.apply(&masks, &mut rng);

        assert_eq!(image_masks, [1.0, 0.0, 0.0]);
        assert_eq!(text_masks, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn both_mode_drops_at_most_one_modality() {
        let masks = vec![1.0; 64];
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let (image_masks, text_masks) = DropoutMode::Both.apply(&masks, &mut rng);
            for (slot, &mask) in masks.iter().enumerate() {
                if mask > 0.0 {
                    assert!(
                        image_masks[slot] > 0.0 || text_masks[slot] > 0.0,
                        "slot {} lost both modalities",
                        slot
                    );
                }
            }
        }
    }

    #[test]
    fn pad_slots_stay_zero() {
        let masks = [1.0, 0.0, 0.0, 0.0];
        let mut rng = StdRng::seed_from_u64(7);

        for mode in [DropoutMode::None, DropoutMode::Image, DropoutMode::Both] {
            let (image_masks, text_masks) = mode.apply(&masks, &mut rng);
            assert_eq!(&image_masks[1..], [0.0, 0.0, 0.0]);
            assert_eq!(&text_masks[1..], [0.0, 0.0, 0.0]);
        }
    }
}
