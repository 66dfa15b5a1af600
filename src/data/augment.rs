// ============================================================
// Layer 4 — Training Augmentation
// ============================================================
// Tissue patches have no canonical orientation, so flips and
// quarter turns give new, equally valid training images:
//
//   - horizontal flip  (p = 0.5)
//   - vertical flip    (p = 0.5)
//   - k × 90° rotation (k uniform in 0..4, square images only)
//
// Augmentation never touches the input tensor; it returns a new
// one. The random choices come from a generator seeded by
// (seed, epoch, sample position), so the same run always sees
// the same augmented images and there is no shared RNG between
// decode threads.
//
// Validation and test images are never augmented.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::image::ImageTensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Augmentation {
    pub horizontal_flip: bool,
    pub vertical_flip:   bool,
    pub rotate90:        bool,
    pub seed:            u64,
}

impl Augmentation {
    /// Flips and rotations all enabled.
    pub fn all(seed: u64) -> Self {
        Self { horizontal_flip: true, vertical_flip: true, rotate90: true, seed }
    }

    /// Deterministic generator for one sample of one epoch.
    fn rng_for(&self, epoch: usize, position: usize) -> StdRng {
        // splitmix-style mixing so neighbouring positions diverge
        let mut z = self.seed
            ^ (epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (position as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 30)).wrapping_mul(0x94D0_49BB_1331_11EB);
        StdRng::seed_from_u64(z ^ (z >> 31))
    }

    /// Return the augmented copy of `image` for this epoch/position.
    pub fn apply(&self, image: &ImageTensor, epoch: usize, position: usize) -> ImageTensor {
        let mut rng = self.rng_for(epoch, position);
        let flip_h  = self.horizontal_flip && rng.gen_bool(0.5);
        let flip_v  = self.vertical_flip && rng.gen_bool(0.5);
        let square  = image.height() == image.width();
        let turns   = if self.rotate90 && square { rng.gen_range(0..4u8) } else { 0 };

        let (h, w) = (image.height(), image.width());
        image.remap(h, w, |y, x| {
            // rotate the destination coordinate back into the source
            let (mut sy, mut sx) = match turns {
                1 => (w - 1 - x, y),
                2 => (h - 1 - y, w - 1 - x),
                3 => (x, h - 1 - y),
                _ => (y, x),
            };
            if flip_h {
                sx = w - 1 - sx;
            }
            if flip_v {
                sy = h - 1 - sy;
            }
            (sy, sx)
        })
    }
}
