// ============================================================
// Layer 3 — ImageTensor
// ============================================================
// A decoded tissue patch: height × width × 3 floats in
// interleaved (HWC) order, every value in [0, 1].
//
// The decode stage creates one per sample and nothing mutates
// it afterwards. Augmentation builds a new tensor.

/// Number of colour channels (RGB).
pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: usize,
    width:  usize,
    data:   Vec<f32>,
}

impl ImageTensor {
    /// Wrap HWC data. Returns `None` when the buffer length does
    /// not match `height * width * 3`.
    pub fn from_hwc(height: usize, width: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == height * width * CHANNELS).then_some(Self { height, width, data })
    }

    /// Shape as (H, W, C).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, CHANNELS)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Raw HWC values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`, channel `c`.
    pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
        self.data[(y * self.width + x) * CHANNELS + c]
    }

    /// Append the values in planar CHW order, the layout
    /// convolution layers expect.
    pub fn extend_chw(&self, out: &mut Vec<f32>) {
        out.reserve(self.data.len());
        for c in 0..CHANNELS {
            out.extend(self.data.iter().skip(c).step_by(CHANNELS).copied());
        }
    }

    /// Build a new tensor of the same size whose pixel (y, x) is
    /// read from `source(y, x)` in this tensor.
    pub fn remap<F>(&self, out_height: usize, out_width: usize, source: F) -> Self
    where
        F: Fn(usize, usize) -> (usize, usize),
    {
        let mut data = Vec::with_capacity(out_height * out_width * CHANNELS);
        for y in 0..out_height {
            for x in 0..out_width {
                let (sy, sx) = source(y, x);
                let base = (sy * self.width + sx) * CHANNELS;
                data.extend_from_slice(&self.data[base..base + CHANNELS]);
            }
        }
        Self { height: out_height, width: out_width, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        assert!(ImageTensor::from_hwc(2, 2, vec![0.0; 11]).is_none());
        assert!(ImageTensor::from_hwc(2, 2, vec![0.0; 12]).is_some());
    }

    #[test]
    fn test_extend_chw_planar_order() {
        // 1×2 image: pixel0 = (r0,g0,b0), pixel1 = (r1,g1,b1)
        let t = ImageTensor::from_hwc(1, 2, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let mut out = Vec::new();
        t.extend_chw(&mut out);
        assert_eq!(out, vec![0.1, 0.4, 0.2, 0.5, 0.3, 0.6]);
    }
}
