//! One-cycle waveform lookup tables.

/// Number of entries in a waveform table
pub const WAVETABLE_LEN: usize = 64;

/// The table is indexed by the top bits of the 32-bit phase accumulator
const INDEX_SHIFT: u32 = 32 - WAVETABLE_LEN.trailing_zeros();
const INDEX_MASK: u32 = (WAVETABLE_LEN as u32) - 1;

/// One full period of a periodic waveform, as signed 8-bit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wavetable(pub [i8; WAVETABLE_LEN]);

impl Wavetable {
  /// Table index for a phase accumulator value: `(phase >> 26) & 0x3F`
  #[inline(always)]
  pub const fn index(phase: u32) -> usize {
    ((phase >> INDEX_SHIFT) & INDEX_MASK) as usize
  }

  #[inline(always)]
  pub fn sample(&self, phase: u32) -> i8 {
    self.0[Self::index(phase)]
  }
}

/// Sine, peak ±91 (~70% of full scale) to leave headroom for the amplitude scaling.
/// round(91 * sin(2πi/64))
pub static SINE: Wavetable = Wavetable([
    0,   9,  18,  26,  35,  43,  51,  58,
   64,  70,  76,  80,  84,  87,  89,  91,
   91,  91,  89,  87,  84,  80,  76,  70,
   64,  58,  51,  43,  35,  26,  18,   9,
    0,  -9, -18, -26, -35, -43, -51, -58,
  -64, -70, -76, -80, -84, -87, -89, -91,
  -91, -91, -89, -87, -84, -80, -76, -70,
  -64, -58, -51, -43, -35, -26, -18,  -9,
]);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn index_uses_top_six_bits() {
    assert_eq!(Wavetable::index(0), 0);
    assert_eq!(Wavetable::index(0x0400_0000), 1);
    assert_eq!(Wavetable::index(0x03FF_FFFF), 0);
    assert_eq!(Wavetable::index(0x8000_0000), 32);
    assert_eq!(Wavetable::index(u32::MAX), 63);
  }

  #[test]
  fn index_stays_in_range() {
    let mut phase: u32 = 0;
    // walk the whole accumulator range with an odd stride
    for _ in 0..100_000 {
      let idx = Wavetable::index(phase);
      assert!(idx < WAVETABLE_LEN);
      assert_eq!(idx, ((phase >> 26) & 0x3F) as usize);
      phase = phase.wrapping_add(0x0000_A7C5_u32.wrapping_mul(657));
    }
  }

  #[test]
  fn sine_shape() {
    assert_eq!(SINE.0.iter().map(|s| s.unsigned_abs()).max(), Some(91));
    assert_eq!(SINE.0[0], 0);
    assert_eq!(SINE.0[16], 91);
    assert_eq!(SINE.0[32], 0);
    assert_eq!(SINE.0[48], -91);
    // odd symmetry about the half period
    for i in 1..32 {
      assert_eq!(SINE.0[i], -SINE.0[i + 32]);
    }
  }
}
