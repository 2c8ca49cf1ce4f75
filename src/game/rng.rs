/// State used when a caller seeds with zero, which xorshift cannot leave.
pub const ZERO_SEED_STATE: u32 = 0xA341_316C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { ZERO_SEED_STATE } else { seed };
        Self { state }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Draws from `[lo, hi_inclusive]`; reversed bounds are swapped.
    pub fn range(&mut self, lo: i32, hi_inclusive: i32) -> i32 {
        let (lo, hi) = if hi_inclusive < lo {
            (hi_inclusive, lo)
        } else {
            (lo, hi_inclusive)
        };
        let span = (hi as i64 - lo as i64 + 1) as u64;
        let r = self.next_u32();
        if span > u32::MAX as u64 {
            return r as i32;
        }
        (lo as i64 + (r as u64 % span) as i64) as i32
    }
}
