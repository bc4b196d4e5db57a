use std::fmt;

/// mask covering the lowest `width` bits. saturates at 64.
#[inline]
pub const fn bit_range_lower(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

#[inline]
pub const fn mask_lower(bin: u64, width: u32) -> u64 {
    bin & bit_range_lower(width)
}

/// logical right shift; shifting out every bit yields 0 instead of overflowing.
#[inline]
pub const fn shr(bin: u64, amount: u32) -> u64 {
    if amount >= u64::BITS {
        0
    } else {
        bin >> amount
    }
}

/// `width` bits of `bin` starting at bit `start`.
#[inline]
pub const fn extract(bin: u64, start: u32, width: u32) -> u64 {
    mask_lower(shr(bin, start), width)
}

/// left shift counterpart of [`shr`].
#[inline]
pub const fn shl(bin: u64, amount: u32) -> u64 {
    if amount >= u64::BITS {
        0
    } else {
        bin << amount
    }
}

/// exact base-2 logarithm. `None` unless `v` is a positive power of two.
#[inline]
pub const fn exact_log2(v: u32) -> Option<u32> {
    if v.is_power_of_two() {
        Some(v.trailing_zeros())
    } else {
        None
    }
}

/// zero-padded binary rendering of a bit field.
#[derive(Clone, Copy)]
pub struct Binary {
    pub value: u64,
    pub width: u32,
}

impl Binary {
    pub fn new(value: u64, width: u32) -> Self {
        Self { value, width }
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 0 {
            return Ok(());
        }
        let width = self.width as usize;
        write!(f, "{:0width$b}", mask_lower(self.value, self.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_range_lower() {
        assert_eq!(0, bit_range_lower(0));
        assert_eq!(0b1111, bit_range_lower(4));
        assert_eq!(u64::MAX >> 1, bit_range_lower(63));
        assert_eq!(u64::MAX, bit_range_lower(64));
    }
    #[test]
    fn test_full_width_shift() {
        assert_eq!(0, shr(u64::MAX, 64));
        assert_eq!(0, shl(1, 64));
        assert_eq!(0b11, extract(0b0110, 1, 2));
        assert_eq!(0b1010, extract(0b1010_0110, 4, 64));
    }
    #[test]
    fn test_exact_log2() {
        assert_eq!(Some(0), exact_log2(1));
        assert_eq!(Some(3), exact_log2(8));
        assert_eq!(Some(31), exact_log2(1 << 31));
        assert_eq!(None, exact_log2(0));
        assert_eq!(None, exact_log2(12));
    }
    #[test]
    fn test_binary() {
        assert_eq!("0101", Binary::new(5, 4).to_string());
        assert_eq!("", Binary::new(5, 0).to_string());
        assert_eq!("01", Binary::new(0b101, 2).to_string());
    }
}
