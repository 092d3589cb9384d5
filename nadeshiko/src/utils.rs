/// An 8-bit-per-channel RGB color.
pub type Rgb = [u8; 3];

/// Packs an RGB color into a `0xRRGGBB` integer.
#[inline]
pub const fn pack_rgb([r, g, b]: Rgb) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Splits a `0xRRGGBB` integer into its components.
#[inline]
pub const fn unpack_rgb(rgb: u32) -> Rgb {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

/// Expands a 5-bit channel value to 8 bits.
#[inline]
pub const fn expand_5(v: u8) -> u8 {
    (v as u32 * 255 / 31) as u8
}

/// Rounds an 8-bit channel value to the nearest 5-bit value.
#[inline]
pub fn round_5(v: u8) -> u8 {
    (v as f32 * 31.0 / 255.0).round() as u8
}

/// Index of the 5-5-5 bucket an RGB color falls into.
#[inline]
pub fn bucket_index([r, g, b]: Rgb) -> usize {
    (usize::from(round_5(r)) << 10) | (usize::from(round_5(g)) << 5) | usize::from(round_5(b))
}

/// Center color of a 5-5-5 bucket.
#[inline]
pub const fn bucket_color(index: usize) -> Rgb {
    [
        expand_5(((index >> 10) & 31) as u8),
        expand_5(((index >> 5) & 31) as u8),
        expand_5((index & 31) as u8),
    ]
}

/// Position of sub-pixel `p` inside a cell, as `(column, row)`.
#[inline]
pub const fn sub_pixel_offset(p: u8) -> (usize, usize) {
    ((p & 1) as usize, (p >> 1) as usize)
}

/// Mask bit controlling sub-pixel `p`.
#[inline]
pub const fn sub_pixel_bit(p: u8) -> u8 {
    0x80 >> p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrip() {
        assert_eq!(pack_rgb([0x12, 0x34, 0x56]), 0x123456);
        assert_eq!(unpack_rgb(0x123456), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn buckets() {
        assert_eq!(bucket_index([0, 0, 0]), 0);
        assert_eq!(bucket_index([255, 255, 255]), 0x7FFF);
        assert_eq!(bucket_color(0x7FFF), [255, 255, 255]);
        assert_eq!(bucket_index([255, 0, 0]), 31 << 10);
    }

    #[test]
    fn sub_pixels() {
        assert_eq!(sub_pixel_offset(0), (0, 0));
        assert_eq!(sub_pixel_offset(3), (1, 1));
        assert_eq!(sub_pixel_offset(7), (1, 3));
        assert_eq!(sub_pixel_bit(0), 0x80);
        assert_eq!(sub_pixel_bit(7), 0x01);
    }
}
