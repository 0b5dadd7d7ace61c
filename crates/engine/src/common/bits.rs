//! Bit-field helpers.
//!
//! All fields are inclusive `[hi:lo]` ranges with `lo <= hi < 64`.

/// Returns a mask with the low `width` bits set.
pub const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extracts bits `[hi:lo]` of `value`, right-aligned.
pub const fn extract(value: u64, lo: u32, hi: u32) -> u64 {
    (value >> lo) & mask(hi - lo + 1)
}

/// Replaces bits `[hi:lo]` of `target` with the low bits of `bits`.
pub const fn insert(target: u64, lo: u32, hi: u32, bits: u64) -> u64 {
    let field = mask(hi - lo + 1) << lo;
    (target & !field) | ((bits << lo) & field)
}

/// Returns the number of trailing one bits, i.e. the width of a low-bit mask like `0xfff`.
pub const fn low_mask_width(mask: u64) -> u32 {
    (!mask).trailing_zeros()
}
