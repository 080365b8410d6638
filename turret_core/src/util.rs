//! Small integer and timing helpers.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Linear integer re-mapping of `x` from `[in_min, in_max]` to `[out_min, out_max]`,
/// truncating toward zero. Values outside the input range are not clamped.
/// `in_min == in_max` maps everything to `out_min`.
#[inline]
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let span = i64::from(in_max) - i64::from(in_min);
    if span == 0 {
        return out_min;
    }
    let scaled = (i64::from(x) - i64::from(in_min)) * (i64::from(out_max) - i64::from(out_min))
        / span
        + i64::from(out_min);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Compute the period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}
