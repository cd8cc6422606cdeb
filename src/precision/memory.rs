//! Memory estimates for reduced-precision training.

use super::Dtype;

/// Estimate memory savings from mixed precision
///
/// Master weights stay in fp32; activations and gradients use `dtype`, or
/// fp32 when it is `None`. Byte counts saturate at `usize::MAX`.
///
/// # Returns
///
/// Tuple of (fp32_bytes, mixed_bytes, savings_ratio)
pub fn estimate_memory_savings(
    num_params: usize,
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
    dtype: Option<Dtype>,
) -> (usize, usize, f32) {
    let element_bytes = dtype.map_or(4, |d| d.size_bytes());
    let activations = batch_size.saturating_mul(seq_len).saturating_mul(hidden_size);
    let bytes = |count: usize, width: usize| count.saturating_mul(width);

    let total_fp32 = bytes(num_params, 4)
        .saturating_add(bytes(activations, 4))
        .saturating_add(bytes(num_params, 4));
    let total_mixed = bytes(num_params, 4)
        .saturating_add(bytes(activations, element_bytes))
        .saturating_add(bytes(num_params, element_bytes));

    if total_fp32 == 0 {
        return (0, 0, 0.0);
    }
    let savings = 1.0 - (total_mixed as f32 / total_fp32 as f32);
    (total_fp32, total_mixed, savings)
}
