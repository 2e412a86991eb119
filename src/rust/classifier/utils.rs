use ndarray::{Array1, ArrayView1};

/// Numerically stable softmax.
pub(crate) fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    if sum > 0.0 {
        exp / sum
    } else {
        Array1::zeros(logits.len())
    }
}

/// Indices of the `k` largest values, highest first. Ties keep index order.
pub(crate) fn top_k_indices(values: ArrayView1<f32>, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(k);
    indices
}
