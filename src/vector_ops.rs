use crate::config::{Number, EPSILON};
use wide::f32x8;

/// Compute cosine similarity between two vectors using SIMD operations.
/// Returns `None` when the lengths differ. Zero-magnitude inputs score 0.
pub fn compute_cosine_similarity_simd(a: &[Number], b: &[Number]) -> Option<Number> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot_product = f32x8::splat(0.0);
    let mut mag_a = f32x8::splat(0.0);
    let mut mag_b = f32x8::splat(0.0);

    let mut a_lanes = a.chunks_exact(8);
    let mut b_lanes = b.chunks_exact(8);

    for (ca, cb) in (&mut a_lanes).zip(&mut b_lanes) {
        let va = load_lane(ca);
        let vb = load_lane(cb);
        dot_product += va * vb;
        mag_a += va * va;
        mag_b += vb * vb;
    }

    let mut scalar_dot_product = dot_product.reduce_add();
    let mut scalar_mag_a = mag_a.reduce_add();
    let mut scalar_mag_b = mag_b.reduce_add();

    // Handle remaining elements
    for (&x, &y) in a_lanes.remainder().iter().zip(b_lanes.remainder()) {
        scalar_dot_product += x * y;
        scalar_mag_a += x * x;
        scalar_mag_b += y * y;
    }

    let denominator = (scalar_mag_a * scalar_mag_b).sqrt();
    if denominator < EPSILON {
        Some(0.0)
    } else {
        Some((scalar_dot_product / denominator).clamp(-1.0, 1.0))
    }
}

fn load_lane(chunk: &[Number]) -> f32x8 {
    let mut lane = [0.0; 8];
    lane.copy_from_slice(chunk);
    f32x8::new(lane)
}

pub fn normalize_vector(vector: &mut [Number]) {
    let magnitude: Number = vector.iter().map(|&x| x * x).sum::<Number>().sqrt();
    if magnitude > EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}
