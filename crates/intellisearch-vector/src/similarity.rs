use intellisearch_core::SearchHit;

pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Cosine similarity of two unit vectors, clamped to `[0, 1]`.
pub(crate) fn score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    clamp_unit(dot)
}

/// `1 - cosine_distance`, clamped to `[0, 1]`.
pub(crate) fn score_from_distance(distance: f32) -> f32 {
    clamp_unit(1.0 - distance)
}

fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Stable descending sort, truncated to `top_k`.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k);
    hits
}
