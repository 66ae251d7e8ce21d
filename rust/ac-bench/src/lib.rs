//! Shared fixtures for the benches.

use ac_core::RawAction;
use ac_norm::StatisticsModel;
use ac_probe::ObservationSnapshot;

/// 7-dim OSC_POSE action statistics.
pub fn pose_action_stats() -> Result<StatisticsModel, ac_norm::MalformedStatisticsError> {
    StatisticsModel::new(
        "actions",
        vec![0.027, 0.089, -0.100, 0.006, 0.004, -0.005, -0.083],
        vec![0.331, 0.372, 0.452, 0.039, 0.063, 0.077, 0.996],
        vec![-0.747, -0.796, -0.938, -0.112, -0.160, -0.209, -1.0],
        vec![0.937, 0.859, 0.937, 0.138, 0.177, 0.196, 1.0],
        0.0,
    )
}

/// Deterministic model-space vectors in roughly [-3, 3].
pub fn gen_vectors(n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut x: u64 = 0xA5A5_A5A5_0123_4567;
    (0..n)
        .map(|_| {
            (0..dim)
                .map(|_| {
                    x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
                    ((x >> 11) as f64 / (1u64 << 53) as f64) * 6.0 - 3.0
                })
                .collect()
        })
        .collect()
}

/// `(action, pre, post)` triples with small increments that track the command.
pub fn gen_probes(n: usize) -> Vec<(RawAction, ObservationSnapshot, ObservationSnapshot)> {
    gen_vectors(n, 7)
        .into_iter()
        .map(|v| {
            let a: Vec<f64> = v.iter().map(|x| x * 0.01).collect();
            let pre = [0.40, 0.00, 0.95];
            let post = [pre[0] + a[0], pre[1] + a[1], pre[2] + a[2]];
            (
                RawAction::new(a),
                ObservationSnapshot::from_eef_pos(pre),
                ObservationSnapshot::from_eef_pos(post),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        assert_eq!(gen_vectors(4, 7), gen_vectors(4, 7));
        assert!(gen_vectors(64, 7).iter().flatten().all(|v| (-3.0..3.0).contains(v)));
        assert!(pose_action_stats().is_ok());
        assert_eq!(gen_probes(3).len(), 3);
    }
}
