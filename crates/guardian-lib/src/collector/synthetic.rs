//! Deterministic synthetic telemetry
//!
//! Generates a fixed four-entity scenario (two nominal workloads, one
//! leaking memory, one with oscillating CPU/throttle/latency noise).
//! Used as demo data when the real backend has nothing, and by the
//! end-to-end pipeline test.

use crate::models::{EntityKey, FamilySeries, MetricPoint};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// 2024-01-01T00:00:00Z, the fixed scenario start
const SCENARIO_EPOCH: i64 = 1_704_067_200;

/// Samples per family per entity, one minute apart
const SAMPLES: usize = 300;

struct Profile {
    pod: &'static str,
    seed: u64,
    leak: bool,
    noisy: bool,
}

const PROFILES: [Profile; 4] = [
    Profile { pod: "svc-a-123", seed: 1, leak: false, noisy: false },
    Profile { pod: "svc-b-999", seed: 2, leak: false, noisy: false },
    Profile { pod: "svc-leak-777", seed: 3, leak: true, noisy: false },
    Profile { pod: "svc-noisy-555", seed: 4, leak: false, noisy: true },
];

/// Build the full demo scenario across all metric families
pub fn demo_series() -> FamilySeries {
    let mut combined = FamilySeries::new();
    for family in ["cpu", "mem", "throttle", "restarts", "latency"] {
        combined.insert(family.to_string(), Vec::new());
    }

    for profile in PROFILES.iter() {
        let entity = EntityKey::new("prod", profile.pod, "app");
        let series = entity_series(&entity, profile);
        for (family, points) in series {
            combined
                .get_mut(&family)
                .expect("family pre-registered")
                .extend(points);
        }
    }
    combined
}

fn entity_series(entity: &EntityKey, profile: &Profile) -> FamilySeries {
    let mut rng = StdRng::seed_from_u64(profile.seed);
    let cpu_dist = Normal::new(0.2, 0.05).expect("valid distribution");
    let mem_dist = Normal::new(200.0 * 1024.0 * 1024.0, 20.0 * 1024.0 * 1024.0)
        .expect("valid distribution");
    let thr_dist = Normal::new(0.0, 0.005).expect("valid distribution");
    let lat_dist = Normal::new(0.12, 0.02).expect("valid distribution");
    let noise_dist = Normal::new(0.0, 0.1).expect("valid distribution");

    let mut cpu = Vec::with_capacity(SAMPLES);
    let mut mem = Vec::with_capacity(SAMPLES);
    let mut thr = Vec::with_capacity(SAMPLES);
    let mut restarts = Vec::with_capacity(SAMPLES);
    let mut lat = Vec::with_capacity(SAMPLES);

    for i in 0..SAMPLES {
        let t = i as f64;
        let mut cpu_v = cpu_dist.sample(&mut rng);
        let mut mem_v: f64 = mem_dist.sample(&mut rng);
        let mut thr_v: f64 = thr_dist.sample(&mut rng);
        let mut lat_v = lat_dist.sample(&mut rng);

        if profile.leak {
            // Slow, steady climb on top of the baseline
            mem_v += t * 300_000.0;
        }
        if profile.noisy {
            cpu_v += (t / 5.0).sin() * 0.2 + noise_dist.sample(&mut rng);
            thr_v += (t / 10.0).sin().abs() * 0.02;
            lat_v += (t / 7.0).sin().abs() * 0.06;
        }

        cpu.push(cpu_v);
        mem.push(mem_v);
        thr.push(thr_v.max(0.0));
        restarts.push(0.0);
        lat.push(lat_v);
    }

    let mut series = FamilySeries::new();
    for (family, values) in [
        ("cpu", cpu),
        ("mem", mem),
        ("throttle", thr),
        ("restarts", restarts),
        ("latency", lat),
    ] {
        let points: Vec<MetricPoint> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| MetricPoint {
                entity: entity.clone(),
                timestamp: SCENARIO_EPOCH + i as i64 * 60,
                value,
            })
            .collect();
        series.insert(family.to_string(), points);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_series_shape() {
        let series = demo_series();
        assert_eq!(series.len(), 5);
        for points in series.values() {
            assert_eq!(points.len(), PROFILES.len() * SAMPLES);
        }
    }

    #[test]
    fn test_generator_is_deterministic() {
        let a = demo_series();
        let b = demo_series();
        for family in a.keys() {
            let pa = &a[family];
            let pb = &b[family];
            assert_eq!(pa.len(), pb.len());
            for (x, y) in pa.iter().zip(pb.iter()) {
                assert_eq!(x.value, y.value);
                assert_eq!(x.timestamp, y.timestamp);
            }
        }
    }

    #[test]
    fn test_leak_entity_trends_upward() {
        let series = demo_series();
        let mem = &series["mem"];
        let leak: Vec<f64> = mem
            .iter()
            .filter(|p| p.entity.pod == "svc-leak-777")
            .map(|p| p.value)
            .collect();
        let first_half: f64 = leak[..SAMPLES / 2].iter().sum::<f64>() / (SAMPLES / 2) as f64;
        let second_half: f64 = leak[SAMPLES / 2..].iter().sum::<f64>() / (SAMPLES / 2) as f64;
        assert!(second_half > first_half + 10_000_000.0);
    }
}
