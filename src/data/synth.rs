//! Deterministic synthetic signals with injected artifacts.
//!
//! The clean signal is `baseline + N(0, noise_sd)` per sample. Two kinds of
//! artifact are then added, each of magnitude `spike_scale * baseline`:
//! - whole-volume spikes (every voxel of volume `t`)
//! - single-slice spikes (one cross-section of volume `t` along the slice axis)

use ndarray::{Array4, Axis};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::SynthConfig;
use crate::engine::TIME_AXIS;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SynthSignal {
    pub signal: Array4<f64>,
    /// Time indices that received a whole-volume spike, ascending.
    pub spiked_volumes: Vec<usize>,
    /// `(t, slice)` pairs that received a single-slice spike, ascending by `t`.
    pub spiked_slices: Vec<(usize, usize)>,
}

pub fn generate_signal(config: &SynthConfig) -> Result<SynthSignal, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    let [nx, ny, nz, nt] = config.shape;
    let mut signal = Array4::from_shape_simple_fn((nx, ny, nz, nt), || config.baseline + noise.sample(&mut rng));

    let bump = config.spike_scale * config.baseline;
    let slice_axis = config.slice_axis.index();
    let n_slice = config.shape[slice_axis];

    let mut spiked_volumes = Vec::new();
    let mut spiked_slices = Vec::new();
    for t in 0..nt {
        if rng.gen_bool(config.spike_prob) {
            signal.index_axis_mut(Axis(TIME_AXIS), t).mapv_inplace(|v| v + bump);
            spiked_volumes.push(t);
        }
        for s in 0..n_slice {
            if rng.gen_bool(config.slice_spike_prob) {
                // Slab is (in-plane, in-plane, t) once the slice axis is removed.
                signal
                    .index_axis_mut(Axis(slice_axis), s)
                    .index_axis_mut(Axis(TIME_AXIS - 1), t)
                    .mapv_inplace(|v| v + bump);
                spiked_slices.push((t, s));
            }
        }
    }

    Ok(SynthSignal {
        signal,
        spiked_volumes,
        spiked_slices,
    })
}

fn validate(config: &SynthConfig) -> Result<(), AppError> {
    let [nx, ny, nz, nt] = config.shape;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(AppError::new(2, format!("Invalid shape {:?}: spatial axes must be > 0.", config.shape)));
    }
    if nt < 2 {
        return Err(AppError::new(2, format!("Invalid shape {:?}: need at least 2 volumes.", config.shape)));
    }
    if !(config.baseline.is_finite() && config.baseline > 0.0) {
        return Err(AppError::new(2, "Baseline must be finite and > 0."));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::new(2, "Noise standard deviation must be finite and >= 0."));
    }
    if !config.spike_scale.is_finite() {
        return Err(AppError::new(2, "Spike scale must be finite."));
    }
    for (name, p) in [("spike", config.spike_prob), ("slice spike", config.slice_spike_prob)] {
        if !(0.0..=1.0).contains(&p) {
            return Err(AppError::new(2, format!("Invalid {name} probability {p}: must be in [0, 1].")));
        }
    }
    Ok(())
}
