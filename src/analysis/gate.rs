// NoiseGate - peak-amplitude pre-filter
//
// Windows whose loudest sample does not exceed the threshold are treated as
// silence and never reach the spectral transform.

/// Absolute peak-amplitude gate
#[derive(Debug, Clone, Copy)]
pub struct NoiseGate {
    threshold: f32,
}

impl NoiseGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// True iff `max(|sample|) > threshold`
    pub fn passes(&self, window: &[f32]) -> bool {
        peak_amplitude(window) > self.threshold
    }
}

/// Largest absolute sample value (0.0 for an empty slice)
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples
        .iter()
        .fold(0.0_f32, |peak, &sample| peak.max(sample.abs()))
}
