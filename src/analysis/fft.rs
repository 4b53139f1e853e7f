// FFT module - spectral transform used by the peak estimator
//
// The transform is planned once and runs in place on preallocated buffers,
// so calling it from the audio callback never allocates or locks. Input
// shorter than the transform length is zero-padded.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Complex N-point forward DFT of a real window
pub trait SpectralTransform: Send {
    /// Transform length N
    fn len(&self) -> usize;

    /// Transform `window` (zero-padded or truncated to N) and return the
    /// full complex spectrum of N bins
    fn transform(&mut self, window: &[f32]) -> &[Complex<f32>];
}

/// rustfft-backed transform with a fixed plan
pub struct RustFftTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftTransform {
    /// Plan a forward FFT of `fft_size` points
    ///
    /// # Panics
    /// Panics if fft_size is 0
    pub fn new(fft_size: usize) -> Self {
        assert!(fft_size > 0, "fft_size must be greater than 0");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }
}

impl SpectralTransform for RustFftTransform {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn transform(&mut self, window: &[f32]) -> &[Complex<f32>] {
        for (i, bin) in self.buffer.iter_mut().enumerate() {
            let sample = window.get(i).copied().unwrap_or(0.0);
            *bin = Complex::new(sample, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer
    }
}
