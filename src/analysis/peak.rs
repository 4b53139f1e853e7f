// PeakEstimator - dominant in-band spectral peak
//
// Scans the magnitude of every bin whose frequency lies in the configured
// band (never bin 0) and reports the strongest one if it clears the
// magnitude floor. Resolution is one bin, i.e. sample_rate / fft_size; no
// interpolation or harmonic analysis is attempted.

use rustfft::num_complex::Complex;

/// Dominant frequency of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    pub frequency_hz: f64,
    pub magnitude: f32,
}

/// Single-peak pitch estimator over a fixed frequency band
#[derive(Debug, Clone)]
pub struct PeakEstimator {
    bin_width_hz: f64,
    min_frequency_hz: f64,
    max_frequency_hz: f64,
    magnitude_floor: f32,
    first_bin: usize,
    end_bin: usize,
}

impl PeakEstimator {
    /// Create an estimator for spectra of `fft_size` bins
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate of the analysed audio in Hz
    /// * `fft_size` - Transform length N
    /// * `min_frequency_hz` / `max_frequency_hz` - Accepted band
    /// * `magnitude_floor` - Peaks at or below this magnitude are ignored
    pub fn new(
        sample_rate: u32,
        fft_size: usize,
        min_frequency_hz: f64,
        max_frequency_hz: f64,
        magnitude_floor: f32,
    ) -> Self {
        let bins_per_hz = fft_size as f64 / sample_rate as f64;
        let first_bin = ((min_frequency_hz * bins_per_hz) as usize).max(1);
        let end_bin = ((max_frequency_hz * bins_per_hz) as usize).min(fft_size / 2);

        Self {
            bin_width_hz: sample_rate as f64 / fft_size as f64,
            min_frequency_hz,
            max_frequency_hz,
            magnitude_floor,
            first_bin,
            end_bin,
        }
    }

    /// Frequency spacing between adjacent bins
    pub fn bin_width_hz(&self) -> f64 {
        self.bin_width_hz
    }

    /// Bins scanned, as a half-open range
    pub fn bin_range(&self) -> std::ops::Range<usize> {
        self.first_bin..self.end_bin
    }

    /// Strongest in-band peak, or `None` when nothing clears the floor
    pub fn estimate(&self, spectrum: &[Complex<f32>]) -> Option<PitchCandidate> {
        let end = self.end_bin.min(spectrum.len());
        let mut peak_bin = 0;
        let mut peak_magnitude = 0.0_f32;

        for bin in self.first_bin..end {
            let magnitude = spectrum[bin].norm();
            if magnitude > peak_magnitude {
                peak_magnitude = magnitude;
                peak_bin = bin;
            }
        }

        if peak_bin == 0 || peak_magnitude <= self.magnitude_floor {
            return None;
        }

        // Truncating the band edges to bins can admit a bin just below min
        let frequency_hz = peak_bin as f64 * self.bin_width_hz;
        if frequency_hz < self.min_frequency_hz || frequency_hz > self.max_frequency_hz {
            return None;
        }

        Some(PitchCandidate {
            frequency_hz,
            magnitude: peak_magnitude,
        })
    }
}
