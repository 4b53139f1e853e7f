// OverlapWindowBuffer - ring buffer yielding 50%-overlapping analysis windows
//
// Incoming chunks of any size are appended to a ring buffer. Whenever at
// least one window's worth of samples is buffered, the oldest `window_size`
// samples are copied out (unwrapped into a contiguous scratch slice) and the
// read cursor advances by `hop_size = window_size / 2`.
//
// Per-window cost is O(window_size) for the copy and O(1) for the advance;
// nothing is shifted. Storage is allocated up front and only grows if a
// single chunk is larger than the spare capacity.

/// One analysis window borrowed from the buffer's scratch storage
#[derive(Debug, Clone, Copy)]
pub struct AnalysisWindow<'a> {
    /// Exactly `window_size` samples, oldest first
    pub samples: &'a [f32],
    /// Cumulative sample-frame offset of the first sample
    pub frame_offset: u64,
}

impl AnalysisWindow<'_> {
    /// Timestamp of the window centre in seconds
    pub fn center_time_sec(&self, sample_rate: u32) -> f64 {
        (self.frame_offset as f64 + self.samples.len() as f64 / 2.0) / sample_rate as f64
    }
}

/// Fixed-stride overlapping window extractor
pub struct OverlapWindowBuffer {
    ring: Vec<f32>,
    read: usize,
    len: usize,
    window_size: usize,
    hop_size: usize,
    frames_processed: u64,
    window: Vec<f32>,
}

impl OverlapWindowBuffer {
    /// Create a buffer for windows of `window_size` samples
    ///
    /// `chunk_hint` is the expected producer chunk size; storage for
    /// `window_size + chunk_hint` samples is reserved so that steady-state
    /// pushes never allocate.
    ///
    /// # Panics
    /// Panics if window_size is smaller than 2 or odd
    pub fn new(window_size: usize, chunk_hint: usize) -> Self {
        assert!(window_size >= 2, "window_size must be at least 2");
        assert!(window_size % 2 == 0, "window_size must be even");

        Self {
            ring: vec![0.0; window_size + chunk_hint.max(1)],
            read: 0,
            len: 0,
            window_size,
            hop_size: window_size / 2,
            frames_processed: 0,
            window: vec![0.0; window_size],
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Samples currently buffered and not yet discarded
    pub fn buffered_len(&self) -> usize {
        self.len
    }

    /// Cumulative frame offset of the next window
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Append a chunk of samples
    pub fn push(&mut self, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }
        if self.len + chunk.len() > self.ring.len() {
            self.grow(self.len + chunk.len());
        }

        let capacity = self.ring.len();
        let write = (self.read + self.len) % capacity;
        let first = chunk.len().min(capacity - write);
        self.ring[write..write + first].copy_from_slice(&chunk[..first]);
        self.ring[..chunk.len() - first].copy_from_slice(&chunk[first..]);
        self.len += chunk.len();
    }

    /// Copy out the next window and advance by one hop
    ///
    /// Returns `None` until at least `window_size` samples are buffered.
    pub fn next_window(&mut self) -> Option<AnalysisWindow<'_>> {
        if self.len < self.window_size {
            return None;
        }

        let capacity = self.ring.len();
        let first = self.window_size.min(capacity - self.read);
        self.window[..first].copy_from_slice(&self.ring[self.read..self.read + first]);
        self.window[first..].copy_from_slice(&self.ring[..self.window_size - first]);

        let frame_offset = self.frames_processed;
        self.read = (self.read + self.hop_size) % capacity;
        self.len -= self.hop_size;
        self.frames_processed += self.hop_size as u64;

        Some(AnalysisWindow {
            samples: &self.window,
            frame_offset,
        })
    }

    /// Drop all buffered samples and restart frame counting at zero
    pub fn reset(&mut self) {
        self.read = 0;
        self.len = 0;
        self.frames_processed = 0;
    }

    fn grow(&mut self, required: usize) {
        let capacity = self.ring.len();
        let new_capacity = required.max(capacity * 2);
        let mut ring = vec![0.0; new_capacity];

        let first = self.len.min(capacity - self.read);
        ring[..first].copy_from_slice(&self.ring[self.read..self.read + first]);
        ring[first..self.len].copy_from_slice(&self.ring[..self.len - first]);

        self.ring = ring;
        self.read = 0;
    }
}
