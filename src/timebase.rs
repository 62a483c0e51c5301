use approx::relative_eq;
use ndarray::Array1;
use std::ops::Range;

// Tolerance, in samples, when deciding if a time lies on a sample
const SAMPLE_TOLERANCE: f64 = 1e-6;

/// Uniform sampling of a signal: first sample time, sample interval and sample count
#[derive(Clone, Debug, PartialEq)]
pub struct Timebase {
    pub tmin: f64,         // (second)
    pub tstep: f64,        // (second)
    pub n_samples: usize,
}

impl Timebase {
    pub fn new(tmin: f64, tstep: f64, n_samples: usize) -> Self {
        Self { tmin, tstep, n_samples }
    }

    pub fn from_sfreq(tmin: f64, sfreq: f64, n_samples: usize) -> Self {
        Self {
            tmin,
            tstep: 1.0 / sfreq,
            n_samples,
        }
    }

    pub fn sfreq(&self) -> f64 {
        return 1.0 / self.tstep;
    }

    /// Time of the last sample
    pub fn tmax(&self) -> f64 {
        if self.n_samples == 0 {
            return self.tmin;
        }
        return self.tmin + (self.n_samples - 1) as f64 * self.tstep;
    }

    /// Sample times, `tmin + i * tstep`
    pub fn times(&self) -> Array1<f64> {
        let times: Array1<f64> = Array1::from_shape_fn(self.n_samples, |i_sample: usize| self.tmin + i_sample as f64 * self.tstep);
        return times;
    }

    /// Index of the sample nearest to `time`, may lie outside `0..n_samples`
    pub fn time_as_index(&self, time: f64) -> isize {
        return ((time - self.tmin) / self.tstep).round() as isize;
    }

    /// True when both timebases share the same sample interval
    pub fn same_tstep(&self, other: &Timebase) -> bool {
        return relative_eq!(self.tstep, other.tstep, max_relative = 1e-9);
    }

    /// Samples whose times lie within `[tmin, tmax]`, both ends inclusive
    ///
    /// The returned range is empty when no sample falls inside the window.
    pub fn window(&self, tmin: f64, tmax: f64) -> Range<usize> {
        let n_samples: isize = self.n_samples as isize;
        let first: f64 = ((tmin - self.tmin) / self.tstep - SAMPLE_TOLERANCE).ceil();
        let last: f64 = ((tmax - self.tmin) / self.tstep + SAMPLE_TOLERANCE).floor();

        if !first.is_finite() || !last.is_finite() || last < first {
            return 0..0;
        }

        let start: isize = (first as isize).clamp(0, n_samples);
        let stop: isize = (last as isize + 1).clamp(0, n_samples);
        if stop <= start {
            return 0..0;
        }

        return start as usize..stop as usize;
    }
}

#[test]
fn test_timebase_times_and_window() {
    use approx::assert_abs_diff_eq;

    // Reference scenario: 600 samples at 1 kHz, starting 100 ms before the stimulus
    let timebase: Timebase = Timebase::from_sfreq(-0.1, 1000.0, 600);
    let times: Array1<f64> = timebase.times();

    assert_eq!(times.len(), 600);
    assert_abs_diff_eq!(times[0], -0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(timebase.tmax(), 0.499, epsilon = 1e-12);
    assert_eq!(timebase.time_as_index(0.0), 100);

    // [0.0, 0.2] includes both end points
    let window: Range<usize> = timebase.window(0.0, 0.2);
    assert_eq!(window, 100..301);

    // Window partially before the signal is clipped
    assert_eq!(timebase.window(-1.0, -0.099), 0..2);

    // Window between two samples contains nothing
    assert!(timebase.window(0.0101, 0.0109).is_empty());

    // Window after the signal contains nothing
    assert!(timebase.window(1.0, 2.0).is_empty());
}
