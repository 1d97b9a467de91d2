/*! Turning I/Q samples into a row of dB values, one per screen column.

The number of FFT bins depends on the zoom. When the displayed span is
smaller than the sample rate, the FFT gets more bins than the screen has
columns, and the middle of the result (shifted by the LO offset) is kept.

The DC bin is never shown.
*/
use std::collections::VecDeque;
use std::sync::Arc;

use itertools::{Itertools, MinMaxResult};
use rustfft::FftPlanner;

use crate::window::{WindowKind, window};
use crate::{Complex, Error, Float, Result};

/// Number of samples grabbed from the radio per frame.
///
/// Large enough to zoom into a 10kHz span on 320 pixels at 0.230 MHz.
pub const SDR_SAMPLE_SIZE: usize = 8192;

/// Magnitudes are floored to this before converting to dB.
pub const MIN_MAGNITUDE: Float = 1e-10;

/// How many FFT bins to use for a given screen width, sample rate and zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPlan {
    /// FFT bins kept after dropping the two end bins.
    pub bins: usize,
    /// Displayed span, in MHz. Never more than the sample rate.
    pub span_mhz: f64,
    /// Sample rate, in MHz.
    pub sample_rate_mhz: f64,
}

impl ZoomPlan {
    /// Plan for `width` screen columns.
    ///
    /// ```
    /// use freqshow::spectrum::ZoomPlan;
    /// let p = ZoomPlan::new(320, 0.230, 0.05);
    /// assert_eq!(p.bins, 1472);
    /// assert_eq!(p.fft_size(), 1474);
    /// ```
    pub fn new(width: usize, sample_rate_mhz: f64, zoom_mhz: f64) -> Self {
        let full = Self {
            bins: width,
            span_mhz: sample_rate_mhz,
            sample_rate_mhz,
        };
        if !(zoom_mhz > 0.0 && zoom_mhz < sample_rate_mhz) {
            return full;
        }
        // Epsilon, so that 320 * 0.25 / 0.05 is 1600 and not 1599.
        let bins = (width as f64 * sample_rate_mhz / zoom_mhz + 1e-9).floor() as usize;
        if bins + 2 > SDR_SAMPLE_SIZE {
            return full;
        }
        Self {
            bins,
            span_mhz: zoom_mhz,
            sample_rate_mhz,
        }
    }

    /// Number of samples going into the FFT.
    pub fn fft_size(&self) -> usize {
        self.bins + 2
    }

    /// Hz between FFT bins.
    pub fn freq_step_hz(&self) -> f64 {
        self.sample_rate_mhz * 1e6 / self.fft_size() as f64
    }
}

/// Everything [`SpectrumEngine::compute`] needs besides the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumParams {
    /// Screen width, and thus output length.
    pub width: usize,
    /// Zoom plan for this width.
    pub plan: ZoomPlan,
    /// Window function.
    pub window: WindowKind,
    /// Kaiser window beta.
    pub kaiser_beta: Float,
    /// Swap I and Q, mirroring the spectrum.
    pub swap_iq: bool,
    /// Local oscillator offset, in MHz.
    pub lo_offset_mhz: f64,
}

/// FFT with cached plans and windows.
pub struct SpectrumEngine {
    planner: FftPlanner<Float>,
    window: Option<((WindowKind, usize, u32), Arc<Vec<Float>>)>,
}

impl Default for SpectrumEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumEngine {
    /// Create new engine.
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            window: None,
        }
    }

    fn window(&mut self, kind: WindowKind, n: usize, beta: Float) -> Arc<Vec<Float>> {
        let key = (kind, n, beta.to_bits());
        match &self.window {
            Some((k, w)) if *k == key => w.clone(),
            _ => {
                let w = Arc::new(window(kind, n, beta));
                self.window = Some((key, w.clone()));
                w
            }
        }
    }

    /// Compute one row of dB values, `params.width` long.
    pub fn compute(&mut self, samples: &[Complex], params: &SpectrumParams) -> Result<Vec<Float>> {
        let n = params.plan.fft_size();
        if samples.len() < n {
            return Err(Error::msg(format!(
                "need {n} samples for the FFT, got {}",
                samples.len()
            )));
        }
        if params.plan.bins < params.width {
            return Err(Error::msg(format!(
                "zoom plan has {} bins, fewer than width {}",
                params.plan.bins, params.width
            )));
        }
        let win = self.window(params.window, n, params.kaiser_beta);
        let mut buf: Vec<Complex> = samples[..n]
            .iter()
            .zip(win.iter())
            .map(|(s, w)| {
                let s = if params.swap_iq {
                    Complex::new(s.im, s.re)
                } else {
                    *s
                };
                s * *w
            })
            .collect();
        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buf);

        // Drop DC and the last bin, then fftshift what's left. Positive
        // frequencies start at bins/2, negative ones end just below it.
        let mut mags: Vec<Float> = buf[1..n - 1].iter().map(|c| c.norm()).collect();
        let half = mags.len() / 2;
        mags.rotate_right(half);

        let left = crop_start(mags.len(), params);
        Ok(mags[left..left + params.width]
            .iter()
            .map(|m| to_db(*m))
            .collect())
    }
}

// Where the displayed window starts, moved by the LO offset if it fits.
fn crop_start(len: usize, params: &SpectrumParams) -> usize {
    if len <= params.width {
        return 0;
    }
    let shift = (params.lo_offset_mhz * 1e6 / params.plan.freq_step_hz()) as i64;
    let extra = ((len - params.width) / 2) as i64;
    let left = if extra > shift.abs() {
        if params.swap_iq {
            extra + shift
        } else {
            extra - shift
        }
    } else {
        extra
    };
    left as usize
}

/// Convert magnitude to dB.
pub fn to_db(m: Float) -> Float {
    let m = m.max(MIN_MAGNITUDE);
    #[cfg(feature = "fast-math")]
    {
        20.0 * fast_math::log2(m) * std::f32::consts::LOG10_2
    }
    #[cfg(not(feature = "fast-math"))]
    {
        20.0 * m.log10()
    }
}

/// Y axis scale. Each end is either fixed, or follows the data.
///
/// Auto values track the running extreme since the last [`clear`](Self::clear).
#[derive(Debug, Clone, PartialEq)]
pub struct Intensity {
    min: Option<Float>,
    max: Option<Float>,
    min_auto: bool,
    max_auto: bool,
}

impl Intensity {
    /// Create scale with given ends. `None` means auto.
    pub fn new(min: Option<Float>, max: Option<Float>) -> Self {
        let mut s = Self {
            min: None,
            max: None,
            min_auto: true,
            max_auto: true,
        };
        s.set_min(min);
        s.set_max(max);
        s
    }

    /// Set bottom of scale. `None` means auto.
    pub fn set_min(&mut self, min: Option<Float>) {
        self.min_auto = min.is_none();
        if min.is_some() {
            self.min = min;
        }
        self.clear();
    }

    /// Set top of scale. `None` means auto.
    pub fn set_max(&mut self, max: Option<Float>) {
        self.max_auto = max.is_none();
        if max.is_some() {
            self.max = max;
        }
        self.clear();
    }

    /// Forget auto scaled values.
    pub fn clear(&mut self) {
        if self.min_auto {
            self.min = None;
        }
        if self.max_auto {
            self.max = None;
        }
    }

    /// Widen auto scaled ends to include this frame.
    pub fn update(&mut self, frame: &[Float]) {
        let (lo, hi) = match frame.iter().copied().minmax() {
            MinMaxResult::NoElements => return,
            MinMaxResult::OneElement(x) => (x, x),
            MinMaxResult::MinMax(a, b) => (a, b),
        };
        if self.min_auto {
            self.min = Some(self.min.map_or(lo, |m| m.min(lo)));
        }
        if self.max_auto {
            self.max = Some(self.max.map_or(hi, |m| m.max(hi)));
        }
    }

    /// Bottom of scale, if known.
    pub fn min(&self) -> Option<Float> {
        self.min
    }

    /// Top of scale, if known.
    pub fn max(&self) -> Option<Float> {
        self.max
    }

    /// True if bottom is auto scaled.
    pub fn min_auto(&self) -> bool {
        self.min_auto
    }

    /// True if top is auto scaled.
    pub fn max_auto(&self) -> bool {
        self.max_auto
    }

    /// Distance between top and bottom.
    pub fn range(&self) -> Option<Float> {
        Some(self.max? - self.min?)
    }

    /// Map dB value to 0.0 at the bottom, and 1.0 at the top. Not clamped.
    pub fn normalize(&self, db: Float) -> Float {
        let (Some(min), Some(range)) = (self.min, self.range()) else {
            return 0.0;
        };
        // A flat signal with auto scaling has no range.
        let range = if range.abs() < Float::EPSILON {
            1.0
        } else {
            range
        };
        (db - min) / range
    }

    /// Bottom, as shown in settings: `AUTO` or whole dB.
    pub fn min_string(&self) -> String {
        scale_string(self.min_auto, self.min)
    }

    /// Top, as shown in settings: `AUTO` or whole dB.
    pub fn max_string(&self) -> String {
        scale_string(self.max_auto, self.max)
    }
}

fn scale_string(auto: bool, v: Option<Float>) -> String {
    match (auto, v) {
        (true, _) | (false, None) => "AUTO".to_string(),
        (false, Some(v)) => format!("{v:.0}"),
    }
}

/// The last few frames, for smoothing the instant plot.
#[derive(Debug, Default)]
pub struct FrameHistory {
    frames: VecDeque<Vec<Float>>,
}

impl FrameHistory {
    /// Create empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add frame, keeping `fft_ave + 1` frames.
    ///
    /// If the depth or the frame length changed, the history is refilled
    /// with copies of this frame.
    pub fn push(&mut self, frame: Vec<Float>, fft_ave: usize) {
        let depth = fft_ave + 1;
        let reset = self.frames.len() != depth
            || self.frames.front().is_none_or(|f| f.len() != frame.len());
        if reset {
            self.frames = std::iter::repeat_n(frame, depth).collect();
            return;
        }
        self.frames.pop_front();
        self.frames.push_back(frame);
    }

    /// Number of frames held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if no frames have been pushed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Combine frames per bin: max if `peak`, otherwise mean.
    pub fn combine(&self, peak: bool) -> Vec<Float> {
        let Some(first) = self.frames.front() else {
            return Vec::new();
        };
        let mut out = first.clone();
        for f in self.frames.iter().skip(1) {
            for (o, v) in out.iter_mut().zip(f) {
                if peak {
                    *o = o.max(*v);
                } else {
                    *o += v;
                }
            }
        }
        if !peak {
            let n = self.frames.len() as Float;
            out.iter_mut().for_each(|o| *o /= n);
        }
        out
    }
}
