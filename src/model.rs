/*! Application state, and the step from samples to a row of dB values.

All frequencies here are in MHz, like on screen. The tuner gets Hz.
*/
use log::{debug, warn};

use crate::acquire::{Acquisition, Command};
use crate::settings::Settings;
use crate::spectrum::{FrameHistory, Intensity, SpectrumEngine, SpectrumParams, ZoomPlan};
use crate::tuner::Gain;
use crate::window::WindowKind;
use crate::{Float, Result};

/// Largest accepted number of frames to combine.
pub const MAX_FFT_AVE: usize = 100;

/// Sample rates RTL-SDR can do, in MHz.
const SAMPLE_RATE_RANGES: [(f64, f64); 2] = [(0.225001, 0.3), (0.900001, 3.2)];

/// Return true if an RTL-SDR can sample at this rate.
pub fn valid_sample_rate(mhz: f64) -> bool {
    SAMPLE_RATE_RANGES
        .iter()
        .any(|(lo, hi)| (*lo..=*hi).contains(&mhz))
}

/// FreqShow state.
pub struct FreqShowModel {
    width: usize,
    height: usize,
    center_freq: f64,
    sample_rate: f64,
    zoom: f64,
    lo_offset: f64,
    lo_freq: f64,
    gain: Gain,
    freq_correction: i32,
    swap_iq: bool,
    peak: bool,
    fft_ave: usize,
    tune_rate: f64,
    filter: WindowKind,
    kaiser_beta: Float,
    intensity: Intensity,
    acq: Acquisition,
    engine: SpectrumEngine,
}

impl FreqShowModel {
    /// Create model for a screen of the given size, and tune the radio.
    ///
    /// Settings out of range are replaced by defaults, with a warning.
    pub fn new(width: usize, height: usize, settings: &Settings, acq: Acquisition) -> Self {
        let defaults = Settings::default();
        let mut m = Self {
            width,
            height,
            center_freq: defaults.center_freq,
            sample_rate: defaults.sample_rate,
            zoom: defaults.zoom,
            lo_offset: defaults.lo_offset,
            lo_freq: 0.0,
            gain: settings.gain,
            freq_correction: settings.freq_correction,
            swap_iq: settings.swap_iq,
            peak: settings.peak,
            fft_ave: defaults.fft_ave,
            tune_rate: defaults.tune_rate,
            filter: settings.filter,
            kaiser_beta: defaults.kaiser_beta,
            intensity: Intensity::new(settings.min_intensity, settings.max_intensity),
            acq,
            engine: SpectrumEngine::new(),
        };
        m.send(Command::FreqCorrection(m.freq_correction));
        m.send(Command::Gain(m.gain));
        if !m.set_sample_rate(settings.sample_rate) {
            warn!("Invalid sample rate {} MHz in settings", settings.sample_rate);
            m.send(Command::SampleRate(m.sample_rate * 1e6));
        }
        if !m.set_zoom(settings.zoom) {
            warn!("Invalid zoom {} MHz in settings", settings.zoom);
        }
        if !m.set_lo_offset(settings.lo_offset) {
            warn!("Invalid LO offset {} MHz in settings", settings.lo_offset);
        }
        if !m.set_fft_ave(settings.fft_ave) {
            warn!("Invalid fft_ave {} in settings", settings.fft_ave);
        }
        if !m.set_tune_rate(settings.tune_rate) {
            warn!("Invalid tune rate {} MHz in settings", settings.tune_rate);
        }
        if !m.set_kaiser_beta(settings.kaiser_beta) {
            warn!("Invalid kaiser beta {} in settings", settings.kaiser_beta);
        }
        if !m.set_center_freq(settings.center_freq) {
            warn!("Invalid center frequency {} MHz in settings", settings.center_freq);
            m.retune();
        }
        m
    }

    /// Current settings, for saving.
    pub fn settings(&self) -> Settings {
        Settings {
            center_freq: self.center_freq,
            sample_rate: self.sample_rate,
            zoom: self.zoom,
            lo_offset: self.lo_offset,
            gain: self.gain,
            freq_correction: self.freq_correction,
            swap_iq: self.swap_iq,
            peak: self.peak,
            fft_ave: self.fft_ave,
            tune_rate: self.tune_rate,
            filter: self.filter,
            kaiser_beta: self.kaiser_beta,
            min_intensity: (!self.intensity.min_auto())
                .then_some(self.intensity.min())
                .flatten(),
            max_intensity: (!self.intensity.max_auto())
                .then_some(self.intensity.max())
                .flatten(),
        }
    }

    fn send(&mut self, cmd: Command) {
        if let Err(e) = self.acq.send(cmd) {
            // The next read reports this too.
            warn!("Failed to send {cmd:?}: {e}");
        }
    }

    // Frequency the tuner should be at. The LO offset is only used if the
    // DC spike then still ends up outside the displayed span.
    fn tuner_freq(&self) -> f64 {
        if (self.sample_rate / self.zoom) / 2.0 > self.lo_offset / self.zoom - self.zoom / 2.0 {
            self.center_freq + self.lo_offset
        } else {
            self.center_freq
        }
    }

    fn retune(&mut self) {
        self.lo_freq = self.tuner_freq();
        debug!(
            "Tuning to {:.6} MHz for center {:.6} MHz",
            self.lo_freq, self.center_freq
        );
        self.send(Command::CenterFreq(self.lo_freq * 1e6));
        self.intensity.clear();
    }

    /// Screen width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Screen height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Displayed center frequency.
    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    /// Set displayed center frequency. Returns false if rejected.
    pub fn set_center_freq(&mut self, mhz: f64) -> bool {
        if !mhz.is_finite() || mhz <= 0.0 {
            return false;
        }
        self.center_freq = mhz;
        self.retune();
        true
    }

    /// Frequency the tuner is tuned to.
    pub fn lo_freq(&self) -> f64 {
        self.lo_freq
    }

    /// Sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set sample rate. Returns false, changing nothing, if the hardware
    /// can't do it.
    pub fn set_sample_rate(&mut self, mhz: f64) -> bool {
        if !valid_sample_rate(mhz) {
            return false;
        }
        self.sample_rate = mhz;
        self.send(Command::SampleRate(mhz * 1e6));
        self.retune();
        true
    }

    /// Displayed span.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set displayed span. Returns false if rejected.
    ///
    /// A span wider than the sample rate shows the whole sample rate.
    pub fn set_zoom(&mut self, mhz: f64) -> bool {
        if !mhz.is_finite() || mhz <= 0.0 {
            return false;
        }
        self.zoom = mhz;
        self.retune();
        true
    }

    /// LO offset.
    pub fn lo_offset(&self) -> f64 {
        self.lo_offset
    }

    /// Set LO offset. May be negative.
    pub fn set_lo_offset(&mut self, mhz: f64) -> bool {
        if !mhz.is_finite() {
            return false;
        }
        self.lo_offset = mhz;
        self.retune();
        true
    }

    /// Tuner gain.
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Set tuner gain.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
        self.send(Command::Gain(gain));
        self.intensity.clear();
    }

    /// Frequency correction.
    pub fn freq_correction(&self) -> i32 {
        self.freq_correction
    }

    /// Set frequency correction.
    pub fn set_freq_correction(&mut self, ppm: i32) {
        self.freq_correction = ppm;
        self.send(Command::FreqCorrection(ppm));
    }

    /// Y axis scale.
    pub fn intensity(&self) -> &Intensity {
        &self.intensity
    }

    /// Set bottom of scale. `None` for auto.
    pub fn set_min_intensity(&mut self, db: Option<Float>) {
        self.intensity.set_min(db);
    }

    /// Set top of scale. `None` for auto.
    pub fn set_max_intensity(&mut self, db: Option<Float>) {
        self.intensity.set_max(db);
    }

    /// Bottom of scale, `AUTO` or whole dB.
    pub fn min_string(&self) -> String {
        self.intensity.min_string()
    }

    /// Top of scale, `AUTO` or whole dB.
    pub fn max_string(&self) -> String {
        self.intensity.max_string()
    }

    /// Number of old frames to combine with the current one.
    pub fn fft_ave(&self) -> usize {
        self.fft_ave
    }

    /// Set number of frames to combine. Must be more than one.
    pub fn set_fft_ave(&mut self, n: usize) -> bool {
        if n <= 1 || n > MAX_FFT_AVE {
            return false;
        }
        self.fft_ave = n;
        true
    }

    /// How far one press of `<` or `>` tunes.
    pub fn tune_rate(&self) -> f64 {
        self.tune_rate
    }

    /// Set tune rate.
    pub fn set_tune_rate(&mut self, mhz: f64) -> bool {
        if !mhz.is_finite() {
            return false;
        }
        self.tune_rate = mhz;
        true
    }

    /// Window function.
    pub fn filter(&self) -> WindowKind {
        self.filter
    }

    /// Set window function.
    pub fn set_filter(&mut self, kind: WindowKind) {
        self.filter = kind;
    }

    /// Kaiser window beta.
    pub fn kaiser_beta(&self) -> Float {
        self.kaiser_beta
    }

    /// Set kaiser window beta. Must not be negative.
    pub fn set_kaiser_beta(&mut self, beta: Float) -> bool {
        if !beta.is_finite() || beta < 0.0 {
            return false;
        }
        self.kaiser_beta = beta;
        true
    }

    /// Swap I and Q.
    pub fn swap_iq(&self) -> bool {
        self.swap_iq
    }

    /// Set swap I and Q.
    pub fn set_swap_iq(&mut self, swap: bool) {
        self.swap_iq = swap;
    }

    /// Show peak, as opposed to average, of recent frames.
    pub fn peak(&self) -> bool {
        self.peak
    }

    /// Set peak mode.
    pub fn set_peak(&mut self, peak: bool) {
        self.peak = peak;
    }

    /// Zoom plan for the current settings.
    pub fn plan(&self) -> ZoomPlan {
        ZoomPlan::new(self.width, self.sample_rate, self.zoom)
    }

    /// Hz between FFT bins.
    pub fn freq_step(&self) -> f64 {
        self.plan().freq_step_hz()
    }

    /// Read samples and return one row of dB values, `width` long.
    ///
    /// The zoom is set to what's actually shown, which is the sample rate
    /// if zoomed out too far, or in too far.
    pub fn get_data(&mut self) -> Result<Vec<Float>> {
        let plan = self.plan();
        if plan.span_mhz != self.zoom {
            debug!("Zoom {} MHz not possible, showing {} MHz", self.zoom, plan.span_mhz);
            self.zoom = plan.span_mhz;
            if self.tuner_freq() != self.lo_freq {
                self.retune();
            }
        }
        let samples = self.acq.read()?;
        let params = SpectrumParams {
            width: self.width,
            plan,
            window: self.filter,
            kaiser_beta: self.kaiser_beta,
            swap_iq: self.swap_iq,
            lo_offset_mhz: self.lo_offset,
        };
        let row = self.engine.compute(&samples, &params)?;
        self.intensity.update(&row);
        Ok(row)
    }

    /// Read samples into the frame history, and return the combined row.
    pub fn get_combined(&mut self, history: &mut FrameHistory) -> Result<Vec<Float>> {
        let row = self.get_data()?;
        history.push(row, self.fft_ave);
        Ok(history.combine(self.peak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SDR_SAMPLE_SIZE;
    use crate::tuner::{SimulatedTuner, Tuner};

    fn argmax(v: &[Float]) -> usize {
        v.iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0
    }

    fn model(settings: &Settings, tones: Vec<(f64, Float)>) -> Result<FreqShowModel> {
        let acq = Acquisition::spawn(
            move || Ok(Box::new(SimulatedTuner::new(tones).noise(0.001)) as Box<dyn Tuner>),
            SDR_SAMPLE_SIZE,
        )?;
        Ok(FreqShowModel::new(320, 240, settings, acq))
    }

    // 230kHz over 1474 bins.
    const STEP: f64 = 230_000.0 / 1474.0;

    #[test]
    fn tone_position() -> Result<()> {
        let settings = Settings {
            lo_offset: 0.0,
            swap_iq: false,
            ..Default::default()
        };
        let c = settings.center_freq * 1e6;
        let mut m = model(&settings, vec![(c + 10.0 * STEP, 1.0)])?;
        assert!((m.freq_step() - STEP).abs() < 1e-9);
        let row = m.get_data()?;
        assert_eq!(row.len(), 320);
        assert_eq!(argmax(&row), 169);

        m.set_swap_iq(true);
        let row = m.get_data()?;
        assert_eq!(argmax(&row), 151);
        Ok(())
    }

    #[test]
    fn lo_offset_keeps_center() -> Result<()> {
        let settings = Settings {
            swap_iq: false,
            ..Default::default()
        };
        let c = settings.center_freq * 1e6;
        let mut m = model(&settings, vec![(c, 1.0)])?;
        assert!((m.lo_freq() - 70.4815).abs() < 1e-9);
        let p = argmax(&m.get_data()?);
        assert!((159..=161).contains(&p), "peak at {p}");
        Ok(())
    }

    #[test]
    fn retune_shows_new_frequency() -> Result<()> {
        let settings = Settings {
            lo_offset: 0.0,
            swap_iq: false,
            ..Default::default()
        };
        let c = settings.center_freq * 1e6;
        let mut m = model(&settings, vec![(c + 10.0 * STEP, 1.0)])?;
        assert_eq!(argmax(&m.get_data()?), 169);
        // Tune up 20 bins. Now the tone is 10 bins left of center.
        m.set_center_freq(settings.center_freq + 20.0 * STEP / 1e6);
        assert_eq!(argmax(&m.get_data()?), 151);
        Ok(())
    }

    #[test]
    fn lo_offset_rule() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        assert!((m.lo_freq() - (70.4515 + 0.03)).abs() < 1e-9);
        // Offset way outside the sample rate: tune to the center.
        assert!(m.set_lo_offset(0.2));
        assert!((m.lo_freq() - 70.4515).abs() < 1e-9);
        assert!(m.set_lo_offset(-0.01));
        assert!((m.lo_freq() - 70.4415).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn sample_rate_ranges() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        assert!(!m.set_sample_rate(0.5));
        assert_eq!(m.sample_rate(), 0.230);
        assert!(!m.set_sample_rate(0.225));
        assert!(!m.set_sample_rate(3.3));
        assert!(m.set_sample_rate(0.25));
        assert!(m.set_sample_rate(2.4));
        assert_eq!(m.sample_rate(), 2.4);
        assert!(valid_sample_rate(0.3));
        assert!(valid_sample_rate(3.2));
        assert!(!valid_sample_rate(0.9));
        Ok(())
    }

    #[test]
    fn zoom_out_clamps() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        assert!(!m.set_zoom(0.0));
        assert!(m.set_zoom(1.0));
        let row = m.get_data()?;
        assert_eq!(row.len(), 320);
        assert_eq!(m.zoom(), 0.230);
        Ok(())
    }

    #[test]
    fn validated_setters() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        assert!(!m.set_fft_ave(1));
        assert!(!m.set_fft_ave(MAX_FFT_AVE + 1));
        assert!(m.set_fft_ave(5));
        assert_eq!(m.fft_ave(), 5);
        assert!(!m.set_kaiser_beta(-1.0));
        assert!(m.set_kaiser_beta(0.0));
        assert!(!m.set_tune_rate(f64::NAN));
        assert!(!m.set_center_freq(-1.0));
        Ok(())
    }

    #[test]
    fn auto_scale() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        assert_eq!(m.min_string(), "-10");
        assert_eq!(m.max_string(), "50");
        m.set_min_intensity(None);
        m.set_max_intensity(None);
        assert_eq!(m.max_string(), "AUTO");
        assert_eq!(m.intensity().range(), None);
        let row = m.get_data()?;
        let min = row.iter().copied().fold(Float::INFINITY, Float::min);
        assert_eq!(m.intensity().min(), Some(min));
        m.set_gain(Gain::Manual(10.0));
        assert_eq!(m.intensity().min(), None);
        Ok(())
    }

    #[test]
    fn bad_settings_use_defaults() -> Result<()> {
        let settings = Settings {
            sample_rate: 0.5,
            fft_ave: 0,
            zoom: -1.0,
            ..Default::default()
        };
        let m = model(&settings, vec![])?;
        assert_eq!(m.sample_rate(), 0.230);
        assert_eq!(m.fft_ave(), 3);
        assert_eq!(m.zoom(), 0.05);
        Ok(())
    }

    #[test]
    fn settings_round_trip() -> Result<()> {
        let settings = Settings {
            center_freq: 100.3,
            gain: Gain::Manual(20.0),
            filter: WindowKind::Kaiser,
            kaiser_beta: 5.0,
            min_intensity: None,
            peak: false,
            ..Default::default()
        };
        let m = model(&settings, vec![])?;
        assert_eq!(m.settings(), settings);
        Ok(())
    }

    #[test]
    fn history_combines() -> Result<()> {
        let mut m = model(&Settings::default(), vec![])?;
        let mut h = FrameHistory::new();
        let row = m.get_combined(&mut h)?;
        assert_eq!(row.len(), 320);
        assert_eq!(h.len(), 4);
        Ok(())
    }
}
