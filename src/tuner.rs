/*! Tuners: things that produce I/Q samples at a given frequency.

The real thing is an RTL-SDR dongle, behind the `rtlsdr` feature. RTL-SDRs
are the most common type of SDR hardware. They're cheap, and good for up to
about 2.8Msps from about 24MHz to 1.75Ghz.

Without hardware, a capture file made with `rtl_sdr` can be replayed, or a
set of tones can be simulated.
*/
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::time::Duration;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decode::decode_u8_iq;
use crate::{Complex, Error, Float, Repeat, Result};

/// Tuner gain.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gain {
    /// Let the tuner pick.
    Auto,
    /// Fixed gain, in dB.
    Manual(Float),
}

impl std::fmt::Display for Gain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Gain::Auto => write!(f, "AUTO"),
            Gain::Manual(db) => write!(f, "{db:.1}"),
        }
    }
}

impl std::str::FromStr for Gain {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Gain::Auto);
        }
        let db: Float = s.parse().map_err(|_| Error::invalid("gain", s))?;
        if !db.is_finite() {
            return Err(Error::invalid("gain", s));
        }
        Ok(Gain::Manual(db))
    }
}

impl TryFrom<String> for Gain {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Gain> for String {
    fn from(g: Gain) -> String {
        g.to_string()
    }
}

/// A source of I/Q samples that can be tuned.
///
/// Setters that fail leave the tuner as it was.
pub trait Tuner {
    /// Name of tuner, for logging.
    fn name(&self) -> &str;

    /// Set center frequency, in Hz.
    fn set_center_freq(&mut self, hz: f64) -> Result<()>;

    /// Set sample rate, in samples per second.
    fn set_sample_rate(&mut self, hz: f64) -> Result<()>;

    /// Set gain.
    fn set_gain(&mut self, gain: Gain) -> Result<()>;

    /// Set frequency correction, in parts per million.
    fn set_freq_correction(&mut self, ppm: i32) -> Result<()>;

    /// Read exactly `n` samples.
    fn read_samples(&mut self, n: usize) -> Result<Vec<Complex>>;
}

#[derive(Debug)]
struct Tone {
    freq: f64,
    amplitude: Float,
    phase: f64,
}

/// Simulated tuner, producing pure tones at fixed absolute frequencies,
/// plus some noise.
///
/// # Example
///
/// ```
/// use freqshow::tuner::{SimulatedTuner, Tuner};
/// let mut t = SimulatedTuner::new(vec![(100.01e6, 1.0)]);
/// t.set_center_freq(100e6)?;
/// t.set_sample_rate(250e3)?;
/// assert_eq!(t.read_samples(1024)?.len(), 1024);
/// # Ok::<(), freqshow::Error>(())
/// ```
pub struct SimulatedTuner {
    tones: Vec<Tone>,
    center: f64,
    samp_rate: f64,
    gain: Float,
    ppm: i32,
    noise: Float,
    inverted: bool,
    paced: bool,
    rng: StdRng,
}

impl SimulatedTuner {
    /// Create new simulated tuner, with tones given as (Hz, amplitude).
    pub fn new(tones: Vec<(f64, Float)>) -> Self {
        Self {
            tones: tones
                .into_iter()
                .map(|(freq, amplitude)| Tone {
                    freq,
                    amplitude,
                    phase: 0.0,
                })
                .collect(),
            center: 100e6,
            samp_rate: 230e3,
            gain: 1.0,
            ppm: 0,
            noise: 0.01,
            inverted: false,
            paced: false,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Set noise amplitude. Uniform, on both I and Q.
    pub fn noise(mut self, amplitude: Float) -> Self {
        self.noise = amplitude;
        self
    }

    /// Set noise seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Produce a mirrored spectrum, like a receiver tapping an inverted IF.
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Sleep as long as the samples would take to arrive from hardware.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }
}

impl Tuner for SimulatedTuner {
    fn name(&self) -> &str {
        "SimulatedTuner"
    }
    fn set_center_freq(&mut self, hz: f64) -> Result<()> {
        self.center = hz;
        Ok(())
    }
    fn set_sample_rate(&mut self, hz: f64) -> Result<()> {
        if hz <= 0.0 {
            return Err(Error::invalid("sample rate", hz));
        }
        self.samp_rate = hz;
        Ok(())
    }
    fn set_gain(&mut self, gain: Gain) -> Result<()> {
        self.gain = match gain {
            Gain::Auto => 1.0,
            Gain::Manual(db) => (10.0 as Float).powf(db / 20.0),
        };
        Ok(())
    }
    fn set_freq_correction(&mut self, ppm: i32) -> Result<()> {
        self.ppm = ppm;
        Ok(())
    }
    fn read_samples(&mut self, n: usize) -> Result<Vec<Complex>> {
        let tau = 2.0 * std::f64::consts::PI;
        let correction = self.ppm as f64 * self.center / 1e6;
        let steps: Vec<f64> = self
            .tones
            .iter()
            .map(|t| tau * (t.freq - self.center - correction) / self.samp_rate)
            .collect();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let mut s = Complex::new(
                self.rng.random_range(-1.0..=1.0) * self.noise,
                self.rng.random_range(-1.0..=1.0) * self.noise,
            );
            for (tone, step) in self.tones.iter_mut().zip(&steps) {
                s += Complex::from_polar(tone.amplitude, tone.phase as Float);
                tone.phase = (tone.phase + step) % tau;
            }
            s *= self.gain;
            out.push(if self.inverted { s.conj() } else { s });
        }
        if self.paced {
            std::thread::sleep(Duration::from_secs_f64(n as f64 / self.samp_rate));
        }
        Ok(out)
    }
}

/// Replay a raw capture file, as written by `rtl_sdr`.
///
/// The file is interleaved unsigned 8 bit I/Q. Tuning has no effect on the
/// data, but is logged.
pub struct FileTuner {
    filename: String,
    reader: BufReader<File>,
    repeat: Repeat,
    samp_rate: f64,
    paced: bool,
}

impl FileTuner {
    /// Open capture file.
    pub fn new(filename: &str, repeat: Repeat) -> Result<Self> {
        let f = File::open(filename)
            .map_err(|e| Error::wrap(e.into(), format!("opening capture {filename}")))?;
        debug!("Opening source {filename}");
        Ok(Self {
            filename: filename.to_string(),
            reader: BufReader::new(f),
            repeat,
            samp_rate: 230e3,
            paced: false,
        })
    }

    /// Sleep as long as the samples would take to arrive from hardware.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }
}

impl Tuner for FileTuner {
    fn name(&self) -> &str {
        "FileTuner"
    }
    fn set_center_freq(&mut self, hz: f64) -> Result<()> {
        debug!("{}: ignoring center frequency {hz}", self.filename);
        Ok(())
    }
    fn set_sample_rate(&mut self, hz: f64) -> Result<()> {
        if hz <= 0.0 {
            return Err(Error::invalid("sample rate", hz));
        }
        self.samp_rate = hz;
        Ok(())
    }
    fn set_gain(&mut self, gain: Gain) -> Result<()> {
        debug!("{}: ignoring gain {gain}", self.filename);
        Ok(())
    }
    fn set_freq_correction(&mut self, ppm: i32) -> Result<()> {
        debug!("{}: ignoring frequency correction {ppm}", self.filename);
        Ok(())
    }
    fn read_samples(&mut self, n: usize) -> Result<Vec<Complex>> {
        let mut buf = vec![0u8; 2 * n];
        let mut have = 0;
        let mut rewound_at = None;
        while have < buf.len() {
            let rc = self.reader.read(&mut buf[have..])?;
            if rc > 0 {
                have += rc;
                continue;
            }
            // EOF.
            if rewound_at == Some(have) {
                return Err(Error::msg(format!("{} has no samples", self.filename)));
            }
            if !self.repeat.again() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("end of {}", self.filename),
                )));
            }
            info!("{}: rewinding", self.filename);
            self.reader.seek(SeekFrom::Start(0))?;
            rewound_at = Some(have);
        }
        if self.paced {
            std::thread::sleep(Duration::from_secs_f64(n as f64 / self.samp_rate));
        }
        Ok(decode_u8_iq(&buf))
    }
}

#[cfg(feature = "rtlsdr")]
pub use rtl::RtlSdrTuner;

#[cfg(feature = "rtlsdr")]
mod rtl {
    use log::{debug, warn};

    use super::{Gain, Tuner};
    use crate::decode::decode_u8_iq;
    use crate::{Complex, Error, Result};

    // librtlsdr wants reads in multiples of this.
    const READ_ALIGN: usize = 512;

    impl From<rtlsdr::RTLSDRError> for Error {
        fn from(e: rtlsdr::RTLSDRError) -> Self {
            Error::Device(format!("RTL SDR Error: {}", e))
        }
    }

    /// RTL SDR tuner.
    ///
    /// The device handle can't move between threads, so create it on the
    /// thread that reads from it.
    pub struct RtlSdrTuner {
        dev: rtlsdr::RTLSDRDevice,
        ppm: i32,
    }

    impl RtlSdrTuner {
        /// Open RTL SDR by index.
        pub fn new(index: i32) -> Result<Self> {
            let found = rtlsdr::get_device_count();
            if index >= found {
                return Err(Error::Device(format!(
                    "RTL SDR index {index} doesn't exist, found {found}"
                )));
            }
            let mut dev =
                rtlsdr::open(index).map_err(|e| Error::Device(format!("RTL SDR open: {e}")))?;
            debug!("Tuner type: {:?}", dev.get_tuner_type());
            dev.reset_buffer()?;
            Ok(Self { dev, ppm: 0 })
        }
    }

    impl Tuner for RtlSdrTuner {
        fn name(&self) -> &str {
            "RtlSdrTuner"
        }
        fn set_center_freq(&mut self, hz: f64) -> Result<()> {
            self.dev.set_center_freq(hz.round() as u32)?;
            Ok(())
        }
        fn set_sample_rate(&mut self, hz: f64) -> Result<()> {
            self.dev.set_sample_rate(hz.round() as u32)?;
            debug!("Set sample rate {}", self.dev.get_sample_rate()?);
            Ok(())
        }
        fn set_gain(&mut self, gain: Gain) -> Result<()> {
            match gain {
                Gain::Auto => self.dev.set_tuner_gain_mode(false)?,
                Gain::Manual(db) => {
                    let want = (db * 10.0).round() as i32;
                    let gains = self.dev.get_tuner_gains()?;
                    debug!("Allowed tuner gains: {gains:?}");
                    let Some(best) = gains.iter().copied().min_by_key(|g| (g - want).abs())
                    else {
                        return Err(Error::Device("tuner reports no gains".to_string()));
                    };
                    self.dev.set_tuner_gain_mode(true)?;
                    self.dev.set_tuner_gain(best)?;
                    debug!("Tuner gain: {}", self.dev.get_tuner_gain());
                }
            }
            Ok(())
        }
        fn set_freq_correction(&mut self, ppm: i32) -> Result<()> {
            // librtlsdr returns an error when setting the value it already has.
            if ppm == self.ppm {
                return Ok(());
            }
            self.dev.set_freq_correction(ppm)?;
            self.ppm = ppm;
            Ok(())
        }
        fn read_samples(&mut self, n: usize) -> Result<Vec<Complex>> {
            let want = 2 * n;
            let chunk = want.div_ceil(READ_ALIGN) * READ_ALIGN;
            let mut buf = Vec::with_capacity(chunk);
            while buf.len() < want {
                let got = self.dev.read_sync(chunk)?;
                if got.is_empty() {
                    warn!("RTL SDR returned no data");
                }
                buf.extend(got);
            }
            buf.truncate(want);
            Ok(decode_u8_iq(&buf))
        }
    }
}
