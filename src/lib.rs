/*! FreqShow is a panadapter for RTL-SDR receivers.

It shows a slice of radio spectrum either as an instantaneous line plot,
or as a scrolling waterfall, with a settings UI that is driven by
clicks. It was written for small touch screens, and here the screen is
a terminal and the touch is the mouse.

# Architecture overview

Samples are read from a [`tuner::Tuner`] on a background thread owned
by [`acquire::Acquisition`]. The [`model::FreqShowModel`] holds every
user setting, and turns a block of samples into one row of dB values,
exactly as wide as the screen.

```text
     [ Tuner: RTL-SDR, file replay, or simulated ]
                     ↓
     [ Acquisition reader thread              ]
     [ (generation tagged sample blocks)      ]
                     ↓
     [ Model: window → FFT → crop → dB        ]
                     ↓
     [ Controller: instant / waterfall /      ]
     [ settings / dialogs                     ]
                     ↓
     [ Surface: RGB pixels and text labels    ]
                     ↓
     [ Terminal (ratatui), or PPM snapshot    ]
```

# Examples

Compute one spectrum row from a simulated tone:

```
use freqshow::acquire::Acquisition;
use freqshow::model::FreqShowModel;
use freqshow::settings::Settings;
use freqshow::tuner::{SimulatedTuner, Tuner};

let settings = Settings::default();
let tuner = SimulatedTuner::new(vec![(70.46e6, 1.0)]);
let acq = Acquisition::spawn(
    move || Ok(Box::new(tuner) as Box<dyn Tuner>),
    freqshow::spectrum::SDR_SAMPLE_SIZE,
)?;
let mut model = FreqShowModel::new(320, 240, &settings, acq);
let row = model.get_data()?;
assert_eq!(row.len(), 320);
# Ok::<(), freqshow::Error>(())
```

## Links

* FreqShow, the Python original: <https://github.com/adafruit/FreqShow>
* librtlsdr: <https://github.com/osmocom/rtl-sdr>
 */

pub mod acquire;
pub mod controller;
pub mod decode;
pub mod model;
pub mod settings;
pub mod spectrum;
pub mod surface;
pub mod tui;
pub mod tuner;
pub mod ui;
pub mod views;
pub mod window;

/// Float type used. Usually f32, but not guaranteed.
pub type Float = f32;

/// Complex (I/Q) data.
pub type Complex = num_complex::Complex<Float>;

/// FreqShow error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or writing settings.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the radio hardware.
    #[error("Device error: {0}")]
    Device(String),

    /// A setting was given a value it can't take.
    #[error("Invalid value {value:?} for {setting}")]
    InvalidSetting {
        /// Human readable setting name.
        setting: &'static str,
        /// The rejected value.
        value: String,
    },

    /// No samples arrived in time.
    #[error("timed out waiting for samples after {0:?}")]
    Timeout(std::time::Duration),

    /// The reader thread is gone.
    #[error("sample reader stopped: {0}")]
    AcquisitionGone(String),

    /// Some other error, with a message.
    #[error("{0}")]
    Plain(String),

    /// Another error, with added context.
    #[error("{msg}: {source}")]
    Wrap {
        /// Context.
        msg: String,
        /// The underlying error.
        source: Box<Error>,
    },
}

impl Error {
    /// Create error from message.
    pub fn msg<S: Into<String>>(msg: S) -> Self {
        Self::Plain(msg.into())
    }

    /// Wrap an error with some context.
    pub fn wrap<S: Into<String>>(e: Error, msg: S) -> Self {
        Self::Wrap {
            msg: msg.into(),
            source: Box::new(e),
        }
    }

    /// Create an invalid setting error.
    pub fn invalid(setting: &'static str, value: impl std::fmt::Display) -> Self {
        Self::InvalidSetting {
            setting,
            value: value.to_string(),
        }
    }
}

/// FreqShow result.
pub type Result<T> = std::result::Result<T, Error>;

/// Repeat between zero and infinite times.
#[derive(Debug)]
pub struct Repeat {
    repeater: Repeater,
    count: u64,
}

impl Repeat {
    /// Repeat finite number of times. 0 Means not even once. 1 is default.
    pub fn finite(n: u64) -> Self {
        Self {
            repeater: Repeater::Finite(n),
            count: 0,
        }
    }

    /// Repeat infinite number of times.
    pub fn infinite() -> Self {
        Self {
            repeater: Repeater::Infinite,
            count: 0,
        }
    }

    /// Register a repeat being done, and return true if we should continue.
    #[must_use]
    pub fn again(&mut self) -> bool {
        self.count += 1;
        match self.repeater {
            Repeater::Finite(n) => {
                self.repeater = Repeater::Finite(n.saturating_sub(1));
                n > 1
            }
            Repeater::Infinite => true,
        }
    }

    /// Return true if repeating is done.
    #[must_use]
    pub fn done(&self) -> bool {
        match self.repeater {
            Repeater::Finite(n) => n == 0,
            Repeater::Infinite => false,
        }
    }

    /// Return how many repeats have fully completed.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[derive(Debug)]
enum Repeater {
    Finite(u64),
    Infinite,
}

/// Parse a frequency, with optional SI suffix.
///
/// ```
/// use freqshow::parse_frequency;
/// assert_eq!(parse_frequency("300k")?, 300_000.0);
/// assert_eq!(parse_frequency("70.4515M")?, 70_451_500.0);
/// # Ok::<(), freqshow::Error>(())
/// ```
pub fn parse_frequency(s: &str) -> Result<f64> {
    let s = s.trim();
    let (num, mul) = match s.chars().last().map(|c| c.to_ascii_lowercase()) {
        Some('k') => (&s[..s.len() - 1], 1e3),
        Some('m') => (&s[..s.len() - 1], 1e6),
        Some('g') => (&s[..s.len() - 1], 1e9),
        _ => (s, 1.0),
    };
    let v: f64 = num
        .trim()
        .parse()
        .map_err(|_| Error::invalid("frequency", s))?;
    // Round away float noise, so that "70.4515m" is exactly 70451500.
    Ok((v * mul * 1000.0).round() / 1000.0)
}

/// Parse verbosity, either as a number or a log level name.
pub fn parse_verbosity(s: &str) -> Result<usize> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "error" => 0,
        "warn" => 1,
        "info" => 2,
        "debug" => 3,
        "trace" => 4,
        other => other.parse().map_err(|_| Error::invalid("verbosity", s))?,
    })
}

#[cfg(test)]
pub mod tests {
    //! Test helper functions.
    use super::*;

    /// For testing, assert that two slices are almost equal.
    ///
    /// Floating point numbers are almost never exactly equal.
    pub fn assert_almost_equal_float(left: &[Float], right: &[Float]) {
        assert_eq!(
            left.len(),
            right.len(),
            "\nleft: {:?}\nright: {:?}",
            left,
            right
        );
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).abs();
            if dist > 0.001 {
                assert_eq!(
                    left[i], right[i],
                    "\nElement {i}:\nleft: {:?}\nright: {:?}",
                    left, right
                );
            }
        }
    }

    #[test]
    fn frequencies() -> Result<()> {
        assert_eq!(parse_frequency("100")?, 100.0);
        assert_eq!(parse_frequency("2.4G")?, 2_400_000_000.0);
        assert_eq!(parse_frequency("230k")?, 230_000.0);
        assert!(parse_frequency("k").is_err());
        assert!(parse_frequency("").is_err());
        assert!(parse_frequency("12x").is_err());
        Ok(())
    }

    #[test]
    fn verbosity() -> Result<()> {
        assert_eq!(parse_verbosity("info")?, 2);
        assert_eq!(parse_verbosity("TRACE")?, 4);
        assert_eq!(parse_verbosity("3")?, 3);
        assert!(parse_verbosity("loud").is_err());
        Ok(())
    }

    #[test]
    fn repeat() {
        let mut r = Repeat::finite(2);
        assert!(!r.done());
        assert!(r.again());
        assert!(!r.again());
        assert!(r.done());
        assert_eq!(r.count(), 2);

        let mut r = Repeat::infinite();
        for _ in 0..10 {
            assert!(r.again());
        }
        assert!(!r.done());
        assert_eq!(r.count(), 10);
    }

    #[test]
    fn wrapped_error() {
        let e = Error::wrap(Error::msg("inner"), "outer");
        assert_eq!(e.to_string(), "outer: inner");
        let e = Error::invalid("gain", "x");
        assert_eq!(e.to_string(), "Invalid value \"x\" for gain");
    }
}
