//! Persistent settings.
//!
//! Stored as JSON. Missing fields take the FreqShow defaults, so an empty
//! object is a valid settings file.
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::tuner::Gain;
use crate::window::WindowKind;
use crate::{Float, Result};

/// User settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Displayed center frequency, in MHz.
    pub center_freq: f64,

    /// Sample rate, in MHz.
    pub sample_rate: f64,

    /// Displayed span, in MHz.
    pub zoom: f64,

    /// Tune the hardware this far away from the displayed center, in
    /// MHz, to move the DC spike off screen.
    pub lo_offset: f64,

    /// Tuner gain.
    pub gain: Gain,

    /// Frequency correction, in ppm.
    pub freq_correction: i32,

    /// Swap I and Q.
    pub swap_iq: bool,

    /// Show peaks of the last frames, instead of their average.
    pub peak: bool,

    /// Number of frames to combine, besides the current one.
    pub fft_ave: usize,

    /// How far `<` and `>` tune, in MHz.
    pub tune_rate: f64,

    /// Window function.
    pub filter: WindowKind,

    /// Kaiser window beta.
    pub kaiser_beta: Float,

    /// Bottom of scale in dB. `None` for auto.
    pub min_intensity: Option<Float>,

    /// Top of scale in dB. `None` for auto.
    pub max_intensity: Option<Float>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            center_freq: 70.4515,
            sample_rate: 0.230,
            zoom: 0.05,
            lo_offset: 0.03,
            gain: Gain::Auto,
            freq_correction: 0,
            swap_iq: true,
            peak: true,
            fft_ave: 3,
            tune_rate: 0.001,
            filter: WindowKind::Nuttall,
            kaiser_beta: 8.6,
            min_intensity: Some(-10.0),
            max_intensity: Some(50.0),
        }
    }
}

impl Settings {
    /// Load settings from JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let f = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }

    /// Load settings from JSON file, or return defaults if it doesn't exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(&path) {
            Err(crate::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings in {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save settings as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Saving settings to {}", path.display());
        let mut f = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut f, self)?;
        f.write_all(b"\n")?;
        f.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let path = tmpd.path().join("settings.json");
        let s = Settings {
            center_freq: 145.8,
            gain: Gain::Manual(19.7),
            filter: WindowKind::Kaiser,
            min_intensity: None,
            ..Default::default()
        };
        s.save(&path)?;
        let got = Settings::load(&path)?;
        assert_eq!(got, s);
        Ok(())
    }

    #[test]
    fn missing_fields() -> Result<()> {
        let s: Settings = serde_json::from_str(r#"{"center_freq": 100.1, "gain": "auto"}"#)?;
        assert_eq!(s.center_freq, 100.1);
        assert_eq!(s.gain, Gain::Auto);
        assert_eq!(s.sample_rate, 0.230);
        assert_eq!(s.filter, WindowKind::Nuttall);
        assert_eq!(s.max_intensity, Some(50.0));

        let s: Settings = serde_json::from_str("{}")?;
        assert_eq!(s, Settings::default());
        Ok(())
    }

    #[test]
    fn bad_values() {
        assert!(serde_json::from_str::<Settings>(r#"{"gain": "loud"}"#).is_err());
        assert!(serde_json::from_str::<Settings>(r#"{"filter": "square"}"#).is_err());
    }

    #[test]
    fn load_missing() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let path = tmpd.path().join("nope.json");
        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(&path)?, Settings::default());
        Ok(())
    }
}
