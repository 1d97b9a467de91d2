//! FreqShow panadapter.
//!
//! ```text
//! freqshow --simulate 70.46m,70.44m
//! freqshow --file capture.u8 --repeat
//! freqshow --device 0 --freq 144.8m --config ~/.freqshow.json --save
//! freqshow --simulate 70.46m --headless --frames 20 --snapshot out.ppm
//! freqshow --simulate 70.46m --invert
//! ```
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use freqshow::acquire::Acquisition;
use freqshow::controller::Controller;
use freqshow::model::FreqShowModel;
use freqshow::settings::Settings;
use freqshow::spectrum::SDR_SAMPLE_SIZE;
use freqshow::tui::{CancellationToken, run_headless, run_tui};
use freqshow::tuner::{FileTuner, SimulatedTuner, Tuner};
use freqshow::{Repeat, parse_frequency, parse_verbosity};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Layout {
    /// 120x64 pixels.
    Small,
    /// 160x96 pixels.
    Large,
}

impl Layout {
    fn size(&self) -> (usize, usize) {
        match self {
            Layout::Small => (120, 64),
            Layout::Large => (160, 96),
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Verbosity level.
    #[arg(short, value_parser=parse_verbosity, default_value = "warn")]
    verbose: usize,

    /// Settings file to load.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save settings to the config file on exit.
    #[arg(long, requires = "config")]
    save: bool,

    /// Center frequency, overriding the settings.
    #[arg(long, value_parser=parse_frequency)]
    freq: Option<f64>,

    /// Simulate tones at these frequencies.
    #[arg(long, value_parser=parse_frequency, value_delimiter = ',')]
    simulate: Vec<f64>,

    /// Mirror the simulated spectrum, like a radio that needs swapped I/Q.
    #[arg(long, requires = "simulate")]
    invert: bool,

    /// Replay rtl_sdr capture file.
    #[arg(long, conflicts_with = "simulate")]
    file: Option<String>,

    /// Replay the capture file forever.
    #[arg(long, requires = "file")]
    repeat: bool,

    /// RTL-SDR device index.
    #[cfg(feature = "rtlsdr")]
    #[arg(long, default_value_t = 0)]
    device: i32,

    /// Screen layout.
    #[arg(long, value_enum, default_value = "large")]
    layout: Layout,

    /// Screen width in pixels, overriding the layout.
    #[arg(long)]
    width: Option<usize>,

    /// Screen height in pixels, overriding the layout. One terminal row is
    /// two pixels.
    #[arg(long)]
    height: Option<usize>,

    /// Time between screen updates.
    #[arg(long, value_parser=humantime::parse_duration, default_value = "50ms")]
    refresh: Duration,

    /// Run without a terminal.
    #[arg(long)]
    headless: bool,

    /// Frames to render when headless.
    #[arg(long, default_value_t = 10)]
    frames: usize,

    /// Write the last headless frame as a PPM image.
    #[arg(long, requires = "headless")]
    snapshot: Option<PathBuf>,
}

fn open_tuner(opt: &Opt) -> Result<Acquisition> {
    let simulate = opt.simulate.clone();
    let file = opt.file.clone();
    let repeat = opt.repeat;
    let invert = opt.invert;
    #[cfg(feature = "rtlsdr")]
    let device = opt.device;
    let acq = Acquisition::spawn(
        move || -> freqshow::Result<Box<dyn Tuner>> {
            if let Some(file) = file {
                let r = if repeat {
                    Repeat::infinite()
                } else {
                    Repeat::finite(1)
                };
                return Ok(Box::new(FileTuner::new(&file, r)?.paced(true)));
            }
            if !simulate.is_empty() {
                let tones = simulate.iter().map(|f| (*f, 0.5)).collect();
                return Ok(Box::new(SimulatedTuner::new(tones).inverted(invert).paced(true)));
            }
            #[cfg(feature = "rtlsdr")]
            let tuner: freqshow::Result<Box<dyn Tuner>> =
                Ok(Box::new(freqshow::tuner::RtlSdrTuner::new(device)?));
            #[cfg(not(feature = "rtlsdr"))]
            let tuner = Err(freqshow::Error::msg(
                "no radio: built without rtlsdr, and no --simulate or --file given",
            ));
            tuner
        },
        SDR_SAMPLE_SIZE,
    )?;
    Ok(acq)
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("freqshow")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mut settings = match &opt.config {
        Some(path) => Settings::load_or_default(path)?,
        None => Settings::default(),
    };
    if let Some(hz) = opt.freq {
        settings.center_freq = hz / 1e6;
    }

    let (mut width, mut height) = opt.layout.size();
    if let Some(w) = opt.width {
        width = w;
    }
    if let Some(h) = opt.height {
        height = h;
    }
    if width == 0 || height == 0 {
        return Err(anyhow::Error::msg("screen size must not be zero"));
    }
    info!("Screen is {width}x{height} pixels");

    let acq = open_tuner(&opt)?;
    let model = FreqShowModel::new(width, height, &settings, acq);
    let mut controller = Controller::new(model);

    let cancel = CancellationToken::new();
    let c2 = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Received Ctrl+C!");
        c2.cancel();
    })?;

    run_and_save(&opt, &mut controller, &cancel)
}

// Run until done, then save settings if asked to, even if the run failed.
fn run_and_save(
    opt: &Opt,
    controller: &mut Controller,
    cancel: &CancellationToken,
) -> Result<()> {
    let ret = if opt.headless {
        run_headless(controller, opt.frames, opt.snapshot.as_deref(), cancel)
    } else {
        run_tui(controller, opt.refresh, cancel)
    };
    if opt.save
        && let Some(path) = &opt.config
    {
        if let Err(e) = controller.model().settings().save(path) {
            warn!("Failed to save settings to {}: {e}", path.display());
        } else {
            info!("Saved settings to {}", path.display());
        }
    }
    ret?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn invert_needs_simulate() -> Result<()> {
        assert!(Opt::try_parse_from(["freqshow", "--invert"]).is_err());
        let opt = Opt::try_parse_from(["freqshow", "--simulate", "70.46m", "--invert"])?;
        assert!(opt.invert);
        assert_eq!(opt.simulate, vec![70.46e6]);
        Ok(())
    }

    #[test]
    fn saves_when_source_fails() -> Result<()> {
        let dir = tempdir()?;
        let capture = dir.path().join("empty.u8");
        std::fs::File::create(&capture)?;
        let config = dir.path().join("freqshow.json");
        let (capture, config) = (
            capture.to_string_lossy().to_string(),
            config.to_string_lossy().to_string(),
        );
        let opt = Opt::try_parse_from([
            "freqshow",
            "--file",
            capture.as_str(),
            "--config",
            config.as_str(),
            "--save",
            "--headless",
        ])?;
        let settings = Settings {
            center_freq: 100.0,
            ..Default::default()
        };
        let model = FreqShowModel::new(160, 96, &settings, open_tuner(&opt)?);
        let mut controller = Controller::new(model);
        assert!(run_and_save(&opt, &mut controller, &CancellationToken::new()).is_err());
        let saved = Settings::load_or_default(&config)?;
        assert_eq!(saved.center_freq, 100.0);
        Ok(())
    }
}
