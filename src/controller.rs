/*! Which view is shown, and what clicks do.

The instant and waterfall views live as long as the controller, since
they keep history. Everything else is made when it's opened. Going back
only goes back one level.
*/
use log::{debug, info, warn};

use crate::model::FreqShowModel;
use crate::surface::Surface;
use crate::tuner::Gain;
use crate::views::{
    Action, Dialog, MessageDialog, Setting, SettingsList, SpectrogramView, parse_bool,
};
use crate::window::WindowKind;
use crate::{Error, Float, Result};

/// Whether to keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// User asked to quit.
    Quit,
}

/// The view currently shown.
pub enum View {
    /// Instant line plot.
    Instant,
    /// Waterfall.
    Waterfall,
    /// Settings list.
    Settings(SettingsList),
    /// Editing a setting.
    Dialog(Dialog),
    /// A question.
    Message(MessageDialog),
}

impl View {
    /// Name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            View::Instant => "instant",
            View::Waterfall => "waterfall",
            View::Settings(_) => "settings",
            View::Dialog(_) => "dialog",
            View::Message(_) => "message",
        }
    }
}

/// Owns the model and the views.
pub struct Controller {
    model: FreqShowModel,
    instant: SpectrogramView,
    waterfall: SpectrogramView,
    current: View,
    previous: Option<View>,
    main_is_waterfall: bool,
}

impl Controller {
    /// Create controller, starting on the instant view.
    pub fn new(model: FreqShowModel) -> Self {
        let (w, h) = (model.width(), model.height());
        Self {
            instant: SpectrogramView::instant(w, h),
            waterfall: SpectrogramView::waterfall(w, h),
            model,
            current: View::Instant,
            previous: None,
            main_is_waterfall: false,
        }
    }

    /// The model.
    pub fn model(&self) -> &FreqShowModel {
        &self.model
    }

    /// The model, for changing.
    pub fn model_mut(&mut self) -> &mut FreqShowModel {
        &mut self.model
    }

    /// Current view.
    pub fn current(&self) -> &View {
        &self.current
    }

    /// The instant view.
    pub fn instant(&self) -> &SpectrogramView {
        &self.instant
    }

    /// The waterfall view.
    pub fn waterfall(&self) -> &SpectrogramView {
        &self.waterfall
    }

    fn change_view(&mut self, view: View) {
        debug!("View: {} -> {}", self.current.name(), view.name());
        let old = std::mem::replace(&mut self.current, view);
        self.previous = Some(old);
    }

    fn change_to_previous(&mut self) {
        match self.previous.take() {
            Some(v) => self.change_view(v),
            None => self.change_to_main(),
        }
    }

    fn change_to_main(&mut self) {
        if self.main_is_waterfall {
            self.change_view(View::Waterfall);
        } else {
            self.change_view(View::Instant);
        }
    }

    fn toggle_main(&mut self) {
        self.main_is_waterfall = !matches!(self.current, View::Waterfall);
        self.change_to_main();
    }

    fn change_to_settings(&mut self) {
        let list = SettingsList::new(&self.model);
        self.change_view(View::Settings(list));
    }

    /// Open the quit question, unless it's already open.
    pub fn request_quit(&mut self) {
        if !matches!(self.current, View::Message(_)) {
            let (w, h) = (self.model.width(), self.model.height());
            self.change_view(View::Message(MessageDialog::new(
                w,
                h,
                "QUIT: Are you sure?",
                true,
            )));
        }
    }

    /// Handle click at pixel position.
    pub fn click(&mut self, pos: (i32, i32)) -> Flow {
        let action = match &mut self.current {
            View::Instant => self.instant.click(pos),
            View::Waterfall => self.waterfall.click(pos),
            View::Settings(l) => l.click(pos),
            View::Dialog(d) => d.click(pos),
            View::Message(m) => m.click(pos),
        };
        match action {
            Some(a) => self.handle(a),
            None => Flow::Continue,
        }
    }

    /// Do what an action asks for.
    pub fn handle(&mut self, action: Action) -> Flow {
        debug!("Action: {action:?}");
        match action {
            Action::Settings => self.change_to_settings(),
            Action::Main => self.change_to_main(),
            Action::ToggleMain => self.toggle_main(),
            Action::ScaleUp => self.scale(5.0),
            Action::ScaleDown => self.scale(-5.0),
            Action::TuneUp => self.tune(self.model.tune_rate()),
            Action::TuneDown => self.tune(-self.model.tune_rate()),
            Action::Quit => self.request_quit(),
            Action::Edit(s) => {
                let d = Dialog::for_setting(&self.model, s);
                self.change_view(View::Dialog(d));
            }
            Action::Accept(s, value) => match self.apply(s, &value) {
                Ok(()) => {
                    info!("Set {} to {}", s.name(), value);
                    if matches!(
                        s,
                        Setting::CenterFreq
                            | Setting::SampleRate
                            | Setting::Gain
                            | Setting::MinIntensity
                            | Setting::MaxIntensity
                    ) {
                        self.waterfall.clear();
                    }
                    self.change_to_settings();
                }
                Err(e) => warn!("Not accepted: {e}"),
            },
            // The only question asked is whether to quit.
            Action::Confirm => return Flow::Quit,
            Action::Cancel => self.change_to_previous(),
        }
        Flow::Continue
    }

    fn scale(&mut self, db: Float) {
        let it = self.model.intensity();
        if it.min_auto() || it.max_auto() {
            return;
        }
        let (Some(min), Some(max)) = (it.min(), it.max()) else {
            return;
        };
        self.model.set_min_intensity(Some(min + db));
        self.model.set_max_intensity(Some(max + db));
        self.waterfall.clear();
        self.change_to_main();
    }

    fn tune(&mut self, mhz: f64) {
        let freq = self.model.center_freq() + mhz;
        if !self.model.set_center_freq(freq) {
            warn!("Can't tune to {freq} MHz");
        }
        self.change_to_main();
    }

    fn apply(&mut self, s: Setting, value: &str) -> Result<()> {
        let invalid = || Error::invalid(s.name(), value);
        let m = &mut self.model;
        let ok = match s {
            Setting::CenterFreq => m.set_center_freq(parse_number(value).ok_or_else(invalid)?),
            Setting::SampleRate => m.set_sample_rate(parse_number(value).ok_or_else(invalid)?),
            Setting::Zoom => m.set_zoom(parse_number(value).ok_or_else(invalid)?),
            Setting::LoOffset => m.set_lo_offset(parse_number(value).ok_or_else(invalid)?),
            Setting::TuneRate => m.set_tune_rate(parse_number(value).ok_or_else(invalid)?),
            Setting::KaiserBeta => {
                m.set_kaiser_beta(parse_number(value).ok_or_else(invalid)? as Float)
            }
            Setting::FftAve => {
                let n = parse_whole(value).ok_or_else(invalid)?;
                usize::try_from(n).is_ok_and(|n| m.set_fft_ave(n))
            }
            Setting::FreqCorrection => {
                let n = parse_whole(value).ok_or_else(invalid)?;
                let ppm = i32::try_from(n).map_err(|_| invalid())?;
                m.set_freq_correction(ppm);
                true
            }
            Setting::Gain => {
                m.set_gain(value.parse::<Gain>()?);
                true
            }
            Setting::MinIntensity => {
                m.set_min_intensity(parse_auto(value).ok_or_else(invalid)?);
                true
            }
            Setting::MaxIntensity => {
                m.set_max_intensity(parse_auto(value).ok_or_else(invalid)?);
                true
            }
            Setting::Filter => {
                m.set_filter(value.parse::<WindowKind>()?);
                true
            }
            Setting::SwapIq => {
                m.set_swap_iq(parse_bool(value).ok_or_else(invalid)?);
                true
            }
            Setting::Peak => {
                m.set_peak(parse_bool(value).ok_or_else(invalid)?);
                true
            }
        };
        if ok { Ok(()) } else { Err(invalid()) }
    }

    /// Draw the current view. Spectrogram views read from the radio.
    pub fn render(&mut self, s: &mut Surface) -> Result<()> {
        match &self.current {
            View::Instant => self.instant.render(&mut self.model, s)?,
            View::Waterfall => self.waterfall.render(&mut self.model, s)?,
            View::Settings(l) => l.render(s),
            View::Dialog(d) => d.render(s),
            View::Message(m) => m.render(s),
        }
        Ok(())
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_whole(s: &str) -> Option<i64> {
    parse_number(s)
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

// `AUTO` is None.
fn parse_auto(s: &str) -> Option<Option<Float>> {
    if s == "AUTO" {
        return Some(None);
    }
    parse_number(s).map(|v| Some(v as Float))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::Acquisition;
    use crate::settings::Settings;
    use crate::spectrum::SDR_SAMPLE_SIZE;
    use crate::tuner::{SimulatedTuner, Tuner};

    fn controller() -> Result<Controller> {
        let acq = Acquisition::spawn(
            || Ok(Box::new(SimulatedTuner::new(vec![(70.46e6, 0.5)])) as Box<dyn Tuner>),
            SDR_SAMPLE_SIZE,
        )?;
        Ok(Controller::new(FreqShowModel::new(
            320,
            240,
            &Settings::default(),
            acq,
        )))
    }

    fn settings_button(c: &Controller, prefix: &str) -> (i32, i32) {
        let View::Settings(l) = c.current() else {
            panic!("not on settings, but {}", c.current().name());
        };
        l.buttons()
            .buttons()
            .iter()
            .find(|b| b.text().starts_with(prefix))
            .unwrap_or_else(|| panic!("no button {prefix}"))
            .center()
    }

    fn main_button(c: &Controller, text: &str) -> (i32, i32) {
        let v = match c.current() {
            View::Instant => c.instant(),
            View::Waterfall => c.waterfall(),
            other => panic!("not on main view, but {}", other.name()),
        };
        v.buttons().find(text).unwrap().center()
    }

    #[test]
    fn navigation() -> Result<()> {
        let mut c = controller()?;
        assert_eq!(c.current().name(), "instant");
        assert_eq!(c.click(main_button(&c, "Set")), Flow::Continue);
        assert_eq!(c.current().name(), "settings");
        c.click(settings_button(&c, "Center Freq"));
        assert_eq!(c.current().name(), "dialog");
        c.handle(Action::Cancel);
        assert_eq!(c.current().name(), "settings");
        c.click(settings_button(&c, "BACK"));
        assert_eq!(c.current().name(), "instant");
        Ok(())
    }

    #[test]
    fn toggle_main() -> Result<()> {
        let mut c = controller()?;
        c.click(main_button(&c, "PANADAPTER"));
        assert_eq!(c.current().name(), "waterfall");
        c.click(main_button(&c, "Set"));
        c.click(settings_button(&c, "BACK"));
        assert_eq!(c.current().name(), "waterfall");
        c.click(main_button(&c, "PANADAPTER"));
        assert_eq!(c.current().name(), "instant");
        Ok(())
    }

    #[test]
    fn accept_applies() -> Result<()> {
        let mut c = controller()?;
        c.handle(Action::Settings);
        c.click(settings_button(&c, "Sample Rate"));
        c.handle(Action::Accept(Setting::SampleRate, "0.25".to_string()));
        assert_eq!(c.model().sample_rate(), 0.25);
        // A fresh list, showing the new value.
        assert_eq!(c.current().name(), "settings");
        settings_button(&c, "Sample Rate: 0.250 MHz");

        c.handle(Action::Accept(Setting::Gain, "AUTO".to_string()));
        assert_eq!(c.model().gain(), Gain::Auto);
        c.handle(Action::Accept(Setting::Gain, "20.5".to_string()));
        assert_eq!(c.model().gain(), Gain::Manual(20.5));
        c.handle(Action::Accept(Setting::MinIntensity, "AUTO".to_string()));
        assert_eq!(c.model().min_string(), "AUTO");
        c.handle(Action::Accept(Setting::Filter, "kaiser".to_string()));
        assert_eq!(c.model().filter(), WindowKind::Kaiser);
        settings_button(&c, "beta:8.6");
        c.handle(Action::Accept(Setting::Peak, "False".to_string()));
        assert!(!c.model().peak());
        c.handle(Action::Accept(Setting::FftAve, "10".to_string()));
        assert_eq!(c.model().fft_ave(), 10);
        c.handle(Action::Accept(Setting::FreqCorrection, "-3".to_string()));
        assert_eq!(c.model().freq_correction(), -3);
        Ok(())
    }

    #[test]
    fn invalid_keeps_dialog() -> Result<()> {
        let mut c = controller()?;
        c.handle(Action::Settings);
        c.handle(Action::Edit(Setting::SampleRate));
        for bad in ["0.5", "-", "0.", "x"] {
            c.handle(Action::Accept(Setting::SampleRate, bad.to_string()));
            assert_eq!(c.current().name(), "dialog", "accepted {bad}");
        }
        assert_eq!(c.model().sample_rate(), 0.230);
        c.handle(Action::Accept(Setting::FftAve, "2.5".to_string()));
        c.handle(Action::Accept(Setting::FftAve, "1".to_string()));
        assert_eq!(c.model().fft_ave(), 3);
        c.handle(Action::Accept(Setting::KaiserBeta, "-1".to_string()));
        assert_eq!(c.model().kaiser_beta(), 8.6);
        assert_eq!(c.current().name(), "dialog");
        c.handle(Action::Cancel);
        assert_eq!(c.current().name(), "settings");
        Ok(())
    }

    #[test]
    fn quit() -> Result<()> {
        let mut c = controller()?;
        c.click(main_button(&c, "Quit"));
        assert_eq!(c.current().name(), "message");
        c.request_quit();
        assert_eq!(c.handle(Action::Cancel), Flow::Continue);
        assert_eq!(c.current().name(), "instant");
        c.request_quit();
        assert_eq!(c.handle(Action::Confirm), Flow::Quit);
        Ok(())
    }

    #[test]
    fn scale_and_tune() -> Result<()> {
        let mut c = controller()?;
        c.click(main_button(&c, "Up"));
        assert_eq!(c.model().min_string(), "-5");
        assert_eq!(c.model().max_string(), "55");
        c.click(main_button(&c, "Dn"));
        c.click(main_button(&c, "Dn"));
        assert_eq!(c.model().min_string(), "-15");

        c.handle(Action::Accept(Setting::MaxIntensity, "AUTO".to_string()));
        c.handle(Action::Main);
        c.click(main_button(&c, "Up"));
        assert_eq!(c.model().min_string(), "-15");

        c.click(main_button(&c, ">"));
        assert!((c.model().center_freq() - 70.4525).abs() < 1e-9);
        c.click(main_button(&c, "<"));
        c.click(main_button(&c, "<"));
        assert!((c.model().center_freq() - 70.4505).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn render_views() -> Result<()> {
        let mut c = controller()?;
        let mut s = Surface::new(320, 240);
        c.render(&mut s)?;
        assert!(s.labels().iter().any(|l| l.text == "70.451500"));
        assert!(s.labels().iter().any(|l| l.text == "fft pks = 3"));
        assert!(s.labels().iter().any(|l| l.text == "- 0.0250 Mhz"));

        c.handle(Action::ToggleMain);
        c.render(&mut s)?;
        c.render(&mut s)?;
        assert!(s.labels().iter().any(|l| l.text == "PANADAPTER"));

        c.handle(Action::Settings);
        c.render(&mut s)?;
        assert!(s.labels().iter().any(|l| l.text == "Swap IQ: True"));

        c.handle(Action::Edit(Setting::Filter));
        c.render(&mut s)?;
        assert!(s.labels().iter().any(|l| l.text == "bharris"));
        Ok(())
    }

    #[test]
    fn tiny_scale_renders() {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let r = (|| -> Result<()> {
                let mut c = controller()?;
                c.handle(Action::Accept(Setting::MinIntensity, "0".to_string()));
                c.handle(Action::Accept(Setting::MaxIntensity, "0.00001".to_string()));
                c.handle(Action::Main);
                assert_eq!(c.current().name(), "instant");
                let mut s = Surface::new(320, 240);
                c.render(&mut s)?;
                c.render(&mut s)?;
                Ok(())
            })();
            let _ = tx.send(r.map_err(|e| e.to_string()));
        });
        let got = rx.recv_timeout(std::time::Duration::from_secs(20));
        assert_eq!(got, Ok(Ok(())));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("0."), Some(0.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_whole("3"), Some(3));
        assert_eq!(parse_whole("-3."), Some(-3));
        assert_eq!(parse_whole("3.5"), None);
        assert_eq!(parse_auto("AUTO"), Some(None));
        assert_eq!(parse_auto("-10"), Some(Some(-10.0)));
        assert_eq!(parse_auto("x"), None);
    }
}
