/*! Views: the spectrograms, the settings list, and dialogs.

Views draw themselves on a [`Surface`], and turn clicks into [`Action`]s.
What an action does is up to the controller.
*/
use crate::model::FreqShowModel;
use crate::spectrum::{FrameHistory, Intensity};
use crate::surface::{Rect, Rgb, Surface, text_rect};
use crate::ui::{
    ALIGN_BOTTOM, ALIGN_CENTER, ALIGN_LEFT, ALIGN_RIGHT, ALIGN_TOP, ButtonGrid, Cell, align,
};
use crate::window::WindowKind;
use crate::{Float, Result};

/// Background.
pub const MAIN_BG: Rgb = Rgb(5, 45, 45);
/// Dialog input row background.
pub const INPUT_BG: Rgb = MAIN_BG;
/// Dialog input text, and the instant plot line.
pub const INPUT_FG: Rgb = Rgb(60, 255, 255);
/// Cancel button background.
pub const CANCEL_BG: Rgb = MAIN_BG;
/// Accept button background.
pub const ACCEPT_BG: Rgb = MAIN_BG;
/// Button background.
pub const BUTTON_BG: Rgb = MAIN_BG;
/// Button text.
pub const BUTTON_FG: Rgb = INPUT_FG;
/// Button border.
pub const BUTTON_BORDER: Rgb = MAIN_BG;
/// Hash marks.
pub const SYMBOL_FG: Rgb = Rgb(255, 255, 0);
/// Plain text.
pub const TEXT_FG: Rgb = Rgb(222, 184, 135);
/// Instant plot grid.
pub const GRID_LINE: Rgb = Rgb(119, 119, 130);
/// Instant plot background.
pub const GRID_BG: Rgb = Rgb(10, 10, 30);
/// Center and 0dB lines.
pub const CENTER_LINE: Rgb = Rgb(125, 0, 0);
/// Fill under the instant plot line.
pub const LINE_SHADOW: Rgb = Rgb(96, 96, 96);

/// Waterfall colors, from weakest to strongest: blue, cyan, yellow, red.
pub const WATERFALL_GRAD: [Rgb; 4] = [
    Rgb(0, 0, 255),
    Rgb(0, 255, 255),
    Rgb(255, 255, 0),
    Rgb(255, 0, 0),
];

/// Linear interpolation: map `x` in `[x0, x1]` to `[y0, y1]`.
pub fn lerp(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    y0 + (y1 - y0) * ((x - x0) / (x1 - x0))
}

/// Linear interpolation between two colors.
pub fn rgb_lerp(x: f32, x0: f32, x1: f32, c0: Rgb, c1: Rgb) -> Rgb {
    let ch = |a: u8, b: u8| lerp(x, x0, x1, a as f32, b as f32).floor() as u8;
    Rgb(ch(c0.0, c1.0), ch(c0.1, c1.1), ch(c0.2, c1.2))
}

/// Clamp `x` to `[lo, hi]`.
pub fn clamp(x: Float, lo: Float, hi: Float) -> Float {
    if x > hi {
        hi
    } else if x < lo {
        lo
    } else {
        x
    }
}

/// Maps 0.0 to 1.0 onto evenly spaced colors.
#[derive(Debug, Clone)]
pub struct Gradient {
    colors: Vec<Rgb>,
}

impl Gradient {
    /// Create gradient. Needs at least one color.
    pub fn new(colors: &[Rgb]) -> Self {
        Self {
            colors: colors.to_vec(),
        }
    }

    /// Color for a value between 0.0 and 1.0. Values outside are clamped.
    pub fn color(&self, value: Float) -> Rgb {
        let (Some(first), Some(last)) = (self.colors.first(), self.colors.last()) else {
            return Rgb::default();
        };
        if value <= 0.0 || self.colors.len() == 1 {
            return *first;
        }
        if value >= 1.0 {
            return *last;
        }
        let width = 1.0 / (self.colors.len() - 1) as Float;
        let pos = ((value / width) as usize).min(self.colors.len() - 2);
        let x = (value % width) / width;
        rgb_lerp(x, 0.0, 1.0, self.colors[pos], self.colors[pos + 1])
    }
}

/// Something the user can change in the settings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Center frequency.
    CenterFreq,
    /// Sample rate.
    SampleRate,
    /// Number of frames to combine.
    FftAve,
    /// How far `<` and `>` tune.
    TuneRate,
    /// Displayed span.
    Zoom,
    /// Frequency correction.
    FreqCorrection,
    /// Tuner gain.
    Gain,
    /// Bottom of scale.
    MinIntensity,
    /// Top of scale.
    MaxIntensity,
    /// LO offset.
    LoOffset,
    /// Window function.
    Filter,
    /// Kaiser window beta.
    KaiserBeta,
    /// Swap I and Q.
    SwapIq,
    /// Peak or average.
    Peak,
}

impl Setting {
    /// Name, for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Setting::CenterFreq => "center frequency",
            Setting::SampleRate => "sample rate",
            Setting::FftAve => "fft ave",
            Setting::TuneRate => "tune rate",
            Setting::Zoom => "zoom",
            Setting::FreqCorrection => "frequency correction",
            Setting::Gain => "gain",
            Setting::MinIntensity => "min intensity",
            Setting::MaxIntensity => "max intensity",
            Setting::LoOffset => "LO offset",
            Setting::Filter => "filter",
            Setting::KaiserBeta => "kaiser beta",
            Setting::SwapIq => "swap IQ",
            Setting::Peak => "peak",
        }
    }
}

/// What a click asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show the settings list.
    Settings,
    /// Show the main spectrogram.
    Main,
    /// Switch between instant and waterfall.
    ToggleMain,
    /// Move scale up 5dB.
    ScaleUp,
    /// Move scale down 5dB.
    ScaleDown,
    /// Tune up by the tune rate.
    TuneUp,
    /// Tune down by the tune rate.
    TuneDown,
    /// Ask whether to quit.
    Quit,
    /// Open the dialog for a setting.
    Edit(Setting),
    /// Dialog accepted, with the entered value.
    Accept(Setting, String),
    /// Message dialog OK.
    Confirm,
    /// Dialog cancelled.
    Cancel,
}

fn bool_text(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Parse the value text of a boolean dialog.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Text and OK button, with an optional CANCEL button.
#[derive(Debug, Clone)]
pub struct MessageDialog {
    text: String,
    width: usize,
    height: usize,
    buttons: ButtonGrid<Action>,
}

impl MessageDialog {
    /// Create dialog.
    pub fn new(width: usize, height: usize, text: &str, cancel: bool) -> Self {
        let mut buttons = ButtonGrid::new(width, height, 4, 5);
        buttons.add(Cell::new(3, 4, "OK").bg(ACCEPT_BG).action(Action::Confirm));
        if cancel {
            buttons.add(Cell::new(0, 4, "CANCEL").bg(CANCEL_BG).action(Action::Cancel));
        }
        Self {
            text: text.to_string(),
            width,
            height,
            buttons,
        }
    }

    /// The message.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Draw dialog.
    pub fn render(&self, s: &mut Surface) {
        s.fill(MAIN_BG);
        self.buttons.render(s);
        let pos = align(
            text_rect(&self.text),
            Rect::new(0, 0, self.width as i32, self.height as i32),
            ALIGN_CENTER,
            ALIGN_CENTER,
            0,
            0,
        );
        s.draw_text(pos, &self.text, BUTTON_FG, MAIN_BG);
    }

    /// Handle click.
    pub fn click(&self, pos: (i32, i32)) -> Option<Action> {
        self.buttons.click(pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Key {
    Digit(char),
    Decimal,
    Delete,
    Clear,
    PosNeg,
    Auto,
    Window(WindowKind),
    Bool(bool),
    Accept,
    Cancel,
}

// Label on the left, value on the right, in the top row.
fn render_input(s: &mut Surface, row: Rect, label: &str, value: &str, hpad: i32) {
    s.fill_rect(row, INPUT_BG);
    let pos = align(text_rect(label), row, ALIGN_LEFT, ALIGN_CENTER, hpad, 0);
    s.draw_text(pos, label, INPUT_FG, INPUT_BG);
    let pos = align(text_rect(value), row, ALIGN_RIGHT, ALIGN_CENTER, -hpad, 0);
    s.draw_text(pos, value, INPUT_FG, INPUT_BG);
}

fn value_text(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

/// Keypad for entering a number.
#[derive(Debug, Clone)]
pub struct NumberDialog {
    setting: Setting,
    label: String,
    unit: String,
    value: String,
    width: usize,
    buttons: ButtonGrid<Key>,
}

impl NumberDialog {
    /// Create dialog. `has_auto` adds an AUTO button, and `allow_negative`
    /// replaces CLEAR with `+/-`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: usize,
        height: usize,
        setting: Setting,
        label: &str,
        unit: &str,
        initial: &str,
        has_auto: bool,
        allow_negative: bool,
    ) -> Self {
        let mut buttons = ButtonGrid::new(width, height, 4, 5);
        for (i, d) in ('1'..='9').enumerate() {
            let i = i as i32;
            buttons.add(Cell::new(i % 3, 1 + i / 3, &d.to_string()).action(Key::Digit(d)));
        }
        buttons.add(Cell::new(1, 4, "0").action(Key::Digit('0')));
        buttons.add(Cell::new(2, 4, ".").action(Key::Decimal));
        buttons.add(Cell::new(0, 4, "DELETE").action(Key::Delete));
        if allow_negative {
            buttons.add(Cell::new(3, 1, "+/-").action(Key::PosNeg));
        } else {
            buttons.add(Cell::new(3, 1, "CLEAR").action(Key::Clear));
        }
        buttons.add(Cell::new(3, 3, "CANCEL").bg(CANCEL_BG).action(Key::Cancel));
        buttons.add(Cell::new(3, 4, "ACCEPT").bg(ACCEPT_BG).action(Key::Accept));
        if has_auto {
            buttons.add(Cell::new(3, 2, "AUTO").action(Key::Auto));
        }
        Self {
            setting,
            label: label.to_string(),
            unit: unit.to_string(),
            value: initial.to_string(),
            width,
            buttons,
        }
    }

    /// Value as entered so far.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Setting this dialog edits.
    pub fn setting(&self) -> Setting {
        self.setting
    }

    fn press(&mut self, key: Key) -> Option<Action> {
        match key {
            Key::Digit(d) => {
                if self.value == "0" || self.value == "AUTO" {
                    self.value = d.to_string();
                } else {
                    self.value.push(d);
                }
            }
            Key::Decimal => {
                if self.value == "AUTO" {
                    self.value = "0.".to_string();
                } else if !self.value.contains('.') {
                    self.value.push('.');
                }
            }
            Key::Delete => {
                if self.value == "AUTO" {
                    // Nothing to delete.
                } else if self.value.chars().count() > 1 {
                    self.value.pop();
                } else {
                    self.value = "0".to_string();
                }
            }
            Key::Clear => self.value = "0".to_string(),
            Key::PosNeg => {
                if self.value != "AUTO" {
                    self.value = match self.value.strip_prefix('-') {
                        Some(rest) => rest.to_string(),
                        None => format!("-{}", self.value),
                    };
                }
            }
            Key::Auto => self.value = "AUTO".to_string(),
            Key::Accept => return Some(Action::Accept(self.setting, self.value.clone())),
            Key::Cancel => return Some(Action::Cancel),
            Key::Window(_) | Key::Bool(_) => {}
        }
        None
    }

    /// Draw dialog.
    pub fn render(&self, s: &mut Surface) {
        s.fill(MAIN_BG);
        let row = Rect::new(0, 0, self.width as i32, self.buttons.row_size());
        render_input(s, row, &self.label, &value_text(&self.value, &self.unit), 10);
        self.buttons.render(s);
    }

    /// Handle click.
    pub fn click(&mut self, pos: (i32, i32)) -> Option<Action> {
        let key = self.buttons.click(pos)?;
        self.press(key)
    }
}

/// Pick a window function.
#[derive(Debug, Clone)]
pub struct FilterDialog {
    label: String,
    value: WindowKind,
    width: usize,
    buttons: ButtonGrid<Key>,
}

impl FilterDialog {
    /// Create dialog.
    pub fn new(width: usize, height: usize, label: &str, initial: WindowKind) -> Self {
        let mut buttons = ButtonGrid::new(width, height, 4, 5);
        for (i, kind) in WindowKind::ALL.iter().enumerate() {
            let i = i as i32;
            buttons.add(Cell::new(i % 3, 1 + i / 3, kind.short_name()).action(Key::Window(*kind)));
        }
        buttons.add(Cell::new(3, 3, "CANCEL").bg(CANCEL_BG).action(Key::Cancel));
        buttons.add(Cell::new(3, 4, "ACCEPT").bg(ACCEPT_BG).action(Key::Accept));
        Self {
            label: label.to_string(),
            value: initial,
            width,
            buttons,
        }
    }

    /// Currently picked window.
    pub fn value(&self) -> WindowKind {
        self.value
    }

    /// Draw dialog.
    pub fn render(&self, s: &mut Surface) {
        s.fill(MAIN_BG);
        let row = Rect::new(0, 0, self.width as i32, self.buttons.row_size());
        render_input(s, row, &self.label, self.value.name(), 9);
        self.buttons.render(s);
    }

    /// Handle click.
    pub fn click(&mut self, pos: (i32, i32)) -> Option<Action> {
        match self.buttons.click(pos)? {
            Key::Window(k) => self.value = k,
            Key::Accept => {
                return Some(Action::Accept(Setting::Filter, self.value.name().to_string()));
            }
            Key::Cancel => return Some(Action::Cancel),
            _ => {}
        }
        None
    }
}

/// Pick true or false.
#[derive(Debug, Clone)]
pub struct BooleanDialog {
    setting: Setting,
    label: String,
    value: bool,
    width: usize,
    buttons: ButtonGrid<Key>,
}

impl BooleanDialog {
    /// Create dialog.
    pub fn new(width: usize, height: usize, setting: Setting, label: &str, initial: bool) -> Self {
        let mut buttons = ButtonGrid::new(width, height, 4, 5);
        buttons.add(Cell::new(0, 1, "False").action(Key::Bool(false)));
        buttons.add(Cell::new(1, 1, "True").action(Key::Bool(true)));
        buttons.add(Cell::new(3, 3, "CANCEL").bg(CANCEL_BG).action(Key::Cancel));
        buttons.add(Cell::new(3, 4, "ACCEPT").bg(ACCEPT_BG).action(Key::Accept));
        Self {
            setting,
            label: label.to_string(),
            value: initial,
            width,
            buttons,
        }
    }

    /// Currently picked value.
    pub fn value(&self) -> bool {
        self.value
    }

    /// Draw dialog.
    pub fn render(&self, s: &mut Surface) {
        s.fill(MAIN_BG);
        let row = Rect::new(0, 0, self.width as i32, self.buttons.row_size());
        render_input(s, row, &self.label, bool_text(self.value), 2);
        self.buttons.render(s);
    }

    /// Handle click.
    pub fn click(&mut self, pos: (i32, i32)) -> Option<Action> {
        match self.buttons.click(pos)? {
            Key::Bool(b) => self.value = b,
            Key::Accept => {
                return Some(Action::Accept(self.setting, bool_text(self.value).to_string()));
            }
            Key::Cancel => return Some(Action::Cancel),
            _ => {}
        }
        None
    }
}

/// List of settings, with current values. Clicking one opens its dialog.
///
/// Made fresh every time it's shown, so values are current.
#[derive(Debug, Clone)]
pub struct SettingsList {
    buttons: ButtonGrid<Action>,
}

impl SettingsList {
    /// Create list showing the model's values.
    pub fn new(model: &FreqShowModel) -> Self {
        use Setting::*;
        let mut b = ButtonGrid::new(model.width(), model.height(), 4, 6);
        let edit = |col, row, text: String, span, s| {
            Cell::new(col, row, &text).colspan(span).action(Action::Edit(s))
        };
        b.add(edit(0, 0, format!("Center Freq: {:.6} MHz", model.center_freq()), 2, CenterFreq));
        b.add(edit(0, 1, format!("Sample Rate: {:.3} MHz", model.sample_rate()), 2, SampleRate));
        b.add(edit(0, 2, format!("FFT ave: {}", model.fft_ave()), 1, FftAve));
        b.add(edit(2, 1, format!("Tune Rate: {:.3} MHz", model.tune_rate()), 2, TuneRate));
        b.add(edit(2, 0, format!("Zoom: {:.3} MHz", model.zoom()), 2, Zoom));
        b.add(edit(0, 3, format!("Freq Corr: {} ppm", model.freq_correction()), 2, FreqCorrection));
        b.add(edit(2, 4, format!("Gain: {} dB", model.gain()), 1, Gain));
        b.add(edit(0, 4, format!("Min: {} dB", model.min_string()), 1, MinIntensity));
        b.add(edit(1, 4, format!("Max: {} dB", model.max_string()), 1, MaxIntensity));
        b.add(Cell::new(3, 5, "BACK").action(Action::Main));
        b.add(edit(1, 2, format!("LO Offset: {:.2} MHz", model.lo_offset()), 2, LoOffset));
        b.add(edit(2, 3, model.filter().name().to_string(), 1, Filter));
        if model.filter() == WindowKind::Kaiser {
            b.add(edit(3, 3, format!("beta:{:.1}", model.kaiser_beta()), 1, KaiserBeta));
        }
        b.add(edit(0, 5, format!("Swap IQ: {}", bool_text(model.swap_iq())), 1, SwapIq));
        b.add(edit(1, 5, format!("Peak: {}", bool_text(model.peak())), 1, Peak));
        Self { buttons: b }
    }

    /// Buttons, for finding things.
    pub fn buttons(&self) -> &ButtonGrid<Action> {
        &self.buttons
    }

    /// Draw list.
    pub fn render(&self, s: &mut Surface) {
        s.fill(MAIN_BG);
        self.buttons.render(s);
    }

    /// Handle click.
    pub fn click(&self, pos: (i32, i32)) -> Option<Action> {
        self.buttons.click(pos)
    }
}

/// A dialog editing one setting.
pub enum Dialog {
    /// Keypad.
    Number(NumberDialog),
    /// Window function picker.
    Filter(FilterDialog),
    /// True or false.
    Boolean(BooleanDialog),
}

impl Dialog {
    /// Dialog for editing `setting`, starting at its current value.
    pub fn for_setting(model: &FreqShowModel, setting: Setting) -> Self {
        let (w, h) = (model.width(), model.height());
        let num = |label: &str, unit: &str, initial: String, auto: bool, neg: bool| {
            Dialog::Number(NumberDialog::new(w, h, setting, label, unit, &initial, auto, neg))
        };
        match setting {
            Setting::CenterFreq => {
                num("FREQUENCY:", "MHz", format!("{:.6}", model.center_freq()), false, false)
            }
            Setting::SampleRate => {
                num("SAMPLE RATE:", "MHz", format!("{:.3}", model.sample_rate()), false, false)
            }
            Setting::FftAve => num("FFT AVE:", "X", model.fft_ave().to_string(), false, false),
            Setting::TuneRate => {
                num("TUNE RATE:", "MHz", format!("{:.3}", model.tune_rate()), false, false)
            }
            Setting::LoOffset => {
                num("LO OFFSET:", "MHz", format!("{:.2}", model.lo_offset()), false, true)
            }
            Setting::Zoom => num("ZOOM in:", "MHz", format!("{:.3}", model.zoom()), false, false),
            Setting::FreqCorrection => num(
                "Frequency correction:",
                "ppm",
                model.freq_correction().to_string(),
                false,
                true,
            ),
            Setting::Gain => num("GAIN:", "dB", model.gain().to_string(), true, false),
            Setting::MinIntensity => num("MIN:", "dB", model.min_string(), true, true),
            Setting::MaxIntensity => num("MAX:", "dB", model.max_string(), true, true),
            Setting::KaiserBeta => {
                num("kaiser beta:", "", format!("{:.1}", model.kaiser_beta()), false, false)
            }
            Setting::Filter => {
                Dialog::Filter(FilterDialog::new(w, h, "Windowing filter:", model.filter()))
            }
            Setting::SwapIq => {
                Dialog::Boolean(BooleanDialog::new(w, h, setting, "Swap I&Q", model.swap_iq()))
            }
            Setting::Peak => {
                Dialog::Boolean(BooleanDialog::new(w, h, setting, "Peak", model.peak()))
            }
        }
    }

    /// Draw dialog.
    pub fn render(&self, s: &mut Surface) {
        match self {
            Dialog::Number(d) => d.render(s),
            Dialog::Filter(d) => d.render(s),
            Dialog::Boolean(d) => d.render(s),
        }
    }

    /// Handle click.
    pub fn click(&mut self, pos: (i32, i32)) -> Option<Action> {
        match self {
            Dialog::Number(d) => d.click(pos),
            Dialog::Filter(d) => d.click(pos),
            Dialog::Boolean(d) => d.click(pos),
        }
    }
}

enum Mode {
    Instant { history: FrameHistory },
    Waterfall { waterfall: Surface, gradient: Gradient },
}

/// Main view: instant line plot, or scrolling waterfall.
///
/// With the overlay on, the plot is drawn between the top and bottom button
/// rows, with scale and frequency labels. Clicking the plot toggles the
/// overlay.
pub struct SpectrogramView {
    mode: Mode,
    overlay: bool,
    width: usize,
    height: usize,
    buttons: ButtonGrid<Action>,
}

impl SpectrogramView {
    fn new(width: usize, height: usize, mode: Mode) -> Self {
        let mut b = ButtonGrid::new(width, height, 5, 5);
        b.add(Cell::new(0, 0, "Set").action(Action::Settings));
        b.add(Cell::new(1, 0, "Dn").action(Action::ScaleDown));
        b.add(Cell::new(1, 4, "<").action(Action::TuneDown));
        b.add(Cell::new(3, 4, ">").action(Action::TuneUp));
        b.add(Cell::new(3, 0, "Up").action(Action::ScaleUp));
        b.add(Cell::new(2, 0, "PANADAPTER").action(Action::ToggleMain));
        b.add(Cell::new(4, 0, "Quit").bg(MAIN_BG).action(Action::Quit));
        Self {
            mode,
            overlay: true,
            width,
            height,
            buttons: b,
        }
    }

    /// Create instant line plot.
    pub fn instant(width: usize, height: usize) -> Self {
        Self::new(
            width,
            height,
            Mode::Instant {
                history: FrameHistory::new(),
            },
        )
    }

    /// Create waterfall.
    pub fn waterfall(width: usize, height: usize) -> Self {
        let mut waterfall = Surface::new(width, height);
        waterfall.fill(MAIN_BG);
        Self::new(
            width,
            height,
            Mode::Waterfall {
                waterfall,
                gradient: Gradient::new(&WATERFALL_GRAD),
            },
        )
    }

    /// True for the waterfall.
    pub fn is_waterfall(&self) -> bool {
        matches!(self.mode, Mode::Waterfall { .. })
    }

    /// True if buttons and labels are shown.
    pub fn overlay(&self) -> bool {
        self.overlay
    }

    /// Buttons, for finding things.
    pub fn buttons(&self) -> &ButtonGrid<Action> {
        &self.buttons
    }

    /// Blank the waterfall. No-op for the instant plot.
    pub fn clear(&mut self) {
        if let Mode::Waterfall { waterfall, .. } = &mut self.mode {
            waterfall.fill(MAIN_BG);
        }
    }

    /// Handle click.
    pub fn click(&mut self, pos: (i32, i32)) -> Option<Action> {
        let row = self.buttons.row_size();
        let y = pos.1;
        if y > row && y < 4 * row {
            self.overlay = !self.overlay;
            return None;
        }
        self.buttons.click(pos)
    }

    /// Get data from the model, and draw.
    pub fn render(&mut self, model: &mut FreqShowModel, s: &mut Surface) -> Result<()> {
        s.fill(MAIN_BG);
        if !self.overlay {
            return self.render_spectrogram(model, s);
        }
        let (w, h) = (self.width as i32, self.height as i32);
        let row = self.buttons.row_size();
        let spect = Rect::new(0, row, w, h - 2 * row);
        let mut sub = Surface::new(spect.w.max(0) as usize, spect.h.max(0) as usize);
        self.render_spectrogram(model, &mut sub)?;
        s.blit(&sub, sub.rect(), (spect.x, spect.y));

        for x in [0, w / 2, w - 1] {
            self.render_hash(s, x, 5, 2);
        }

        let bottom = Rect::new(0, h - row, w, row);
        let half_span = model.zoom() / 2.0;
        let labels = [
            (format!("- {half_span:.4} Mhz"), ALIGN_LEFT),
            (format!("{:.6}", model.center_freq()), ALIGN_CENTER),
            (format!("+ {half_span:.4} Mhz"), ALIGN_RIGHT),
        ];
        for (text, h_align) in labels {
            let pos = align(text_rect(&text), bottom, h_align, ALIGN_CENTER, 0, 0);
            s.draw_text(pos, &text, TEXT_FG, MAIN_BG);
        }

        let it = model.intensity();
        let db = |v: Option<Float>| v.map_or("- dB".to_string(), |v| format!("{v:.0} dB"));
        let ave = if model.peak() {
            format!("fft pks = {}", model.fft_ave())
        } else {
            format!("fft ave = {}", model.fft_ave())
        };
        let scale = it
            .range()
            .map_or("scale = -".to_string(), |r| format!("scale = {:.1} dB", r / 10.0));
        let filter = if model.filter() == WindowKind::Kaiser {
            format!("Kaiser beta = {:.1}", model.kaiser_beta())
        } else {
            model.filter().name().to_string()
        };
        let labels = [
            (db(it.min()), ALIGN_LEFT, ALIGN_BOTTOM),
            (db(it.max()), ALIGN_LEFT, ALIGN_TOP),
            (ave, ALIGN_RIGHT, ALIGN_BOTTOM),
            (scale, ALIGN_RIGHT, ALIGN_TOP),
            (filter, ALIGN_CENTER, ALIGN_TOP),
        ];
        for (text, h_align, v_align) in labels {
            let pos = align(text_rect(&text), spect, h_align, v_align, 0, 0);
            s.draw_text(pos, &text, TEXT_FG, GRID_BG);
        }

        self.buttons.render(s);
        Ok(())
    }

    // Triangle with a tail, pointing up from the bottom row.
    fn render_hash(&self, s: &mut Surface, x: i32, size: i32, padding: i32) {
        let y = self.height as i32 - self.buttons.row_size() + padding;
        s.draw_lines(
            &[
                (x, y),
                (x - size, y + size),
                (x + size, y + size),
                (x, y),
                (x, y + 2 * size),
            ],
            SYMBOL_FG,
        );
    }

    fn render_spectrogram(&mut self, model: &mut FreqShowModel, s: &mut Surface) -> Result<()> {
        match &mut self.mode {
            Mode::Instant { history } => {
                let freqs = model.get_combined(history)?;
                render_instant(&freqs, model.intensity(), s);
            }
            Mode::Waterfall {
                waterfall,
                gradient,
            } => {
                let freqs = model.get_data()?;
                waterfall.scroll_up(1);
                let bottom = waterfall.height() as i32 - 1;
                let it = model.intensity();
                for (i, v) in freqs.iter().enumerate() {
                    let power = clamp(it.normalize(*v), 0.0, 1.0);
                    waterfall.set_at(i as i32, bottom, gradient.color(power));
                }
                let offset = (waterfall.height() as i32 - s.height() as i32).max(0);
                let area = Rect::new(0, offset, s.width() as i32, s.height() as i32);
                s.blit(waterfall, area, (0, 0));
            }
        }
        Ok(())
    }
}

fn render_instant(freqs: &[Float], it: &Intensity, s: &mut Surface) {
    let (w, h) = (s.width() as i32, s.height() as i32);
    // Values off the scale are drawn just past the edge.
    let ys: Vec<i32> = freqs
        .iter()
        .map(|v| {
            let y = h as Float - (it.normalize(*v) * h as Float).floor();
            clamp(y, -1.0, h as Float) as i32
        })
        .collect();

    s.fill(GRID_BG);
    for k in (1..10).filter(|k| *k != 5) {
        s.draw_line((k * w / 10, 0), (k * w / 10, h), GRID_LINE);
        s.draw_line((0, k * h / 10), (w, k * h / 10), GRID_LINE);
    }
    s.draw_line((0, h / 2), (w, h / 2), GRID_LINE);
    s.draw_line((w / 2, 0), (w / 2, h), CENTER_LINE);
    s.draw_lines(&[(0, 0), (w - 1, 0), (w - 1, h - 1), (0, h - 1), (0, 0)], GRID_LINE);

    // 0dB reference, if on screen.
    if let (Some(min), Some(max)) = (it.min(), it.max())
        && min < 0.0
        && max > 0.0
    {
        let y = (max / (max - min) * h as Float) as i32;
        s.draw_line((0, y), (w - 1, y), CENTER_LINE);
    }

    for i in 1..ys.len().min(w as usize) {
        let (y0, y1) = (ys[i - 1], ys[i]);
        let x = i as i32;
        s.draw_line((x - 1, y0), (x, y1), INPUT_FG);
        if y1 + 3 < h {
            s.draw_line((x, y1 + 3), (x, h), LINE_SHADOW);
        }
    }
}
