/*! Terminal front end, and a headless runner.

Each terminal cell shows two pixels stacked on top of each other, using
an upper half block with the top pixel as foreground and the bottom pixel
as background. Labels are drawn as real text on top.

Mouse clicks map back to pixels, so the terminal works like the touch
screen FreqShow was written for.
*/
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use log::{debug, info, warn};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as Area;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::controller::{Controller, Flow};
use crate::surface::{Rgb, Surface};
use crate::{Error, Result};

/// Clicks closer together than this are dropped.
///
/// Terminals sometimes report one press more than once.
pub const CLICK_DEBOUNCE: Duration = Duration::from_millis(40);

/**
Cancellation token, for stopping the run loops from another thread, such
as the Ctrl-C handler.

```
use freqshow::tui::CancellationToken;
let token = CancellationToken::new();
let t2 = token.clone();
std::thread::spawn(move || t2.cancel());
while !token.is_canceled() {}
```
*/
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create new cancellation token.
    pub fn new() -> Self {
        CancellationToken {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the token cancelled.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Check if the token is cancelled.
    pub fn is_canceled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

fn color(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Pixel for a terminal cell. Cells are one pixel wide and two tall.
pub fn cell_to_pixel(column: u16, row: u16) -> (i32, i32) {
    (column as i32, row as i32 * 2)
}

/// Draws a [`Surface`] using half blocks. Anything that doesn't fit is cut
/// off.
pub struct SurfaceWidget<'a> {
    surface: &'a Surface,
}

impl<'a> SurfaceWidget<'a> {
    /// Create widget.
    pub fn new(surface: &'a Surface) -> Self {
        Self { surface }
    }
}

impl Widget for SurfaceWidget<'_> {
    fn render(self, area: Area, buf: &mut Buffer) {
        let s = self.surface;
        let cols = clamp_u16(s.width()).min(area.width);
        let rows = clamp_u16(s.height().div_ceil(2)).min(area.height);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = cell_to_pixel(col, row);
                let top = s.get_at(x, y).unwrap_or_default();
                let bottom = s.get_at(x, y + 1).unwrap_or_default();
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol("▀").set_fg(color(top)).set_bg(color(bottom));
                }
            }
        }
        for l in s.labels() {
            if l.x < 0 || l.y < 0 {
                continue;
            }
            let (x, y) = (clamp_u16(l.x as usize), clamp_u16(l.y as usize / 2));
            if x >= cols || y >= rows {
                continue;
            }
            let style = Style::default().fg(color(l.fg)).bg(color(l.bg));
            buf.set_stringn(
                area.x + x,
                area.y + y,
                &l.text,
                (cols - x) as usize,
                style,
            );
        }
    }
}

// Render, tolerating a radio that's slow to deliver.
fn render(controller: &mut Controller, surface: &mut Surface) -> Result<()> {
    match controller.render(surface) {
        Err(Error::Timeout(d)) => {
            warn!("No samples for {d:?}, still waiting");
            Ok(())
        }
        other => other,
    }
}

/// Run interactively in the terminal, until quit or cancelled.
pub fn run_tui(
    controller: &mut Controller,
    refresh: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut terminal = ratatui::init();
    if let Err(e) = crossterm::execute!(std::io::stdout(), EnableMouseCapture) {
        ratatui::restore();
        return Err(e.into());
    }
    let ret = event_loop(&mut terminal, controller, refresh, cancel);
    if let Err(e) = crossterm::execute!(std::io::stdout(), DisableMouseCapture) {
        warn!("Failed to disable mouse capture: {e}");
    }
    ratatui::restore();
    ret
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    controller: &mut Controller,
    refresh: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut surface = Surface::new(controller.model().width(), controller.model().height());
    let mut last_click: Option<Instant> = None;
    loop {
        if cancel.is_canceled() {
            info!("Cancelled");
            return Ok(());
        }
        render(controller, &mut surface)?;
        terminal.draw(|f| f.render_widget(SurfaceWidget::new(&surface), f.area()))?;

        let deadline = Instant::now() + refresh;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            if !event::poll(left)? {
                break;
            }
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
                    KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                        info!("Ctrl-C");
                        return Ok(());
                    }
                    KeyCode::Char('q') | KeyCode::Esc => controller.request_quit(),
                    _ => {}
                },
                Event::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
                    let now = Instant::now();
                    if last_click.is_some_and(|t| now.duration_since(t) < CLICK_DEBOUNCE) {
                        debug!("Dropping repeated click");
                        continue;
                    }
                    last_click = Some(now);
                    let pos = cell_to_pixel(m.column, m.row);
                    debug!("Click at {pos:?}");
                    if controller.click(pos) == Flow::Quit {
                        info!("Quit");
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }
}

/// Render `frames` frames without a terminal, then optionally write the
/// last one as a PPM image.
pub fn run_headless(
    controller: &mut Controller,
    frames: usize,
    snapshot: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut surface = Surface::new(controller.model().width(), controller.model().height());
    let st = Instant::now();
    let mut done = 0;
    for _ in 0..frames {
        if cancel.is_canceled() {
            info!("Cancelled after {done} frames");
            break;
        }
        render(controller, &mut surface)?;
        done += 1;
    }
    info!("Rendered {done} frames in {:?}", st.elapsed());
    if let Some(path) = snapshot {
        surface.write_ppm(path)?;
        info!("Wrote snapshot to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::Acquisition;
    use crate::model::FreqShowModel;
    use crate::settings::Settings;
    use crate::spectrum::SDR_SAMPLE_SIZE;
    use crate::tuner::{SimulatedTuner, Tuner};

    #[test]
    fn half_blocks() {
        let mut s = Surface::new(4, 4);
        s.set_at(1, 0, Rgb(255, 0, 0));
        s.set_at(1, 1, Rgb(0, 0, 255));
        s.draw_text((0, 2), "hi", Rgb(1, 2, 3), Rgb(4, 5, 6));
        let area = Area::new(0, 0, 10, 10);
        let mut buf = Buffer::empty(area);
        SurfaceWidget::new(&s).render(area, &mut buf);

        let cell = &buf[(1, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
        assert_eq!(buf[(0, 1)].symbol(), "h");
        assert_eq!(buf[(1, 1)].symbol(), "i");
        assert_eq!(buf[(1, 1)].fg, Color::Rgb(1, 2, 3));
        assert_eq!(buf[(2, 1)].symbol(), "▀");
        // Outside the surface.
        assert_eq!(buf[(5, 0)].symbol(), " ");
        assert_eq!(buf[(0, 2)].symbol(), " ");
    }

    #[test]
    fn clipped() {
        let mut s = Surface::new(10, 10);
        s.draw_text((6, 0), "long label", Rgb(1, 1, 1), Rgb(0, 0, 0));
        let area = Area::new(0, 0, 8, 2);
        let mut buf = Buffer::empty(area);
        SurfaceWidget::new(&s).render(area, &mut buf);
        assert_eq!(buf[(6, 0)].symbol(), "l");
        assert_eq!(buf[(7, 0)].symbol(), "o");
    }

    #[test]
    fn pixels() {
        assert_eq!(cell_to_pixel(0, 0), (0, 0));
        assert_eq!(cell_to_pixel(17, 9), (17, 18));
    }

    #[test]
    fn cancel() {
        let t = CancellationToken::new();
        let t2 = t.clone();
        assert!(!t.is_canceled());
        t2.cancel();
        assert!(t.is_canceled());
    }

    #[test]
    fn headless_snapshot() -> Result<()> {
        let acq = Acquisition::spawn(
            || Ok(Box::new(SimulatedTuner::new(vec![(70.46e6, 0.5)])) as Box<dyn Tuner>),
            SDR_SAMPLE_SIZE,
        )?;
        let model = FreqShowModel::new(160, 96, &Settings::default(), acq);
        let mut c = Controller::new(model);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snap.ppm");
        run_headless(&mut c, 3, Some(&path), &CancellationToken::new())?;
        let data = std::fs::read(&path)?;
        assert!(data.starts_with(b"P6\n160 96\n255\n"));

        // Cancelled before the first frame: no frames, but still a snapshot.
        let token = CancellationToken::new();
        token.cancel();
        run_headless(&mut c, 3, Some(&path), &token)?;
        assert!(path.exists());
        Ok(())
    }
}
