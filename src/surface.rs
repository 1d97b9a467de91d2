/*! Off-screen drawing surface.

RGB pixels, plus text labels kept on the side. Text can't be drawn into
pixels at terminal resolution, so a label covers one pixel per character
horizontally, and [`TEXT_HEIGHT`] pixels vertically, and whoever shows the
surface draws the text on top.

Everything is clipped to the surface. Coordinates are signed so that
drawing partly off the surface is fine.
*/
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::Result;

/// Height of a line of text, in pixels.
pub const TEXT_HEIGHT: i32 = 2;

/// A color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Rect {
    /// Create new rectangle.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// One past the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// One past the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// True if the point is inside. Right and bottom edges are outside.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of two rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        (r > x && b > y).then(|| Rect::new(x, y, r - x, b - y))
    }
}

/// Text to draw on top of the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Left edge, in pixels.
    pub x: i32,
    /// Top edge, in pixels.
    pub y: i32,
    /// The text.
    pub text: String,
    /// Text color.
    pub fg: Rgb,
    /// Background color.
    pub bg: Rgb,
}

/// Size of text, as drawn.
pub fn text_rect(text: &str) -> Rect {
    Rect::new(0, 0, text.chars().count() as i32, TEXT_HEIGHT)
}

/// RGB pixels and labels.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    labels: Vec<Label>,
}

impl Surface {
    /// Create black surface.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::default(); width * height],
            labels: Vec::new(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The whole surface.
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Pixel color, if inside.
    pub fn get_at(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set pixel color. Ignored if outside.
    pub fn set_at(&mut self, x: i32, y: i32, c: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = c;
        }
    }

    /// Labels, in drawing order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Fill everything, and remove all labels.
    pub fn fill(&mut self, c: Rgb) {
        self.pixels.fill(c);
        self.labels.clear();
    }

    /// Fill rectangle. Labels starting inside it are removed.
    pub fn fill_rect(&mut self, r: Rect, c: Rgb) {
        let Some(r) = r.intersect(&self.rect()) else {
            return;
        };
        for y in r.y..r.bottom() {
            let start = y as usize * self.width;
            self.pixels[start + r.x as usize..start + r.right() as usize].fill(c);
        }
        self.labels.retain(|l| !r.contains(l.x, l.y));
    }

    /// Draw rectangle outline `border` pixels wide, inside the rectangle.
    pub fn draw_rect(&mut self, r: Rect, c: Rgb, border: i32) {
        let b = border.min(r.w).min(r.h);
        if b <= 0 {
            return;
        }
        self.fill_rect(Rect::new(r.x, r.y, r.w, b), c);
        self.fill_rect(Rect::new(r.x, r.bottom() - b, r.w, b), c);
        self.fill_rect(Rect::new(r.x, r.y, b, r.h), c);
        self.fill_rect(Rect::new(r.right() - b, r.y, b, r.h), c);
    }

    /// Draw line, both ends included.
    pub fn draw_line(&mut self, p0: (i32, i32), p1: (i32, i32), c: Rgb) {
        let r = self.rect();
        let ((x0, y0), (x1, y1)) = if r.contains(p0.0, p0.1) && r.contains(p1.0, p1.1) {
            (p0, p1)
        } else {
            match clip_line(p0, p1, &r) {
                Some(l) => l,
                None => return,
            }
        };
        // Bresenham.
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.set_at(x, y, c);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw connected lines through the points.
    pub fn draw_lines(&mut self, points: &[(i32, i32)], c: Rgb) {
        for w in points.windows(2) {
            self.draw_line(w[0], w[1], c);
        }
    }

    /// Move all pixels up `n` rows. The bottom `n` rows are left as they were.
    pub fn scroll_up(&mut self, n: usize) {
        if n == 0 || n >= self.height {
            return;
        }
        self.pixels.copy_within(n * self.width.., 0);
    }

    /// Copy `area` of `src` to `(x, y)`, labels included.
    pub fn blit(&mut self, src: &Surface, area: Rect, (x, y): (i32, i32)) {
        let Some(area) = area.intersect(&src.rect()) else {
            return;
        };
        for sy in area.y..area.bottom() {
            for sx in area.x..area.right() {
                if let Some(c) = src.get_at(sx, sy) {
                    self.set_at(x + sx - area.x, y + sy - area.y, c);
                }
            }
        }
        let dst = Rect::new(x, y, area.w, area.h);
        self.labels.retain(|l| !dst.contains(l.x, l.y));
        for l in src.labels.iter().filter(|l| area.contains(l.x, l.y)) {
            self.labels.push(Label {
                x: x + l.x - area.x,
                y: y + l.y - area.y,
                ..l.clone()
            });
        }
    }

    /// Draw text with its top left corner at `(x, y)`.
    pub fn draw_text(&mut self, (x, y): (i32, i32), text: &str, fg: Rgb, bg: Rgb) {
        let r = text_rect(text);
        self.fill_rect(Rect::new(x, y, r.w, r.h), bg);
        self.labels.push(Label {
            x,
            y,
            text: text.to_string(),
            fg,
            bg,
        });
    }

    /// Write pixels as binary PPM. Labels are drawn as a solid line of text
    /// color under each character that isn't a space.
    pub fn write_ppm<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut pixels = self.pixels.clone();
        for l in &self.labels {
            for (i, ch) in l.text.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                if let Some(idx) = self.index(l.x + i as i32, l.y) {
                    pixels[idx] = l.fg;
                }
            }
        }
        let mut f = BufWriter::new(std::fs::File::create(path)?);
        write!(f, "P6\n{} {}\n255\n", self.width, self.height)?;
        let bytes: Vec<u8> = pixels.iter().flat_map(|p| [p.0, p.1, p.2]).collect();
        f.write_all(&bytes)?;
        f.flush()?;
        Ok(())
    }
}

// Liang-Barsky. Clips the segment to the pixels inside `r`.
fn clip_line(
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    r: &Rect,
) -> Option<((i32, i32), (i32, i32))> {
    if r.w <= 0 || r.h <= 0 {
        return None;
    }
    let (x0, y0, x1, y1) = (x0 as f64, y0 as f64, x1 as f64, y1 as f64);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (left, top) = (r.x as f64, r.y as f64);
    let (right, bottom) = ((r.right() - 1) as f64, (r.bottom() - 1) as f64);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, x0 - left),
        (dx, right - x0),
        (-dy, y0 - top),
        (dy, bottom - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| {
        let x = (x0 + t * dx).round().clamp(left, right) as i32;
        let y = (y0 + t * dy).round().clamp(top, bottom) as i32;
        (x, y)
    };
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb(255, 0, 0);
    const BLUE: Rgb = Rgb(0, 0, 255);

    fn count(s: &Surface, c: Rgb) -> usize {
        let mut n = 0;
        for y in 0..s.height() as i32 {
            for x in 0..s.width() as i32 {
                if s.get_at(x, y) == Some(c) {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn rects() {
        let r = Rect::new(2, 3, 4, 5);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 7));
        assert!(!r.contains(6, 7));
        assert_eq!(
            r.intersect(&Rect::new(0, 0, 4, 4)),
            Some(Rect::new(2, 3, 2, 1))
        );
        assert_eq!(r.intersect(&Rect::new(6, 0, 4, 4)), None);
    }

    #[test]
    fn fill_clipped() {
        let mut s = Surface::new(10, 10);
        s.fill_rect(Rect::new(-5, -5, 8, 7), RED);
        assert_eq!(count(&s, RED), 3 * 2);
        s.fill_rect(Rect::new(20, 20, 8, 7), RED);
        assert_eq!(count(&s, RED), 6);
        s.fill(BLUE);
        assert_eq!(count(&s, BLUE), 100);
        assert_eq!(s.get_at(10, 0), None);
        assert_eq!(s.get_at(-1, 0), None);
    }

    #[test]
    fn outline() {
        let mut s = Surface::new(10, 10);
        s.draw_rect(Rect::new(0, 0, 10, 10), RED, 2);
        assert_eq!(count(&s, RED), 100 - 36);
        assert_eq!(s.get_at(5, 5), Some(Rgb::default()));
    }

    #[test]
    fn lines() {
        let mut s = Surface::new(10, 10);
        s.draw_line((0, 0), (9, 9), RED);
        assert_eq!(count(&s, RED), 10);
        assert_eq!(s.get_at(9, 9), Some(RED));

        let mut s = Surface::new(10, 10);
        s.draw_line((3, 8), (3, 2), RED);
        assert_eq!(count(&s, RED), 7);

        // Clipped, but doesn't loop forever.
        let mut s = Surface::new(10, 10);
        s.draw_line((-20, 5), (30, 5), RED);
        assert_eq!(count(&s, RED), 10);

        // Entirely outside.
        let mut s = Surface::new(10, 10);
        s.draw_line((-5, -1), (20, -3), RED);
        s.draw_line((12, 0), (12, 9), RED);
        assert_eq!(count(&s, RED), 0);

        let mut s = Surface::new(10, 10);
        s.draw_lines(&[(0, 0), (4, 0), (4, 4)], RED);
        assert_eq!(count(&s, RED), 9);
    }

    #[test]
    fn huge_lines_are_clipped() {
        let start = std::time::Instant::now();
        let mut s = Surface::new(10, 10);
        s.draw_line((5, -1_000_000_000), (5, 1_000_000_000), RED);
        assert_eq!(count(&s, RED), 10);

        let mut s = Surface::new(10, 10);
        s.draw_line((i32::MIN, i32::MIN), (i32::MAX, i32::MAX), RED);
        assert_eq!(count(&s, RED), 10);
        assert_eq!(s.get_at(0, 0), Some(RED));
        assert_eq!(s.get_at(9, 9), Some(RED));

        // Off the top on one end, on the surface at the other.
        let mut s = Surface::new(10, 10);
        s.draw_line((3, i32::MIN), (3, 4), RED);
        assert_eq!(count(&s, RED), 5);
        assert_eq!(s.get_at(3, 4), Some(RED));
        assert_eq!(s.get_at(3, 5), Some(Rgb::default()));

        let mut s = Surface::new(0, 0);
        s.draw_line((-1, -1), (1, 1), RED);
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn scroll() {
        let mut s = Surface::new(3, 4);
        s.set_at(1, 3, RED);
        s.scroll_up(1);
        assert_eq!(s.get_at(1, 2), Some(RED));
        // Bottom row kept.
        assert_eq!(s.get_at(1, 3), Some(RED));
        s.scroll_up(10);
        assert_eq!(count(&s, RED), 2);
    }

    #[test]
    fn blit_with_labels() {
        let mut src = Surface::new(4, 4);
        src.fill(RED);
        src.draw_text((1, 1), "hi", BLUE, RED);
        src.draw_text((3, 3), "outside", BLUE, RED);
        let mut dst = Surface::new(10, 10);
        dst.draw_text((6, 6), "gone", RED, BLUE);
        dst.blit(&src, Rect::new(0, 0, 3, 3), (5, 5));
        assert_eq!(count(&dst, RED), 9);
        assert_eq!(dst.get_at(5, 5), Some(RED));
        assert_eq!(dst.labels().len(), 1);
        assert_eq!(dst.labels()[0].text, "hi");
        assert_eq!((dst.labels()[0].x, dst.labels()[0].y), (6, 6));

        // Partly off the edge.
        let mut dst = Surface::new(6, 6);
        dst.blit(&src, src.rect(), (4, 4));
        assert_eq!(count(&dst, RED), 4);
    }

    #[test]
    fn text() {
        let mut s = Surface::new(10, 10);
        s.draw_text((2, 2), "abc", RED, BLUE);
        assert_eq!(count(&s, BLUE), 6);
        assert_eq!(s.labels().len(), 1);
        // Painting over text removes it.
        s.fill_rect(Rect::new(0, 0, 5, 5), RED);
        assert!(s.labels().is_empty());
        assert_eq!(text_rect("héllo").w, 5);
    }

    #[test]
    fn ppm() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let path = tmpd.path().join("out.ppm");
        let mut s = Surface::new(4, 3);
        s.fill(BLUE);
        s.draw_text((0, 0), "a b", RED, BLUE);
        s.write_ppm(&path)?;
        let data = std::fs::read(&path)?;
        let header = b"P6\n4 3\n255\n";
        assert_eq!(&data[..header.len()], header);
        let px = &data[header.len()..];
        assert_eq!(px.len(), 4 * 3 * 3);
        assert_eq!(&px[0..3], &[255, 0, 0]);
        assert_eq!(&px[3..6], &[0, 0, 255]);
        assert_eq!(&px[6..9], &[255, 0, 0]);
        Ok(())
    }
}
