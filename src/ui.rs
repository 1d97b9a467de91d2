//! Buttons and button grids.
//!
//! Buttons don't call anything when clicked. They return their action,
//! and the view decides what to do with it.
use crate::surface::{Rect, Rgb, Surface, text_rect};
use crate::views::{BUTTON_BG, BUTTON_BORDER, BUTTON_FG};

/// Align left.
pub const ALIGN_LEFT: f32 = 0.0;
/// Align top.
pub const ALIGN_TOP: f32 = 0.0;
/// Align center.
pub const ALIGN_CENTER: f32 = 0.5;
/// Align right.
pub const ALIGN_RIGHT: f32 = 1.0;
/// Align bottom.
pub const ALIGN_BOTTOM: f32 = 1.0;

/// Position to draw `child` so that it's aligned inside `parent`, plus
/// padding.
pub fn align(
    child: Rect,
    parent: Rect,
    horizontal: f32,
    vertical: f32,
    hpad: i32,
    vpad: i32,
) -> (i32, i32) {
    let x = parent.x as f32 + horizontal * (parent.w - child.w) as f32;
    let y = parent.y as f32 + vertical * (parent.h - child.h) as f32;
    (x as i32 + hpad, y as i32 + vpad)
}

/// A clickable box with centered text.
#[derive(Debug, Clone)]
pub struct Button<A> {
    rect: Rect,
    text: String,
    action: Option<A>,
    fg: Rgb,
    bg: Rgb,
    border: Rgb,
}

impl<A: Clone> Button<A> {
    /// Space between the given rect and the button.
    pub const PADDING: i32 = 2;
    /// Width of the border.
    pub const BORDER: i32 = 2;

    /// Create button inside `rect`.
    pub fn new(rect: Rect, text: &str, action: Option<A>) -> Self {
        Self {
            rect: Rect::new(
                rect.x + Self::PADDING,
                rect.y + Self::PADDING,
                rect.w - 2 * Self::PADDING,
                rect.h - 2 * Self::PADDING,
            ),
            text: text.to_string(),
            action,
            fg: BUTTON_FG,
            bg: BUTTON_BG,
            border: BUTTON_BORDER,
        }
    }

    /// Set background color.
    pub fn with_bg(mut self, bg: Rgb) -> Self {
        self.bg = bg;
        self
    }

    /// The button, without padding.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Button text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Middle of the button.
    pub fn center(&self) -> (i32, i32) {
        (self.rect.x + self.rect.w / 2, self.rect.y + self.rect.h / 2)
    }

    /// Draw button.
    pub fn render(&self, s: &mut Surface) {
        s.fill_rect(self.rect, self.bg);
        s.draw_rect(self.rect, self.border, Self::BORDER);
        let pos = align(
            text_rect(&self.text),
            self.rect,
            ALIGN_CENTER,
            ALIGN_CENTER,
            0,
            0,
        );
        s.draw_text(pos, &self.text, self.fg, self.bg);
    }

    /// Return the action if the point is on the button, edges included.
    pub fn click(&self, (x, y): (i32, i32)) -> Option<A> {
        let r = &self.rect;
        if x >= r.x && x <= r.right() && y >= r.y && y <= r.bottom() {
            self.action.clone()
        } else {
            None
        }
    }
}

/// Button position and looks, for [`ButtonGrid::add`].
#[derive(Debug, Clone)]
pub struct Cell<A> {
    col: i32,
    row: i32,
    colspan: i32,
    rowspan: i32,
    text: String,
    bg: Option<Rgb>,
    action: Option<A>,
}

impl<A> Cell<A> {
    /// Button at column and row, zero based.
    pub fn new(col: i32, row: i32, text: &str) -> Self {
        Self {
            col,
            row,
            colspan: 1,
            rowspan: 1,
            text: text.to_string(),
            bg: None,
            action: None,
        }
    }

    /// Span more than one column.
    pub fn colspan(mut self, n: i32) -> Self {
        self.colspan = n;
        self
    }

    /// Span more than one row.
    pub fn rowspan(mut self, n: i32) -> Self {
        self.rowspan = n;
        self
    }

    /// Background color.
    pub fn bg(mut self, bg: Rgb) -> Self {
        self.bg = Some(bg);
        self
    }

    /// What clicking does.
    pub fn action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }
}

/// Screen divided into equally sized cells, with buttons in some of them.
#[derive(Debug, Clone)]
pub struct ButtonGrid<A> {
    col_size: i32,
    row_size: i32,
    buttons: Vec<Button<A>>,
}

impl<A: Clone> ButtonGrid<A> {
    /// Create empty grid covering `width` by `height` pixels.
    pub fn new(width: usize, height: usize, cols: usize, rows: usize) -> Self {
        Self {
            col_size: (width / cols.max(1)) as i32,
            row_size: (height / rows.max(1)) as i32,
            buttons: Vec::new(),
        }
    }

    /// Cell width.
    pub fn col_size(&self) -> i32 {
        self.col_size
    }

    /// Cell height.
    pub fn row_size(&self) -> i32 {
        self.row_size
    }

    /// Add button.
    pub fn add(&mut self, cell: Cell<A>) {
        let rect = Rect::new(
            cell.col * self.col_size,
            cell.row * self.row_size,
            cell.colspan * self.col_size,
            cell.rowspan * self.row_size,
        );
        let mut b = Button::new(rect, &cell.text, cell.action);
        if let Some(bg) = cell.bg {
            b = b.with_bg(bg);
        }
        self.buttons.push(b);
    }

    /// All buttons, in the order added.
    pub fn buttons(&self) -> &[Button<A>] {
        &self.buttons
    }

    /// First button with this text.
    pub fn find(&self, text: &str) -> Option<&Button<A>> {
        self.buttons.iter().find(|b| b.text == text)
    }

    /// Draw all buttons.
    pub fn render(&self, s: &mut Surface) {
        for b in &self.buttons {
            b.render(s);
        }
    }

    /// Action of the first button at this point.
    pub fn click(&self, pos: (i32, i32)) -> Option<A> {
        self.buttons.iter().find_map(|b| b.click(pos))
    }
}
