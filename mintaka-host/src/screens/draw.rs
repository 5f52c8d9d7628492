//! Drawing helpers shared by the screens.
//!
//! Rectangles take inclusive corner coordinates.

use std::borrow::Cow;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use mintaka_core::{DISPLAY_WIDTH, Framebuffer};

use super::FontHandle;

const WIDTH: i32 = DISPLAY_WIDTH as i32;

/// Bottom row of the inverted header bar.
pub const HEADER_BOTTOM: i32 = 12;

/// Display name for a keymap layer.
pub fn layer_name(layer: u8) -> Cow<'static, str> {
    match layer {
        0 => Cow::Borrowed("MACRO"),
        1 => Cow::Borrowed("NUMPAD"),
        n => Cow::Owned(format!("L{n}")),
    }
}

fn draw_text(fb: &mut Framebuffer, font: FontHandle, x: i32, y: i32, s: &str, color: BinaryColor) {
    let style = MonoTextStyle::new(font.font(), color);
    let Ok(_) = Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(fb);
}

/// Text with its top-left corner at `(x, y)`.
pub fn text(fb: &mut Framebuffer, font: FontHandle, x: i32, y: i32, s: &str) {
    draw_text(fb, font, x, y, s, BinaryColor::On);
}

/// Text ending just before column `right`.
pub fn text_right(fb: &mut Framebuffer, font: FontHandle, right: i32, y: i32, s: &str) {
    text(fb, font, right - font.text_width(s), y, s);
}

/// Text centered horizontally, for "no data" states.
pub fn placeholder(fb: &mut Framebuffer, font: FontHandle, s: &str) {
    let x = ((WIDTH - font.text_width(s)) / 2).max(0);
    text(fb, font, x, 30, s);
}

pub fn fill_rect(fb: &mut Framebuffer, x0: i32, y0: i32, x1: i32, y1: i32) {
    let Ok(()) = Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(fb);
}

pub fn outline_rect(fb: &mut Framebuffer, x0: i32, y0: i32, x1: i32, y1: i32) {
    let Ok(()) = Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(fb);
}

/// Inverted bar across the top: title on the left, layer on the right.
pub fn header(fb: &mut Framebuffer, font: FontHandle, title: &str, layer: u8) {
    fill_rect(fb, 0, 0, WIDTH - 1, HEADER_BOTTOM);
    draw_text(fb, font, 2, 1, title, BinaryColor::Off);
    let name = layer_name(layer);
    draw_text(fb, font, WIDTH - 2 - font.text_width(&name), 1, &name, BinaryColor::Off);
}

/// Outlined bar filled in proportion to `percent` (capped at 100).
pub fn progress_bar(fb: &mut Framebuffer, x: i32, y: i32, width: i32, height: i32, percent: f32) {
    outline_rect(fb, x, y, x + width, y + height);
    let fill = ((width - 2) as f32 * percent.clamp(0.0, 100.0) / 100.0) as i32;
    if fill > 0 {
        fill_rect(fb, x + 1, y + 1, x + 1 + fill, y + height - 1);
    }
}

/// `B/s`, `KB/s` without decimals, or `MB/s` with one.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes_per_sec >= MIB {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.0} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{bytes_per_sec:.0} B/s")
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontHandle {
        FontHandle::default()
    }

    #[test]
    fn layer_names() {
        assert_eq!(layer_name(0), "MACRO");
        assert_eq!(layer_name(1), "NUMPAD");
        assert_eq!(layer_name(7), "L7");
    }

    #[test]
    fn rates_pick_a_unit() {
        assert_eq!(format_rate(0.0), "0 B/s");
        assert_eq!(format_rate(1023.4), "1023 B/s");
        assert_eq!(format_rate(1024.0), "1 KB/s");
        assert_eq!(format_rate(150.0 * 1024.0), "150 KB/s");
        assert_eq!(format_rate(2.5 * 1024.0 * 1024.0), "2.5 MB/s");
    }

    #[test]
    fn header_is_inverted_bar() {
        let mut fb = Framebuffer::new();
        header(&mut fb, font(), "IO", 0);
        // Corners of the bar are lit, the row below is not.
        assert!(fb.pixel(0, 0));
        assert!(fb.pixel(127, 12));
        assert!(!fb.pixel(0, 13));
        // Glyph strokes punch holes into the bar.
        assert!((0..13).any(|y| (2..14).any(|x| !fb.pixel(x, y))));
    }

    #[test]
    fn progress_bar_fill_is_proportional_and_capped() {
        let mut half = Framebuffer::new();
        progress_bar(&mut half, 0, 0, 10, 4, 50.0);
        // Outline: 11×5 box; interior fill 4 px wide plus its edge.
        assert!(half.pixel(0, 0) && half.pixel(10, 4));
        assert!(half.pixel(5, 2));
        assert!(!half.pixel(7, 2));

        let mut over = Framebuffer::new();
        progress_bar(&mut over, 0, 0, 10, 4, 250.0);
        let mut full = Framebuffer::new();
        progress_bar(&mut full, 0, 0, 10, 4, 100.0);
        assert_eq!(over, full);

        let mut empty = Framebuffer::new();
        progress_bar(&mut empty, 0, 0, 10, 4, 0.0);
        assert!(!empty.pixel(5, 2));
    }

    #[test]
    fn right_aligned_text_stays_left_of_edge() {
        let mut fb = Framebuffer::new();
        text_right(&mut fb, font(), 128, 20, "DN 12 KB/s");
        let lit_cols: Vec<usize> = (0..128)
            .filter(|&x| (20..30).any(|y| fb.pixel(x, y)))
            .collect();
        assert!(!lit_cols.is_empty());
        assert!(*lit_cols.last().unwrap() <= 127);
        assert!(*lit_cols.first().unwrap() >= 128 - 50);
    }

    #[test]
    fn placeholder_is_centered() {
        let mut fb = Framebuffer::new();
        placeholder(&mut fb, font(), "NO DATA");
        let lit: Vec<usize> = (0..128)
            .filter(|&x| (0..64).any(|y| fb.pixel(x, y)))
            .collect();
        let (first, last) = (lit[0], lit[lit.len() - 1]);
        assert!((first as i32 - (127 - last as i32)).abs() <= 5);
    }
}
