use std::fmt;

use crate::quirks::SpriteEdge;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// 64x32 monochrome framebuffer, row-major (`y * 64 + x`).
#[derive(Clone, PartialEq, Eq)]
pub struct Display {
    pixels: [bool; SCREEN_SIZE],
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: [false; SCREEN_SIZE],
        }
    }
}

impl Display {
    pub fn clear(&mut self) {
        self.pixels = [false; SCREEN_SIZE];
    }

    /// Out-of-range coordinates read as unlit.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.pixels[y * SCREEN_WIDTH + x]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(SCREEN_WIDTH)
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// XOR `sprite` onto the screen with its top-left corner at (`x`, `y`).
    ///
    /// The origin wraps once onto the screen; `edge` decides what happens to
    /// the pixels that extend past it. Returns true if any lit pixel was
    /// turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8], edge: SpriteEdge) -> bool {
        let x = x % SCREEN_WIDTH;
        let y = y % SCREEN_HEIGHT;
        let mut collision = false;
        for (row, &bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if (bits >> (7 - col)) & 0x1 == 0 {
                    continue;
                }
                let (px, py) = match edge {
                    SpriteEdge::Clip => {
                        let (px, py) = (x + col, y + row);
                        if px >= SCREEN_WIDTH || py >= SCREEN_HEIGHT {
                            continue;
                        }
                        (px, py)
                    }
                    SpriteEdge::Wrap => ((x + col) % SCREEN_WIDTH, (y + row) % SCREEN_HEIGHT),
                };
                let pixel = &mut self.pixels[py * SCREEN_WIDTH + px];
                if *pixel {
                    collision = true;
                }
                *pixel ^= true;
            }
        }
        collision
    }

    /// Text rendering, `#` for lit pixels, each pixel `scale` characters wide.
    pub fn render_text(&self, scale: usize) -> String {
        let scale = scale.max(1);
        let mut out = String::with_capacity((SCREEN_WIDTH * scale + 1) * SCREEN_HEIGHT);
        for row in self.rows() {
            for &lit in row {
                let ch = if lit { '#' } else { '.' };
                out.extend(std::iter::repeat(ch).take(scale));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text(1))
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("lit", &self.lit_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipped_pixels_do_not_wrap() {
        let mut display = Display::default();
        let collided = display.draw_sprite(62, 31, &[0xF0, 0xF0], SpriteEdge::Clip);
        assert!(!collided);
        assert!(display.pixel(62, 31));
        assert!(display.pixel(63, 31));
        assert_eq!(display.lit_count(), 2);
        assert!(!display.pixel(0, 31));
        assert!(!display.pixel(0, 0));
    }

    #[test]
    fn wrapped_pixels_reappear_on_the_other_side() {
        let mut display = Display::default();
        display.draw_sprite(62, 31, &[0xF0, 0xF0], SpriteEdge::Wrap);
        assert_eq!(display.lit_count(), 8);
        assert!(display.pixel(0, 31));
        assert!(display.pixel(1, 0));
    }

    #[test]
    fn origin_wraps_before_drawing() {
        let mut display = Display::default();
        display.draw_sprite(64 + 3, 32 + 2, &[0x80], SpriteEdge::Clip);
        assert!(display.pixel(3, 2));
        assert_eq!(display.lit_count(), 1);
    }

    #[test]
    fn clipped_pixels_never_collide() {
        let mut display = Display::default();
        display.draw_sprite(0, 1, &[0x80], SpriteEdge::Clip);
        let mut wrapped = display.clone();
        // The second pixel of this row lands at x=64.
        assert!(!display.draw_sprite(63, 1, &[0xC0], SpriteEdge::Clip));
        assert!(wrapped.draw_sprite(63, 1, &[0xC0], SpriteEdge::Wrap));
    }

    #[test]
    fn render_text_scales_columns() {
        let mut display = Display::default();
        display.draw_sprite(0, 0, &[0x80], SpriteEdge::Clip);
        let text = display.render_text(2);
        let first = text.lines().next().unwrap();
        assert_eq!(first.len(), SCREEN_WIDTH * 2);
        assert!(first.starts_with("##.."));
        assert_eq!(text.lines().count(), SCREEN_HEIGHT);
    }
}
