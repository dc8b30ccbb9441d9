//! HD44780-style 16×2 character LCD.
//!
//! Holds the character RAM for two 16-column lines and renders it to an RGBA
//! framebuffer with a 5×7 dot font. Only the characters the tester prints
//! have glyphs (digits, capitals and a little punctuation); lowercase is shown
//! as capitals and anything else as a blank cell.

use crate::hal::TextDisplay;

/// Characters per line
pub const LCD_COLS: usize = 16;
/// Lines
pub const LCD_ROWS: usize = 2;

const CELL_W: usize = 6; // 5 dots + 1 gap
const CELL_H: usize = 9; // 8 dot rows + 1 gap
const BORDER: usize = 3;

/// Framebuffer width in pixels
pub const LCD_WIDTH: usize = LCD_COLS * CELL_W + 2 * BORDER;
/// Framebuffer height in pixels
pub const LCD_HEIGHT: usize = LCD_ROWS * CELL_H + 2 * BORDER;

const FB_SIZE: usize = LCD_WIDTH * LCD_HEIGHT * 4; // RGBA

// Yellow-green STN panel
const COLOR_BG: [u8; 3] = [0x8C, 0xB8, 0x2C];
const COLOR_DOT_OFF: [u8; 3] = [0x80, 0xAC, 0x28];
const COLOR_DOT_ON: [u8; 3] = [0x1C, 0x2C, 0x08];

/// 5×7 glyph rows, bit 4 is the leftmost dot.
fn glyph(c: u8) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        b'0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        b'1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        b'2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        b'3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        b'4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        b'5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        b'6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        b'7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        b'8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        b'9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        b'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        b'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        b'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        b'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        b'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        b'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        b'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        b'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        b'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        b'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        b'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        b'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        b'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        b'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        b'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        b'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        b'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        b'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        b'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        b'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        b'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        b'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        b'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        b'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        b'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        b'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        b'.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        b'-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        b':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => [0; 7],
    }
}

/// 16×2 character LCD
pub struct CharLcd {
    ddram: [[u8; LCD_COLS]; LCD_ROWS],
    row: usize,
    col: usize,
    pub framebuffer: Vec<u8>,
    /// Whether the framebuffer is stale
    pub dirty: bool,
}

impl CharLcd {
    pub fn new() -> Self {
        let mut lcd = CharLcd {
            ddram: [[b' '; LCD_COLS]; LCD_ROWS],
            row: 0,
            col: 0,
            framebuffer: vec![0; FB_SIZE],
            dirty: true,
        };
        lcd.render();
        lcd
    }

    /// Put one character at the cursor and advance. Line 1 wraps to line 2;
    /// writes past the end of line 2 are dropped.
    pub fn put_char(&mut self, c: u8) {
        if self.row >= LCD_ROWS {
            return;
        }
        self.ddram[self.row][self.col] = c;
        self.col += 1;
        if self.col == LCD_COLS {
            self.col = 0;
            self.row += 1;
        }
        self.dirty = true;
    }

    /// Text of one line with trailing blanks removed
    pub fn line(&self, row: usize) -> String {
        match self.ddram.get(row) {
            Some(cells) => String::from_utf8_lossy(cells).trim_end().to_string(),
            None => String::new(),
        }
    }

    /// Redraw the framebuffer from character RAM if anything changed.
    pub fn render(&mut self) {
        if !self.dirty {
            return;
        }
        for px in self.framebuffer.chunks_exact_mut(4) {
            px[..3].copy_from_slice(&COLOR_BG);
            px[3] = 0xFF;
        }
        for row in 0..LCD_ROWS {
            for col in 0..LCD_COLS {
                let rows = glyph(self.ddram[row][col]);
                let x0 = BORDER + col * CELL_W;
                let y0 = BORDER + row * CELL_H;
                for (dy, bits) in rows.iter().enumerate() {
                    for dx in 0..5 {
                        let on = bits & (0x10 >> dx) != 0;
                        let offset = ((y0 + dy) * LCD_WIDTH + x0 + dx) * 4;
                        let color = if on { COLOR_DOT_ON } else { COLOR_DOT_OFF };
                        self.framebuffer[offset..offset + 3].copy_from_slice(&color);
                    }
                }
            }
        }
        self.dirty = false;
    }

    /// Convert framebuffer to u32 pixel array (0xRRGGBB format for minifb)
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        self.framebuffer
            .chunks_exact(4)
            .map(|px| ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32)
            .collect()
    }
}

impl TextDisplay for CharLcd {
    fn clear(&mut self) {
        self.ddram = [[b' '; LCD_COLS]; LCD_ROWS];
        self.row = 0;
        self.col = 0;
        self.dirty = true;
    }

    fn write(&mut self, text: &str) {
        for c in text.bytes() {
            self.put_char(c);
        }
    }
}

impl Default for CharLcd {
    fn default() -> Self {
        Self::new()
    }
}
