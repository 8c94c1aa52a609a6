use serde::{Deserialize, Serialize};
use std::fmt;

/// A packed ARGB color value. Stored as a signed 32-bit integer so data
/// written by earlier versions (which used signed ints) loads unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTag(pub i32);

impl ColorTag {
    pub const fn from_argb(argb: u32) -> Self {
        ColorTag(argb as i32)
    }

    pub const fn argb(self) -> u32 {
        self.0 as u32
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        let argb = self.argb();
        (
            ((argb >> 16) & 0xFF) as u8,
            ((argb >> 8) & 0xFF) as u8,
            (argb & 0xFF) as u8,
        )
    }

    /// Palette position of this color, if it is one of the palette entries.
    pub fn palette_index(self) -> Option<usize> {
        PALETTE.iter().position(|swatch| swatch.tag == self)
    }

    pub fn name(self) -> &'static str {
        self.palette_index()
            .map(|i| PALETTE[i].name)
            .unwrap_or("custom")
    }

    pub fn to_terminal(self) -> ratatui::style::Color {
        let (r, g, b) = self.rgb();
        ratatui::style::Color::Rgb(r, g, b)
    }

    /// Whether light text reads better than dark text on this color.
    pub fn prefers_light_text(self) -> bool {
        let (r, g, b) = self.rgb();
        relative_luminance(r, g, b) < CONTRAST_CROSSOVER
    }
}

impl Default for ColorTag {
    fn default() -> Self {
        PALETTE[0].tag
    }
}

impl fmt::Display for ColorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.argb())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub tag: ColorTag,
}

pub const PALETTE: [Swatch; 6] = [
    Swatch { name: "white", tag: ColorTag::from_argb(0xFFFFFFFF) },
    Swatch { name: "yellow", tag: ColorTag::from_argb(0xFFFFF176) },
    Swatch { name: "red", tag: ColorTag::from_argb(0xFFFF8A80) },
    Swatch { name: "green", tag: ColorTag::from_argb(0xFF81C784) },
    Swatch { name: "blue", tag: ColorTag::from_argb(0xFF64B5F6) },
    Swatch { name: "purple", tag: ColorTag::from_argb(0xFFE1BEE7) },
];

/// Card color used for completed tasks regardless of their tag.
pub const DONE_CARD: ColorTag = ColorTag::from_argb(0xFFE0E0E0);

/// Palette entry at `index`, wrapping out-of-range values to the first entry.
pub fn swatch(index: usize) -> Swatch {
    PALETTE.get(index).copied().unwrap_or(PALETTE[0])
}

/// Luminance at which black and white text have equal contrast ratios.
const CONTRAST_CROSSOVER: f64 = 0.179;

fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    let channel = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };

    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}
