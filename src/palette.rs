//! Colors and palettes for indexed tile graphics.
//!
//! A [`Palette`] is an ordered list of [`Color`]s. Pixels of a tiled raster
//! store indices into it, never the colors themselves. The palette does not
//! care about duplicate entries; it is up to each tile format to decide how
//! many entries it can address.

use image::Rgba;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FromIterator;

/// A color in `0xAARRGGBB` form
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const BLACK: Color = Color(0xFF00_0000);

    /// Create an opaque color from its red, green, and blue components
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub const fn argb(self) -> u32 {
        self.0
    }

    /// The color without its alpha channel
    pub const fn rgb(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    pub const fn is_white(self) -> bool {
        self.rgb() == 0x00FF_FFFF
    }

    pub const fn is_black(self) -> bool {
        self.rgb() == 0
    }

    pub fn from_rgba(px: Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.red(), self.green(), self.blue(), self.alpha()])
    }

    /// Decompose into `[hue, saturation, value]`, each in `0.0..=1.0`.
    /// Hue is `0.0` for grays.
    pub fn hsv(self) -> [f32; 3] {
        let r = f32::from(self.red()) / 255.0;
        let g = f32::from(self.green()) / 255.0;
        let b = f32::from(self.blue()) / 255.0;

        let max_c = r.max(g).max(b);
        let min_c = r.min(g).min(b);
        let v = max_c;
        if min_c == max_c {
            return [0.0, 0.0, v];
        }
        let span = max_c - min_c;
        let s = span / max_c;

        let rc = (max_c - r) / span;
        let gc = (max_c - g) / span;
        let bc = (max_c - b) / span;

        let h = if r == max_c {
            bc - gc
        } else if g == max_c {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };
        let h = h / 6.0;

        [h - h.floor(), s, v]
    }

    /// Order from brightest to darkest: descending value, then descending
    /// saturation, then ascending hue.
    pub fn cmp_brightness(&self, other: &Self) -> Ordering {
        let [h1, s1, v1] = self.hsv();
        let [h2, s2, v2] = other.hsv();

        v2.total_cmp(&v1)
            .then_with(|| s2.total_cmp(&s1))
            .then_with(|| h1.total_cmp(&h2))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// An ordered set of colors addressed by pixel index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: SmallVec<[Color; 16]>,
}

impl Palette {
    pub fn new<I: IntoIterator<Item = Color>>(colors: I) -> Self {
        Self {
            colors: colors.into_iter().collect(),
        }
    }

    /// A ramp of `len` grays, from white at index 0 to black at the last index
    pub fn grayscale(len: usize) -> Self {
        let steps = len.saturating_sub(1).max(1) as u32;
        (0..len as u32)
            .map(|i| {
                let level = (255 - i * 255 / steps) as u8;
                Color::from_rgb(level, level, level)
            })
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Index of the first entry equal to `color`
    pub fn position(&self, color: Color) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }

    /// Copy of `self` extended with opaque black up to `len` entries.
    /// Longer palettes are returned unchanged.
    pub(crate) fn padded_to(&self, len: usize) -> Self {
        let mut colors = self.colors.clone();
        if colors.len() < len {
            colors.resize(len, Color::BLACK);
        }

        Self { colors }
    }
}

impl FromIterator<Color> for Palette {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, color) in self.colors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", color)?;
        }
        write!(f, "]")
    }
}
