/////////////////////////////////////////////////////////////////////////////////////////////
//
// Immutable color tables mapping temperature bands to display colors.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::error::{IsothermError, Result};
use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` representation.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Operational air temperature scale, coldest first: white through magenta, blue,
/// cyan, green, yellow and red to dark red, then greys for the hottest bands.
const TEMPERATURE_COLORS: [Rgb; 100] = [
    Rgb::new(255, 255, 255),
    Rgb::new(255, 245, 255),
    Rgb::new(255, 230, 255),
    Rgb::new(255, 220, 255),
    Rgb::new(255, 205, 255),
    Rgb::new(255, 190, 255),
    Rgb::new(255, 175, 255),
    Rgb::new(255, 160, 255),
    Rgb::new(255, 145, 255),
    Rgb::new(255, 135, 255),
    Rgb::new(255, 120, 255),
    Rgb::new(255, 110, 255),
    Rgb::new(255, 100, 255),
    Rgb::new(255, 90, 255),
    Rgb::new(255, 80, 255),
    Rgb::new(255, 70, 255),
    Rgb::new(255, 60, 255),
    Rgb::new(255, 50, 255),
    Rgb::new(255, 35, 255),
    Rgb::new(255, 15, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(240, 0, 240),
    Rgb::new(230, 0, 230),
    Rgb::new(220, 0, 220),
    Rgb::new(200, 0, 200),
    Rgb::new(190, 0, 180),
    Rgb::new(175, 0, 165),
    Rgb::new(160, 0, 150),
    Rgb::new(145, 0, 140),
    Rgb::new(135, 0, 130),
    Rgb::new(115, 0, 125),
    Rgb::new(90, 0, 115),
    Rgb::new(65, 0, 115),
    Rgb::new(35, 0, 115),
    Rgb::new(10, 0, 120),
    Rgb::new(0, 0, 128),
    Rgb::new(0, 0, 160),
    Rgb::new(0, 0, 190),
    Rgb::new(0, 0, 225),
    Rgb::new(0, 0, 255),
    Rgb::new(0, 35, 255),
    Rgb::new(0, 65, 255),
    Rgb::new(0, 85, 255),
    Rgb::new(0, 110, 255),
    Rgb::new(0, 128, 255),
    Rgb::new(0, 145, 255),
    Rgb::new(0, 170, 255),
    Rgb::new(0, 195, 255),
    Rgb::new(0, 215, 255),
    Rgb::new(0, 230, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(0, 255, 128),
    Rgb::new(0, 255, 95),
    Rgb::new(0, 255, 70),
    Rgb::new(0, 255, 40),
    Rgb::new(0, 255, 0),
    Rgb::new(70, 255, 0),
    Rgb::new(110, 255, 0),
    Rgb::new(140, 255, 0),
    Rgb::new(165, 255, 0),
    Rgb::new(185, 255, 0),
    Rgb::new(205, 255, 0),
    Rgb::new(220, 255, 0),
    Rgb::new(235, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(255, 240, 0),
    Rgb::new(255, 220, 0),
    Rgb::new(255, 195, 0),
    Rgb::new(255, 165, 0),
    Rgb::new(255, 140, 0),
    Rgb::new(255, 120, 0),
    Rgb::new(255, 100, 0),
    Rgb::new(255, 80, 0),
    Rgb::new(255, 60, 0),
    Rgb::new(255, 30, 0),
    Rgb::new(255, 0, 0),
    Rgb::new(245, 0, 0),
    Rgb::new(235, 0, 0),
    Rgb::new(220, 0, 0),
    Rgb::new(205, 0, 0),
    Rgb::new(195, 0, 0),
    Rgb::new(180, 0, 0),
    Rgb::new(165, 0, 0),
    Rgb::new(150, 0, 0),
    Rgb::new(135, 0, 0),
    Rgb::new(120, 0, 0),
    Rgb::new(110, 0, 0),
    Rgb::new(100, 0, 0),
    Rgb::new(90, 0, 0),
    Rgb::new(75, 0, 0),
    Rgb::new(60, 0, 0),
    Rgb::new(60, 20, 20),
    Rgb::new(60, 40, 40),
    Rgb::new(60, 60, 60),
    Rgb::new(80, 80, 80),
    Rgb::new(100, 100, 100),
    Rgb::new(120, 120, 120),
    Rgb::new(140, 140, 140),
    Rgb::new(160, 160, 160),
    Rgb::new(180, 180, 180),
];

/// Ordered list of colors, one per band from lowest to highest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// ### Errors
    /// `InvalidParameter` if `colors` is empty.
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(IsothermError::invalid("palette", "at least one color is required"));
        }
        Ok(Self { colors })
    }

    /// The 100 color temperature scale used for the operational maps.
    pub fn default_temperature() -> Self {
        Self {
            colors: TEMPERATURE_COLORS.to_vec(),
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color of `band` out of `n_bands`.
    ///
    /// With as many colors as bands each band takes its own color. With more colors
    /// than bands the colors are spread evenly so the first and last bands take the
    /// first and last colors: `floor(band * (n_colors - 1) / (n_bands - 1))`.
    ///
    /// ### Errors
    /// `InvalidParameter` if `band` is out of range or the palette has fewer colors
    /// than bands.
    pub fn color_for_band(&self, band: usize, n_bands: usize) -> Result<Rgb> {
        if band >= n_bands {
            return Err(IsothermError::invalid(
                "band",
                format!("band {} is out of range for {} bands", band, n_bands),
            ));
        }

        let n_colors = self.colors.len();
        if n_colors < n_bands {
            return Err(IsothermError::invalid(
                "palette",
                format!("{} colors cannot cover {} bands", n_colors, n_bands),
            ));
        }

        let index = match n_bands {
            1 => 0,
            n if n == n_colors => band,
            n => band * (n_colors - 1) / (n - 1),
        };

        Ok(self.colors[index])
    }

    /// Colors for every band in ascending order.
    pub fn colors_for_bands(&self, n_bands: usize) -> Result<Vec<Rgb>> {
        (0..n_bands).map(|band| self.color_for_band(band, n_bands)).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::default_temperature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn default_temperature_table() {
        let palette = Palette::default_temperature();
        assert!(palette.len() == 100);
        assert!(palette.colors()[0] == Rgb::new(255, 255, 255));
        assert!(palette.colors()[50] == Rgb::new(0, 255, 255));
        assert!(palette.colors()[99] == Rgb::new(180, 180, 180));
        assert!(palette.colors()[75].to_hex() == "#ff0000");
    }

    #[test]
    fn equal_counts_index_directly() {
        let palette = Palette::new(vec![Rgb::new(0, 0, 0), Rgb::new(1, 1, 1), Rgb::new(2, 2, 2)]).unwrap();
        for band in 0..3 {
            assert!(palette.color_for_band(band, 3).unwrap() == palette.colors()[band]);
        }
    }

    #[test]
    fn extra_colors_are_spread_over_bands() {
        let palette = Palette::default_temperature();

        // 100 levels give 99 bands over 100 colors.
        let colors = palette.colors_for_bands(99).unwrap();
        assert!(colors.len() == 99);
        assert!(colors[0] == palette.colors()[0]);
        assert!(colors[98] == palette.colors()[99]);
        assert!(colors[50] == palette.colors()[50]);
        assert!(colors[97] == palette.colors()[97]);

        // Two bands take the two ends of the scale.
        assert!(palette.color_for_band(0, 2).unwrap() == palette.colors()[0]);
        assert!(palette.color_for_band(1, 2).unwrap() == palette.colors()[99]);
    }

    #[test]
    fn too_few_colors_is_an_error() {
        let palette = Palette::new(vec![Rgb::new(0, 0, 0), Rgb::new(9, 9, 9)]).unwrap();
        assert!(palette.color_for_band(0, 3).is_err());
        assert!(palette.color_for_band(2, 2).is_err());
        assert!(Palette::new(Vec::new()).is_err());
    }
}
