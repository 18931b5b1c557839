use serde::{Deserialize, Serialize};

/// Number of entries in a [`ColorTable`].
pub const COLOR_TABLE_LEN: usize = 256;

/// 8-bit RGBA color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorValue", into = "[u8; 4]")]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const RED: Rgba = Rgba([255, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba([r, g, b, a])
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Alpha in `[0, 1]`.
    pub fn alpha_fraction(self) -> f64 {
        self.0[3] as f64 / 255.0
    }

    /// Copy with alpha multiplied by `factor` (clamped to `[0, 1]`).
    pub fn scale_alpha(self, factor: f64) -> Self {
        let a = (self.0[3] as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Rgba([self.0[0], self.0[1], self.0[2], a])
    }

    pub fn lerp(self, other: Rgba, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 4];
        for (i, c) in out.iter_mut().enumerate() {
            let a = self.0[i] as f64;
            let b = other.0[i] as f64;
            *c = (a + (b - a) * t).round() as u8;
        }
        Rgba(out)
    }

    /// Parses `rgba(r,g,b,a)`, `rgb(r,g,b)`, `#rrggbb`, `#rrggbbaa` and a few color names.
    ///
    /// CSS alpha is a fraction in `[0, 1]`.
    pub fn parse_css(text: &str) -> Result<Self, ColorParseError> {
        let s = text.trim().to_ascii_lowercase();
        let err = || ColorParseError(text.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            let byte = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(err)
            };
            return match hex.len() {
                6 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
                8 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
                _ => Err(err()),
            };
        }

        let (args, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest.strip_suffix(')').ok_or_else(err)?, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest.strip_suffix(')').ok_or_else(err)?, false)
        } else {
            return named_color(&s).ok_or_else(err);
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(err());
        }
        let channel = |p: &str| {
            p.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 255.0).round() as u8)
                .ok_or_else(err)
        };
        let alpha = if has_alpha {
            let a = parts[3].parse::<f64>().map_err(|_| err())?;
            (a.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            255
        };
        Ok(Rgba([
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ]))
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let c = match name {
        "red" => Rgba::RED,
        "white" => Rgba::WHITE,
        "black" => Rgba::BLACK,
        "transparent" => Rgba::TRANSPARENT,
        "blue" => Rgba::new(0, 0, 255, 255),
        "green" => Rgba::new(0, 128, 0, 255),
        "lime" => Rgba::new(0, 255, 0, 255),
        "yellow" => Rgba::new(255, 255, 0, 255),
        "cyan" => Rgba::new(0, 255, 255, 255),
        _ => return None,
    };
    Some(c)
}

impl From<Rgba> for [u8; 4] {
    fn from(c: Rgba) -> Self {
        c.0
    }
}

/// Colors may be written as CSS strings or as `[r, g, b, a]` arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Css(String),
    Bytes([u8; 4]),
}

impl TryFrom<ColorValue> for Rgba {
    type Error = ColorParseError;

    fn try_from(value: ColorValue) -> Result<Self, Self::Error> {
        match value {
            ColorValue::Css(s) => Rgba::parse_css(&s),
            ColorValue::Bytes(b) => Ok(Rgba(b)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid color: {:?}", self.0)
    }
}

impl std::error::Error for ColorParseError {}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Rgba,
}

impl ColorStop {
    pub const fn new(offset: f64, color: Rgba) -> Self {
        Self { offset, color }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradientError {
    Empty,
    OffsetOutOfRange(f64),
    NotMonotonic { index: usize },
}

impl std::fmt::Display for GradientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradientError::Empty => write!(f, "gradient has no color stops"),
            GradientError::OffsetOutOfRange(o) => {
                write!(f, "gradient stop offset {o} is outside [0, 1]")
            }
            GradientError::NotMonotonic { index } => {
                write!(f, "gradient stop {index} has a smaller offset than its predecessor")
            }
        }
    }
}

impl std::error::Error for GradientError {}

/// Piecewise-linear color ramp over `[0, 1]`.
///
/// Stops are ordered by offset. Two stops sharing an offset form a hard
/// step; at that offset the later stop wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorStop>", into = "Vec<ColorStop>")]
pub struct Gradient {
    stops: Vec<ColorStop>,
}

impl Gradient {
    pub fn new(stops: Vec<ColorStop>) -> Result<Self, GradientError> {
        if stops.is_empty() {
            return Err(GradientError::Empty);
        }
        for (i, stop) in stops.iter().enumerate() {
            if !(0.0..=1.0).contains(&stop.offset) {
                return Err(GradientError::OffsetOutOfRange(stop.offset));
            }
            if i > 0 && stop.offset < stops[i - 1].offset {
                return Err(GradientError::NotMonotonic { index: i });
            }
        }
        Ok(Self { stops })
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn sample(&self, t: f64) -> Rgba {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if t.is_nan() || t < first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t >= a.offset && t < b.offset {
                let f = (t - a.offset) / (b.offset - a.offset);
                return a.color.lerp(b.color, f);
            }
        }
        last.color
    }
}

impl Default for Gradient {
    /// Blue, cyan, green, yellow, red in equal quarters.
    fn default() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.0, Rgba::new(0, 0, 200, 255)),
                ColorStop::new(0.25, Rgba::new(0, 200, 200, 255)),
                ColorStop::new(0.5, Rgba::new(0, 200, 0, 255)),
                ColorStop::new(0.75, Rgba::new(200, 200, 0, 255)),
                ColorStop::new(1.0, Rgba::new(200, 0, 0, 255)),
            ],
        }
    }
}

impl TryFrom<Vec<ColorStop>> for Gradient {
    type Error = GradientError;

    fn try_from(stops: Vec<ColorStop>) -> Result<Self, Self::Error> {
        Gradient::new(stops)
    }
}

impl From<Gradient> for Vec<ColorStop> {
    fn from(g: Gradient) -> Self {
        g.stops
    }
}

/// A gradient sampled at 256 evenly spaced positions; entry `i` is the color at `i / 255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<Rgba>,
}

impl ColorTable {
    pub fn from_gradient(gradient: &Gradient) -> Self {
        let last = (COLOR_TABLE_LEN - 1) as f64;
        let entries = (0..COLOR_TABLE_LEN)
            .map(|i| gradient.sample(i as f64 / last))
            .collect();
        Self { entries }
    }

    /// Entry for a normalized position; out-of-range positions are clamped.
    pub fn lookup(&self, position: f64) -> Rgba {
        let last = self.entries.len() - 1;
        let idx = (position.clamp(0.0, 1.0) * last as f64).floor() as usize;
        self.entries[idx.min(last)]
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }
}

/// Display state of imagery layers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    /// Opacity in `[0, 1]`.
    pub alpha: f64,
}

impl LayerStyle {
    pub const fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_css_colors() {
        assert_eq!(Rgba::parse_css("rgba(0,0,200,1.00)"), Ok(Rgba::new(0, 0, 200, 255)));
        assert_eq!(Rgba::parse_css("rgba(10, 20, 30, 0.5)"), Ok(Rgba::new(10, 20, 30, 128)));
        assert_eq!(Rgba::parse_css("rgb(1,2,3)"), Ok(Rgba::new(1, 2, 3, 255)));
        assert_eq!(Rgba::parse_css("#FF8000"), Ok(Rgba::new(255, 128, 0, 255)));
        assert_eq!(Rgba::parse_css("#ff800080"), Ok(Rgba::new(255, 128, 0, 128)));
        assert_eq!(Rgba::parse_css(" Red "), Ok(Rgba::RED));
        assert!(Rgba::parse_css("rgba(1,2,3)").is_err());
        assert!(Rgba::parse_css("#12345").is_err());
        assert!(Rgba::parse_css("mauve-ish").is_err());
    }

    #[test]
    fn gradient_rejects_bad_stops() {
        assert_eq!(Gradient::new(vec![]), Err(GradientError::Empty));
        assert_eq!(
            Gradient::new(vec![ColorStop::new(1.5, Rgba::RED)]),
            Err(GradientError::OffsetOutOfRange(1.5))
        );
        assert_eq!(
            Gradient::new(vec![
                ColorStop::new(0.5, Rgba::RED),
                ColorStop::new(0.2, Rgba::RED)
            ]),
            Err(GradientError::NotMonotonic { index: 1 })
        );
    }

    #[test]
    fn sample_interpolates_and_steps() {
        let blue = Rgba::new(0, 0, 255, 255);
        let g = Gradient::new(vec![
            ColorStop::new(0.0, Rgba::BLACK),
            ColorStop::new(0.5, Rgba::WHITE),
            ColorStop::new(0.5, blue),
            ColorStop::new(1.0, Rgba::RED),
        ])
        .unwrap();
        assert_eq!(g.sample(0.25), Rgba::new(128, 128, 128, 255));
        assert_eq!(g.sample(0.5), blue);
        assert_eq!(g.sample(1.0), Rgba::RED);
        assert_eq!(g.sample(-1.0), Rgba::BLACK);
        assert_eq!(g.sample(2.0), Rgba::RED);
    }

    #[test]
    fn color_table_ends_match_gradient_ends() {
        let blue = Rgba::new(0, 0, 255, 255);
        let green = Rgba::new(0, 255, 0, 255);
        let g = Gradient::new(vec![
            ColorStop::new(0.0, blue),
            ColorStop::new(0.5, green),
            ColorStop::new(1.0, Rgba::RED),
        ])
        .unwrap();
        let table = ColorTable::from_gradient(&g);
        assert_eq!(table.entries().len(), COLOR_TABLE_LEN);
        assert_eq!(table.lookup(0.0), blue);
        assert_eq!(table.lookup(1.0), Rgba::RED);
        assert_eq!(table.lookup(1.0 + 1e-12), Rgba::RED);
        assert_eq!(table.lookup(-0.1), blue);
    }

    #[test]
    fn gradient_deserializes_from_css_stops() {
        let g: Gradient = serde_json::from_str(
            r#"[{"offset":0.0,"color":"rgba(0,0,200,1.0)"},{"offset":1.0,"color":[200,0,0,255]}]"#,
        )
        .unwrap();
        assert_eq!(g.stops()[0].color, Rgba::new(0, 0, 200, 255));
        assert_eq!(g.stops()[1].color, Rgba::new(200, 0, 0, 255));
        assert!(serde_json::from_str::<Gradient>("[]").is_err());
    }

    #[test]
    fn scale_alpha_multiplies() {
        assert_eq!(Rgba::new(1, 2, 3, 200).scale_alpha(0.5).alpha(), 100);
        assert_eq!(Rgba::RED.scale_alpha(2.0), Rgba::RED);
    }
}
