#![forbid(unsafe_code)]

//! Text overlay planning and its rendering as ffmpeg `drawtext` filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Pixels kept between keyword-anchored text and the frame edge.
pub const OVERLAY_MARGIN: u32 = 10;

const FONT_STYLES: &[&str] = &[
    "Bold",
    "Italic",
    "Oblique",
    "BoldItalic",
    "BoldOblique",
    "Regular",
    "Roman",
    "Light",
    "Medium",
    "Black",
    "Thin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    Left,
    Center,
    Right,
    Top,
    Bottom,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Keyword::Left => "left",
            Keyword::Center => "center",
            Keyword::Right => "right",
            Keyword::Top => "top",
            Keyword::Bottom => "bottom",
        };
        f.write_str(label)
    }
}

/// One axis of an anchor: a keyword or an absolute pixel offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Keyword(Keyword),
    Pixels(f64),
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Keyword(keyword) => fmt::Display::fmt(keyword, f),
            Coordinate::Pixels(value) => write!(f, "{value}"),
        }
    }
}

/// `[horizontal, vertical]` anchor pair, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Coordinate, pub Coordinate);

impl Position {
    pub const fn keywords(horizontal: Keyword, vertical: Keyword) -> Self {
        Self(Coordinate::Keyword(horizontal), Coordinate::Keyword(vertical))
    }

    /// `drawtext` x/y expressions for this anchor.
    pub fn to_drawtext_position(&self, margin: u32) -> (String, String) {
        let m = margin;
        let x = match self.0 {
            Coordinate::Keyword(Keyword::Center) => "(w-text_w)/2".to_string(),
            Coordinate::Keyword(Keyword::Right) => format!("w-text_w-{m}"),
            Coordinate::Keyword(_) => m.to_string(),
            Coordinate::Pixels(px) => px.to_string(),
        };
        let y = match self.1 {
            Coordinate::Keyword(Keyword::Center) => "(h-text_h)/2".to_string(),
            Coordinate::Keyword(Keyword::Bottom) => format!("h-text_h-{m}"),
            Coordinate::Keyword(_) => m.to_string(),
            Coordinate::Pixels(px) => px.to_string(),
        };
        (x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySpan {
    /// Visible for the whole video.
    Full,
    /// Visible from `start` for `duration` seconds.
    Window { start: u64, duration: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub color: String,
    pub position: Position,
    pub span: OverlaySpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle<'a> {
    pub font: &'a str,
    pub font_size: u32,
}

/// Everything drawn on top of one video.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlan {
    pub username: TextOverlay,
    pub date: TextOverlay,
    pub timestamps: Vec<TextOverlay>,
}

impl OverlayPlan {
    pub fn overlays(&self) -> impl Iterator<Item = &TextOverlay> {
        [&self.username, &self.date]
            .into_iter()
            .chain(self.timestamps.iter())
    }

    /// Comma-joined `drawtext` chain suitable for `-filter_script:v`.
    pub fn to_filter_script(&self, style: &TextStyle<'_>) -> String {
        let font = font_option(style.font);
        self.overlays()
            .map(|overlay| drawtext_filter(overlay, &font, style.font_size))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// `HH:MM:SS` for an elapsed second count.
pub fn timestamp_label(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// One label per whole second: `floor(duration)` windows starting at
/// 0..duration-1.
pub fn timestamp_overlays(duration: f64, color: &str, position: Position) -> Vec<TextOverlay> {
    let whole_seconds = if duration.is_finite() && duration > 0.0 {
        duration.floor() as u64
    } else {
        0
    };
    (0..whole_seconds)
        .map(|second| TextOverlay {
            text: timestamp_label(second),
            color: color.to_string(),
            position,
            span: OverlaySpan::Window {
                start: second,
                duration: 1,
            },
        })
        .collect()
}

fn drawtext_filter(overlay: &TextOverlay, font: &str, font_size: u32) -> String {
    let (x, y) = overlay.position.to_drawtext_position(OVERLAY_MARGIN);
    let mut filter = format!(
        "drawtext={font}:expansion=none:text={text}:fontsize={font_size}:fontcolor={color}:x={x}:y={y}",
        text = escape_option_value(&overlay.text),
        color = escape_option_value(&overlay.color),
    );
    if let OverlaySpan::Window { start, duration } = overlay.span {
        let end = start + duration;
        let expr = format!("gte(t,{start})*lt(t,{end})");
        filter.push_str(&format!(":enable={}", escape_option_value(&expr)));
    }
    filter
}

/// `fontfile=` for font files on disk, otherwise a fontconfig `font=`
/// pattern.
fn font_option(font: &str) -> String {
    if Path::new(font).is_file() {
        format!("fontfile={}", escape_option_value(font))
    } else {
        format!("font={}", escape_option_value(&fontconfig_pattern(font)))
    }
}

/// Converts ImageMagick-style names (`Arial-Bold`) into fontconfig patterns
/// (`Arial:style=Bold`).
pub fn fontconfig_pattern(font: &str) -> String {
    match font.rsplit_once('-') {
        Some((family, style)) if !family.is_empty() && FONT_STYLES.contains(&style) => {
            format!("{}:style={style}", family.replace('-', " "))
        }
        _ => font.replace('-', " "),
    }
}

/// Escapes a filter option value for a filtergraph script. ffmpeg unescapes
/// twice: once when splitting the graph into filters, once when splitting a
/// filter's arguments into options. No quoting is used.
fn escape_option_value(value: &str) -> String {
    escape_chars(&escape_chars(value, &['\\', '\'', ':']), &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
