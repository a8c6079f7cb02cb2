use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A text or block color.
///
/// The serde names are the API's wire values (`gray_background` and so
/// on), so a decoded color re-encodes to exactly what was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Gray,
    Brown,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    GrayBackground,
    BrownBackground,
    RedBackground,
    OrangeBackground,
    YellowBackground,
    GreenBackground,
    BlueBackground,
    PurpleBackground,
    PinkBackground,
}

const WIRE_NAMES: [(Color, &str); 19] = [
    (Color::Default, "default"),
    (Color::Gray, "gray"),
    (Color::Brown, "brown"),
    (Color::Red, "red"),
    (Color::Orange, "orange"),
    (Color::Yellow, "yellow"),
    (Color::Green, "green"),
    (Color::Blue, "blue"),
    (Color::Purple, "purple"),
    (Color::Pink, "pink"),
    (Color::GrayBackground, "gray_background"),
    (Color::BrownBackground, "brown_background"),
    (Color::RedBackground, "red_background"),
    (Color::OrangeBackground, "orange_background"),
    (Color::YellowBackground, "yellow_background"),
    (Color::GreenBackground, "green_background"),
    (Color::BlueBackground, "blue_background"),
    (Color::PurpleBackground, "purple_background"),
    (Color::PinkBackground, "pink_background"),
];

impl std::str::FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WIRE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(color, _)| *color)
            .ok_or_else(|| ValidationError::InvalidColor(s.to_string()))
    }
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(color, _)| color == self)
            .map_or("default", |(_, name)| *name)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
