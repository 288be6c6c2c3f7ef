//! A progress bar's rendered appearance.

use crate::config::Color;

/// What a progress bar last rendered into its elements.
#[derive(Clone, PartialEq, Debug)]
pub struct Appearance {
    /// The fill's width, in percent of the bar's full width.
    pub width_percent: f64,
    /// The fill's background color.
    pub color: Color,
    /// The message text.
    pub message: String,
}

impl Appearance {
    /// Returns the fill's width as a CSS length, e.g. `50%`.
    pub fn width_css(&self) -> String {
        format!("{}%", self.width_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_css() {
        let appearance = Appearance {
            width_percent: 50.0,
            color: "#3280cf".parse().unwrap(),
            message: "Halfway".into(),
        };

        assert_eq!(appearance.width_css(), "50%");
    }
}
