//! Colors, socket endpoints and controller configuration.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The default socket endpoint path.
pub const DEFAULT_ENDPOINT_PATH: &str = "/ws/progress";

/// The default placeholder shown before any update arrives.
pub const DEFAULT_WAITING_MESSAGE: &str = "Waiting...";

/// The default capacity of the frame channel between receiver and dispatcher.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// A CSS hex color, `#rgb` or `#rrggbb`.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Returns the color literal, e.g. `#3280cf`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_static(literal: &'static str) -> Self {
        Self(literal.to_owned())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(digits) = s.strip_prefix('#') else {
            return Err(Error::InvalidColor(s.to_owned()));
        };

        let is_hex = digits.chars().all(|c| c.is_ascii_hexdigit());

        if !is_hex || !matches!(digits.len(), 3 | 6) {
            return Err(Error::InvalidColor(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(literal: String) -> Result<Self, Self::Error> {
        literal.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fill colors a progress bar cycles through.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// The fill color of waiting and running tasks.
    pub neutral: Color,
    /// The fill color of succeeded tasks.
    pub success: Color,
    /// The fill color of failed tasks.
    pub failure: Color,
}

impl Default for Palette {
    /// Returns a palette with following default values:
    ///
    /// - `neutral: #3280cf`,
    /// - `success: #2cd459`,
    /// - `failure: #e80f28`,
    fn default() -> Self {
        Self {
            neutral: Color::from_static("#3280cf"),
            success: Color::from_static("#2cd459"),
            failure: Color::from_static("#e80f28"),
        }
    }
}

/// The location of the page hosting the progress bars.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PageOrigin {
    /// The page's host, including a port if any (e.g. `example.com:8000`).
    pub host: String,
    /// Whether the page was loaded over a secure transport.
    pub secure: bool,
}

impl PageOrigin {
    /// Creates an origin for `host`.
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Returns the URL of the socket endpoint at `path`.
    ///
    /// The scheme matches the page's own transport security.
    pub fn socket_url(&self, path: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };

        format!("{scheme}://{host}{path}", host = self.host)
    }
}

impl FromStr for PageOrigin {
    type Err = Error;

    /// Parses a page URL such as `https://example.com:8000/admin/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| Error::InvalidOrigin {
            origin: s.to_owned(),
            reason,
        };

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;

        let secure = match scheme.to_ascii_lowercase().as_str() {
            "https" => true,
            "http" => false,
            _ => return Err(invalid("scheme must be `http` or `https`")),
        };

        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self::new(host, secure))
    }
}

/// Configuration of a [`ProgressBarController`](crate::ProgressBarController)
/// and the bars it creates defaults for.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// The socket endpoint path, appended verbatim to the page host.
    pub endpoint_path: String,
    /// The bars' fill colors.
    pub palette: Palette,
    /// Capacity of the bounded channel between receiver and dispatcher.
    pub channel_capacity: usize,
    /// Whether to clamp progress values into `0.0..=1.0` before rendering.
    pub clamp_progress: bool,
    /// The placeholder shown before any update arrives.
    pub waiting_message: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_owned(),
            palette: Palette::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            clamp_progress: true,
            waiting_message: DEFAULT_WAITING_MESSAGE.to_owned(),
        }
    }
}

impl ControllerConfig {
    /// Parses a TOML document; missing keys fall back to their defaults.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(document)?;

        if config.channel_capacity == 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Channel capacity of zero is not supported. Using {}.",
                DEFAULT_CHANNEL_CAPACITY
            );
            config.channel_capacity = DEFAULT_CHANNEL_CAPACITY;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn valid_colors() {
        for literal in ["#fff", "#3280cf", "#E80F28"] {
            assert_eq!(literal.parse::<Color>().unwrap().as_str(), literal);
        }
    }

    #[test]
    fn invalid_colors() {
        for literal in ["", "fff", "#ff", "#3280cfa", "#zzzzzz", "red"] {
            assert!(
                matches!(literal.parse::<Color>(), Err(Error::InvalidColor(_))),
                "accepted {literal:?}"
            );
        }
    }

    #[test]
    fn socket_url_follows_page_security() {
        let plain = PageOrigin::new("example.com:8000", false);
        let secure = PageOrigin::new("example.com", true);

        assert_eq!(plain.socket_url("/ws/progress"), "ws://example.com:8000/ws/progress");
        assert_eq!(secure.socket_url("/ws/progress"), "wss://example.com/ws/progress");
    }

    #[test]
    fn parses_page_urls() {
        let origin: PageOrigin = "https://example.com:8000/admin/?q=1".parse().unwrap();
        assert_eq!(origin, PageOrigin::new("example.com:8000", true));

        let origin: PageOrigin = "http://localhost".parse().unwrap();
        assert_eq!(origin, PageOrigin::new("localhost", false));
    }

    #[test]
    fn rejects_bad_page_urls() {
        for url in ["example.com", "ftp://example.com", "https:///path"] {
            assert!(
                matches!(url.parse::<PageOrigin>(), Err(Error::InvalidOrigin { .. })),
                "accepted {url:?}"
            );
        }
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            ControllerConfig::from_toml_str("").unwrap(),
            ControllerConfig::default()
        );
    }

    #[test]
    fn toml_overrides() {
        let config = ControllerConfig::from_toml_str(
            r##"
            endpoint_path = "/ws/tasks"
            channel_capacity = 0
            clamp_progress = false

            [palette]
            success = "#0f0"
            "##,
        )
        .unwrap();

        assert_eq!(config.endpoint_path, "/ws/tasks");
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(!config.clamp_progress);
        assert_eq!(config.palette.success.as_str(), "#0f0");
        assert_eq!(config.palette.neutral, Palette::default().neutral);
        assert_eq!(config.waiting_message, DEFAULT_WAITING_MESSAGE);
    }

    #[test]
    fn toml_rejects_bad_colors() {
        let result = ControllerConfig::from_toml_str("[palette]\nfailure = \"crimson\"\n");

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
