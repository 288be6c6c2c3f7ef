//! A progress bar.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    appearance::Appearance,
    config::{Color, ControllerConfig, Palette, DEFAULT_WAITING_MESSAGE},
    StatusRecord, TaskState,
};

/// Types for rendering a bar's fill.
///
/// Elements run while their own bar is locked. They may call back into
/// the controller, except to query the appearance of their own bar.
pub trait FillElement: Send {
    /// Sets the fill's width, in percent of the bar's full width.
    fn set_width_percent(&mut self, percent: f64);

    /// Sets the fill's background color.
    fn set_background_color(&mut self, color: &Color);
}

/// Types for rendering a bar's message.
///
/// Same re-entrancy rules as [`FillElement`].
pub trait MessageElement: Send {
    /// Sets the message text, verbatim.
    fn set_text(&mut self, text: &str);
}

impl<T> FillElement for Box<T>
where
    T: FillElement + ?Sized,
{
    fn set_width_percent(&mut self, percent: f64) {
        (**self).set_width_percent(percent)
    }

    fn set_background_color(&mut self, color: &Color) {
        (**self).set_background_color(color)
    }
}

impl<T> MessageElement for Box<T>
where
    T: MessageElement + ?Sized,
{
    fn set_text(&mut self, text: &str) {
        (**self).set_text(text)
    }
}

/// The outcome of [`ProgressBar::update`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Applied {
    /// The record was pending and left the bar untouched.
    Ignored,
    /// The record was rendered.
    Rendered,
}

/// Options for creating a [`ProgressBar`].
pub struct ProgressBarOptions {
    /// The element rendering the bar's fill.
    pub fill: Box<dyn FillElement>,
    /// The element rendering the bar's message.
    pub message: Box<dyn MessageElement>,
    /// The fill colors.
    pub palette: Palette,
    /// The placeholder shown before any update arrives.
    pub waiting_message: String,
    /// Whether to clamp progress values into `0.0..=1.0`.
    pub clamp_progress: bool,
}

impl ProgressBarOptions {
    /// Creates options for the given elements, using the default palette,
    /// placeholder and clamping.
    pub fn new(fill: impl FillElement + 'static, message: impl MessageElement + 'static) -> Self {
        Self {
            fill: Box::new(fill),
            message: Box::new(message),
            palette: Palette::default(),
            waiting_message: DEFAULT_WAITING_MESSAGE.to_owned(),
            clamp_progress: true,
        }
    }

    /// Builder-style method for applying a controller's bar settings.
    pub fn config(mut self, config: &ControllerConfig) -> Self {
        self.palette = config.palette.clone();
        self.waiting_message = config.waiting_message.clone();
        self.clamp_progress = config.clamp_progress;
        self
    }

    /// Builder-style method for setting the fill colors.
    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Builder-style method for enabling or disabling progress clamping.
    ///
    /// Without clamping, out-of-range progress renders widths outside `0..=100` percent.
    pub fn clamp_progress(mut self, clamp: bool) -> Self {
        self.clamp_progress = clamp;
        self
    }
}

/// A view of one task's status: a colored fill plus a text message.
///
/// The bar mutates its elements' presentation only; it never owns what
/// they render into.
pub struct ProgressBar {
    fill: Box<dyn FillElement>,
    message: Box<dyn MessageElement>,
    palette: Palette,
    clamp_progress: bool,
    appearance: Appearance,
}

impl ProgressBar {
    /// Creates a bar bound to the elements in `options`,
    /// resetting them to an empty, neutral, waiting bar.
    pub fn new(options: ProgressBarOptions) -> Self {
        let ProgressBarOptions {
            mut fill,
            mut message,
            palette,
            waiting_message,
            clamp_progress,
        } = options;

        let appearance = Appearance {
            width_percent: 0.0,
            color: palette.neutral.clone(),
            message: waiting_message,
        };

        fill.set_width_percent(appearance.width_percent);
        fill.set_background_color(&appearance.color);
        message.set_text(&appearance.message);

        Self {
            fill,
            message,
            palette,
            clamp_progress,
            appearance,
        }
    }

    /// Renders `record`.
    ///
    /// Pending records are ignored. Succeeded and failed records switch
    /// the fill color; any other state keeps the current color. Every
    /// non-pending record sets the fill width and the message.
    pub fn update(&mut self, record: &StatusRecord) -> Applied {
        let color = match &record.state {
            TaskState::Pending => return Applied::Ignored,
            TaskState::Success => Some(&self.palette.success),
            TaskState::Failure => Some(&self.palette.failure),
            TaskState::Running(_) => None,
        };

        if let Some(color) = color {
            self.fill.set_background_color(color);
            self.appearance.color = color.clone();
        }

        let width_percent = self.width_percent(record.progress);

        self.fill.set_width_percent(width_percent);
        self.appearance.width_percent = width_percent;

        self.message.set_text(&record.message);
        self.appearance.message.clone_from(&record.message);

        Applied::Rendered
    }

    /// Returns what the bar last rendered into its elements.
    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    fn width_percent(&self, progress: f64) -> f64 {
        let progress = if self.clamp_progress {
            progress.clamp(0.0, 1.0)
        } else {
            progress
        };

        progress * 100.0
    }
}

/// State of a [`MemoryFill`].
#[derive(Clone, PartialEq, Default, Debug)]
pub struct FillState {
    /// The last width set, in percent.
    pub width_percent: Option<f64>,
    /// The last background color set.
    pub color: Option<Color>,
    /// The number of writes the element received.
    pub writes: usize,
}

/// A fill element rendering into shared memory.
///
/// Clones share the same state, so one clone can be handed to a bar
/// while another is kept for inspection.
#[derive(Clone, Default, Debug)]
pub struct MemoryFill {
    state: Arc<RwLock<FillState>>,
}

impl MemoryFill {
    /// Creates an element with nothing rendered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the element's state.
    pub fn state(&self) -> FillState {
        self.state.read().clone()
    }

    /// Returns the last width set, in percent.
    pub fn width_percent(&self) -> Option<f64> {
        self.state.read().width_percent
    }

    /// Returns the last background color set.
    pub fn color(&self) -> Option<Color> {
        self.state.read().color.clone()
    }
}

impl FillElement for MemoryFill {
    fn set_width_percent(&mut self, percent: f64) {
        let mut state = self.state.write();
        state.width_percent = Some(percent);
        state.writes += 1;
    }

    fn set_background_color(&mut self, color: &Color) {
        let mut state = self.state.write();
        state.color = Some(color.clone());
        state.writes += 1;
    }
}

/// A message element rendering into shared memory.
///
/// Clones share the same text.
#[derive(Clone, Default, Debug)]
pub struct MemoryMessage {
    text: Arc<RwLock<Option<String>>>,
}

impl MemoryMessage {
    /// Creates an element with no text yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last text set.
    pub fn text(&self) -> Option<String> {
        self.text.read().clone()
    }
}

impl MessageElement for MemoryMessage {
    fn set_text(&mut self, text: &str) {
        *self.text.write() = Some(text.to_owned());
    }
}
