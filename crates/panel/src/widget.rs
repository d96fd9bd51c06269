use crate::FieldDescriptor;

/// Default step used by range inputs when a descriptor omits one.
pub const DEFAULT_STEP: f32 = 1.0;

/// Free-form numeric entry paired with a slider.
///
/// `value` is the committed number; `pending` holds text typed since the last
/// commit so a half-entered number never reaches the shader.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberBox {
    value: f32,
    pending: Option<String>,
}

impl NumberBox {
    pub(crate) fn new(value: f32) -> Self {
        Self {
            value,
            pending: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub(crate) fn set(&mut self, value: f32) {
        self.value = value;
        self.pending = None;
    }

    pub(crate) fn push(&mut self, ch: char) -> bool {
        if !is_numeric_char(ch) {
            return false;
        }
        self.pending.get_or_insert_with(String::new).push(ch);
        true
    }

    pub(crate) fn erase(&mut self) {
        if let Some(text) = self.pending.as_mut() {
            text.pop();
            if text.is_empty() {
                self.pending = None;
            }
        }
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Parses the typed text, clearing it either way.
    pub(crate) fn take_entry(&mut self) -> Option<f32> {
        let text = self.pending.take()?;
        text.trim()
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
    }
}

fn is_numeric_char(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E')
}

/// Bounded, stepped range input.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    value: f32,
    min: f32,
    max: f32,
    step: f32,
}

impl Slider {
    pub(crate) fn new(descriptor: &FieldDescriptor, value: f32) -> Self {
        let mut slider = Self {
            value: 0.0,
            min: descriptor.min,
            max: descriptor.max,
            step: descriptor.step.unwrap_or(DEFAULT_STEP),
        };
        slider.value = slider.clamp(value);
        slider
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub(crate) fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Clamps into range and snaps onto the step grid anchored at `min`.
    ///
    /// The grid is evaluated in `f64` so repeated stepping does not drift.
    pub(crate) fn resolve(&self, value: f32) -> f32 {
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        let step = f64::from(self.step);
        let clamped = f64::from(value).clamp(min, max);
        let mut steps = ((clamped - min) / step).round();
        if min + steps * step > max {
            steps -= 1.0;
        }
        (min + steps * step).clamp(min, max) as f32
    }

    pub(crate) fn set(&mut self, value: f32) {
        self.value = value;
    }
}
