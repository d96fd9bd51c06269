//! Declarative parameter panel.
//!
//! A viewer exposes its shader uniforms through a static list of
//! [`FieldDescriptor`]s. [`FieldPanel`] turns that list into paired
//! number-box/slider widgets, keeps both widgets in sync, and reports every
//! accepted change as a [`UniformUpdate`] for the renderer to apply. Nothing in
//! here touches a window or a GPU, so each field can be exercised on its own.

mod widget;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use widget::{NumberBox, Slider, DEFAULT_STEP};

/// Key of the implicit group used when a layout declares none.
pub const DEFAULT_GROUP: &str = "main";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PanelError {
    #[error("field '{uniform}' has an empty range ({min} >= {max})")]
    EmptyRange { uniform: String, min: f32, max: f32 },
    #[error("field '{uniform}' has a non-positive step ({step})")]
    InvalidStep { uniform: String, step: f32 },
    #[error("field '{uniform}' requires an initial value")]
    MissingInitialValue { uniform: String },
    #[error("field '{uniform}' initial value {ini} lies outside [{min}, {max}]")]
    InitialOutOfRange {
        uniform: String,
        ini: f32,
        min: f32,
        max: f32,
    },
    #[error("field '{uniform}' refers to unknown group '{group}'")]
    UnknownGroup { uniform: String, group: String },
    #[error("uniform '{0}' is bound to more than one field")]
    DuplicateUniform(String),
    #[error("group '{0}' is declared more than once")]
    DuplicateGroup(String),
}

/// Immutable description of one adjustable uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub uniform: String,
    pub label: String,
    pub min: f32,
    pub max: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Container that fields are inserted into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default)]
    pub closed: bool,
}

impl FieldGroup {
    pub fn main() -> Self {
        Self {
            key: DEFAULT_GROUP.to_string(),
            title: "Main".to_string(),
            collapsible: false,
            closed: false,
        }
    }
}

/// How a descriptor without `ini` is treated.
///
/// The two bundled layouts disagree here and are kept as separate policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialValuePolicy {
    /// Missing `ini` starts the field at zero.
    #[default]
    DefaultZero,
    /// Every descriptor must carry `ini`.
    Required,
}

/// A single uniform write produced by the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformUpdate {
    pub uniform: String,
    pub value: f32,
}

/// Input understood by [`FieldPanel::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelCommand {
    FocusNext,
    FocusPrevious,
    Increment { coarse: bool },
    Decrement { coarse: bool },
    Type(char),
    Erase,
    Commit,
    Cancel,
    Reset,
    ToggleGroup(usize),
}

/// Number box and slider bound to one descriptor.
#[derive(Debug, Clone)]
pub struct FieldWidget {
    descriptor: FieldDescriptor,
    group: usize,
    initial: f32,
    number: NumberBox,
    slider: Slider,
}

impl FieldWidget {
    fn new(descriptor: FieldDescriptor, group: usize, initial: f32) -> Self {
        let slider = Slider::new(&descriptor, initial);
        let initial = slider.value();
        Self {
            number: NumberBox::new(initial),
            slider,
            descriptor,
            group,
            initial,
        }
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn uniform(&self) -> &str {
        &self.descriptor.uniform
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    pub fn value(&self) -> f32 {
        self.slider.value()
    }

    pub fn number(&self) -> &NumberBox {
        &self.number
    }

    pub fn slider(&self) -> &Slider {
        &self.slider
    }

    fn mirror(&mut self, value: f32) -> UniformUpdate {
        self.number.set(value);
        self.slider.set(value);
        UniformUpdate {
            uniform: self.descriptor.uniform.clone(),
            value,
        }
    }
}

/// Runtime state of a group container.
#[derive(Debug, Clone)]
pub struct GroupState {
    group: FieldGroup,
}

impl GroupState {
    pub fn key(&self) -> &str {
        &self.group.key
    }

    pub fn title(&self) -> &str {
        &self.group.title
    }

    pub fn is_collapsible(&self) -> bool {
        self.group.collapsible
    }

    pub fn is_closed(&self) -> bool {
        self.group.closed
    }
}

/// Widgets built from a descriptor list, plus focus and group state.
#[derive(Debug, Clone)]
pub struct FieldPanel {
    groups: Vec<GroupState>,
    fields: Vec<FieldWidget>,
    focus: Option<usize>,
}

impl FieldPanel {
    /// Validates the descriptor list and instantiates one widget pair per entry.
    pub fn build(
        groups: &[FieldGroup],
        fields: &[FieldDescriptor],
        policy: InitialValuePolicy,
    ) -> Result<Self, PanelError> {
        let groups: Vec<FieldGroup> = if groups.is_empty() {
            vec![FieldGroup::main()]
        } else {
            groups.to_vec()
        };

        let mut seen_groups = HashSet::new();
        for group in &groups {
            if !seen_groups.insert(group.key.as_str()) {
                return Err(PanelError::DuplicateGroup(group.key.clone()));
            }
        }

        let mut seen_uniforms = HashSet::new();
        let mut widgets = Vec::with_capacity(fields.len());
        for descriptor in fields {
            validate_descriptor(descriptor, policy)?;
            if !seen_uniforms.insert(descriptor.uniform.as_str()) {
                return Err(PanelError::DuplicateUniform(descriptor.uniform.clone()));
            }
            let group = match descriptor.group.as_deref() {
                None => 0,
                Some(key) => groups
                    .iter()
                    .position(|group| group.key == key)
                    .ok_or_else(|| PanelError::UnknownGroup {
                        uniform: descriptor.uniform.clone(),
                        group: key.to_string(),
                    })?,
            };
            let initial = descriptor.ini.unwrap_or(0.0);
            widgets.push(FieldWidget::new(descriptor.clone(), group, initial));
        }

        let mut panel = Self {
            groups: groups.into_iter().map(|group| GroupState { group }).collect(),
            fields: widgets,
            focus: None,
        };
        let first = panel.visible_indices().next();
        panel.focus = first;
        Ok(panel)
    }

    pub fn fields(&self) -> &[FieldWidget] {
        &self.fields
    }

    pub fn groups(&self) -> &[GroupState] {
        &self.groups
    }

    pub fn field(&self, index: usize) -> Option<&FieldWidget> {
        self.fields.get(index)
    }

    pub fn focused(&self) -> Option<&FieldWidget> {
        self.focus.and_then(|index| self.fields.get(index))
    }

    /// Initial value of every field, in declaration order.
    pub fn seed_uniforms(&self) -> Vec<UniformUpdate> {
        self.fields
            .iter()
            .map(|field| UniformUpdate {
                uniform: field.descriptor.uniform.clone(),
                value: field.initial,
            })
            .collect()
    }

    /// Shared handler behind both widgets of a field.
    pub fn input(&mut self, index: usize, value: f32) -> Option<UniformUpdate> {
        if !value.is_finite() {
            return None;
        }
        let field = self.fields.get_mut(index)?;
        let resolved = field.slider.resolve(value);
        Some(field.mirror(resolved))
    }

    /// Flips a collapsible group open or closed and returns the new state.
    pub fn toggle_group(&mut self, index: usize) -> Option<bool> {
        let group = self.groups.get_mut(index)?;
        if !group.group.collapsible {
            return None;
        }
        group.group.closed = !group.group.closed;
        let closed = group.group.closed;

        if closed
            && self
                .focused()
                .is_some_and(|field| field.group == index)
        {
            self.focus = self.next_visible(self.focus, true);
        } else if self.focus.is_none() {
            let first = self.visible_indices().next();
            self.focus = first;
        }
        Some(closed)
    }

    pub fn apply(&mut self, command: PanelCommand) -> Option<UniformUpdate> {
        match command {
            PanelCommand::FocusNext => {
                self.cancel_entry();
                self.focus = self.next_visible(self.focus, true);
                None
            }
            PanelCommand::FocusPrevious => {
                self.cancel_entry();
                self.focus = self.next_visible(self.focus, false);
                None
            }
            PanelCommand::Increment { coarse } => self.nudge(1.0, coarse),
            PanelCommand::Decrement { coarse } => self.nudge(-1.0, coarse),
            PanelCommand::Type(ch) => {
                let index = self.focus?;
                self.fields[index].number.push(ch);
                None
            }
            PanelCommand::Erase => {
                let index = self.focus?;
                self.fields[index].number.erase();
                None
            }
            PanelCommand::Commit => {
                let index = self.focus?;
                let value = self.fields[index].number.take_entry()?;
                self.input(index, value)
            }
            PanelCommand::Cancel => {
                self.cancel_entry();
                None
            }
            PanelCommand::Reset => {
                let index = self.focus?;
                let initial = self.fields[index].initial;
                Some(self.fields[index].mirror(initial))
            }
            PanelCommand::ToggleGroup(group) => {
                self.toggle_group(group);
                None
            }
        }
    }

    /// Returns true when a typed entry is in progress on the focused field.
    pub fn is_editing(&self) -> bool {
        self.focused()
            .is_some_and(|field| field.number.pending().is_some())
    }

    /// One-line description of the focused field.
    pub fn status_line(&self) -> String {
        let Some(field) = self.focused() else {
            return "no field selected".to_string();
        };
        let group = &self.groups[field.group];
        let value = match field.number.pending() {
            Some(text) => format!("{text}_"),
            None => format_value(field.value()),
        };
        format!(
            "[{}] {}: {} ({} .. {})",
            group.title(),
            field.label(),
            value,
            format_value(field.slider.min()),
            format_value(field.slider.max()),
        )
    }

    fn nudge(&mut self, direction: f32, coarse: bool) -> Option<UniformUpdate> {
        let index = self.focus?;
        self.fields[index].number.cancel();
        let slider = &self.fields[index].slider;
        let factor = if coarse { 10.0 } else { 1.0 };
        let target = slider.value() + direction * slider.step() * factor;
        self.input(index, target)
    }

    fn cancel_entry(&mut self) {
        if let Some(index) = self.focus {
            self.fields[index].number.cancel();
        }
    }

    fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| !self.groups[field.group].is_closed())
            .map(|(index, _)| index)
    }

    fn next_visible(&self, from: Option<usize>, forward: bool) -> Option<usize> {
        let count = self.fields.len();
        if count == 0 {
            return None;
        }
        let start = from.unwrap_or(if forward { count - 1 } else { 0 });
        (1..=count)
            .map(|offset| {
                if forward {
                    (start + offset) % count
                } else {
                    (start + count - offset % count) % count
                }
            })
            .find(|&index| !self.groups[self.fields[index].group].is_closed())
    }
}

fn validate_descriptor(
    descriptor: &FieldDescriptor,
    policy: InitialValuePolicy,
) -> Result<(), PanelError> {
    let uniform = || descriptor.uniform.clone();
    if !(descriptor.min < descriptor.max) {
        return Err(PanelError::EmptyRange {
            uniform: uniform(),
            min: descriptor.min,
            max: descriptor.max,
        });
    }
    if let Some(step) = descriptor.step {
        if !(step > 0.0) || !step.is_finite() {
            return Err(PanelError::InvalidStep {
                uniform: uniform(),
                step,
            });
        }
    }
    match descriptor.ini {
        None if policy == InitialValuePolicy::Required => {
            Err(PanelError::MissingInitialValue { uniform: uniform() })
        }
        Some(ini) if !(descriptor.min..=descriptor.max).contains(&ini) => {
            Err(PanelError::InitialOutOfRange {
                uniform: uniform(),
                ini,
                min: descriptor.min,
                max: descriptor.max,
            })
        }
        _ => Ok(()),
    }
}

fn format_value(value: f32) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(uniform: &str, min: f32, max: f32, ini: Option<f32>) -> FieldDescriptor {
        FieldDescriptor {
            uniform: uniform.into(),
            label: uniform.to_uppercase(),
            min,
            max,
            step: Some(0.5),
            ini,
            group: None,
        }
    }

    fn group(key: &str, collapsible: bool) -> FieldGroup {
        FieldGroup {
            key: key.into(),
            title: key.into(),
            collapsible,
            closed: false,
        }
    }

    fn transform_panel() -> FieldPanel {
        FieldPanel::build(
            &[],
            &[
                field("rotate", -180.0, 180.0, None),
                field("squeeze", 0.0, 1.0, None),
                field("scale", 1.0, 100.0, Some(1.0)),
            ],
            InitialValuePolicy::DefaultZero,
        )
        .unwrap()
    }

    #[test]
    fn widgets_start_in_sync_with_seeded_uniforms() {
        let panel = transform_panel();
        let seeds = panel.seed_uniforms();
        assert_eq!(seeds.len(), 3);
        for (widget, seed) in panel.fields().iter().zip(&seeds) {
            assert_eq!(widget.number().value(), widget.slider().value());
            assert_eq!(seed.uniform, widget.uniform());
            assert_eq!(seed.value, widget.value());
        }
        assert_eq!(seeds[0].value, 0.0);
        assert_eq!(seeds[2].value, 1.0);
    }

    #[test]
    fn default_zero_is_clamped_into_range() {
        let panel = FieldPanel::build(
            &[],
            &[field("scale", 1.0, 100.0, None)],
            InitialValuePolicy::DefaultZero,
        )
        .unwrap();
        assert_eq!(panel.fields()[0].value(), 1.0);
        assert_eq!(panel.fields()[0].number().value(), 1.0);
    }

    #[test]
    fn required_policy_rejects_missing_ini() {
        let err = FieldPanel::build(
            &[],
            &[field("dip", -10.0, 10.0, None)],
            InitialValuePolicy::Required,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PanelError::MissingInitialValue {
                uniform: "dip".into()
            }
        );
    }

    #[test]
    fn required_policy_rejects_out_of_range_ini() {
        let err = FieldPanel::build(
            &[],
            &[field("dip", -10.0, 10.0, Some(20.0))],
            InitialValuePolicy::Required,
        )
        .unwrap_err();
        assert!(matches!(err, PanelError::InitialOutOfRange { .. }));
    }

    #[test]
    fn default_zero_policy_rejects_out_of_range_or_nan_ini() {
        for ini in [500.0, -1.0, f32::NAN] {
            let err = FieldPanel::build(
                &[],
                &[field("scale", 1.0, 100.0, Some(ini))],
                InitialValuePolicy::DefaultZero,
            )
            .unwrap_err();
            assert!(matches!(err, PanelError::InitialOutOfRange { .. }), "{ini}");
        }
    }

    #[test]
    fn rejects_malformed_descriptors() {
        let mut empty = field("a", 1.0, 1.0, None);
        assert!(matches!(
            FieldPanel::build(&[], &[empty.clone()], InitialValuePolicy::DefaultZero),
            Err(PanelError::EmptyRange { .. })
        ));
        empty.max = 2.0;
        empty.step = Some(0.0);
        assert!(matches!(
            FieldPanel::build(&[], &[empty], InitialValuePolicy::DefaultZero),
            Err(PanelError::InvalidStep { .. })
        ));

        let duplicate = [field("a", 0.0, 1.0, None), field("a", 0.0, 1.0, None)];
        assert_eq!(
            FieldPanel::build(&[], &duplicate, InitialValuePolicy::DefaultZero).unwrap_err(),
            PanelError::DuplicateUniform("a".into())
        );

        let mut orphan = field("b", 0.0, 1.0, None);
        orphan.group = Some("missing".into());
        assert!(matches!(
            FieldPanel::build(&[], &[orphan], InitialValuePolicy::DefaultZero),
            Err(PanelError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn input_mirrors_resolved_value_into_both_widgets() {
        let mut panel = transform_panel();
        let update = panel.input(0, 42.3).unwrap();
        assert_eq!(update.uniform, "rotate");
        assert_eq!(update.value, 42.5);
        let widget = &panel.fields()[0];
        assert_eq!(widget.number().value(), 42.5);
        assert_eq!(widget.slider().value(), 42.5);

        let update = panel.input(1, 7.0).unwrap();
        assert_eq!(update.value, 1.0);
        assert!(panel.input(9, 1.0).is_none());
        assert!(panel.input(0, f32::NAN).is_none());
    }

    #[test]
    fn stepping_moves_by_step_and_coarse_by_ten() {
        let mut panel = transform_panel();
        let update = panel.apply(PanelCommand::Increment { coarse: false }).unwrap();
        assert_eq!(update.value, 0.5);
        let update = panel.apply(PanelCommand::Increment { coarse: true }).unwrap();
        assert_eq!(update.value, 5.5);
        let update = panel.apply(PanelCommand::Decrement { coarse: false }).unwrap();
        assert_eq!(update.value, 5.0);
    }

    #[test]
    fn typed_entry_commits_through_the_slider() {
        let mut panel = transform_panel();
        for ch in "-12.4".chars() {
            assert!(panel.apply(PanelCommand::Type(ch)).is_none());
        }
        assert!(panel.is_editing());
        assert!(panel.status_line().contains("-12.4_"));
        let update = panel.apply(PanelCommand::Commit).unwrap();
        assert_eq!(update.value, -12.5);
        assert!(!panel.is_editing());

        panel.apply(PanelCommand::Type('9'));
        panel.apply(PanelCommand::Cancel);
        assert!(panel.apply(PanelCommand::Commit).is_none());
        assert_eq!(panel.fields()[0].value(), -12.5);
    }

    #[test]
    fn reset_restores_initial_value() {
        let mut panel = transform_panel();
        panel.apply(PanelCommand::FocusPrevious);
        assert_eq!(panel.focused().unwrap().uniform(), "scale");
        panel.input(2, 30.0);
        let update = panel.apply(PanelCommand::Reset).unwrap();
        assert_eq!(update.value, 1.0);
        assert_eq!(panel.fields()[2].number().value(), 1.0);
    }

    #[test]
    fn toggling_twice_restores_group_state() {
        let groups = [group("camera", true), group("view", true)];
        let mut fields = vec![field("height", 0.0, 10.0, Some(1.0))];
        fields.push(FieldDescriptor {
            group: Some("view".into()),
            ..field("range", 1.0, 10.0, Some(5.0))
        });
        let mut panel = FieldPanel::build(&groups, &fields, InitialValuePolicy::Required).unwrap();

        let before: Vec<bool> = panel.groups().iter().map(GroupState::is_closed).collect();
        assert_eq!(panel.toggle_group(0), Some(true));
        assert_eq!(panel.toggle_group(0), Some(false));
        let after: Vec<bool> = panel.groups().iter().map(GroupState::is_closed).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn closed_groups_are_skipped_by_focus() {
        let groups = [group("camera", true), group("view", true)];
        let fields = vec![
            field("height", 0.0, 10.0, Some(1.0)),
            FieldDescriptor {
                group: Some("view".into()),
                ..field("range", 1.0, 10.0, Some(5.0))
            },
        ];
        let mut panel = FieldPanel::build(&groups, &fields, InitialValuePolicy::Required).unwrap();
        assert_eq!(panel.focused().unwrap().uniform(), "height");

        panel.toggle_group(0);
        assert_eq!(panel.focused().unwrap().uniform(), "range");
        panel.apply(PanelCommand::FocusNext);
        assert_eq!(panel.focused().unwrap().uniform(), "range");

        panel.toggle_group(1);
        assert!(panel.focused().is_none());
        assert!(panel.apply(PanelCommand::Increment { coarse: false }).is_none());

        panel.toggle_group(0);
        assert_eq!(panel.focused().unwrap().uniform(), "height");
    }

    #[test]
    fn fixed_groups_ignore_toggles() {
        let mut panel = transform_panel();
        assert_eq!(panel.toggle_group(0), None);
        assert!(!panel.groups()[0].is_closed());
        assert_eq!(panel.groups()[0].key(), DEFAULT_GROUP);
    }

    #[test]
    fn status_line_names_group_field_and_range() {
        let panel = transform_panel();
        assert_eq!(panel.status_line(), "[Main] ROTATE: 0 (-180 .. 180)");
    }
}
