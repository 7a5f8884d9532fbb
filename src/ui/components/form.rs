use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::config::{FieldConfig, FieldKind};
use crate::model::{Entity, EntityId, Patch};
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use serde_json::Value;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the form that parent needs to handle
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
  /// Enter pressed. `target` is `None` for a create form.
  /// The form stays open until the parent closes it.
  Submitted {
    target: Option<EntityId>,
    values: Patch,
  },
  Cancelled,
}

/// Create/edit popup with one text input per configured field
#[derive(Debug, Clone, Default)]
pub struct FormPopup {
  fields: Vec<FieldConfig>,
  inputs: Vec<TextInput>,
  /// Per field; numeric when configured so or when the edited value was a number
  kinds: Vec<FieldKind>,
  focus: usize,
  target: Option<EntityId>,
  error: Option<String>,
  active: bool,
}

impl FormPopup {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open an empty form for a new record
  pub fn show_create(&mut self, fields: &[FieldConfig]) {
    self.open(fields, None, |_| TextInput::new());
    self.kinds = fields.iter().map(|f| f.kind).collect();
  }

  /// Open a form prefilled from `entity`
  pub fn show_edit(&mut self, fields: &[FieldConfig], entity: &Entity) {
    self.open(fields, Some(entity.id.clone()), |field| {
      TextInput::with_value(&entity.text(&field.name))
    });
    self.kinds = fields
      .iter()
      .map(|f| match entity.attributes.get(&f.name) {
        Some(Value::Number(_)) => FieldKind::Number,
        _ => f.kind,
      })
      .collect();
  }

  fn open(
    &mut self,
    fields: &[FieldConfig],
    target: Option<EntityId>,
    input_for: impl Fn(&FieldConfig) -> TextInput,
  ) {
    self.fields = fields.to_vec();
    self.inputs = fields.iter().map(input_for).collect();
    self.focus = 0;
    self.target = target;
    self.error = None;
    self.active = true;
  }

  pub fn close(&mut self) {
    *self = Self::default();
  }

  /// Show a form-level message, e.g. a validation failure
  pub fn set_error(&mut self, message: impl Into<String>) {
    self.error = Some(message.into());
  }

  fn values(&self) -> Patch {
    self
      .fields
      .iter()
      .zip(&self.inputs)
      .zip(&self.kinds)
      .map(|((field, input), kind)| (field.name.clone(), typed_value(input.value(), *kind)))
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let count = self.inputs.len();
    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(FormEvent::Cancelled)
      }
      KeyCode::Enter => KeyResult::Event(FormEvent::Submitted {
        target: self.target.clone(),
        values: self.values(),
      }),
      KeyCode::Tab | KeyCode::Down => {
        if count > 0 {
          self.focus = (self.focus + 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        if count > 0 {
          self.focus = (self.focus + count - 1) % count;
        }
        KeyResult::Handled
      }
      _ => {
        if let Some(input) = self.inputs.get_mut(self.focus) {
          if input.handle_key(key) == InputResult::Consumed {
            self.error = None;
          }
        }
        // Modal: nothing leaks to the view while the form is open
        KeyResult::Handled
      }
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    // One line per field plus error and hint lines
    let height = self.fields.len() as u16 + 4;
    let popup = centered_rect(60, height, area);
    frame.render_widget(Clear, popup);

    let title = match &self.target {
      Some(id) => format!(" Edit user {} ", id),
      None => " New user ".to_string(),
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);

    let label_width = self
      .fields
      .iter()
      .map(|f| f.label().chars().count())
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .zip(&self.inputs)
      .enumerate()
      .map(|(i, (field, input))| {
        let focused = i == self.focus;
        let label_style = if focused {
          Style::default().fg(Color::Cyan).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let marker = if field.required { "*" } else { " " };

        let mut spans = vec![
          Span::styled(
            format!("{:<width$}{} ", field.label(), marker, width = label_width),
            label_style,
          ),
        ];
        if focused {
          let (before, after) = input.split_at_cursor();
          spans.push(Span::raw(before.to_string()));
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
          spans.push(Span::raw(after.to_string()));
        } else {
          spans.push(Span::raw(input.value().to_string()));
        }
        Line::from(spans)
      })
      .collect();

    lines.push(match &self.error {
      Some(error) => Line::styled(error.clone(), Style::default().fg(Color::Red)),
      None => Line::raw(""),
    });
    lines.push(Line::styled(
      "Tab next  Enter save  Esc cancel",
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines).block(block), popup);
  }
}

/// Numeric fields become JSON numbers; anything unparsable stays text so
/// validation and the remote see what was typed.
fn typed_value(text: &str, kind: FieldKind) -> Value {
  if kind == FieldKind::Number {
    if let Ok(Value::Number(n)) = serde_json::from_str::<Value>(text.trim()) {
      return Value::Number(n);
    }
  }
  Value::String(text.to_string())
}
