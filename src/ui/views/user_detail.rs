use crate::config::FieldConfig;
use crate::model::{Entity, EntityId};
use crate::overlay::Overlay;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;

/// Where the displayed version of a record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Remote,
  /// Remote record with a pending local patch
  Modified,
  /// Created here, never persisted by the remote
  LocalOnly,
}

impl Origin {
  pub fn of(overlay: &Overlay, id: &EntityId) -> Self {
    if overlay.is_created(id) {
      Origin::LocalOnly
    } else if overlay.is_updated(id) {
      Origin::Modified
    } else {
      Origin::Remote
    }
  }

  /// Single-character table marker
  pub fn marker(self) -> &'static str {
    match self {
      Origin::Remote => " ",
      Origin::Modified => "~",
      Origin::LocalOnly => "+",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Origin::Remote => "from server",
      Origin::Modified => "modified locally",
      Origin::LocalOnly => "local only",
    }
  }

  fn color(self) -> Color {
    match self {
      Origin::Remote => Color::DarkGray,
      Origin::Modified => Color::Yellow,
      Origin::LocalOnly => Color::Green,
    }
  }
}

/// Read-only view of every attribute of one user
pub struct UserDetailView {
  entity: Entity,
  origin: Origin,
  fields: Vec<FieldConfig>,
  scroll: u16,
}

impl UserDetailView {
  pub fn new(entity: Entity, origin: Origin, fields: Vec<FieldConfig>) -> Self {
    Self {
      entity,
      origin,
      fields,
      scroll: 0,
    }
  }

  /// Configured fields first, then the remaining attributes in key order
  fn lines(&self) -> Vec<Line<'static>> {
    let key_style = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(vec![
      Span::styled("id: ", key_style),
      Span::styled(self.entity.id.to_string(), Style::default().fg(Color::Cyan)),
      Span::raw("  "),
      Span::styled(
        format!("({})", self.origin.label()),
        Style::default().fg(self.origin.color()),
      ),
    ])];

    let configured = self.fields.iter().map(|f| (f.name.as_str(), f.label()));
    let others = self
      .entity
      .attributes
      .keys()
      .filter(|key| !self.fields.iter().any(|f| &f.name == *key))
      .map(|key| (key.as_str(), key.clone()));

    for (name, label) in configured.chain(others) {
      let value = self.entity.attributes.get(name).unwrap_or(&Value::Null);
      match value {
        Value::Object(_) | Value::Array(_) => {
          lines.push(Line::styled(format!("{}:", label), key_style));
          let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
          lines.extend(pretty.lines().map(|l| Line::raw(format!("  {}", l))));
        }
        _ => lines.push(Line::from(vec![
          Span::styled(format!("{}: ", label), key_style),
          Span::raw(self.entity.text(name)),
        ])),
      }
    }

    lines
  }
}

impl View for UserDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.breadcrumb_label()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    let name = self.fields.first().map(|f| self.entity.text(&f.name));
    match name {
      Some(name) if !name.is_empty() => name,
      _ => format!("User {}", self.entity.id),
    }
  }

  fn context(&self) -> Option<String> {
    Some(self.origin.label().to_string())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Patch;
  use serde_json::json;

  fn entity() -> Entity {
    let attributes: Patch = match json!({
      "name": "Leanne Graham",
      "email": "Sincere@april.biz",
      "address": {"city": "Gwenborough"},
      "website": "hildegard.org"
    }) {
      Value::Object(map) => map,
      _ => unreachable!(),
    };
    Entity::new(EntityId::from(1u64), attributes)
  }

  fn text(lines: &[Line]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
  }

  #[test]
  fn test_origin_of_entity() {
    let mut overlay = Overlay::default();
    let id = EntityId::from("1");
    assert_eq!(Origin::of(&overlay, &id), Origin::Remote);

    overlay.record_update(&id, &Patch::new());
    assert_eq!(Origin::of(&overlay, &id), Origin::Modified);

    let local = overlay.record_create(Patch::new(), None);
    assert_eq!(Origin::of(&overlay, &local), Origin::LocalOnly);
  }

  #[test]
  fn test_configured_fields_come_first() {
    let view = UserDetailView::new(
      entity(),
      Origin::Modified,
      vec![FieldConfig::new("name"), FieldConfig::new("phone")],
    );
    let lines = text(&view.lines());

    assert_eq!(lines[0], "id: 1  (modified locally)");
    assert_eq!(lines[1], "Name: Leanne Graham");
    assert_eq!(lines[2], "Phone: ");
    assert_eq!(lines[3], "address:");
    assert!(lines[4..].iter().any(|l| l.contains("\"city\": \"Gwenborough\"")));
    assert!(lines.contains(&"website: hildegard.org".to_string()));
  }

  #[test]
  fn test_breadcrumb_falls_back_to_id() {
    let view = UserDetailView::new(entity(), Origin::Remote, vec![FieldConfig::new("phone")]);
    assert_eq!(view.breadcrumb_label(), "User 1");
  }
}
