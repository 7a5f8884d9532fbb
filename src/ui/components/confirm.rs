use super::KeyResult;
use crate::model::EntityId;
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Yes/no prompt guarding a delete
#[derive(Debug, Clone, Default)]
pub struct ConfirmPrompt {
  pending: Option<(EntityId, String)>,
}

impl ConfirmPrompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  /// Ask before deleting `id`; `name` is only shown in the prompt
  pub fn ask(&mut self, id: EntityId, name: impl Into<String>) {
    self.pending = Some((id, name.into()));
  }

  /// `Event(id)` on confirmation. Any other key except `n`/Esc is swallowed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<EntityId> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => match self.pending.take() {
        Some((id, _)) => KeyResult::Event(id),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.pending = None;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, name)) = &self.pending else {
      return;
    };

    let popup = centered_rect(50, 5, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Delete ");

    let label = if name.is_empty() { "this user" } else { name.as_str() };
    let lines = vec![
      Line::from(format!("Delete {}?", label)),
      Line::raw(""),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Cyan)),
        Span::styled(" confirm   ", Style::default().fg(Color::DarkGray)),
        Span::styled("n", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];

    frame.render_widget(
      Paragraph::new(lines).block(block).alignment(Alignment::Center),
      popup,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_confirm_returns_id() {
    let mut prompt = ConfirmPrompt::new();
    assert_eq!(prompt.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);

    prompt.ask(EntityId::from("local-1"), "Ann");
    assert!(prompt.is_active());
    assert_eq!(prompt.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert_eq!(
      prompt.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(EntityId::from("local-1"))
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_decline_clears_prompt() {
    let mut prompt = ConfirmPrompt::new();
    prompt.ask(EntityId::from(3u64), "Clementine");
    assert_eq!(prompt.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(!prompt.is_active());
  }
}
