use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with the view breadcrumb and a status message
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&Status>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  if let Some(status) = status {
    spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(status.text.clone(), status.style()));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
  Info,
  Success,
  Error,
}

/// One-line feedback shown after loads and mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
  pub text: String,
  pub kind: StatusKind,
}

impl Status {
  pub fn info(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      kind: StatusKind::Info,
    }
  }

  pub fn success(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      kind: StatusKind::Success,
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      kind: StatusKind::Error,
    }
  }

  fn style(&self) -> Style {
    match self.kind {
      StatusKind::Info => Style::default().fg(Color::Yellow),
      StatusKind::Success => Style::default().fg(Color::Green),
      StatusKind::Error => Style::default().fg(Color::Red),
    }
  }
}
