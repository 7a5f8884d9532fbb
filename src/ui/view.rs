use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use super::renderfns::Status;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, forms, prompts) and return
/// actions for the App to execute:
/// App → View → Components
///
/// Views that load data asynchronously use `Query<T>`/`Mutation<T>`
/// internally and poll them in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Extra context for the header, e.g. pending local changes
  fn context(&self) -> Option<String> {
    None
  }

  /// Latest status message for the footer
  fn status(&self) -> Option<&Status> {
    None
  }

  /// Called on each tick to allow views to poll async work
  fn tick(&mut self) {}

  /// True while a text field owns the keyboard, so `:` is typed, not a command
  fn captures_input(&self) -> bool {
    false
  }

  /// Handle a palette command addressed to this view. Returns `false` when
  /// the command means nothing here.
  fn command(&mut self, _name: &str) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
