use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::sync::SyncedClient;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header, header::extract_domain};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::UserListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// Navigation stack - the user table is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command palette (after pressing :)
  command: CommandInput,

  config: Config,
  client: SyncedClient,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, client: SyncedClient) -> Self {
    let root = UserListView::new(&config, client.clone());
    Self {
      view_stack: vec![Box::new(root)],
      command: CommandInput::new(),
      config,
      client,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(
      url = %self.client.remote().base_url(),
      slot = self.client.reconciler().slot(),
      "usertab started"
    );

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Open palette only when no text field owns the keyboard
    let captured = self.current_view().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !captured {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(cmd, "command");
    match cmd {
      "quit" => self.should_quit = true,
      "users" => self.view_stack.truncate(1),
      // Table commands act on the root view
      "new" | "reload" | "sort" => {
        self.view_stack.truncate(1);
        if let Some(root) = self.view_stack.first_mut() {
          root.command(cmd);
        }
      }
      _ => {
        // Unknown command
      }
    }
  }

  fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  fn title(&self) -> String {
    match &self.config.title {
      Some(title) => title.clone(),
      None => extract_domain(self.client.remote().base_url().as_str()).to_string(),
    }
  }

  fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let title = self.title();
    let breadcrumb = self.view_breadcrumb();

    if let Some(view) = self.view_stack.last_mut() {
      let context = view.context();
      draw_header(
        frame,
        chunks[0],
        &title,
        context.as_deref(),
        &view.shortcuts(),
      );
      view.render(frame, chunks[1]);
    }

    // Status of the root table stays visible from pushed views
    let status = self.view_stack.first().and_then(|v| v.status());
    draw_footer(frame, chunks[2], &breadcrumb, status);

    self.command.render_overlay(frame, chunks[1]);
  }
}
