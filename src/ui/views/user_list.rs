use crate::config::Config;
use crate::listing::UserTable;
use crate::model::{Entity, EntityId, Operation, Patch};
use crate::overlay::Overlay;
use crate::query::{Mutation, Query, QueryState};
use crate::sync::{Snapshot, SyncedClient};
use crate::ui::components::{
  ConfirmPrompt, FormEvent, FormPopup, KeyResult, SearchEvent, SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{truncate, Status};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{Origin, UserDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tracing::warn;

/// Widest a single cell gets before truncation
const MAX_CELL_WIDTH: usize = 40;

/// Paginated, searchable table of users with create/edit/delete
pub struct UserListView {
  client: SyncedClient,
  /// Attribute shown in the delete prompt
  search_field: String,
  table: UserTable,
  overlay: Overlay,
  query: Query<Snapshot>,
  /// In-flight create/update/delete calls, polled on tick
  mutations: Vec<(Operation, Mutation<()>)>,
  table_state: TableState,
  search: SearchInput,
  form: FormPopup,
  confirm: ConfirmPrompt,
  status: Option<Status>,
  /// Whether any fetch has succeeded yet
  loaded: bool,
}

impl UserListView {
  pub fn new(config: &Config, client: SyncedClient) -> Self {
    let fetch_client = client.clone();
    let mut query = Query::new(move || {
      let client = fetch_client.clone();
      async move { client.fetch().await.map_err(|e| e.to_string()) }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      table: UserTable::new(config.resource.search_field.clone(), config.page_size),
      search_field: config.resource.search_field.clone(),
      overlay: client.reconciler().load(),
      client,
      query,
      mutations: Vec::new(),
      table_state: TableState::default(),
      search: SearchInput::new(),
      form: FormPopup::new(),
      confirm: ConfirmPrompt::new(),
      status: Some(Status::info("Loading users...")),
      loaded: false,
    }
  }

  fn reload(&mut self) {
    self.query.refetch();
    self.status = Some(Status::info("Loading users..."));
  }

  fn selected(&self) -> Option<&Entity> {
    let idx = self.table_state.selected()?;
    self.table.page_items().get(idx).copied()
  }

  fn open_create(&mut self) {
    self.form.show_create(self.client.fields());
  }

  fn open_edit(&mut self) {
    if let Some(entity) = self.selected().cloned() {
      self.form.show_edit(self.client.fields(), &entity);
    }
  }

  fn ask_delete(&mut self) {
    if let Some(entity) = self.selected() {
      let id = entity.id.clone();
      let name = entity.text(&self.search_field);
      self.confirm.ask(id, name);
    }
  }

  fn cycle_sort(&mut self) {
    let sort = self.table.cycle_sort();
    self.table_state.select(Some(0));
    self.status = Some(Status::info(format!("Sorted: {}", sort.label())));
  }

  /// Validate, then hand the form to a background create/update. Validation
  /// failures keep the form open and never reach the network.
  fn submit_form(&mut self, target: Option<EntityId>, values: Patch) {
    let op = match target {
      Some(_) => Operation::Update,
      None => Operation::Create,
    };

    let cleaned = match self.client.validate(op, values) {
      Ok(cleaned) => cleaned,
      Err(e) => {
        self.form.set_error(e.to_string());
        return;
      }
    };
    self.form.close();

    let client = self.client.clone();
    let mutation = match target {
      Some(id) => {
        self.status = Some(Status::info("Updating user..."));
        Mutation::spawn(async move {
          client
            .update(&id, cleaned)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
        })
      }
      None => {
        self.status = Some(Status::info("Creating user..."));
        Mutation::spawn(async move {
          client
            .create(cleaned)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
        })
      }
    };
    self.mutations.push((op, mutation));
  }

  fn delete(&mut self, id: EntityId) {
    self.status = Some(Status::info("Deleting user..."));
    let client = self.client.clone();
    let mutation = Mutation::spawn(async move {
      client.delete(&id).await.map(|_| ()).map_err(|e| e.to_string())
    });
    self.mutations.push((Operation::Delete, mutation));
  }

  /// Re-read the overlay and re-merge the current snapshot. Reading fresh
  /// keeps the table right when several mutations finish out of order.
  fn refresh_overlay(&mut self) {
    self.overlay = self.client.reconciler().load();
    self.table.apply_overlay(&self.overlay);
    self.table_state.select(Some(0));
    ensure_valid_selection(&mut self.table_state, self.table.page_items().len());
  }

  fn poll_query(&mut self) {
    if !self.query.poll() {
      return;
    }

    if let Some(error) = self.query.state().error() {
      warn!(error = %error, "Fetch failed");
      self.status = Some(Status::error(error));
      return;
    }

    if let Some(Snapshot { remote, overlay }) = self.query.take() {
      self.overlay = overlay;
      self.table.set_snapshot(remote, &self.overlay);
      self.table_state.select(Some(0));
      ensure_valid_selection(&mut self.table_state, self.table.page_items().len());
      self.loaded = true;
      self.status = Some(Status::success("Users loaded (local changes kept)"));
    }
  }

  fn poll_mutations(&mut self) {
    let mut finished = Vec::new();
    self.mutations.retain_mut(|(op, mutation)| match mutation.poll() {
      Some(result) => {
        finished.push((*op, result));
        false
      }
      None => true,
    });

    if finished.is_empty() {
      return;
    }

    // Failures leave the overlay untouched, so only successes re-merge
    let mut changed = false;
    for (op, result) in finished {
      self.status = Some(match result {
        Ok(()) => {
          changed = true;
          Status::success(success_message(op))
        }
        Err(error) => {
          warn!(%op, error = %error, "Mutation failed");
          Status::error(error)
        }
      });
    }
    if changed {
      self.refresh_overlay();
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let rows_len = self.table.page_items().len();
    ensure_valid_selection(&mut self.table_state, rows_len);

    let title = match self.query.state() {
      QueryState::Loading => " Users (loading...) ".to_string(),
      _ => format!(" Users ({}) ", self.table.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.table.is_empty() {
      let content = if !self.loaded && self.query.is_loading() {
        "Loading users...".to_string()
      } else if !self.loaded && self.query.is_error() {
        "Could not load users. Press 'r' to retry.".to_string()
      } else if !self.table.term().is_empty() {
        format!("No users match \"{}\".", self.table.term())
      } else {
        "No users.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let fields = self.client.fields();
    let header = Row::new(
      std::iter::once(Cell::from(""))
        .chain(fields.iter().map(|f| Cell::from(f.label()))),
    )
    .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .table
      .page_items()
      .into_iter()
      .map(|entity| {
        let origin = Origin::of(&self.overlay, &entity.id);
        let marker = Cell::from(origin.marker()).style(match origin {
          Origin::Remote => Style::default(),
          Origin::Modified => Style::default().fg(Color::Yellow),
          Origin::LocalOnly => Style::default().fg(Color::Green),
        });
        let cells = fields
          .iter()
          .map(|f| Cell::from(truncate(&entity.text(&f.name), MAX_CELL_WIDTH)));
        Row::new(std::iter::once(marker).chain(cells))
      })
      .collect();

    let widths = std::iter::once(Constraint::Length(1))
      .chain(fields.iter().map(|_| Constraint::Fill(1)));

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn render_pager(&self, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
      Span::raw(" "),
      Span::styled(self.table.summary(), Style::default().fg(Color::White)),
      Span::styled("  sort: ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.table.sort().label(), Style::default().fg(Color::Cyan)),
    ];
    if !self.table.term().is_empty() {
      spans.push(Span::styled("  search: ", Style::default().fg(Color::DarkGray)));
      spans.push(Span::styled(
        self.table.term().to_string(),
        Style::default().fg(Color::Cyan),
      ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }
}

fn success_message(op: Operation) -> &'static str {
  match op {
    Operation::Fetch => "Users loaded (local changes kept)",
    Operation::Create => "User created (UI updated locally)",
    Operation::Update => "User updated (UI updated locally)",
    Operation::Delete => "User deleted (UI updated locally)",
  }
}

impl View for UserListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Modal components first
    match self.confirm.handle_key(key) {
      KeyResult::Event(id) => {
        self.delete(id);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted { target, values }) => {
        self.submit_form(target, values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.table.search(&term);
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('l') | KeyCode::Right => {
        if self.table.next_page() {
          self.table_state.select(Some(0));
        }
      }
      KeyCode::Char('h') | KeyCode::Left => {
        if self.table.prev_page() {
          self.table_state.select(Some(0));
        }
      }
      KeyCode::Char('s') => self.cycle_sort(),
      KeyCode::Char('r') => self.reload(),
      KeyCode::Char('n') => self.open_create(),
      KeyCode::Char('e') => self.open_edit(),
      KeyCode::Char('d') => self.ask_delete(),
      KeyCode::Enter => {
        if let Some(entity) = self.selected() {
          let origin = Origin::of(&self.overlay, &entity.id);
          return ViewAction::Push(Box::new(UserDetailView::new(
            entity.clone(),
            origin,
            self.client.fields().to_vec(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(3),    // Table
        Constraint::Length(1), // Pager
      ])
      .split(area);

    self.render_table(frame, chunks[0]);
    self.render_pager(frame, chunks[1]);

    self.search.render_overlay(frame, chunks[0]);
    self.form.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Users".to_string()
  }

  fn context(&self) -> Option<String> {
    match self.overlay.pending_count() {
      0 => None,
      1 => Some("1 local change".to_string()),
      n => Some(format!("{} local changes", n)),
    }
  }

  fn status(&self) -> Option<&Status> {
    self.status.as_ref()
  }

  fn tick(&mut self) {
    self.poll_query();
    self.poll_mutations();
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.form.is_active() || self.confirm.is_active()
  }

  fn command(&mut self, name: &str) -> bool {
    match name {
      "new" => self.open_create(),
      "reload" => self.reload(),
      "sort" => self.cycle_sort(),
      _ => return false,
    }
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(30),
      ShortcutInfo::new("e", "edit").with_priority(40),
      ShortcutInfo::new("d", "delete").with_priority(50),
      ShortcutInfo::new("s", "sort").with_priority(60),
      ShortcutInfo::new("h/l", "page").with_priority(70),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
