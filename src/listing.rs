//! View-model for the user table: search, sort and pagination over the
//! effective list.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Entity;
use crate::overlay::{merge, Overlay};

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  /// Local creates first, then remote order
  #[default]
  Source,
  Ascending,
  Descending,
}

impl SortOrder {
  pub fn next(self) -> Self {
    match self {
      Self::Source => Self::Ascending,
      Self::Ascending => Self::Descending,
      Self::Descending => Self::Source,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Source => "default",
      Self::Ascending => "A-Z",
      Self::Descending => "Z-A",
    }
  }
}

/// State behind the user table.
#[derive(Debug, Clone)]
pub struct UserTable {
  remote: Vec<Entity>,
  effective: Vec<Entity>,
  /// Indices into `effective` that pass the search, in display order
  visible: Vec<usize>,
  search_field: String,
  term: String,
  sort: SortOrder,
  /// 1-based
  page: usize,
  page_size: usize,
}

impl UserTable {
  pub fn new(search_field: impl Into<String>, page_size: usize) -> Self {
    Self {
      remote: Vec::new(),
      effective: Vec::new(),
      visible: Vec::new(),
      search_field: search_field.into(),
      term: String::new(),
      sort: SortOrder::default(),
      page: 1,
      page_size: page_size.max(1),
    }
  }

  /// Replace the remote snapshot and re-merge it with `overlay`.
  pub fn set_snapshot(&mut self, remote: Vec<Entity>, overlay: &Overlay) {
    self.remote = remote;
    self.apply_overlay(overlay);
  }

  /// Re-merge the current snapshot after a fetch or a local change. Goes back
  /// to page 1 so new local creates, which sort first, are on screen.
  pub fn apply_overlay(&mut self, overlay: &Overlay) {
    self.effective = merge(&self.remote, overlay);
    self.refilter();
    self.page = 1;
  }

  pub fn term(&self) -> &str {
    &self.term
  }

  /// Substring filter on the search field, ignoring case and diacritics.
  /// Resets to page 1.
  pub fn search(&mut self, term: &str) {
    self.term = term.trim().to_string();
    self.refilter();
    self.page = 1;
  }

  pub fn sort(&self) -> SortOrder {
    self.sort
  }

  pub fn cycle_sort(&mut self) -> SortOrder {
    self.sort = self.sort.next();
    self.refilter();
    self.page = 1;
    self.sort
  }

  fn refilter(&mut self) {
    let field = &self.search_field;
    let term = search_key(&self.term);
    let mut visible: Vec<usize> = self
      .effective
      .iter()
      .enumerate()
      .filter(|(_, e)| term.is_empty() || search_key(&e.text(field)).contains(term.as_str()))
      .map(|(i, _)| i)
      .collect();

    let key = |i: &usize| self.effective[*i].text(field).to_lowercase();
    match self.sort {
      SortOrder::Source => {}
      SortOrder::Ascending => visible.sort_by_key(key),
      SortOrder::Descending => {
        visible.sort_by_key(key);
        visible.reverse();
      }
    }

    self.visible = visible;
  }

  /// Number of entities passing the search.
  pub fn len(&self) -> usize {
    self.visible.len()
  }

  pub fn is_empty(&self) -> bool {
    self.visible.is_empty()
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn total_pages(&self) -> usize {
    self.visible.len().div_ceil(self.page_size).max(1)
  }

  pub fn next_page(&mut self) -> bool {
    if self.page < self.total_pages() {
      self.page += 1;
      true
    } else {
      false
    }
  }

  pub fn prev_page(&mut self) -> bool {
    if self.page > 1 {
      self.page -= 1;
      true
    } else {
      false
    }
  }

  /// Entities on the current page.
  pub fn page_items(&self) -> Vec<&Entity> {
    let start = (self.page - 1) * self.page_size;
    self
      .visible
      .iter()
      .skip(start)
      .take(self.page_size)
      .map(|&i| &self.effective[i])
      .collect()
  }

  /// e.g. `Page 1 of 2 - 7 user(s)`
  pub fn summary(&self) -> String {
    format!(
      "Page {} of {} - {} user(s)",
      self.page(),
      self.total_pages(),
      self.visible.len()
    )
  }
}

/// Lowercase with combining marks stripped, so "nguyen" finds "Nguyễn"
fn search_key(text: &str) -> String {
  text
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::EntityId;
  use serde_json::json;

  fn users(names: &[&str]) -> Vec<Entity> {
    names
      .iter()
      .enumerate()
      .map(|(i, name)| serde_json::from_value(json!({"id": i + 1, "name": name})).unwrap())
      .collect()
  }

  fn names(table: &UserTable) -> Vec<String> {
    table.page_items().iter().map(|e| e.text("name")).collect()
  }

  fn table(names: &[&str], page_size: usize) -> UserTable {
    let mut table = UserTable::new("name", page_size);
    table.set_snapshot(users(names), &Overlay::default());
    table
  }

  #[test]
  fn test_pagination() {
    let mut table = table(&["a", "b", "c", "d", "e", "f", "g"], 5);
    assert_eq!(table.summary(), "Page 1 of 2 - 7 user(s)");
    assert_eq!(names(&table).len(), 5);

    assert!(table.next_page());
    assert_eq!(names(&table), vec!["f", "g"]);
    assert!(!table.next_page());

    assert!(table.prev_page());
    assert!(!table.prev_page());
    assert_eq!(table.page(), 1);
  }

  #[test]
  fn test_empty_table_has_one_page() {
    let table = table(&[], 5);
    assert_eq!(table.total_pages(), 1);
    assert!(table.page_items().is_empty());
    assert_eq!(table.summary(), "Page 1 of 1 - 0 user(s)");
  }

  #[test]
  fn test_search_is_case_insensitive_and_resets_page() {
    let mut table = table(&["Leanne", "Ervin", "Clementine", "Patricia", "Chelsey", "Dennis"], 2);
    table.next_page();
    table.search("  LE ");
    assert_eq!(table.page(), 1);
    assert_eq!(names(&table), vec!["Leanne", "Clementine"]);
    assert_eq!(table.len(), 3);

    table.search("");
    assert_eq!(table.len(), 6);
  }

  #[test]
  fn test_sort_cycles() {
    let mut table = table(&["bob", "Al", "cy"], 5);
    assert_eq!(table.cycle_sort(), SortOrder::Ascending);
    assert_eq!(names(&table), vec!["Al", "bob", "cy"]);
    assert_eq!(table.cycle_sort(), SortOrder::Descending);
    assert_eq!(names(&table), vec!["cy", "bob", "Al"]);
    assert_eq!(table.cycle_sort(), SortOrder::Source);
    assert_eq!(names(&table), vec!["bob", "Al", "cy"]);
  }

  #[test]
  fn test_apply_overlay_returns_to_first_page() {
    let mut table = table(&["a", "b", "c"], 2);
    table.next_page();
    assert_eq!(table.page(), 2);

    let mut overlay = Overlay::default();
    overlay.record_delete(&EntityId::from("3"));
    table.apply_overlay(&overlay);

    assert_eq!(table.page(), 1);
    assert_eq!(table.summary(), "Page 1 of 1 - 2 user(s)");
  }

  #[test]
  fn test_create_from_later_page_is_visible() {
    let mut table = table(&["u1", "u2", "u3", "u4", "u5", "u6", "u7"], 5);
    assert!(table.next_page());
    assert_eq!(table.page(), 2);

    let mut overlay = Overlay::default();
    overlay.record_create(
      serde_json::from_value(json!({"name": "fresh"})).unwrap(),
      None,
    );
    table.apply_overlay(&overlay);

    assert_eq!(table.page(), 1);
    assert_eq!(names(&table)[0], "fresh");
  }

  #[test]
  fn test_search_ignores_diacritics() {
    let mut table = table(&["Nguy\u{1ec5}n V\u{103}n A", "Tr\u{1ea7}n B", "Le C"], 5);
    table.search("nguyen");
    assert_eq!(names(&table), vec!["Nguy\u{1ec5}n V\u{103}n A"]);

    table.search("TR\u{1ea6}N");
    assert_eq!(names(&table), vec!["Tr\u{1ea7}n B"]);
  }

  #[test]
  fn test_apply_overlay_shows_local_creates_first() {
    let mut table = table(&["a", "b"], 5);
    let mut overlay = Overlay::default();
    let id = overlay.record_create(
      serde_json::from_value(json!({"name": "new"})).unwrap(),
      None,
    );
    table.apply_overlay(&overlay);

    assert_eq!(names(&table), vec!["new", "a", "b"]);
    assert_eq!(table.page_items()[0].id, id);
    assert_eq!(table.len(), 3);
  }
}
