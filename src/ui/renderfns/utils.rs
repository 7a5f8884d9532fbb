use ratatui::prelude::Rect;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Popup of `percent_x`% width and `height` rows, centered in `area`
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
  let width = (area.width as u32 * percent_x.min(100) as u32 / 100) as u16;
  let width = width.max(30).min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_counts_chars() {
    assert_eq!(truncate("Nguy\u{1ec5}n V\u{103}n A", 7), "Nguy...");
  }

  #[test]
  fn test_centered_rect() {
    let area = Rect::new(0, 0, 100, 40);
    assert_eq!(centered_rect(60, 10, area), Rect::new(20, 15, 60, 10));
  }

  #[test]
  fn test_centered_rect_fits_small_area() {
    let area = Rect::new(2, 1, 20, 4);
    let popup = centered_rect(60, 10, area);
    assert_eq!(popup, Rect::new(2, 1, 20, 4));
  }
}
