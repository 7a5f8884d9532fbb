/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "users",
    aliases: &["u", "user", "list"],
    description: "Back to the user table",
  },
  Command {
    name: "new",
    aliases: &["n", "create", "add"],
    description: "Create a user",
  },
  Command {
    name: "reload",
    aliases: &["r", "refresh"],
    description: "Fetch users again (local changes kept)",
  },
  Command {
    name: "sort",
    aliases: &["s", "order"],
    description: "Cycle sort order by name",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit usertab",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  // Stable sort keeps declaration order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("reload");
    assert_eq!(suggestions[0].name, "reload");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("add")[0].name, "new");
    assert_eq!(get_suggestions("q")[0].name, "quit");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("rel")[0].name, "reload");
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(get_suggestions("ser")[0].name, "users");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
