#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Save the current query as a channel, optionally named.
    NewChannel(Option<String>),
    Rename(String),
    Delete,
    /// Run a typed query.
    Query(String),
    /// Follow a deep link (`?q=...`).
    Open(String),
    Home,
    Refresh,
    Help,
    Quit,
}

pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.strip_prefix(':').unwrap_or(input).trim();

    if input.is_empty() {
        return None;
    }

    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };

    match cmd {
        "new" | "save" => Some(Command::NewChannel(
            (!args.is_empty()).then(|| args.to_owned()),
        )),
        "rename" | "mv" if !args.is_empty() => Some(Command::Rename(args.to_owned())),
        "delete" | "del" | "rm" => Some(Command::Delete),
        "query" | "search" | "s" if !args.is_empty() => Some(Command::Query(args.to_owned())),
        "open" | "o" if !args.is_empty() => Some(Command::Open(args.to_owned())),
        "home" => Some(Command::Home),
        "refresh" | "r" => Some(Command::Refresh),
        "help" | "h" => Some(Command::Help),
        "quit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_new_channel() {
        assert_eq!(parse_command(":new"), Some(Command::NewChannel(None)));
        assert_eq!(
            parse_command("save rust news"),
            Some(Command::NewChannel(Some("rust news".into())))
        );
    }

    #[test]
    fn test_parse_command_rename_needs_name() {
        assert_eq!(
            parse_command(":rename  Friends "),
            Some(Command::Rename("Friends".into()))
        );
        assert_eq!(parse_command(":rename"), None);
    }

    #[test]
    fn test_parse_command_query_keeps_raw_text() {
        assert_eq!(
            parse_command(":query foo re:123 bar"),
            Some(Command::Query("foo re:123 bar".into()))
        );
    }

    #[test]
    fn test_parse_command_open_link() {
        assert_eq!(
            parse_command(":open https://lucerne.example/?q=conv%3A9"),
            Some(Command::Open("https://lucerne.example/?q=conv%3A9".into()))
        );
    }

    #[test]
    fn test_parse_command_aliases() {
        assert_eq!(parse_command(":q"), Some(Command::Quit));
        assert_eq!(parse_command(":h"), Some(Command::Help));
        assert_eq!(parse_command(":r"), Some(Command::Refresh));
        assert_eq!(parse_command(":rm"), Some(Command::Delete));
        assert_eq!(parse_command(":home"), Some(Command::Home));
    }

    #[test]
    fn test_parse_command_empty() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command(":"), None);
        assert_eq!(parse_command(":bogus"), None);
    }
}
