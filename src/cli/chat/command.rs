/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Clear,
    Status,
    History,
    Attach(Option<String>),
    Detach,
    ForgetArticle,
    /// Anything that is not a known command is a chat turn.
    Send(String),
}

impl Command {
    /// Only exact command names are commands; `//` escapes a leading slash.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if let Some(escaped) = trimmed.strip_prefix("//") {
            return Command::Send(format!("/{}", escaped));
        }

        let (name, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (trimmed, ""),
        };

        match name {
            "/help" => Command::Help,
            "/quit" => Command::Quit,
            "/clear" => Command::Clear,
            "/status" => Command::Status,
            "/history" => Command::History,
            "/attach" if argument.is_empty() => Command::Attach(None),
            "/attach" => Command::Attach(Some(argument.to_string())),
            "/detach" => Command::Detach,
            "/forget-article" => Command::ForgetArticle,
            _ => Command::Send(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse(" /quit "), Command::Quit);
        assert_eq!(Command::parse("/forget-article"), Command::ForgetArticle);
        assert_eq!(Command::parse("/attach"), Command::Attach(None));
        assert_eq!(
            Command::parse("/attach  ~/papers/a b.pdf "),
            Command::Attach(Some("~/papers/a b.pdf".to_string()))
        );
    }

    #[test]
    fn unknown_slash_lines_are_sent() {
        assert_eq!(
            Command::parse("/usr/bin holds what?"),
            Command::Send("/usr/bin holds what?".to_string())
        );
        assert_eq!(Command::parse("/helpme"), Command::Send("/helpme".to_string()));
    }

    #[test]
    fn double_slash_escapes_commands() {
        assert_eq!(Command::parse("//help"), Command::Send("/help".to_string()));
    }

    #[test]
    fn plain_text_and_urls_are_sent() {
        assert_eq!(Command::parse("hello"), Command::Send("hello".to_string()));
        assert_eq!(
            Command::parse("https://example.com/a"),
            Command::Send("https://example.com/a".to_string())
        );
        assert_eq!(Command::parse(""), Command::Send(String::new()));
    }
}
