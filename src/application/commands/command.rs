//! Chat command parsing
//!
//! Slash commands map 1:1 onto registry operations; any other text is
//! treated as a URL to register.

/// A parsed chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    Delete { url: String },
    Update { old_url: String, new_url: String },
    Register { url: String },
    /// A known command with the wrong number of arguments
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if !text.starts_with('/') {
            return Self::Register {
                url: text.to_string(),
            };
        }

        let mut parts = text.split_whitespace();
        let head = parts.next().unwrap_or_default();
        // "/list@UptimeBot" in group chats
        let name = head.split('@').next().unwrap_or(head);
        let args: Vec<&str> = parts.collect();

        match (name, args.as_slice()) {
            ("/start", _) => Self::Start,
            ("/help", _) => Self::Help,
            ("/list", _) => Self::List,
            ("/delete", [url]) => Self::Delete {
                url: url.to_string(),
            },
            ("/delete", _) => Self::Usage("/delete <url>"),
            ("/update", [old_url, new_url]) => Self::Update {
                old_url: old_url.to_string(),
                new_url: new_url.to_string(),
            },
            ("/update", _) => Self::Usage("/update <old_url> <new_url>"),
            _ => Self::Unknown(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_registers_trimmed_url() {
        assert_eq!(
            Command::parse("  https://example.com \n"),
            Command::Register {
                url: "https://example.com".into()
            }
        );
        // Validation happens later; parsing accepts anything.
        assert_eq!(
            Command::parse("ftp://x.com"),
            Command::Register {
                url: "ftp://x.com".into()
            }
        );
    }

    #[test]
    fn simple_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/list"), Command::List);
        assert_eq!(Command::parse("/list@UptimeBot"), Command::List);
    }

    #[test]
    fn delete_takes_exactly_one_argument() {
        assert_eq!(
            Command::parse("/delete https://a.com"),
            Command::Delete {
                url: "https://a.com".into()
            }
        );
        assert_eq!(Command::parse("/delete"), Command::Usage("/delete <url>"));
        assert_eq!(
            Command::parse("/delete a b"),
            Command::Usage("/delete <url>")
        );
    }

    #[test]
    fn update_takes_exactly_two_arguments() {
        assert_eq!(
            Command::parse("/update  https://a.com   https://b.com"),
            Command::Update {
                old_url: "https://a.com".into(),
                new_url: "https://b.com".into()
            }
        );
        assert_eq!(
            Command::parse("/update https://a.com"),
            Command::Usage("/update <old_url> <new_url>")
        );
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(Command::parse("/stats"), Command::Unknown("/stats".into()));
    }
}
