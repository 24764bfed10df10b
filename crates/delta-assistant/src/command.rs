/// A line typed at the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// A chat turn.
    Chat(&'a str),
    /// `/generate <request>`
    Generate(&'a str),
    /// `/explain <code>`
    Explain(&'a str),
    /// `/transcript`
    Transcript,
    /// `/quit`
    Quit,
    /// A slash command that is unknown or misses its argument.
    Invalid(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Chat(line);
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg.is_empty()) {
            ("generate", false) => Command::Generate(arg),
            ("explain", false) => Command::Explain(arg),
            ("transcript", true) => Command::Transcript,
            ("quit" | "exit", true) => Command::Quit,
            _ => Command::Invalid(line),
        }
    }
}

pub const HELP: &str = "/generate <request>  write a script\n\
                        /explain <code>      explain a script\n\
                        /transcript          dump the conversation as JSON\n\
                        /quit                leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("  hello \n"), Command::Chat("hello"));
        assert_eq!(Command::parse(""), Command::Chat(""));
        assert_eq!(
            Command::parse("/generate a  kill brick"),
            Command::Generate("a  kill brick")
        );
        assert_eq!(
            Command::parse("/explain print(1)\n"),
            Command::Explain("print(1)")
        );
        assert_eq!(Command::parse("/transcript"), Command::Transcript);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Command::parse("/generate"), Command::Invalid("/generate"));
        assert_eq!(Command::parse("/explain   "), Command::Invalid("/explain"));
        assert_eq!(Command::parse("/quit now"), Command::Invalid("/quit now"));
        assert_eq!(Command::parse("/help"), Command::Invalid("/help"));
    }
}
