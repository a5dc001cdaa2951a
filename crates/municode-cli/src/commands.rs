//! REPL command parsing

use municode_core::{Error, Model, Result};

/// A line entered at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Empty,
    Exit,
    Help,
    Reset,
    History,
    Model(Model),
    Chunks(usize),
    Question(String),
}

/// A line entered at the search prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand {
    Empty,
    Exit,
    Help,
    Settings,
    Limit(usize),
    Context(usize),
    Filter(String),
    ArrayAttribute(String),
    ClearFilters,
    Full(usize),
    Query(String),
}

/// Split `/name rest` into `("name", "rest")`
fn slash_command(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('/')?;
    let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    Some((name.to_lowercase(), rest.trim()))
}

fn number(name: &str, raw: &str) -> Result<usize> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("/{} expects a number, got '{}'", name, raw)))
}

fn argument<'a>(name: &str, raw: &'a str, what: &str) -> Result<&'a str> {
    if raw.is_empty() {
        Err(Error::InvalidInput(format!("/{} expects {}", name, what)))
    } else {
        Ok(raw)
    }
}

fn word_command(input: &str) -> Option<&'static str> {
    match input.to_lowercase().as_str() {
        "exit" | "quit" => Some("exit"),
        "help" => Some("help"),
        _ => None,
    }
}

impl ChatCommand {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(ChatCommand::Empty);
        }
        match word_command(input) {
            Some("exit") => return Ok(ChatCommand::Exit),
            Some(_) => return Ok(ChatCommand::Help),
            None => {}
        }

        let Some((name, rest)) = slash_command(input) else {
            return Ok(ChatCommand::Question(input.to_string()));
        };

        match name.as_str() {
            "exit" | "quit" => Ok(ChatCommand::Exit),
            "help" => Ok(ChatCommand::Help),
            "reset" | "clear" => Ok(ChatCommand::Reset),
            "history" => Ok(ChatCommand::History),
            "model" => Ok(ChatCommand::Model(argument(&name, rest, "a model name")?.parse()?)),
            "chunks" => Ok(ChatCommand::Chunks(number(&name, rest)?)),
            other => Err(Error::InvalidInput(format!("unknown command '/{}'", other))),
        }
    }
}

impl SearchCommand {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(SearchCommand::Empty);
        }
        match word_command(input) {
            Some("exit") => return Ok(SearchCommand::Exit),
            Some(_) => return Ok(SearchCommand::Help),
            None => {}
        }

        let Some((name, rest)) = slash_command(input) else {
            return Ok(SearchCommand::Query(input.to_string()));
        };

        match name.as_str() {
            "exit" | "quit" => Ok(SearchCommand::Exit),
            "help" => Ok(SearchCommand::Help),
            "settings" => Ok(SearchCommand::Settings),
            "limit" => Ok(SearchCommand::Limit(number(&name, rest)?)),
            "context" => Ok(SearchCommand::Context(number(&name, rest)?)),
            "filter" => Ok(SearchCommand::Filter(
                argument(&name, rest, "COLUMN=VALUE")?.to_string(),
            )),
            "filters" if rest.eq_ignore_ascii_case("clear") => Ok(SearchCommand::ClearFilters),
            "array" => Ok(SearchCommand::ArrayAttribute(
                argument(&name, rest, "a column name")?.to_string(),
            )),
            "full" => Ok(SearchCommand::Full(number(&name, rest)?)),
            other => Err(Error::InvalidInput(format!("unknown command '/{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_text_is_a_question() {
        assert_eq!(
            ChatCommand::parse("  Can I burn leaves?  ").unwrap(),
            ChatCommand::Question("Can I burn leaves?".to_string())
        );
        assert_eq!(ChatCommand::parse("").unwrap(), ChatCommand::Empty);
    }

    #[test]
    fn chat_commands() {
        assert_eq!(ChatCommand::parse("QUIT").unwrap(), ChatCommand::Exit);
        assert_eq!(ChatCommand::parse("/reset").unwrap(), ChatCommand::Reset);
        assert_eq!(ChatCommand::parse("/chunks 7").unwrap(), ChatCommand::Chunks(7));
        assert_eq!(
            ChatCommand::parse("/model llama3.1-8b").unwrap(),
            ChatCommand::Model(Model::Llama31_8b)
        );
    }

    #[test]
    fn chat_command_errors() {
        assert!(ChatCommand::parse("/model").is_err());
        assert!(ChatCommand::parse("/model gpt-4").is_err());
        assert!(ChatCommand::parse("/chunks many").is_err());
        assert!(ChatCommand::parse("/frobnicate").is_err());
    }

    #[test]
    fn search_commands() {
        assert_eq!(
            SearchCommand::parse("animal control").unwrap(),
            SearchCommand::Query("animal control".to_string())
        );
        assert_eq!(SearchCommand::parse("/full 2").unwrap(), SearchCommand::Full(2));
        assert_eq!(SearchCommand::parse("/context 800").unwrap(), SearchCommand::Context(800));
        assert_eq!(
            SearchCommand::parse("/filter CHAPTER=Chapter 4").unwrap(),
            SearchCommand::Filter("CHAPTER=Chapter 4".to_string())
        );
        assert_eq!(SearchCommand::parse("/filters clear").unwrap(), SearchCommand::ClearFilters);
        assert!(SearchCommand::parse("/filters").is_err());
        assert!(SearchCommand::parse("/limit -1").is_err());
    }
}
