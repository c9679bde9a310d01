use querymaker::recipe::{self, Step};
use serde_json::Value;

#[derive(Debug)]
pub enum Command {
    Step(Step),
    Show,
    Check,
    Reset,
    Help,
    Exit,
}

/// Parse one shell line.
///
/// Supported forms:
///   {"op": "...", ...}     one recipe step as JSON
///   show                   print the pipeline built so far
///   check                  run the shape check on it
///   reset                  start over with an empty pipeline
///   help
///   exit
pub fn parse(input: &str) -> Result<Command, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty input".into());
    }

    match input {
        "show" | "get" => return Ok(Command::Show),
        "check" => return Ok(Command::Check),
        "reset" => return Ok(Command::Reset),
        "help" => return Ok(Command::Help),
        "exit" | "quit" => return Ok(Command::Exit),
        _ => {}
    }

    if !input.starts_with('{') {
        return Err(format!("unknown command: {input}"));
    }

    let value: Value =
        serde_json::from_str(input).map_err(|e| format!("invalid JSON: {e}"))?;
    recipe::parse_step(&value)
        .map(Command::Step)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins() {
        assert!(matches!(parse("show").unwrap(), Command::Show));
        assert!(matches!(parse(" get ").unwrap(), Command::Show));
        assert!(matches!(parse("check").unwrap(), Command::Check));
        assert!(matches!(parse("reset").unwrap(), Command::Reset));
        assert!(matches!(parse("quit").unwrap(), Command::Exit));
    }

    #[test]
    fn step_line() {
        match parse(r#"{"op": "limit", "n": 5}"#).unwrap() {
            Command::Step(Step::Limit { n }) => assert_eq!(n, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn errors() {
        assert!(parse("").is_err());
        assert!(parse("db.users.find()").is_err());
        assert!(parse("{not json").is_err());
        assert!(parse(r#"{"op": "group"}"#).is_err());
    }
}
