//! Command lines built from rendered templates

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ScenarioError, ScenarioResult};

/// A program and its arguments, split the way a POSIX shell would split them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandLine {
    argv: Vec<String>,
}

impl CommandLine {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Tokenize a rendered command string
    pub fn parse(command: &str) -> ScenarioResult<Self> {
        let argv = split(command).map_err(|message| ScenarioError::InvalidCommandLine {
            command: command.to_string(),
            message,
        })?;

        if argv.is_empty() {
            return Err(ScenarioError::InvalidCommandLine {
                command: command.to_string(),
                message: "empty command".to_string(),
            });
        }

        Ok(Self { argv })
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Whether any of `flags` appears as an argument
    pub fn has_flag(&self, flags: &[&str]) -> bool {
        self.args().iter().any(|arg| {
            flags
                .iter()
                .any(|flag| arg == flag || arg.starts_with(&format!("{flag}=")))
        })
    }

    /// Replace occurrences of `from` inside every argument
    pub fn replace(&self, from: &str, to: &str) -> Self {
        if from.is_empty() {
            return self.clone();
        }
        Self {
            argv: self.argv.iter().map(|arg| arg.replace(from, to)).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.argv.iter().map(|arg| quote(arg)).collect();
        write!(f, "{}", rendered.join(" "))
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn split(input: &str) -> Result<Vec<String>, String> {
    #[derive(PartialEq)]
    enum State {
        Between,
        Word,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match state {
            State::Between | State::Word => match ch {
                c if c.is_whitespace() => {
                    if state == State::Word {
                        tokens.push(std::mem::take(&mut current));
                        state = State::Between;
                    }
                }
                '\'' => state = State::Single,
                '"' => state = State::Double,
                '\\' => match chars.next() {
                    // line continuation
                    Some('\n') => {}
                    Some(next) => {
                        current.push(next);
                        state = State::Word;
                    }
                    None => return Err("trailing backslash".to_string()),
                },
                c => {
                    current.push(c);
                    state = State::Word;
                }
            },
            State::Single => match ch {
                '\'' => state = State::Word,
                c => current.push(c),
            },
            State::Double => match ch {
                '"' => state = State::Word,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                    Some('\n') => {}
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => return Err("unterminated double quote".to_string()),
                },
                c => current.push(c),
            },
        }
    }

    match state {
        State::Single => Err("unterminated single quote".to_string()),
        State::Double => Err("unterminated double quote".to_string()),
        State::Word => {
            tokens.push(current);
            Ok(tokens)
        }
        State::Between => Ok(tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(command: &str) -> Vec<String> {
        CommandLine::parse(command).unwrap().argv().to_vec()
    }

    #[test]
    fn test_parse_splits_on_whitespace() {
        assert_eq!(
            argv("az synapse  workspace\tshow --name ws"),
            vec!["az", "synapse", "workspace", "show", "--name", "ws"]
        );
    }

    #[test]
    fn test_parse_handles_quotes() {
        assert_eq!(
            argv(r#"az synapse role definition show --role "Synapse Contributor""#),
            vec!["az", "synapse", "role", "definition", "show", "--role", "Synapse Contributor"]
        );
        assert_eq!(argv(r#"--allowed-tenant-ids '""'"#), vec!["--allowed-tenant-ids", r#""""#]);
    }

    #[test]
    fn test_parse_joins_adjacent_fragments() {
        assert_eq!(
            argv(r#"--file @"/tmp/assets/pipeline.json""#),
            vec!["--file", "@/tmp/assets/pipeline.json"]
        );
    }

    #[test]
    fn test_parse_backslash_escapes() {
        assert_eq!(
            argv(r#"--configuration {\"maxExecutors\":\"18\"}"#),
            vec!["--configuration", r#"{"maxExecutors":"18"}"#]
        );
        assert_eq!(argv(r#""a \"quoted\" \x""#), vec![r#"a "quoted" \x"#]);
    }

    #[test]
    fn test_parse_line_continuation() {
        assert_eq!(argv("az synapse \\\n show"), vec!["az", "synapse", "show"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CommandLine::parse("az 'open").is_err());
        assert!(CommandLine::parse("az \"open").is_err());
        assert!(CommandLine::parse("az \\").is_err());
        assert!(CommandLine::parse("   ").is_err());
    }

    #[test]
    fn test_has_flag() {
        let cmd = CommandLine::parse("az storage account show --query primaryEndpoints.blob -o=tsv").unwrap();
        assert!(cmd.has_flag(&["--query"]));
        assert!(cmd.has_flag(&["--output", "-o"]));
        assert!(!cmd.has_flag(&["--yes"]));
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let cmd = CommandLine::new(vec!["az".into(), "--role".into(), "Synapse Contributor".into()]);
        assert_eq!(cmd.to_string(), "az --role 'Synapse Contributor'");
    }

    #[test]
    fn test_replace_rewrites_arguments() {
        let cmd = CommandLine::parse("az synapse pipeline create --file @/home/me/assets/p.json").unwrap();
        let scrubbed = cmd.replace("/home/me/assets", "$ASSETS");
        assert_eq!(scrubbed.args().last().unwrap(), "@$ASSETS/p.json");
    }
}
