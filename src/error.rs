use std::time::Duration;

/// Errors raised while executing a scenario step.
///
/// Application code wraps these in `anyhow::Error`; scenario code matches on
/// them directly when deciding how a step failed.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("command failed with exit code {exit_code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("command succeeded but was expected to fail: {command}")]
    UnexpectedSuccess { command: String },

    #[error("check failed for '{query}' on `{command}`: expected {expected}, got {actual}")]
    CheckFailed {
        command: String,
        query: String,
        expected: String,
        actual: String,
    },

    #[error("keyword '{name}' is not defined (template: {template})")]
    MissingKeyword { name: String, template: String },

    #[error("invalid template at offset {offset}: {message} (template: {template})")]
    InvalidTemplate {
        template: String,
        offset: usize,
        message: String,
    },

    #[error("invalid command line: {message} (command: {command})")]
    InvalidCommandLine { command: String, message: String },

    #[error("invalid query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    #[error("output of `{command}` is not valid JSON: {source}")]
    InvalidJson {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out after {elapsed:?} ({attempts} attempts) waiting for {condition}: {last}")]
    PollTimeout {
        condition: String,
        attempts: u32,
        elapsed: Duration,
        last: String,
    },

    #[error("recording mismatch at interaction {index}: expected `{expected}`, got `{actual}`")]
    CassetteMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("recording has no interaction left for `{command}`")]
    CassetteExhausted { command: String },

    #[error("recording has no generated name left for prefix '{prefix}'")]
    NamesExhausted { prefix: String },

    #[error("cannot generate a name of length {length} from prefix '{prefix}'")]
    InvalidName { prefix: String, length: usize },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Assertion(String),
}

pub type ScenarioResult<T> = std::result::Result<T, ScenarioError>;
