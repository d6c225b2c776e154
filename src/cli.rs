use std::fmt;
use thiserror::Error;

pub const USAGE: &str = "Usage: iterdns <iterative|recursive> <domain>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Iterative,
    Recursive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Iterative => f.write_str("iterative"),
            Mode::Recursive => f.write_str("recursive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
    pub domain: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("expected 2 arguments, got {0}")]
    ArgumentCount(usize),

    #[error("unknown mode '{0}'")]
    UnknownMode(String),
}

/// Parse the positional arguments (program name already stripped).
/// Exactly `<mode> <domain>`; nothing else is accepted.
pub fn parse_args<I>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    let [mode, domain] = <[String; 2]>::try_from(args).map_err(|args| UsageError::ArgumentCount(args.len()))?;

    let mode = match mode.as_str() {
        "iterative" => Mode::Iterative,
        "recursive" => Mode::Recursive,
        _ => return Err(UsageError::UnknownMode(mode)),
    };

    Ok(Invocation { mode, domain })
}
