//! Error types for the language pipeline.
//!
//! One type per phase; each Display string is the diagnostic the phase
//! prints, so hosts can forward errors to stderr verbatim.

/// A parse error. The lexeme is the token the parser was looking at, which
/// for scanner error tokens is the scanner's message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error: {message} (token: {lexeme})")]
pub struct ParseError {
    pub message: String,
    pub lexeme: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Bare string literal in expression")]
    BareString,
}

fn arg_word(count: &u8) -> &'static str {
    if *count == 1 {
        "arg"
    } else {
        "args"
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("{func} expects {expected} {}", arg_word(.expected))]
    Arity { func: &'static str, expected: u8 },

    #[error("Unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Truncated chunk")]
    TruncatedChunk,
}

/// Top-level error type for tradelang.
#[derive(Debug, thiserror::Error)]
pub enum TradeLangError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradeLangError> for std::process::ExitCode {
    fn from(err: &TradeLangError) -> Self {
        let code: u8 = match err {
            TradeLangError::Io(_) => 1,
            TradeLangError::ConfigParse { .. }
            | TradeLangError::ConfigMissing { .. }
            | TradeLangError::ConfigInvalid { .. } => 2,
            TradeLangError::Parse(_) => 3,
            TradeLangError::Compile(_) => 4,
            TradeLangError::Runtime(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError {
            message: "Expected 'then'".into(),
            lexeme: "<".into(),
        };
        assert_eq!(err.to_string(), "Parse error: Expected 'then' (token: <)");
    }

    #[test]
    fn compile_error_display() {
        assert_eq!(
            CompileError::UnknownIdentifier("closing".into()).to_string(),
            "Unknown identifier: closing"
        );
        assert_eq!(
            CompileError::UnknownFunction("vwap".into()).to_string(),
            "Unknown function: vwap"
        );
    }

    #[test]
    fn arity_error_pluralizes() {
        let two = RuntimeError::Arity {
            func: "sma",
            expected: 2,
        };
        assert_eq!(two.to_string(), "sma expects 2 args");

        let one = RuntimeError::Arity {
            func: "rsi",
            expected: 1,
        };
        assert_eq!(one.to_string(), "rsi expects 1 arg");
    }

    #[test]
    fn unknown_opcode_display() {
        assert_eq!(
            RuntimeError::UnknownOpcode(99).to_string(),
            "Unknown opcode 99"
        );
    }
}
