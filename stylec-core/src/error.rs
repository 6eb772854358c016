use thiserror::Error;

/// Errors produced while compiling a style program.
///
/// Every variant is fatal: the compiler aborts immediately and never
/// writes partial output. The variants carry structured parameters
/// (positions, names) rather than pre-formatted text so that drivers
/// can decide how to present them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The token stream is malformed (unterminated string or block,
    /// unexpected token). Reports the byte position in the source.
    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// An undeclared, non-built-in name was referenced.
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    /// A function body has a stack shape the translator cannot lower
    /// into structured code, e.g. more than one residual value at the
    /// end of the body or conditional arms with diverging stack effects.
    #[error("function '{name}' is too complex to translate ({residual} residual stack values)")]
    ComplexFunction { name: String, residual: usize },

    /// A top-level command names a target that returns a value.
    #[error("{command} target '{name}' returns a value, which is not allowed here")]
    CommandReturnsValue { command: &'static str, name: String },

    /// A top-level command names a target that takes arguments.
    #[error("{command} target '{name}' takes arguments, which is not allowed here")]
    CommandTakesArguments { command: &'static str, name: String },

    /// A top-level command names a target that needs an entry while no
    /// entry is in scope.
    #[error("{command} target '{name}' requires an entry, but none is in scope")]
    CommandNeedsEntry { command: &'static str, name: String },

    /// `:=` aimed at something that is not an assignable variable.
    /// Fields are read-only and functions are not assignable.
    #[error("'{name}' cannot be used as an assignment target")]
    AssignTarget { name: String },

    /// The style resource could not be located or opened.
    #[error("style resource '{name}' could not be found")]
    Resource { name: String },
}
