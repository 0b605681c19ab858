//! Error types for erb-link-i18n.
//!
//! Nothing in the link engine aborts a document: invocation errors are
//! logged and the offending invocation is skipped. `TemplateError` and
//! `ExtractError` only surface from the template reader and the file-level
//! helpers used by the command line tool.

use thiserror::Error;

/// Failure to split a link helper's argument list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("unclosed '{open}' at byte {offset}")]
    UnclosedBracket { open: char, offset: usize },

    #[error("unexpected '{close}' at byte {offset}")]
    UnexpectedClose { close: char, offset: usize },

    #[error("link helper called without a label argument")]
    MissingLabel,
}

/// Failure to read an ERB template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("ERB tag opened at byte {offset} is never closed")]
    UnterminatedTag { offset: usize },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Config error in '{path}': {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
