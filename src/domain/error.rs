use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Please enter some text")]
    EmptyText,

    #[error("Invalid time '{0}', expected YYYY-MM-DD HH:MM")]
    InvalidTime(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid theme '{0}', expected light or dark")]
    InvalidTheme(String),

    #[error("Invalid color index {0}, expected 0-{max}", max = super::PALETTE.len() - 1)]
    InvalidColor(usize),
}

pub type DomainResult<T> = Result<T, DomainError>;
