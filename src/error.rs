//! # Errors

/// tte error type.
#[derive(Debug)]
pub enum Error {
    /// Wrapper around `std::io::Error`.
    Io(std::io::Error),
    /// The window size obtained through a system call is invalid.
    InvalidWindowSize,
    /// Error retrieving the cursor position.
    CursorPosition,
    /// Unrecognized command line option.
    UnrecognizedOption(String),
    /// Too many command line arguments. The attribute holds the full argument
    /// list.
    TooManyArguments(Vec<String>),
}

impl From<std::io::Error> for Error {
    /// Convert an IO Error into a tte Error.
    fn from(err: std::io::Error) -> Self { Self::Io(err) }
}
