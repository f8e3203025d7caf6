use std::{error, fmt, result};

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically `file:line`, and a
/// message, refer to [err_at] macro for composing them.
///
/// [err_at]: crate::err_at
#[derive(Clone, PartialEq)]
pub enum Error {
    /// Fatal case, tree breaks one of the red-black or ordering rules,
    /// or an internal assumption did not hold.
    Fatal(String, String),
    /// Node arena has reached its configured capacity, refer to
    /// [Config::max_nodes][crate::Config::max_nodes].
    ArenaFull(String, String),
    /// Configuration is malformed or out of range.
    InvalidConfig(String, String),
    /// Numeric conversion failed.
    FailConvert(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            ArenaFull(p, msg) => write!(f, "{} ArenaFull: {}", p, msg),
            InvalidConfig(p, msg) => write!(f, "{} InvalidConfig: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}
