//! Error taxonomy for the conversion pipeline.
//!
//! `MalformedContext` means the user should fix their context document,
//! `MalformedGraph` means the input graph does not follow the generic
//! encoding, and `Logic` signals an internal invariant violation (a bug in
//! this crate, not bad input).

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum PrecError {
    /// The context document is invalid (unknown predicate, ambiguous rules,
    /// invalid template, bad priority literal...). Reported at load time.
    MalformedContext(String),
    /// The input graph does not have the expected generic shape (missing
    /// `rdf:value`, broken RDF list...). Reported at apply time.
    MalformedGraph(String),
    /// An internal invariant does not hold.
    Logic(String),
}

impl PrecError {
    pub fn context(message: impl Into<String>) -> PrecError {
        PrecError::MalformedContext(message.into())
    }

    pub fn graph(message: impl Into<String>) -> PrecError {
        PrecError::MalformedGraph(message.into())
    }

    pub fn logic(message: impl Into<String>) -> PrecError {
        PrecError::Logic(message.into())
    }
}

impl fmt::Display for PrecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecError::MalformedContext(m) => write!(f, "malformed context: {}", m),
            PrecError::MalformedGraph(m) => write!(f, "malformed input graph: {}", m),
            PrecError::Logic(m) => write!(f, "internal error: {}", m),
        }
    }
}

impl Error for PrecError {}
