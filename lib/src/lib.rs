//! A property-graph to RDF converter driven by context rules.
#![deny(clippy::all)]

// Publicly visible items
pub mod context;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod isomorphism;
pub mod parser;
pub mod term;
pub mod vocab;

pub use context::Context;
pub use dataset::Dataset;
pub use error::PrecError;
pub use term::{Quad, Term};
pub use vocab::Vocab;

use log::info;
use std::error::Error;
use std::fs;

/// A simple facade over the conversion pipeline.
///
/// It loads a context document and a generic property-graph dump (both
/// Turtle-star), and applies the context's rules to produce the output RDF
/// dataset. For finer control, such as inspecting parsed rules or applying a
/// context to several graphs, use [`Context`] and [`engine::apply`] directly.
pub struct Converter {
    voc: Vocab,
    context: Context,
    graph: Dataset,
}

impl Converter {
    /// Creates a converter from local file paths.
    pub fn from_files(context_path: &str, graph_path: &str) -> Result<Self, Box<dyn Error>> {
        let context = fs::read_to_string(context_path)?;
        let graph = fs::read_to_string(graph_path)?;
        Ok(Self::from_strings(&context, &graph)?)
    }

    /// Creates a converter from in-memory Turtle-star sources.
    pub fn from_strings(context_ttl: &str, graph_ttl: &str) -> Result<Self, PrecError> {
        let voc = Vocab::new();
        let context = Context::parse(context_ttl, &voc)?;
        let graph = parser::parse_turtle(graph_ttl).map_err(PrecError::MalformedGraph)?;
        info!("loaded generic graph with {} quad(s)", graph.len());
        Ok(Converter {
            voc,
            context,
            graph,
        })
    }

    /// The loaded context, for rule inspection.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Applies the context to the graph and returns the converted dataset.
    /// The converter itself is unchanged; `convert` may be called repeatedly.
    pub fn convert(&self) -> Result<Dataset, PrecError> {
        let mut output = self.graph.clone();
        engine::apply(&self.context, &mut output, &self.voc)?;
        Ok(output)
    }
}
