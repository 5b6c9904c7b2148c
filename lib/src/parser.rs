//! Turtle-star reading and N-Triples-star writing.
//!
//! Context documents and generic input graphs are both plain Turtle(-star)
//! files; quoted triples become nested quads in the internal model.

use crate::dataset::Dataset;
use crate::term::Quad;
use oxttl::TurtleParser;

/// Parses a Turtle-star document into a dataset. The error string carries the
/// parser's diagnostic; callers wrap it into the appropriate error kind
/// depending on whether they were reading a context or an input graph.
pub fn parse_turtle(input: &str) -> Result<Dataset, String> {
    let mut dataset = Dataset::new();
    for triple in TurtleParser::new()
        .with_quoted_triples()
        .for_reader(input.as_bytes())
    {
        let triple = triple.map_err(|e| e.to_string())?;
        dataset.add(Quad::from(triple));
    }
    Ok(dataset)
}

/// Serializes a dataset as N-Triples-star (nested quads rendered with
/// `<< ... >>`), sorted lexicographically so repeated runs of the converter
/// print identical output.
pub fn write_ntriples(dataset: &Dataset) -> String {
    let mut lines: Vec<String> = dataset.iter().map(|q| q.to_string()).collect();
    lines.sort();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
