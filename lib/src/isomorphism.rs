//! Blank-node substitution search and graph isomorphism.
//!
//! Used by tests and by callers comparing a produced graph against an
//! expected one: two graphs are isomorphic when some injective substitution
//! of the pattern's blank nodes turns it into exactly the actual graph.
//! Nested quads are compared structurally, so blank nodes buried inside
//! RDF-star terms participate like any other.

use crate::dataset::Dataset;
use crate::term::{Quad, Term};
use oxrdf::BlankNode;
use std::collections::{HashMap, HashSet};

const PATTERN_PREFIX: &str = "pat";
const ACTUAL_PREFIX: &str = "act";

/// Searches for an injective substitution of `pattern`'s blank nodes that
/// maps it quad-for-quad onto `actual`.
pub fn find_blank_node_substitution(
    actual: &[Quad],
    pattern: &[Quad],
) -> Option<HashMap<BlankNode, Term>> {
    // Move the two graphs' blank ids into disjoint ranges so a shared id
    // never produces an accidental exact match.
    let actual: Vec<Quad> = actual
        .iter()
        .map(|q| prefix_blanks(q, ACTUAL_PREFIX))
        .collect();
    let pattern: Vec<Quad> = pattern
        .iter()
        .map(|q| prefix_blanks(q, PATTERN_PREFIX))
        .collect();

    let mut substitution = HashMap::new();
    let mut used = HashSet::new();
    if !solve(&actual, &pattern, &mut used, &mut substitution) {
        return None;
    }

    Some(
        substitution
            .into_iter()
            .map(|(blank, term)| (strip_prefix_blank(&blank), strip_prefix_term(&term)))
            .collect(),
    )
}

/// True when the two datasets are equal up to blank-node renaming.
pub fn are_isomorphic(a: &Dataset, b: &Dataset) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut actual: Vec<Quad> = a.iter().cloned().collect();
    let mut pattern: Vec<Quad> = b.iter().cloned().collect();
    actual.sort_by_key(|q| q.to_string());
    pattern.sort_by_key(|q| q.to_string());
    find_blank_node_substitution(&actual, &pattern).is_some()
}

fn solve(
    actual: &[Quad],
    pattern: &[Quad],
    used: &mut HashSet<Term>,
    substitution: &mut HashMap<BlankNode, Term>,
) -> bool {
    // Exactly-equal quads cancel out before any guessing.
    let mut remaining_actual: Vec<Quad> = actual.to_vec();
    let mut remaining_pattern: Vec<Quad> = Vec::new();
    for quad in pattern {
        if let Some(pos) = remaining_actual.iter().position(|a| a == quad) {
            remaining_actual.swap_remove(pos);
        } else {
            remaining_pattern.push(quad.clone());
        }
    }
    if remaining_pattern.is_empty() {
        return remaining_actual.is_empty();
    }

    // Branch on the most constrained blank: the one occurring most often.
    let mut counts: HashMap<BlankNode, usize> = HashMap::new();
    for quad in &remaining_pattern {
        for component in quad.components() {
            count_blanks(component, &mut counts);
        }
    }
    let target = match counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.as_str().cmp(a.0.as_str())))
    {
        Some((blank, _)) => Term::Blank(blank),
        // Ground pattern quads left with no blank to bend: mismatch.
        None => return false,
    };

    let mut candidates: Vec<Term> = Vec::new();
    for pattern_quad in remaining_pattern.iter().filter(|q| q.contains(&target)) {
        for actual_quad in &remaining_actual {
            let mut found = None;
            if compatible_quad(pattern_quad, actual_quad, &target, &mut found) {
                if let Some(term) = found {
                    if !candidates.contains(&term) {
                        candidates.push(term);
                    }
                }
            }
        }
    }

    let target_blank = match &target {
        Term::Blank(b) => b.clone(),
        _ => return false,
    };
    for candidate in candidates {
        if used.contains(&candidate) {
            continue;
        }
        let mapping = [(candidate.clone(), target.clone())];
        let substituted: Vec<Quad> = remaining_pattern.iter().map(|q| q.remapped(&mapping)).collect();

        used.insert(candidate.clone());
        substitution.insert(target_blank.clone(), candidate.clone());
        if solve(&remaining_actual, &substituted, used, substitution) {
            return true;
        }
        substitution.remove(&target_blank);
        used.remove(&candidate);
    }
    false
}

/// Walks a pattern quad against an actual quad. The searched blank collects a
/// single consistent candidate term; other blanks are wildcards; everything
/// else must match structurally.
fn compatible_quad(pattern: &Quad, actual: &Quad, blank: &Term, found: &mut Option<Term>) -> bool {
    pattern
        .components()
        .iter()
        .zip(actual.components().iter())
        .all(|(p, a)| compatible_term(p, a, blank, found))
}

fn compatible_term(pattern: &Term, actual: &Term, blank: &Term, found: &mut Option<Term>) -> bool {
    if pattern == blank {
        return match found {
            Some(term) => term == actual,
            None => {
                *found = Some(actual.clone());
                true
            }
        };
    }
    match (pattern, actual) {
        (Term::Blank(_), _) => true,
        (Term::Quad(p), Term::Quad(a)) => compatible_quad(p, a, blank, found),
        _ => pattern == actual,
    }
}

fn count_blanks(term: &Term, counts: &mut HashMap<BlankNode, usize>) {
    match term {
        Term::Blank(b) => *counts.entry(b.clone()).or_insert(0) += 1,
        Term::Quad(q) => {
            for component in q.components() {
                count_blanks(component, counts);
            }
        }
        _ => {}
    }
}

fn prefix_blanks(quad: &Quad, prefix: &str) -> Quad {
    let rename = |term: &Term| -> Option<Term> {
        match term {
            Term::Blank(b) => Some(Term::Blank(BlankNode::new_unchecked(format!(
                "{}{}",
                prefix,
                b.as_str()
            )))),
            _ => None,
        }
    };
    quad.rebuild(&rename).unwrap_or_else(|| quad.clone())
}

fn strip_prefix_blank(blank: &BlankNode) -> BlankNode {
    let name = blank.as_str();
    BlankNode::new_unchecked(name.strip_prefix(PATTERN_PREFIX).unwrap_or(name))
}

fn strip_prefix_term(term: &Term) -> Term {
    let strip = |t: &Term| -> Option<Term> {
        match t {
            Term::Blank(b) => {
                let name = b.as_str();
                name.strip_prefix(ACTUAL_PREFIX)
                    .map(|stripped| Term::Blank(BlankNode::new_unchecked(stripped)))
            }
            _ => None,
        }
    };
    term.rebuild(&strip).unwrap_or_else(|| term.clone())
}
