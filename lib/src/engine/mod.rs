//! Rule application.
//!
//! Application is a four-phase pipeline over one mutable dataset:
//! 1. every entity of every domain gets a sentinel mark;
//! 2. rules refine sentinel marks into rule marks, in priority order, while
//!    the generic graph is still intact (conditions of one domain may inspect
//!    entities of another);
//! 3. each domain instantiates its templates, consuming marks and the generic
//!    scaffolding they point at; edges go first so properties can attach to
//!    resolved edge identities, then properties, then node labels;
//! 4. cleanup removes leftover scaffolding and applies output flags.

pub mod edges;
pub mod labels;
pub mod properties;

use crate::context::domain::DomainKind;
use crate::context::template::Template;
use crate::context::{Context, Rule};
use crate::dataset::{Binding, Dataset};
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;
use log::{debug, info};
use oxrdf::NamedNode;
use std::collections::HashMap;

/// Applies a context to a generic graph, in place.
pub fn apply(context: &Context, dataset: &mut Dataset, voc: &Vocab) -> Result<(), PrecError> {
    info!("applying context to {} quad(s)", dataset.len());

    edges::mark(context, dataset, voc);
    properties::mark(context, dataset, voc)?;
    labels::mark(context, dataset, voc);

    let identities = edges::instantiate(context, dataset, voc)?;
    properties::instantiate(context, dataset, voc, &identities)?;
    labels::instantiate(context, dataset, voc)?;

    check_marks_consumed(dataset, voc)?;
    cleanup(context, dataset, voc);

    info!("conversion produced {} quad(s)", dataset.len());
    Ok(())
}

/// Adds one sentinel mark per binding of the domain's structural pattern.
pub(crate) fn mark_entities(dataset: &mut Dataset, structural: &[Quad], mark: &Quad) {
    let bindings = dataset.match_and_bind(structural);
    debug!("marking {} entit(ies)", bindings.len());
    for binding in bindings {
        dataset.add(binding.substitute_quad(mark));
    }
}

/// Runs every rule once, most specific first. Only sentinel marks are
/// eligible, so the first rule to claim an entity is final.
pub(crate) fn refine_marks(
    dataset: &mut Dataset,
    rules: &[Rule],
    structural: &[Quad],
    mark_subject: &Term,
    mark_predicate: &NamedNode,
    voc: &Vocab,
) {
    let predicate = Term::Iri(mark_predicate.clone());
    let sentinel = Term::Iri(voc.prec.no_rule_found.clone());
    for rule in rules {
        let mut source = vec![Quad::new(
            mark_subject.clone(),
            predicate.clone(),
            sentinel.clone(),
        )];
        source.extend_from_slice(structural);

        let mut destination = structural.to_vec();
        destination.push(Quad::new(
            mark_subject.clone(),
            predicate.clone(),
            rule.node.clone(),
        ));

        let conditions: Vec<Vec<Quad>> =
            rule.conditions.iter().map(|c| c.pattern.clone()).collect();
        dataset.find_filter_replace(&source, &conditions, &destination);
    }
}

/// Resolves a mark object back to its template: the sentinel selects the
/// domain default, anything else must be a loaded rule.
pub(crate) fn template_for<'a>(
    context: &'a Context,
    kind: DomainKind,
    rule_term: &Term,
    voc: &Vocab,
) -> Result<&'a Template, PrecError> {
    if *rule_term == Term::Iri(voc.prec.no_rule_found.clone()) {
        return Ok(context.default_template(kind));
    }
    context
        .rules_for(kind)
        .iter()
        .find(|r| r.node == *rule_term)
        .map(|r| &r.template)
        .ok_or_else(|| PrecError::logic(format!("mark references unknown rule {}", rule_term)))
}

/// A variable the pattern guarantees to bind; absence is a bug.
pub(crate) fn bound(binding: &Binding, name: &str) -> Result<Term, PrecError> {
    binding
        .get(name)
        .cloned()
        .ok_or_else(|| PrecError::logic(format!("variable ?{} unbound after a match", name)))
}

/// Every mark must have been consumed by instantiation.
fn check_marks_consumed(dataset: &Dataset, voc: &Vocab) -> Result<(), PrecError> {
    for predicate in [
        &voc.prec.applied_edge_rule,
        &voc.prec.applied_property_rule,
        &voc.prec.applied_node_rule,
    ] {
        let leftovers =
            dataset.quads_matching(None, Some(&Term::Iri(predicate.clone())), None, None);
        if let Some(quad) = leftovers.first() {
            return Err(PrecError::logic(format!(
                "unconsumed mark after instantiation: {}",
                quad
            )));
        }
    }
    Ok(())
}

fn cleanup(context: &Context, dataset: &mut Dataset, voc: &Vocab) {
    scrub_label_scaffolding(context, dataset, voc);
    if !context.keep_provenance {
        strip_provenance(dataset, voc);
    }
    if let Some(prefix) = &context.blank_node_prefix {
        map_blank_nodes(dataset, prefix);
    }
}

/// Label and key nodes that nothing in the output references any more lose
/// their `rdfs:label` / marker typing; nodes still in use keep their label
/// (their typing only survives when provenance is kept).
fn scrub_label_scaffolding(context: &Context, dataset: &mut Dataset, voc: &Vocab) {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    let rdfs_label = Term::Iri(voc.rdf.rdfs_label.clone());
    let markers: Vec<Term> = [
        &voc.prec.created_node_label,
        &voc.prec.created_edge_label,
        &voc.prec.created_property_key,
        &voc.prec.property_key,
    ]
    .into_iter()
    .map(|n| Term::Iri(n.clone()))
    .collect();

    let mut nodes: Vec<Term> = Vec::new();
    for marker in &markers {
        for quad in dataset.quads_matching(None, Some(&rdf_type), Some(marker), None) {
            if !nodes.contains(&quad.subject) {
                nodes.push(quad.subject);
            }
        }
    }

    for node in nodes {
        let mut scaffold: Vec<Quad> = Vec::new();
        for quad in dataset.quads_matching(Some(&node), Some(&rdf_type), None, None) {
            if markers.contains(&quad.object) {
                scaffold.push(quad);
            }
        }
        scaffold.extend(dataset.quads_matching(Some(&node), Some(&rdfs_label), None, None));

        let used = dataset
            .iter()
            .any(|q| !scaffold.contains(q) && q.contains(&node));
        if !used {
            dataset.remove_quads(&scaffold);
        } else if !context.keep_provenance {
            let typing: Vec<Quad> = scaffold
                .into_iter()
                .filter(|q| q.predicate == rdf_type)
                .collect();
            dataset.remove_quads(&typing);
        }
    }
}

/// Removes the generic-encoding typing quads once provenance is not wanted.
fn strip_provenance(dataset: &mut Dataset, voc: &Vocab) {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    for class in [
        Term::Iri(voc.pgo.node.clone()),
        Term::Iri(voc.pgo.edge.clone()),
        Term::Iri(voc.prec.property_key_value.clone()),
    ] {
        let typed = dataset.quads_matching(None, Some(&rdf_type), Some(&class), None);
        dataset.remove_quads(&typed);
    }
}

/// Replaces every blank node, at any nesting depth, with an IRI under the
/// configured prefix.
fn map_blank_nodes(dataset: &mut Dataset, prefix: &str) {
    let rename = |term: &Term| -> Option<Term> {
        match term {
            Term::Blank(b) => Some(Term::Iri(NamedNode::new_unchecked(format!(
                "{}{}",
                prefix,
                b.as_str()
            )))),
            _ => None,
        }
    };
    let all: Vec<Quad> = dataset.iter().cloned().collect();
    for quad in all {
        if let Some(renamed) = quad.rebuild(&rename) {
            dataset.delete(&quad);
            dataset.add(renamed);
        }
    }
}

/// An edge's resolved identity terms, recorded during edge instantiation and
/// consulted when a property needs to attach to that edge.
pub(crate) type Identities = HashMap<Term, Vec<Term>>;
