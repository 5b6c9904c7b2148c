//! Edge rule marking and instantiation.

use super::{bound, mark_entities, refine_marks, template_for, Identities};
use crate::context::domain::DomainKind;
use crate::context::Context;
use crate::dataset::Dataset;
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;

/// The generic shape of one edge. Variable names are shared with the
/// condition blocks built for edge rules.
fn structural(voc: &Vocab) -> Vec<Quad> {
    let edge = Term::var("edge");
    vec![
        Quad::new(
            edge.clone(),
            Term::Iri(voc.rdf.type_.clone()),
            Term::Iri(voc.pgo.edge.clone()),
        ),
        Quad::new(
            edge.clone(),
            Term::Iri(voc.rdf.subject.clone()),
            Term::var("source"),
        ),
        Quad::new(
            edge.clone(),
            Term::Iri(voc.rdf.predicate.clone()),
            Term::var("labelNode"),
        ),
        Quad::new(edge, Term::Iri(voc.rdf.object.clone()), Term::var("destination")),
    ]
}

pub fn mark(context: &Context, dataset: &mut Dataset, voc: &Vocab) {
    let structural = structural(voc);
    let sentinel = Quad::new(
        Term::var("edge"),
        Term::Iri(voc.prec.applied_edge_rule.clone()),
        Term::Iri(voc.prec.no_rule_found.clone()),
    );
    mark_entities(dataset, &structural, &sentinel);
    refine_marks(
        dataset,
        context.rules_for(DomainKind::Edge),
        &structural,
        &Term::var("edge"),
        &voc.prec.applied_edge_rule,
        voc,
    );
}

/// Instantiates every marked edge and returns each edge's resolved identity
/// terms for the property pass.
pub fn instantiate(
    context: &Context,
    dataset: &mut Dataset,
    voc: &Vocab,
) -> Result<Identities, PrecError> {
    let mut pattern = vec![Quad::new(
        Term::var("edge"),
        Term::Iri(voc.prec.applied_edge_rule.clone()),
        Term::var("rule"),
    )];
    pattern.extend(structural(voc));

    let mut identities = Identities::new();
    for binding in dataset.match_and_bind(&pattern) {
        let edge = bound(&binding, "edge")?;
        let rule_term = bound(&binding, "rule")?;
        let template = template_for(context, DomainKind::Edge, &rule_term, voc)?;

        let mapping = vec![
            (edge.clone(), Term::Iri(voc.pvar.self_.clone())),
            (bound(&binding, "source")?, Term::Iri(voc.pvar.source.clone())),
            (
                bound(&binding, "destination")?,
                Term::Iri(voc.pvar.destination.clone()),
            ),
            (
                bound(&binding, "labelNode")?,
                Term::Iri(voc.pvar.label.clone()),
            ),
        ];

        dataset.remove_quads(&binding.matched);
        for quad in &template.quads {
            dataset.add(quad.remapped(&mapping));
        }

        let resolved: Vec<Term> = template.entity_is.iter().map(|t| t.remap(&mapping)).collect();
        identities.insert(edge, resolved);
    }
    Ok(identities)
}
