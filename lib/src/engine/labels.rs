//! Node-label rule marking and instantiation.
//!
//! A node carries several labels at once, so the mark subject is not the node
//! but the nested quad `<< node rdf:type labelNode >>`: each label occurrence
//! gets its own mark and its own template instantiation.

use super::{bound, mark_entities, refine_marks, template_for};
use crate::context::domain::DomainKind;
use crate::context::Context;
use crate::dataset::Dataset;
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;

fn structural(voc: &Vocab) -> Vec<Quad> {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    vec![
        Quad::new(
            Term::var("node"),
            rdf_type.clone(),
            Term::Iri(voc.pgo.node.clone()),
        ),
        Quad::new(Term::var("node"), rdf_type.clone(), Term::var("labelNode")),
        Quad::new(
            Term::var("labelNode"),
            rdf_type,
            Term::Iri(voc.prec.created_node_label.clone()),
        ),
        Quad::new(
            Term::var("labelNode"),
            Term::Iri(voc.rdf.rdfs_label.clone()),
            Term::var("label"),
        ),
    ]
}

pub fn mark(context: &Context, dataset: &mut Dataset, voc: &Vocab) {
    let structural = structural(voc);
    // The mark subject reuses ?node / ?labelNode from the structural pattern.
    let subject = Term::from(Quad::new(
        Term::var("node"),
        Term::Iri(voc.rdf.type_.clone()),
        Term::var("labelNode"),
    ));
    let sentinel = Quad::new(
        subject.clone(),
        Term::Iri(voc.prec.applied_node_rule.clone()),
        Term::Iri(voc.prec.no_rule_found.clone()),
    );
    mark_entities(dataset, &structural, &sentinel);
    refine_marks(
        dataset,
        context.rules_for(DomainKind::NodeLabel),
        &structural,
        &subject,
        &voc.prec.applied_node_rule,
        voc,
    );
}

pub fn instantiate(context: &Context, dataset: &mut Dataset, voc: &Vocab) -> Result<(), PrecError> {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    let occurrence = Term::from(Quad::new(
        Term::var("node"),
        rdf_type.clone(),
        Term::var("labelNode"),
    ));
    let mark = Quad::new(
        occurrence,
        Term::Iri(voc.prec.applied_node_rule.clone()),
        Term::var("rule"),
    );
    let mut pattern = vec![mark.clone()];
    pattern.extend(structural(voc));

    for binding in dataset.match_and_bind(&pattern) {
        let node = bound(&binding, "node")?;
        let label_node = bound(&binding, "labelNode")?;
        let rule_term = bound(&binding, "rule")?;
        let template = template_for(context, DomainKind::NodeLabel, &rule_term, voc)?;

        // Consume the mark and the label occurrence; the label node's own
        // scaffolding stays for the cleanup pass to judge.
        dataset.delete(&binding.substitute_quad(&mark));
        dataset.delete(&Quad::new(node.clone(), rdf_type.clone(), label_node.clone()));

        let mapping = vec![
            (node, Term::Iri(voc.pvar.self_.clone())),
            (label_node, Term::Iri(voc.pvar.label.clone())),
        ];
        for quad in &template.quads {
            dataset.add(quad.remapped(&mapping));
        }
    }
    Ok(())
}
