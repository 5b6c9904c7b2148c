//! Property rule marking and instantiation.
//!
//! A property occurrence is a property node: `?entity ?key ?property` with
//! `?property rdf:value ?value`. Values may be single terms or RDF lists of
//! individual values. Template quads fall into four buckets depending on
//! whether they mention `pvar:individualValue` (instantiated once per list
//! element) and whether they carry the meta-property placeholder pair
//! (instantiated once per meta-property of the occurrence). Meta-properties
//! are themselves marked property occurrences; they are instantiated inline
//! from their owner, yielding the (predicate, object) pairs the owner's
//! meta bucket expands over.

use super::{bound, mark_entities, refine_marks, template_for, Identities};
use crate::context::domain::DomainKind;
use crate::context::Context;
use crate::dataset::{Binding, Dataset};
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;
use log::{debug, warn};
use std::collections::HashSet;

fn structural(voc: &Vocab) -> Vec<Quad> {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    vec![
        Quad::new(
            Term::var("property"),
            rdf_type.clone(),
            Term::Iri(voc.prec.property_key_value.clone()),
        ),
        Quad::new(
            Term::var("property"),
            Term::Iri(voc.rdf.value.clone()),
            Term::var("value"),
        ),
        Quad::new(Term::var("entity"), Term::var("key"), Term::var("property")),
        Quad::new(
            Term::var("key"),
            rdf_type,
            Term::Iri(voc.prec.property_key.clone()),
        ),
    ]
}

fn full_pattern(voc: &Vocab) -> Vec<Quad> {
    let mut pattern = vec![Quad::new(
        Term::var("property"),
        Term::Iri(voc.prec.applied_property_rule.clone()),
        Term::var("rule"),
    )];
    pattern.extend(structural(voc));
    pattern
}

pub fn mark(context: &Context, dataset: &mut Dataset, voc: &Vocab) -> Result<(), PrecError> {
    check_value_links(dataset, voc)?;
    let structural = structural(voc);
    let sentinel = Quad::new(
        Term::var("property"),
        Term::Iri(voc.prec.applied_property_rule.clone()),
        Term::Iri(voc.prec.no_rule_found.clone()),
    );
    mark_entities(dataset, &structural, &sentinel);
    refine_marks(
        dataset,
        context.rules_for(DomainKind::Property),
        &structural,
        &Term::var("property"),
        &voc.prec.applied_property_rule,
        voc,
    );
    Ok(())
}

/// Every property node must carry exactly one `rdf:value`. A node with none
/// would silently fall out of the structural pattern; a node with several
/// would leave dangling values behind. Both are graph defects.
fn check_value_links(dataset: &Dataset, voc: &Vocab) -> Result<(), PrecError> {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    let rdf_value = Term::Iri(voc.rdf.value.clone());
    let class = Term::Iri(voc.prec.property_key_value.clone());
    for quad in dataset.quads_matching(None, Some(&rdf_type), Some(&class), None) {
        let values = dataset.quads_matching(Some(&quad.subject), Some(&rdf_value), None, None);
        if values.len() != 1 {
            return Err(PrecError::graph(format!(
                "property node {} carries {} rdf:value triple(s), expected exactly one",
                quad.subject,
                values.len()
            )));
        }
    }
    Ok(())
}

/// Where the instantiated property attaches.
enum Attachment<'a> {
    /// A plain property: attach to every resolved identity of its owner.
    Owners(&'a [Term]),
    /// A meta-property: do not attach, return the (predicate, object) pairs
    /// the owner's meta bucket will expand over.
    Inline,
}

pub fn instantiate(
    context: &Context,
    dataset: &mut Dataset,
    voc: &Vocab,
    identities: &Identities,
) -> Result<(), PrecError> {
    let has_meta = Term::Iri(voc.prec.has_meta_properties.clone());
    // Meta containers are instantiated from their owner, not from this loop.
    let containers: HashSet<Term> = dataset
        .quads_matching(None, Some(&has_meta), None, None)
        .into_iter()
        .map(|q| q.object)
        .collect();

    for binding in dataset.match_and_bind(&full_pattern(voc)) {
        let entity = bound(&binding, "entity")?;
        if containers.contains(&entity) {
            continue;
        }
        let owners = match identities.get(&entity) {
            Some(resolved) => resolved.clone(),
            None => vec![entity.clone()],
        };
        if owners.is_empty() {
            warn!(
                "property on {} dropped: its edge template declares no identity",
                entity
            );
        }
        instantiate_one(context, dataset, voc, &binding, Attachment::Owners(&owners))?;
    }
    Ok(())
}

/// Instantiates the marked properties of one meta-property container and
/// returns their attachment pairs.
fn instantiate_container(
    context: &Context,
    dataset: &mut Dataset,
    voc: &Vocab,
    container: &Term,
) -> Result<Vec<(Term, Term)>, PrecError> {
    let mut seed = Binding::new();
    seed.bind("entity", container.clone());
    let bindings = dataset.match_and_bind_seeded(&full_pattern(voc), &seed);

    let mut pairs = Vec::new();
    for binding in bindings {
        pairs.extend(instantiate_one(
            context,
            dataset,
            voc,
            &binding,
            Attachment::Inline,
        )?);
    }
    Ok(pairs)
}

fn instantiate_one(
    context: &Context,
    dataset: &mut Dataset,
    voc: &Vocab,
    binding: &Binding,
    attachment: Attachment<'_>,
) -> Result<Vec<(Term, Term)>, PrecError> {
    let entity = bound(binding, "entity")?;
    let key = bound(binding, "key")?;
    let property = bound(binding, "property")?;
    let value = bound(binding, "value")?;
    let rule_term = bound(binding, "rule")?;
    let template = template_for(context, DomainKind::Property, &rule_term, voc)?;

    // Snapshot bindings may outlive their occurrence; a consumed mark means
    // this one was already handled.
    let mark_quad = Quad::new(
        property.clone(),
        Term::Iri(voc.prec.applied_property_rule.clone()),
        rule_term.clone(),
    );
    if !dataset.contains(&mark_quad) {
        return Ok(Vec::new());
    }

    let pvar_entity = Term::Iri(voc.pvar.entity.clone());
    let pvar_value = Term::Iri(voc.pvar.property_value.clone());
    let pvar_individual = Term::Iri(voc.pvar.individual_value.clone());
    let pvar_mpp = Term::Iri(voc.pvar.meta_property_predicate.clone());
    let pvar_mpo = Term::Iri(voc.pvar.meta_property_object.clone());

    let mapping = vec![
        (property.clone(), Term::Iri(voc.pvar.self_.clone())),
        (key.clone(), Term::Iri(voc.pvar.property_key.clone())),
        (value.clone(), pvar_value.clone()),
    ];

    let (individual_values, list_cells) = read_values(dataset, &value, voc)?;

    // Meta-properties first: their instantiation consumes their own marks and
    // hands back the pairs this occurrence's meta bucket expands over.
    let has_meta = Term::Iri(voc.prec.has_meta_properties.clone());
    let links = dataset.quads_matching(Some(&property), Some(&has_meta), None, None);
    let mut meta_pairs: Vec<(Term, Term)> = Vec::new();
    for link in &links {
        meta_pairs.extend(instantiate_container(context, dataset, voc, &link.object)?);
    }

    let uses_whole_value = template.quads.iter().any(|q| q.contains(&pvar_value));

    let mut produced: Vec<Quad> = Vec::new();
    let mut attach_pairs: Vec<(Term, Term)> = Vec::new();
    for template_quad in &template.quads {
        let per_individual = template_quad.contains(&pvar_individual);
        let per_meta =
            template_quad.contains(&pvar_mpp) || template_quad.contains(&pvar_mpo);
        let uses_entity = template_quad.contains(&pvar_entity);
        let base = template_quad.remapped(&mapping);

        let individuals: Vec<Option<&Term>> = if per_individual {
            individual_values.iter().map(Some).collect()
        } else {
            vec![None]
        };
        let metas: Vec<Option<&(Term, Term)>> = if per_meta {
            meta_pairs.iter().map(Some).collect()
        } else {
            vec![None]
        };

        for individual in &individuals {
            for meta in &metas {
                let mut extra: Vec<(Term, Term)> = Vec::new();
                if let Some(iv) = individual {
                    extra.push(((*iv).clone(), pvar_individual.clone()));
                }
                if let Some((p, o)) = meta {
                    extra.push((p.clone(), pvar_mpp.clone()));
                    extra.push((o.clone(), pvar_mpo.clone()));
                }
                let quad = base.remapped(&extra);

                match &attachment {
                    Attachment::Owners(owners) if uses_entity => {
                        for owner in owners.iter() {
                            produced
                                .push(quad.remapped(&[(owner.clone(), pvar_entity.clone())]));
                        }
                    }
                    Attachment::Owners(_) => produced.push(quad),
                    Attachment::Inline => {
                        if quad.subject == pvar_entity {
                            attach_pairs.push((quad.predicate.clone(), quad.object.clone()));
                        } else if uses_entity {
                            debug!("inlined meta-property skips quad {}", quad);
                        } else {
                            produced.push(quad);
                        }
                    }
                }
            }
        }
    }

    // Consume the occurrence: mark, attachment triple, typing, value link,
    // meta links, and the list chain unless the template keeps the whole
    // value (and with it the chain) in the output.
    dataset.delete(&mark_quad);
    dataset.delete(&Quad::new(entity, key, property.clone()));
    dataset.delete(&Quad::new(
        property.clone(),
        Term::Iri(voc.rdf.type_.clone()),
        Term::Iri(voc.prec.property_key_value.clone()),
    ));
    dataset.delete(&Quad::new(
        property,
        Term::Iri(voc.rdf.value.clone()),
        value,
    ));
    dataset.remove_quads(&links);
    if !uses_whole_value {
        dataset.remove_quads(&list_cells);
    }

    for quad in produced {
        dataset.add(quad);
    }
    Ok(attach_pairs)
}

/// Splits a property value into its individual values. A non-list value is
/// its own single individual; a list head is traversed, each cell requiring
/// exactly one `rdf:first` and one `rdf:rest`.
fn read_values(
    dataset: &Dataset,
    value: &Term,
    voc: &Vocab,
) -> Result<(Vec<Term>, Vec<Quad>), PrecError> {
    let first = Term::Iri(voc.rdf.first.clone());
    let rest = Term::Iri(voc.rdf.rest.clone());
    let nil = Term::Iri(voc.rdf.nil.clone());

    if *value == nil {
        return Ok((Vec::new(), Vec::new()));
    }
    if dataset
        .quads_matching(Some(value), Some(&first), None, None)
        .is_empty()
    {
        return Ok((vec![value.clone()], Vec::new()));
    }

    let mut values = Vec::new();
    let mut cells = Vec::new();
    let mut seen: HashSet<Term> = HashSet::new();
    let mut cursor = value.clone();
    while cursor != nil {
        if !seen.insert(cursor.clone()) {
            return Err(PrecError::graph(format!("cyclic RDF list at {}", cursor)));
        }
        let firsts = dataset.quads_matching(Some(&cursor), Some(&first), None, None);
        let rests = dataset.quads_matching(Some(&cursor), Some(&rest), None, None);
        if firsts.len() != 1 || rests.len() != 1 {
            return Err(PrecError::graph(format!(
                "list cell {} must carry exactly one rdf:first and one rdf:rest",
                cursor
            )));
        }
        values.push(firsts[0].object.clone());
        cursor = rests[0].object.clone();
        cells.push(firsts[0].clone());
        cells.push(rests[0].clone());
    }
    Ok((values, cells))
}
