//! Template storage, composition and validation.
//!
//! A template is a list of quads over placeholder terms. Rules pick a
//! template through `prec:templatedBy` (their own declaration first, then the
//! domain's template bases), and placeholder substitutions accumulate from
//! every visited declaration, first one winning per placeholder.

use crate::context::domain::{RuleDomain, RuleParts};
use crate::dataset::Dataset;
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;
use oxrdf::NamedNode;
use std::collections::HashMap;

/// A template as declared: its quads and, optionally, which terms denote the
/// entity itself.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    pub composed_of: Vec<Quad>,
    pub entity_is: Option<Vec<Term>>,
}

/// A fully composed template ready for instantiation.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: NamedNode,
    pub quads: Vec<Quad>,
    /// Terms denoting "the entity itself", used for identity resolution when
    /// another rule's output needs to attach to this entity.
    pub entity_is: Vec<Term>,
}

impl Template {
    /// True when any template quad uses the given placeholder.
    pub fn uses(&self, placeholder: &Term) -> bool {
        self.quads.iter().any(|q| q.contains(placeholder))
    }
}

/// All known templates: the built-in base ruleset plus user declarations.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: HashMap<NamedNode, TemplateDefinition>,
}

impl TemplateLibrary {
    /// The bundled base ruleset, always present before user rules are read.
    pub fn builtin(voc: &Vocab) -> TemplateLibrary {
        let self_ = Term::Iri(voc.pvar.self_.clone());
        let entity = Term::Iri(voc.pvar.entity.clone());
        let source = Term::Iri(voc.pvar.source.clone());
        let destination = Term::Iri(voc.pvar.destination.clone());
        let label = Term::Iri(voc.pvar.label.clone());
        let property_key = Term::Iri(voc.pvar.property_key.clone());
        let property_value = Term::Iri(voc.pvar.property_value.clone());
        let individual_value = Term::Iri(voc.pvar.individual_value.clone());
        let mpp = Term::Iri(voc.pvar.meta_property_predicate.clone());
        let mpo = Term::Iri(voc.pvar.meta_property_object.clone());
        let rdf_type = Term::Iri(voc.rdf.type_.clone());

        let mut templates = HashMap::new();

        templates.insert(
            voc.prec.rdf_reification.clone(),
            TemplateDefinition {
                composed_of: vec![
                    Quad::new(self_.clone(), rdf_type.clone(), Term::Iri(voc.pgo.edge.clone())),
                    Quad::new(
                        self_.clone(),
                        Term::Iri(voc.rdf.subject.clone()),
                        source.clone(),
                    ),
                    Quad::new(
                        self_.clone(),
                        Term::Iri(voc.rdf.predicate.clone()),
                        label.clone(),
                    ),
                    Quad::new(
                        self_.clone(),
                        Term::Iri(voc.rdf.object.clone()),
                        destination.clone(),
                    ),
                ],
                entity_is: None,
            },
        );

        let unique = TemplateDefinition {
            composed_of: vec![Quad::new(source.clone(), label.clone(), destination.clone())],
            entity_is: None,
        };
        templates.insert(voc.prec.rdf_star_unique.clone(), unique.clone());
        templates.insert(voc.prec.direct_triples.clone(), unique);

        templates.insert(
            voc.prec.prec_property_node.clone(),
            TemplateDefinition {
                composed_of: vec![
                    Quad::new(entity.clone(), property_key.clone(), self_.clone()),
                    Quad::new(
                        self_.clone(),
                        Term::Iri(voc.rdf.value.clone()),
                        property_value.clone(),
                    ),
                    Quad::new(
                        self_.clone(),
                        rdf_type.clone(),
                        Term::Iri(voc.prec.property_key_value.clone()),
                    ),
                    Quad::new(self_.clone(), mpp.clone(), mpo.clone()),
                ],
                entity_is: None,
            },
        );

        templates.insert(
            voc.prec.direct_value.clone(),
            TemplateDefinition {
                composed_of: vec![Quad::new(
                    entity.clone(),
                    property_key.clone(),
                    individual_value.clone(),
                )],
                entity_is: None,
            },
        );

        templates.insert(
            voc.prec.node_labels_typing.clone(),
            TemplateDefinition {
                composed_of: vec![Quad::new(self_.clone(), rdf_type.clone(), label.clone())],
                entity_is: None,
            },
        );

        TemplateLibrary { templates }
    }

    /// Registers every template declared in the context (any subject with a
    /// `prec:composedOf` quad). User templates may shadow built-in names.
    pub fn load_user_templates(&mut self, dataset: &Dataset, voc: &Vocab) -> Result<(), PrecError> {
        let composed_of = Term::Iri(voc.prec.composed_of.clone());
        let entity_is = Term::Iri(voc.prec.entity_is.clone());

        let mut subjects: Vec<Term> = dataset
            .quads_matching(None, Some(&composed_of), None, None)
            .into_iter()
            .map(|q| q.subject)
            .collect();
        subjects.sort_by_key(|t| t.to_string());
        subjects.dedup();

        for subject in subjects {
            let name = subject
                .as_iri()
                .ok_or_else(|| {
                    PrecError::context(format!("template {} must be named by an IRI", subject))
                })?
                .clone();

            let mut quads = Vec::new();
            for quad in dataset.quads_matching(Some(&subject), Some(&composed_of), None, None) {
                match quad.object {
                    Term::Quad(inner) => quads.push(*inner),
                    other => {
                        return Err(PrecError::context(format!(
                            "template {}: prec:composedOf expects an embedded triple, found {}",
                            name, other
                        )))
                    }
                }
            }
            quads.sort_by_key(|q| q.to_string());

            let declared: Vec<Term> = dataset
                .quads_matching(Some(&subject), Some(&entity_is), None, None)
                .into_iter()
                .map(|q| q.object)
                .collect();

            self.templates.insert(
                name,
                TemplateDefinition {
                    composed_of: quads,
                    entity_is: if declared.is_empty() {
                        None
                    } else {
                        Some(declared)
                    },
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, name: &NamedNode) -> Option<&TemplateDefinition> {
        self.templates.get(name)
    }
}

/// Composes the template of one rule (or of a domain default when `parts` is
/// a sentinel): picks the template name, accumulates substitutions, applies
/// them, resolves `entityIs` and validates the result.
pub fn compose_template(
    context_dataset: &Dataset,
    parts: &RuleParts,
    domain: &RuleDomain,
    library: &TemplateLibrary,
    voc: &Vocab,
) -> Result<Template, PrecError> {
    let mut substitutions: Vec<(Term, Term)> = Vec::new();

    // The rule's own subject IRI replaces the domain's main placeholder.
    if let Some(iri) = parts.node.as_iri() {
        substitutions.push((
            Term::Iri(iri.clone()),
            Term::Iri(domain.substitution_placeholder.clone()),
        ));
    }
    substitutions.extend(parts.substitutions.iter().cloned());

    let mut chosen = parts.templated_by.clone();

    let templated_by = Term::Iri(voc.prec.templated_by.clone());
    let substitution = Term::Iri(voc.prec.substitution.clone());
    for base in &domain.template_bases {
        if base
            .forbidden_conditions
            .iter()
            .any(|p| parts.declares(p))
        {
            continue;
        }
        let base_term = Term::Iri(base.base.clone());
        if chosen.is_none() {
            // First templatedBy found wins.
            let mut declared: Vec<Quad> =
                context_dataset.quads_matching(Some(&base_term), Some(&templated_by), None, None);
            declared.sort_by_key(|q| q.object.to_string());
            if let Some(quad) = declared.first() {
                let name = quad.object.as_iri().ok_or_else(|| {
                    PrecError::context(format!(
                        "{}: prec:templatedBy requires an IRI, found {}",
                        base.base, quad.object
                    ))
                })?;
                chosen = Some(name.clone());
            }
        }
        // Substitutions accumulate from every visited base.
        for quad in context_dataset.quads_matching(Some(&base_term), Some(&substitution), None, None)
        {
            let entry =
                crate::context::domain::read_substitution(context_dataset, &quad.object, voc)?;
            substitutions.push(entry);
        }
    }

    let name = chosen.unwrap_or_else(|| domain.default_template.clone());
    let definition = library.get(&name).ok_or_else(|| {
        PrecError::context(format!("rule {} references unknown template {}", parts.node, name))
    })?;

    // First substitution for a placeholder wins.
    let mut mapping: Vec<(Term, Term)> = Vec::new();
    for (to, from) in substitutions {
        if !mapping.iter().any(|(_, f)| *f == from) {
            mapping.push((to, from));
        }
    }

    let entity_is_raw = match &definition.entity_is {
        Some(declared) => declared.clone(),
        None => infer_entity_is(&definition.composed_of, domain),
    };

    let quads: Vec<Quad> = definition
        .composed_of
        .iter()
        .map(|q| q.remapped(&mapping))
        .collect();
    let entity_is: Vec<Term> = entity_is_raw.iter().map(|t| t.remap(&mapping)).collect();

    let template = Template {
        name,
        quads,
        entity_is,
    };
    validate_template(&template, voc)?;
    Ok(template)
}

/// Applies the domain's heuristic: the first placeholder set that matches the
/// template decides which terms denote the entity.
fn infer_entity_is(quads: &[Quad], domain: &RuleDomain) -> Vec<Term> {
    for set in &domain.entity_is_heuristic {
        match set.as_slice() {
            [s, p, o] => {
                let found: Vec<Term> = quads
                    .iter()
                    .filter(|q| {
                        q.subject == Term::Iri(s.clone())
                            && q.predicate == Term::Iri(p.clone())
                            && q.object == Term::Iri(o.clone())
                    })
                    .map(|q| Term::from(q.clone()))
                    .collect();
                if !found.is_empty() {
                    return found;
                }
            }
            [single] => {
                let term = Term::Iri(single.clone());
                if quads.iter().any(|q| q.contains(&term)) {
                    return vec![term];
                }
            }
            _ => {}
        }
    }
    Vec::new()
}

/// Rejects templates that break one of the structural invariants.
pub fn validate_template(template: &Template, voc: &Vocab) -> Result<(), PrecError> {
    let entity = Term::Iri(voc.pvar.entity.clone());
    let mpp = Term::Iri(voc.pvar.meta_property_predicate.clone());
    let mpo = Term::Iri(voc.pvar.meta_property_object.clone());

    for quad in &template.quads {
        check_entity_position(quad, &entity, &template.name)?;
        check_meta_pairing(quad, &mpp, &mpo, &template.name)?;
        check_embedded_assertions(quad, &template.quads, &template.name)?;
    }
    Ok(())
}

/// The entity placeholder may only appear in subject position, or recursively
/// in the subject of a subject, never as predicate, object or graph at any
/// depth.
fn check_entity_position(quad: &Quad, entity: &Term, name: &NamedNode) -> Result<(), PrecError> {
    if quad.predicate.contains(entity) || quad.object.contains(entity) || quad.graph.contains(entity)
    {
        return Err(PrecError::context(format!(
            "template {}: {} may only appear in subject position ({})",
            name, entity, quad
        )));
    }
    match &quad.subject {
        s if s == entity => Ok(()),
        Term::Quad(inner) => check_entity_position(inner, entity, name),
        s if s.contains(entity) => Err(PrecError::context(format!(
            "template {}: {} may only appear in subject position ({})",
            name, entity, quad
        ))),
        _ => Ok(()),
    }
}

/// The meta-property placeholders must appear together, as predicate and
/// object of the same triple.
fn check_meta_pairing(quad: &Quad, mpp: &Term, mpo: &Term, name: &NamedNode) -> Result<(), PrecError> {
    let paired = quad.predicate == *mpp && quad.object == *mpo;
    if !paired {
        for component in quad.components() {
            if component == mpp || component == mpo {
                return Err(PrecError::context(format!(
                    "template {}: meta-property placeholders must appear together \
                     as predicate and object of one triple ({})",
                    name, quad
                )));
            }
        }
    }
    for component in quad.components() {
        if let Term::Quad(inner) = component {
            check_meta_pairing(inner, mpp, mpo, name)?;
        }
    }
    Ok(())
}

/// Every nested quad used anywhere in the template must itself be asserted as
/// a top-level template quad.
fn check_embedded_assertions(
    quad: &Quad,
    asserted: &[Quad],
    name: &NamedNode,
) -> Result<(), PrecError> {
    for component in quad.components() {
        if let Term::Quad(inner) = component {
            if !asserted.contains(inner) {
                return Err(PrecError::context(format!(
                    "template {}: embedded triple {} is never asserted",
                    name,
                    Term::Quad(inner.clone())
                )));
            }
            check_embedded_assertions(inner, asserted, name)?;
        }
    }
    Ok(())
}
