//! The three rule domains (edges, properties, node labels) expressed as
//! configuration data, plus rule-definition parsing and the priority order.
//!
//! A domain is plain data: which class marks its rules, which predicate
//! carries the main label, which extra condition predicates are allowed,
//! which template bases may contribute a template, and how to turn declared
//! conditions into discriminating filter patterns.

use crate::dataset::Dataset;
use crate::error::PrecError;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;
use oxrdf::NamedNode;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// Identifies which of the three domains a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    Edge,
    Property,
    NodeLabel,
}

/// A template base a rule may inherit its template from, together with the
/// condition predicates that contradict it (a node-only property rule cannot
/// also require an edge label).
#[derive(Debug, Clone)]
pub struct TemplateBase {
    pub base: NamedNode,
    pub forbidden_conditions: Vec<NamedNode>,
}

/// Static description of one rule domain.
#[derive(Debug, Clone)]
pub struct RuleDomain {
    pub kind: DomainKind,
    /// IRI tagging rule nodes of this domain in a context (`a prec:EdgeRule`).
    pub rule_type: NamedNode,
    /// Template used when no rule (or a template-less rule) applies.
    pub default_template: NamedNode,
    /// Predicate carrying the rule's primary label condition.
    pub main_label: NamedNode,
    /// Extra restriction predicates this domain understands.
    pub possible_conditions: Vec<NamedNode>,
    pub template_bases: Vec<TemplateBase>,
    /// Syntactic-sugar predicate (`:iri prec:IRIOfProperty "Label"`).
    pub shortcut: NamedNode,
    /// Placeholder replaced by the rule's own subject IRI.
    pub substitution_placeholder: NamedNode,
    /// Predicate used for this domain's marks.
    pub mark_predicate: NamedNode,
    /// Ordered placeholder sets used to infer `entityIs` for templates that
    /// do not declare it.
    pub entity_is_heuristic: Vec<Vec<NamedNode>>,
}

/// Builds the three domains, in processing order.
pub fn domains(voc: &Vocab) -> Vec<RuleDomain> {
    vec![
        RuleDomain {
            kind: DomainKind::Edge,
            rule_type: voc.prec.edge_rule.clone(),
            default_template: voc.prec.rdf_reification.clone(),
            main_label: voc.prec.edge_label.clone(),
            possible_conditions: vec![
                voc.prec.source_label.clone(),
                voc.prec.destination_label.clone(),
            ],
            template_bases: vec![TemplateBase {
                base: voc.prec.edges.clone(),
                forbidden_conditions: vec![],
            }],
            shortcut: voc.prec.iri_of_edge.clone(),
            substitution_placeholder: voc.pvar.label.clone(),
            mark_predicate: voc.prec.applied_edge_rule.clone(),
            entity_is_heuristic: vec![
                vec![
                    voc.pvar.source.clone(),
                    voc.pvar.label.clone(),
                    voc.pvar.destination.clone(),
                ],
                vec![voc.pvar.self_.clone()],
            ],
        },
        RuleDomain {
            kind: DomainKind::Property,
            rule_type: voc.prec.property_rule.clone(),
            default_template: voc.prec.prec_property_node.clone(),
            main_label: voc.prec.property_name.clone(),
            possible_conditions: vec![
                voc.prec.on_node_with_label.clone(),
                voc.prec.on_edge_with_label.clone(),
            ],
            template_bases: vec![
                TemplateBase {
                    base: voc.prec.node_properties.clone(),
                    forbidden_conditions: vec![voc.prec.on_edge_with_label.clone()],
                },
                TemplateBase {
                    base: voc.prec.edge_properties.clone(),
                    forbidden_conditions: vec![voc.prec.on_node_with_label.clone()],
                },
                TemplateBase {
                    base: voc.prec.meta_properties.clone(),
                    forbidden_conditions: vec![
                        voc.prec.on_node_with_label.clone(),
                        voc.prec.on_edge_with_label.clone(),
                    ],
                },
            ],
            shortcut: voc.prec.iri_of_property.clone(),
            substitution_placeholder: voc.pvar.property_key.clone(),
            mark_predicate: voc.prec.applied_property_rule.clone(),
            entity_is_heuristic: vec![vec![voc.pvar.self_.clone()]],
        },
        RuleDomain {
            kind: DomainKind::NodeLabel,
            rule_type: voc.prec.node_label_rule.clone(),
            default_template: voc.prec.node_labels_typing.clone(),
            main_label: voc.prec.node_label.clone(),
            possible_conditions: vec![],
            template_bases: vec![TemplateBase {
                base: voc.prec.node_labels.clone(),
                forbidden_conditions: vec![],
            }],
            shortcut: voc.prec.iri_of_node_label.clone(),
            substitution_placeholder: voc.pvar.label.clone(),
            mark_predicate: voc.prec.applied_node_rule.clone(),
            entity_is_heuristic: vec![vec![voc.pvar.self_.clone()]],
        },
    ]
}

/// One conjunctive condition block with its canonical string key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub key: String,
    pub pattern: Vec<Quad>,
}

impl Condition {
    fn new(pattern: Vec<Quad>) -> Condition {
        let key = pattern
            .iter()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Condition { key, pattern }
    }
}

/// The classified triples of one rule declaration.
#[derive(Debug, Clone)]
pub struct RuleParts {
    pub node: Term,
    pub label: Option<Term>,
    pub explicit_priority: Option<i64>,
    /// Extra declared restrictions as (predicate, literal) pairs.
    pub extra_conditions: Vec<(NamedNode, Term)>,
    pub templated_by: Option<NamedNode>,
    /// Declared term substitutions as (to, from) pairs.
    pub substitutions: Vec<(Term, Term)>,
}

impl RuleParts {
    /// Empty rule parts standing for "no rule": used to compose the default
    /// template of a domain.
    pub fn sentinel(node: Term) -> RuleParts {
        RuleParts {
            node,
            label: None,
            explicit_priority: None,
            extra_conditions: Vec::new(),
            templated_by: None,
            substitutions: Vec::new(),
        }
    }

    pub fn declares(&self, predicate: &NamedNode) -> bool {
        self.extra_conditions.iter().any(|(p, _)| p == predicate)
    }
}

/// Reads every triple about `rule_node` and classifies it. Unknown predicates
/// on a rule node are a context error, not silently ignored.
pub fn split_definition(
    dataset: &Dataset,
    rule_node: &Term,
    domain: &RuleDomain,
    voc: &Vocab,
) -> Result<RuleParts, PrecError> {
    let mut parts = RuleParts::sentinel(rule_node.clone());

    for quad in dataset.quads_matching(Some(rule_node), None, None, None) {
        let predicate = match quad.predicate.as_iri() {
            Some(p) => p.clone(),
            None => {
                return Err(PrecError::context(format!(
                    "rule {} has a non-IRI predicate {}",
                    rule_node, quad.predicate
                )))
            }
        };

        if predicate == voc.rdf.type_ {
            if quad.object != Term::Iri(domain.rule_type.clone()) {
                return Err(PrecError::context(format!(
                    "rule {} is typed {} but was expected to be a {}",
                    rule_node, quad.object, domain.rule_type
                )));
            }
        } else if predicate == domain.main_label {
            if !quad.object.is_literal() {
                return Err(PrecError::context(format!(
                    "rule {}: {} requires a literal, found {}",
                    rule_node, predicate, quad.object
                )));
            }
            if parts.label.is_some() {
                return Err(PrecError::context(format!(
                    "rule {} declares {} more than once",
                    rule_node, predicate
                )));
            }
            parts.label = Some(quad.object.clone());
        } else if predicate == voc.prec.priority {
            let literal = quad.object.as_literal().ok_or_else(|| {
                PrecError::context(format!(
                    "rule {}: prec:priority requires a literal",
                    rule_node
                ))
            })?;
            if literal.datatype() != voc.rdf.xsd_integer.as_ref() {
                return Err(PrecError::context(format!(
                    "rule {}: prec:priority must be an xsd:integer, found {}",
                    rule_node, literal
                )));
            }
            let value: i64 = literal.value().parse().map_err(|_| {
                PrecError::context(format!(
                    "rule {}: prec:priority value {} is not a valid integer",
                    rule_node, literal
                ))
            })?;
            if parts.explicit_priority.is_some() {
                return Err(PrecError::context(format!(
                    "rule {} declares prec:priority more than once",
                    rule_node
                )));
            }
            parts.explicit_priority = Some(value);
        } else if domain.possible_conditions.contains(&predicate) {
            if !quad.object.is_literal() {
                return Err(PrecError::context(format!(
                    "rule {}: {} requires a literal, found {}",
                    rule_node, predicate, quad.object
                )));
            }
            parts.extra_conditions.push((predicate, quad.object.clone()));
        } else if predicate == voc.prec.templated_by {
            let template = quad.object.as_iri().ok_or_else(|| {
                PrecError::context(format!(
                    "rule {}: prec:templatedBy requires an IRI",
                    rule_node
                ))
            })?;
            if parts.templated_by.is_some() {
                return Err(PrecError::context(format!(
                    "rule {} declares prec:templatedBy more than once",
                    rule_node
                )));
            }
            parts.templated_by = Some(template.clone());
        } else if predicate == voc.prec.substitution {
            let (to, from) = read_substitution(dataset, &quad.object, voc)?;
            parts.substitutions.push((to, from));
        } else {
            return Err(PrecError::context(format!(
                "rule {} uses unknown predicate {}",
                rule_node, predicate
            )));
        }
    }

    // Declared condition order must never matter.
    parts
        .extra_conditions
        .sort_by(|a, b| (a.0.as_str(), a.1.to_string()).cmp(&(b.0.as_str(), b.1.to_string())));

    Ok(parts)
}

/// Reads one `prec:substitution` declaration node into a (to, from) pair.
pub fn read_substitution(
    dataset: &Dataset,
    node: &Term,
    voc: &Vocab,
) -> Result<(Term, Term), PrecError> {
    let target_pred = Term::Iri(voc.prec.substitution_target.clone());
    let value_pred = Term::Iri(voc.prec.substitution_value.clone());
    let targets = dataset.quads_matching(Some(node), Some(&target_pred), None, None);
    let values = dataset.quads_matching(Some(node), Some(&value_pred), None, None);
    if targets.len() != 1 || values.len() != 1 {
        return Err(PrecError::context(format!(
            "substitution {} must have exactly one prec:substitutionTarget \
             and one prec:substitutionValue",
            node
        )));
    }
    Ok((values[0].object.clone(), targets[0].object.clone()))
}

/// Builds the canonicalized condition blocks of a rule. Well-known variable
/// names tie the blocks to the structural source pattern built by the
/// application engine for the same domain.
pub fn build_conditions(
    parts: &RuleParts,
    domain: &RuleDomain,
    voc: &Vocab,
) -> Result<Vec<Condition>, PrecError> {
    let mut conditions = Vec::new();
    let rdfs_label = Term::Iri(voc.rdf.rdfs_label.clone());
    let rdf_type = Term::Iri(voc.rdf.type_.clone());

    if let Some(label) = &parts.label {
        let block = match domain.kind {
            DomainKind::Edge | DomainKind::NodeLabel => vec![Quad::new(
                Term::var("labelNode"),
                rdfs_label.clone(),
                label.clone(),
            )],
            DomainKind::Property => vec![Quad::new(
                Term::var("key"),
                rdfs_label.clone(),
                label.clone(),
            )],
        };
        conditions.push(Condition::new(block));
    }

    for (predicate, label) in &parts.extra_conditions {
        let block = if *predicate == voc.prec.source_label {
            vec![
                Quad::new(Term::var("source"), rdf_type.clone(), Term::var("srcLabel")),
                Quad::new(Term::var("srcLabel"), rdfs_label.clone(), label.clone()),
            ]
        } else if *predicate == voc.prec.destination_label {
            vec![
                Quad::new(
                    Term::var("destination"),
                    rdf_type.clone(),
                    Term::var("dstLabel"),
                ),
                Quad::new(Term::var("dstLabel"), rdfs_label.clone(), label.clone()),
            ]
        } else if *predicate == voc.prec.on_node_with_label {
            vec![
                Quad::new(
                    Term::var("entity"),
                    rdf_type.clone(),
                    Term::Iri(voc.pgo.node.clone()),
                ),
                Quad::new(Term::var("entity"), rdf_type.clone(), Term::var("ownerLabel")),
                Quad::new(Term::var("ownerLabel"), rdfs_label.clone(), label.clone()),
            ]
        } else if *predicate == voc.prec.on_edge_with_label {
            vec![
                Quad::new(
                    Term::var("entity"),
                    rdf_type.clone(),
                    Term::Iri(voc.pgo.edge.clone()),
                ),
                Quad::new(
                    Term::var("entity"),
                    Term::Iri(voc.rdf.predicate.clone()),
                    Term::var("ownerLabel"),
                ),
                Quad::new(Term::var("ownerLabel"), rdfs_label.clone(), label.clone()),
            ]
        } else {
            return Err(PrecError::logic(format!(
                "condition predicate {} accepted but not translated",
                predicate
            )));
        };
        conditions.push(Condition::new(block));
    }

    // Canonical order so that declaration order never matters.
    conditions.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(conditions)
}

/// Total priority order for rules of one domain.
///
/// An explicit priority always outranks its absence; among equal or absent
/// explicit priorities, more specific rules (more condition blocks) come
/// first, then a hash of the canonicalized conditions decides. The hash is an
/// internal determinism device, never user-facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePriority {
    explicit: Option<i64>,
    condition_count: usize,
    tie_break: String,
}

impl RulePriority {
    pub fn new(explicit: Option<i64>, conditions: &[Condition], domain: &RuleDomain) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain.rule_type.as_str().as_bytes());
        for condition in conditions {
            hasher.update(b"\n");
            hasher.update(condition.key.as_bytes());
        }
        RulePriority {
            explicit,
            condition_count: conditions.len(),
            tie_break: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn explicit(&self) -> Option<i64> {
        self.explicit
    }

    /// The canonical condition digest; equal digests mean equal condition
    /// sets, which a context is not allowed to contain.
    pub fn digest(&self) -> &str {
        &self.tie_break
    }
}

impl Ord for RulePriority {
    /// `Greater` means "applied earlier".
    fn cmp(&self, other: &Self) -> Ordering {
        let explicit = match (self.explicit, other.explicit) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        explicit
            .then(self.condition_count.cmp(&other.condition_count))
            // Ascending hash wins, purely for determinism.
            .then_with(|| other.tie_break.cmp(&self.tie_break))
    }
}

impl PartialOrd for RulePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Vocab, Vec<RuleDomain>) {
        let voc = Vocab::new();
        let ds = domains(&voc);
        (voc, ds)
    }

    fn parts_with_label(voc: &Vocab, label: &str) -> RuleParts {
        let mut parts = RuleParts::sentinel(Term::iri("http://ex.org/rule"));
        parts.label = Some(Term::literal(label));
        let _ = voc;
        parts
    }

    #[test]
    fn conditions_are_canonically_ordered() {
        let (voc, doms) = setup();
        let edge = &doms[0];

        let mut a = parts_with_label(&voc, "KNOWS");
        a.extra_conditions.push((
            voc.prec.destination_label.clone(),
            Term::literal("Person"),
        ));
        a.extra_conditions
            .push((voc.prec.source_label.clone(), Term::literal("Person")));

        let mut b = parts_with_label(&voc, "KNOWS");
        b.extra_conditions
            .push((voc.prec.source_label.clone(), Term::literal("Person")));
        b.extra_conditions.push((
            voc.prec.destination_label.clone(),
            Term::literal("Person"),
        ));

        let ca = build_conditions(&a, edge, &voc).unwrap();
        let cb = build_conditions(&b, edge, &voc).unwrap();
        let keys_a: Vec<_> = ca.iter().map(|c| c.key.clone()).collect();
        let keys_b: Vec<_> = cb.iter().map(|c| c.key.clone()).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn explicit_priority_beats_specificity() {
        let (voc, doms) = setup();
        let edge = &doms[0];

        let generic = parts_with_label(&voc, "KNOWS");
        let mut specific = parts_with_label(&voc, "KNOWS");
        specific
            .extra_conditions
            .push((voc.prec.source_label.clone(), Term::literal("Person")));

        let cg = build_conditions(&generic, edge, &voc).unwrap();
        let cs = build_conditions(&specific, edge, &voc).unwrap();

        let with_explicit = RulePriority::new(Some(5), &cg, edge);
        let without = RulePriority::new(None, &cs, edge);
        assert!(with_explicit > without);
    }

    #[test]
    fn more_conditions_win_without_explicit_priority() {
        let (voc, doms) = setup();
        let edge = &doms[0];

        let generic = parts_with_label(&voc, "KNOWS");
        let mut specific = parts_with_label(&voc, "KNOWS");
        specific
            .extra_conditions
            .push((voc.prec.source_label.clone(), Term::literal("Person")));

        let cg = build_conditions(&generic, edge, &voc).unwrap();
        let cs = build_conditions(&specific, edge, &voc).unwrap();

        assert!(RulePriority::new(None, &cs, edge) > RulePriority::new(None, &cg, edge));
    }

    #[test]
    fn priority_order_is_total_for_distinct_condition_sets() {
        let (voc, doms) = setup();
        let edge = &doms[0];

        let a = parts_with_label(&voc, "A");
        let b = parts_with_label(&voc, "B");
        let ca = build_conditions(&a, edge, &voc).unwrap();
        let cb = build_conditions(&b, edge, &voc).unwrap();

        let pa = RulePriority::new(None, &ca, edge);
        let pb = RulePriority::new(None, &cb, edge);
        assert_ne!(pa.cmp(&pb), Ordering::Equal);
        assert_eq!(pa.cmp(&pb), pb.cmp(&pa).reverse());
    }
}
