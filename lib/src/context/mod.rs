//! Context documents: the user-facing rule language.
//!
//! A context is a Turtle-star document declaring rules, templates, template
//! bases and flags. Loading a context validates everything up front so that
//! application never has to second-guess a rule.

pub mod domain;
pub mod template;

use crate::dataset::Dataset;
use crate::error::PrecError;
use crate::parser::parse_turtle;
use crate::term::{Quad, Term};
use crate::vocab::Vocab;
use domain::{
    build_conditions, domains, split_definition, Condition, DomainKind, RuleDomain, RuleParts,
    RulePriority,
};
use log::debug;
use std::collections::HashMap;
use template::{compose_template, Template, TemplateLibrary};

pub use domain::DomainKind as RuleKind;

/// One ready-to-apply rule: its canonical conditions, its place in the total
/// order and its composed template.
#[derive(Debug, Clone)]
pub struct Rule {
    pub node: Term,
    pub kind: DomainKind,
    pub conditions: Vec<Condition>,
    pub priority: RulePriority,
    pub template: Template,
}

/// A fully loaded and validated context.
#[derive(Debug)]
pub struct Context {
    /// Rules per domain, most specific first (descending priority).
    rules: HashMap<DomainKind, Vec<Rule>>,
    /// Template applied to entities no rule matched, per domain.
    defaults: HashMap<DomainKind, Template>,
    pub keep_provenance: bool,
    pub blank_node_prefix: Option<String>,
}

impl Context {
    /// An empty context: no rules, built-in defaults, provenance kept.
    pub fn empty(voc: &Vocab) -> Result<Context, PrecError> {
        Context::load(&Dataset::new(), voc)
    }

    /// Parses and loads a context from Turtle-star source.
    pub fn parse(source: &str, voc: &Vocab) -> Result<Context, PrecError> {
        let dataset = parse_turtle(source).map_err(PrecError::MalformedContext)?;
        Context::load(&dataset, voc)
    }

    /// Loads a context from an already parsed dataset.
    pub fn load(dataset: &Dataset, voc: &Vocab) -> Result<Context, PrecError> {
        let dataset = normalize_synonyms(dataset, voc);
        let all_domains = domains(voc);
        let dataset = expand_shortcuts(&dataset, &all_domains, voc);

        let mut library = TemplateLibrary::builtin(voc);
        library.load_user_templates(&dataset, voc)?;

        let mut rules: HashMap<DomainKind, Vec<Rule>> = HashMap::new();
        let mut defaults: HashMap<DomainKind, Template> = HashMap::new();

        for domain in &all_domains {
            let domain_rules = load_domain_rules(&dataset, domain, &library, voc)?;
            debug!(
                "loaded {} {:?} rule(s)",
                domain_rules.len(),
                domain.kind
            );
            rules.insert(domain.kind, domain_rules);

            let sentinel = RuleParts::sentinel(Term::fresh_blank());
            let default = compose_template(&dataset, &sentinel, domain, &library, voc)?;
            defaults.insert(domain.kind, default);
        }

        Ok(Context {
            rules,
            defaults,
            keep_provenance: read_keep_provenance(&dataset, voc)?,
            blank_node_prefix: read_blank_node_prefix(&dataset, voc),
        })
    }

    /// Rules of one domain, in application order.
    pub fn rules_for(&self, kind: DomainKind) -> &[Rule] {
        self.rules.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The default template of one domain.
    pub fn default_template(&self, kind: DomainKind) -> &Template {
        // Every domain gets a default at load time.
        &self.defaults[&kind]
    }
}

/// Rewrites the legacy "relationship" vocabulary into its "edge" equivalent
/// so the rest of the loader only ever sees one spelling.
fn normalize_synonyms(dataset: &Dataset, voc: &Vocab) -> Dataset {
    let mapping = [
        (
            Term::Iri(voc.prec.edge_rule.clone()),
            Term::Iri(voc.prec.relationship_rule.clone()),
        ),
        (
            Term::Iri(voc.prec.edge_label.clone()),
            Term::Iri(voc.prec.relationship_label.clone()),
        ),
        (
            Term::Iri(voc.prec.edges.clone()),
            Term::Iri(voc.prec.relationships.clone()),
        ),
        (
            Term::Iri(voc.prec.iri_of_edge.clone()),
            Term::Iri(voc.prec.iri_of_relationship.clone()),
        ),
    ];
    dataset.iter().map(|q| q.remapped(&mapping)).collect()
}

/// Expands `:iri prec:IRIOfEdge "Label"` shortcuts into full rules whose
/// subject IRI then substitutes the domain's main placeholder.
fn expand_shortcuts(dataset: &Dataset, all_domains: &[RuleDomain], voc: &Vocab) -> Dataset {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    let mut out = dataset.clone();
    for domain in all_domains {
        let shortcut = Term::Iri(domain.shortcut.clone());
        for quad in dataset.quads_matching(None, Some(&shortcut), None, None) {
            out.delete(&quad);
            out.add(Quad::new(
                quad.subject.clone(),
                rdf_type.clone(),
                Term::Iri(domain.rule_type.clone()),
            ));
            out.add(Quad::new(
                quad.subject,
                Term::Iri(domain.main_label.clone()),
                quad.object,
            ));
        }
    }
    out
}

fn load_domain_rules(
    dataset: &Dataset,
    domain: &RuleDomain,
    library: &TemplateLibrary,
    voc: &Vocab,
) -> Result<Vec<Rule>, PrecError> {
    let rdf_type = Term::Iri(voc.rdf.type_.clone());
    let rule_type = Term::Iri(domain.rule_type.clone());

    let mut nodes: Vec<Term> = dataset
        .quads_matching(None, Some(&rdf_type), Some(&rule_type), None)
        .into_iter()
        .map(|q| q.subject)
        .collect();
    nodes.sort_by_key(|t| t.to_string());
    nodes.dedup();

    let mut rules = Vec::with_capacity(nodes.len());
    for node in nodes {
        let parts = split_definition(dataset, &node, domain, voc)?;
        let conditions = build_conditions(&parts, domain, voc)?;
        let priority = RulePriority::new(parts.explicit_priority, &conditions, domain);
        let template = compose_template(dataset, &parts, domain, library, voc)?;
        rules.push(Rule {
            node,
            kind: domain.kind,
            conditions,
            priority,
            template,
        });
    }

    // Two rules with the same conditions and the same explicit priority can
    // never be ordered meaningfully; reject the context.
    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.priority.digest() == b.priority.digest()
                && a.priority.explicit() == b.priority.explicit()
            {
                return Err(PrecError::context(format!(
                    "rules {} and {} share the same conditions and priority",
                    a.node, b.node
                )));
            }
        }
    }

    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(rules)
}

fn read_keep_provenance(dataset: &Dataset, voc: &Vocab) -> Result<bool, PrecError> {
    let flag = Term::Iri(voc.prec.keep_provenance.clone());
    let state = Term::Iri(voc.prec.flag_state.clone());
    let declared = dataset.quads_matching(Some(&flag), Some(&state), None, None);
    match declared.first() {
        None => Ok(true),
        Some(quad) => {
            let literal = quad.object.as_literal().ok_or_else(|| {
                PrecError::context(format!(
                    "prec:KeepProvenance prec:flagState requires a boolean literal, found {}",
                    quad.object
                ))
            })?;
            match literal.value() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                other => Err(PrecError::context(format!(
                    "prec:KeepProvenance prec:flagState requires a boolean literal, found \"{}\"",
                    other
                ))),
            }
        }
    }
}

fn read_blank_node_prefix(dataset: &Dataset, voc: &Vocab) -> Option<String> {
    let predicate = Term::Iri(voc.prec.map_blank_nodes_to_prefix.clone());
    dataset
        .quads_matching(None, Some(&predicate), None, None)
        .into_iter()
        .find_map(|q| match q.object {
            Term::Literal(l) => Some(l.value().to_string()),
            Term::Iri(n) => Some(n.as_str().to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: &str = r#"
        @prefix prec: <http://bruy.at/prec#> .
        @prefix pvar: <http://bruy.at/prec-trans#> .
        @prefix ex:   <http://ex.org/> .
        @prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .
    "#;

    fn parse(body: &str) -> Result<Context, PrecError> {
        let voc = Vocab::new();
        Context::parse(&format!("{}{}", PREFIXES, body), &voc)
    }

    #[test]
    fn empty_context_loads_with_builtin_defaults() {
        let voc = Vocab::new();
        let ctx = Context::empty(&voc).unwrap();
        assert!(ctx.rules_for(DomainKind::Edge).is_empty());
        assert!(ctx.keep_provenance);
        assert_eq!(
            ctx.default_template(DomainKind::Edge).name,
            voc.prec.rdf_reification
        );
        assert_eq!(
            ctx.default_template(DomainKind::Property).name,
            voc.prec.prec_property_node
        );
        assert_eq!(
            ctx.default_template(DomainKind::NodeLabel).name,
            voc.prec.node_labels_typing
        );
    }

    #[test]
    fn loads_an_edge_rule_with_template() {
        let ctx = parse(
            r#"
            ex:knows a prec:EdgeRule ;
                prec:edgeLabel "KNOWS" ;
                prec:templatedBy prec:RdfStarUnique .
            "#,
        )
        .unwrap();
        let rules = ctx.rules_for(DomainKind::Edge);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].conditions.len(), 1);
        // The rule IRI replaced pvar:label in the template.
        assert!(rules[0].template.uses(&Term::iri("http://ex.org/knows")));
    }

    #[test]
    fn relationship_vocabulary_is_a_synonym() {
        let ctx = parse(
            r#"
            ex:knows a prec:RelationshipRule ;
                prec:relationshipLabel "KNOWS" .
            "#,
        )
        .unwrap();
        assert_eq!(ctx.rules_for(DomainKind::Edge).len(), 1);
    }

    #[test]
    fn shortcut_expands_to_a_rule() {
        let ctx = parse(r#"ex:name prec:IRIOfProperty "name" ."#).unwrap();
        let rules = ctx.rules_for(DomainKind::Property);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].template.uses(&Term::iri("http://ex.org/name")));
    }

    #[test]
    fn rules_are_sorted_by_priority() {
        let ctx = parse(
            r#"
            ex:generic a prec:EdgeRule ;
                prec:edgeLabel "KNOWS" .
            ex:specific a prec:EdgeRule ;
                prec:edgeLabel "KNOWS" ;
                prec:sourceLabel "Person" .
            ex:urgent a prec:EdgeRule ;
                prec:edgeLabel "LIKES" ;
                prec:priority 10 .
            "#,
        )
        .unwrap();
        let rules = ctx.rules_for(DomainKind::Edge);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].node, Term::iri("http://ex.org/urgent"));
        assert_eq!(rules[1].node, Term::iri("http://ex.org/specific"));
        assert_eq!(rules[2].node, Term::iri("http://ex.org/generic"));
    }

    #[test]
    fn equal_conditions_and_priority_are_rejected() {
        let err = parse(
            r#"
            ex:a a prec:PropertyRule ; prec:propertyName "name" .
            ex:b a prec:PropertyRule ; prec:propertyName "name" .
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PrecError::MalformedContext(_)));
    }

    #[test]
    fn distinct_priorities_disambiguate_equal_conditions() {
        let ctx = parse(
            r#"
            ex:a a prec:PropertyRule ; prec:propertyName "name" ; prec:priority 2 .
            ex:b a prec:PropertyRule ; prec:propertyName "name" ; prec:priority 1 .
            "#,
        )
        .unwrap();
        let rules = ctx.rules_for(DomainKind::Property);
        assert_eq!(rules[0].node, Term::iri("http://ex.org/a"));
    }

    #[test]
    fn unknown_rule_predicate_is_rejected() {
        let err = parse(
            r#"
            ex:a a prec:EdgeRule ;
                prec:edgeLabel "KNOWS" ;
                ex:unrelated "x" .
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PrecError::MalformedContext(_)));
    }

    #[test]
    fn flags_are_read() {
        let ctx = parse(
            r#"
            prec:KeepProvenance prec:flagState false .
            [] prec:mapBlankNodesToPrefix "http://ex.org/bn/" .
            "#,
        )
        .unwrap();
        assert!(!ctx.keep_provenance);
        assert_eq!(
            ctx.blank_node_prefix.as_deref(),
            Some("http://ex.org/bn/")
        );
    }

    #[test]
    fn user_template_with_embedded_triples() {
        let ctx = parse(
            r#"
            ex:Tpl prec:composedOf << pvar:source pvar:label pvar:destination >> .
            ex:knows a prec:EdgeRule ;
                prec:edgeLabel "KNOWS" ;
                prec:templatedBy ex:Tpl .
            "#,
        )
        .unwrap();
        let rules = ctx.rules_for(DomainKind::Edge);
        assert_eq!(rules[0].template.quads.len(), 1);
        // Heuristic: the source-label-destination quad is the edge identity.
        assert_eq!(rules[0].template.entity_is.len(), 1);
    }

    #[test]
    fn base_templated_by_changes_the_default() {
        let voc = Vocab::new();
        let ctx = Context::parse(
            &format!(
                "{}{}",
                PREFIXES, "prec:Edges prec:templatedBy prec:DirectTriples ."
            ),
            &voc,
        )
        .unwrap();
        assert_eq!(
            ctx.default_template(DomainKind::Edge).name,
            voc.prec.direct_triples
        );
    }
}
