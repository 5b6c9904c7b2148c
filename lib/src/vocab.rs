//! Vocabulary constants for the context language, the placeholder namespace
//! and the generic property-graph encoding.

use oxrdf::NamedNode;

/// The `prec:` vocabulary: rule classes, condition predicates, template
/// machinery, flags and the markers used by the generic encoding.
pub struct PREC {
    // rule classes
    pub edge_rule: NamedNode,
    pub property_rule: NamedNode,
    pub node_label_rule: NamedNode,
    pub relationship_rule: NamedNode,

    // condition predicates
    pub edge_label: NamedNode,
    pub relationship_label: NamedNode,
    pub property_name: NamedNode,
    pub node_label: NamedNode,
    pub source_label: NamedNode,
    pub destination_label: NamedNode,
    pub on_node_with_label: NamedNode,
    pub on_edge_with_label: NamedNode,
    pub priority: NamedNode,

    // template machinery
    pub templated_by: NamedNode,
    pub composed_of: NamedNode,
    pub entity_is: NamedNode,
    pub substitution: NamedNode,
    pub substitution_target: NamedNode,
    pub substitution_value: NamedNode,

    // shortcut predicates
    pub iri_of_edge: NamedNode,
    pub iri_of_relationship: NamedNode,
    pub iri_of_property: NamedNode,
    pub iri_of_node_label: NamedNode,

    // template bases
    pub edges: NamedNode,
    pub relationships: NamedNode,
    pub node_properties: NamedNode,
    pub edge_properties: NamedNode,
    pub meta_properties: NamedNode,
    pub node_labels: NamedNode,

    // built-in template names
    pub rdf_reification: NamedNode,
    pub rdf_star_unique: NamedNode,
    pub direct_triples: NamedNode,
    pub prec_property_node: NamedNode,
    pub direct_value: NamedNode,
    pub node_labels_typing: NamedNode,

    // flags
    pub keep_provenance: NamedNode,
    pub flag_state: NamedNode,
    pub map_blank_nodes_to_prefix: NamedNode,

    // generic-encoding markers
    pub property_key: NamedNode,
    pub property_key_value: NamedNode,
    pub created_node_label: NamedNode,
    pub created_edge_label: NamedNode,
    pub created_property_key: NamedNode,
    pub has_meta_properties: NamedNode,

    // internal mark vocabulary
    pub applied_edge_rule: NamedNode,
    pub applied_property_rule: NamedNode,
    pub applied_node_rule: NamedNode,
    pub no_rule_found: NamedNode,
}

const PREC_NS: &str = "http://bruy.at/prec#";

impl PREC {
    pub fn new() -> Self {
        let n = |local: &str| NamedNode::new_unchecked(format!("{}{}", PREC_NS, local));
        PREC {
            edge_rule: n("EdgeRule"),
            property_rule: n("PropertyRule"),
            node_label_rule: n("NodeLabelRule"),
            relationship_rule: n("RelationshipRule"),
            edge_label: n("edgeLabel"),
            relationship_label: n("relationshipLabel"),
            property_name: n("propertyName"),
            node_label: n("nodeLabel"),
            source_label: n("sourceLabel"),
            destination_label: n("destinationLabel"),
            on_node_with_label: n("onNodeWithLabel"),
            on_edge_with_label: n("onEdgeWithLabel"),
            priority: n("priority"),
            templated_by: n("templatedBy"),
            composed_of: n("composedOf"),
            entity_is: n("entityIs"),
            substitution: n("substitution"),
            substitution_target: n("substitutionTarget"),
            substitution_value: n("substitutionValue"),
            iri_of_edge: n("IRIOfEdge"),
            iri_of_relationship: n("IRIOfRelationship"),
            iri_of_property: n("IRIOfProperty"),
            iri_of_node_label: n("IRIOfNodeLabel"),
            edges: n("Edges"),
            relationships: n("Relationships"),
            node_properties: n("NodeProperties"),
            edge_properties: n("EdgeProperties"),
            meta_properties: n("MetaProperties"),
            node_labels: n("NodeLabels"),
            rdf_reification: n("RDFReification"),
            rdf_star_unique: n("RdfStarUnique"),
            direct_triples: n("DirectTriples"),
            prec_property_node: n("PrecPropertyNode"),
            direct_value: n("DirectValue"),
            node_labels_typing: n("NodeLabelsTyping"),
            keep_provenance: n("KeepProvenance"),
            flag_state: n("flagState"),
            map_blank_nodes_to_prefix: n("mapBlankNodesToPrefix"),
            property_key: n("PropertyKey"),
            property_key_value: n("PropertyKeyValue"),
            created_node_label: n("CreatedNodeLabel"),
            created_edge_label: n("CreatedEdgeLabel"),
            created_property_key: n("CreatedPropertyKey"),
            has_meta_properties: n("hasMetaProperties"),
            applied_edge_rule: n("_appliedEdgeRule"),
            applied_property_rule: n("_appliedPropertyRule"),
            applied_node_rule: n("_appliedNodeRule"),
            no_rule_found: n("_NoRuleFound"),
        }
    }
}

impl Default for PREC {
    fn default() -> Self {
        Self::new()
    }
}

/// The `pvar:` placeholder namespace used inside templates.
pub struct PVAR {
    pub self_: NamedNode,
    pub entity: NamedNode,
    pub source: NamedNode,
    pub destination: NamedNode,
    pub label: NamedNode,
    pub property_key: NamedNode,
    pub property_value: NamedNode,
    pub individual_value: NamedNode,
    pub meta_property_predicate: NamedNode,
    pub meta_property_object: NamedNode,
}

const PVAR_NS: &str = "http://bruy.at/prec-trans#";

impl PVAR {
    pub fn new() -> Self {
        let n = |local: &str| NamedNode::new_unchecked(format!("{}{}", PVAR_NS, local));
        PVAR {
            self_: n("self"),
            entity: n("entity"),
            source: n("source"),
            destination: n("destination"),
            label: n("label"),
            property_key: n("propertyKey"),
            property_value: n("propertyValue"),
            individual_value: n("individualValue"),
            meta_property_predicate: n("metaPropertyPredicate"),
            meta_property_object: n("metaPropertyObject"),
        }
    }

    /// All placeholder IRIs, used to recognize placeholder terms in templates.
    pub fn all(&self) -> [&NamedNode; 10] {
        [
            &self.self_,
            &self.entity,
            &self.source,
            &self.destination,
            &self.label,
            &self.property_key,
            &self.property_value,
            &self.individual_value,
            &self.meta_property_predicate,
            &self.meta_property_object,
        ]
    }
}

impl Default for PVAR {
    fn default() -> Self {
        Self::new()
    }
}

/// The property-graph ontology terms used by the generic encoding.
pub struct PGO {
    pub node: NamedNode,
    pub edge: NamedNode,
}

impl PGO {
    pub fn new() -> Self {
        PGO {
            node: NamedNode::new_unchecked("http://ii.uwb.edu.pl/pgo#Node"),
            edge: NamedNode::new_unchecked("http://ii.uwb.edu.pl/pgo#Edge"),
        }
    }
}

impl Default for PGO {
    fn default() -> Self {
        Self::new()
    }
}

/// The handful of `rdf:`, `rdfs:` and `xsd:` terms the engine needs.
pub struct RDF {
    pub type_: NamedNode,
    pub subject: NamedNode,
    pub predicate: NamedNode,
    pub object: NamedNode,
    pub value: NamedNode,
    pub first: NamedNode,
    pub rest: NamedNode,
    pub nil: NamedNode,
    pub rdfs_label: NamedNode,
    pub xsd_integer: NamedNode,
    pub xsd_boolean: NamedNode,
}

impl RDF {
    pub fn new() -> Self {
        let rdf = |local: &str| {
            NamedNode::new_unchecked(format!(
                "http://www.w3.org/1999/02/22-rdf-syntax-ns#{}",
                local
            ))
        };
        RDF {
            type_: rdf("type"),
            subject: rdf("subject"),
            predicate: rdf("predicate"),
            object: rdf("object"),
            value: rdf("value"),
            first: rdf("first"),
            rest: rdf("rest"),
            nil: rdf("nil"),
            rdfs_label: NamedNode::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label"),
            xsd_integer: NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"),
            xsd_boolean: NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean"),
        }
    }
}

impl Default for RDF {
    fn default() -> Self {
        Self::new()
    }
}

/// The full vocabulary, constructed once and passed by reference.
pub struct Vocab {
    pub prec: PREC,
    pub pvar: PVAR,
    pub pgo: PGO,
    pub rdf: RDF,
}

impl Vocab {
    pub fn new() -> Self {
        Vocab {
            prec: PREC::new(),
            pvar: PVAR::new(),
            pgo: PGO::new(),
            rdf: RDF::new(),
        }
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}
