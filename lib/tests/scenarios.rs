//! End-to-end conversion scenarios: a context document and a generic
//! property-graph dump in, a converted RDF-star dataset out.

use prec::isomorphism::are_isomorphic;
use prec::parser::write_ntriples;
use prec::{Converter, Dataset, PrecError, Quad, Term};

const CONTEXT_PREFIXES: &str = r#"
    @prefix prec: <http://bruy.at/prec#> .
    @prefix pvar: <http://bruy.at/prec-trans#> .
    @prefix rdf:  <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    @prefix ex:   <http://ex.org/> .
"#;

const GRAPH_PREFIXES: &str = r#"
    @prefix prec: <http://bruy.at/prec#> .
    @prefix pgo:  <http://ii.uwb.edu.pl/pgo#> .
    @prefix rdf:  <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
    @prefix ex:   <http://ex.org/> .
"#;

fn convert(context: &str, graph: &str) -> Dataset {
    Converter::from_strings(
        &format!("{}{}", CONTEXT_PREFIXES, context),
        &format!("{}{}", GRAPH_PREFIXES, graph),
    )
    .expect("sources should load")
    .convert()
    .expect("conversion should succeed")
}

fn iri(local: &str) -> Term {
    Term::iri(&format!("http://ex.org/{}", local))
}

fn rdf(local: &str) -> Term {
    Term::iri(&format!(
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#{}",
        local
    ))
}

/// One node with one property; the rule renames the key and flattens the
/// property node away.
const ALICE: &str = r#"
    ex:kname a prec:PropertyKey, prec:CreatedPropertyKey ; rdfs:label "name" .
    ex:alice a pgo:Node ; ex:kname _:pv .
    _:pv a prec:PropertyKeyValue ; rdf:value "Alice" .
"#;

#[test]
fn property_rename_with_direct_value() {
    let out = convert(
        r#"
        ex:name a prec:PropertyRule ;
            prec:propertyName "name" ;
            prec:templatedBy prec:DirectValue .
        "#,
        ALICE,
    );

    assert!(out.contains(&Quad::new(iri("alice"), iri("name"), Term::literal("Alice"))));
    // The generic key node is no longer referenced and its scaffolding is gone.
    assert!(!out.iter().any(|q| q.contains(&iri("kname"))));
    // No property node survives DirectValue.
    let blanks = out.iter().filter(|q| q.object.is_blank()).count();
    assert_eq!(blanks, 0);
}

const KNOWS_EDGE: &str = r#"
    ex:lknows a prec:CreatedEdgeLabel ; rdfs:label "KNOWS" .
    ex:a a pgo:Node . ex:b a pgo:Node .
    ex:e1 a pgo:Edge ;
        rdf:subject ex:a ;
        rdf:predicate ex:lknows ;
        rdf:object ex:b .
"#;

#[test]
fn rdf_star_unique_collapses_the_edge_to_one_quad() {
    let out = convert("prec:Edges prec:templatedBy prec:RdfStarUnique .", KNOWS_EDGE);

    assert!(out.contains(&Quad::new(iri("a"), iri("lknows"), iri("b"))));
    // The reified edge node disappears entirely.
    assert!(!out.iter().any(|q| q.contains(&iri("e1"))));
    // The label node is still the output predicate, so its label survives.
    assert!(out.contains(&Quad::new(
        iri("lknows"),
        Term::iri("http://www.w3.org/2000/01/rdf-schema#label"),
        Term::literal("KNOWS"),
    )));
}

#[test]
fn edge_properties_attach_to_the_resolved_identity() {
    let graph = format!(
        "{}{}",
        KNOWS_EDGE,
        r#"
        ex:ksince a prec:PropertyKey ; rdfs:label "since" .
        ex:e1 ex:ksince _:pv .
        _:pv a prec:PropertyKeyValue ; rdf:value "2020" .
        "#
    );
    let out = convert(
        r#"
        prec:Edges prec:templatedBy prec:RdfStarUnique .
        ex:since a prec:PropertyRule ;
            prec:propertyName "since" ;
            prec:templatedBy prec:DirectValue .
        "#,
        &graph,
    );

    let statement = Term::from(Quad::new(iri("a"), iri("lknows"), iri("b")));
    assert!(out.contains(&Quad::new(iri("a"), iri("lknows"), iri("b"))));
    assert!(out.contains(&Quad::new(statement, iri("since"), Term::literal("2020"))));
}

#[test]
fn explicit_priority_outranks_specificity() {
    let graph = format!(
        "{}{}",
        KNOWS_EDGE,
        r#"
        ex:lperson a prec:CreatedNodeLabel ; rdfs:label "Person" .
        ex:a a ex:lperson .
        "#
    );
    let out = convert(
        r#"
        ex:r1 a prec:EdgeRule ;
            prec:edgeLabel "KNOWS" ;
            prec:sourceLabel "Person" ;
            prec:templatedBy prec:RdfStarUnique .
        ex:r2 a prec:EdgeRule ;
            prec:edgeLabel "KNOWS" ;
            prec:priority 1 ;
            prec:templatedBy prec:DirectTriples .
        "#,
        &graph,
    );

    // r2 carries an explicit priority, so it claims the edge first even
    // though r1 is more specific. The rule IRI becomes the predicate.
    assert!(out.contains(&Quad::new(iri("a"), iri("r2"), iri("b"))));
    assert!(!out.iter().any(|q| q.contains(&iri("r1"))));
}

#[test]
fn more_specific_rule_wins_without_explicit_priorities() {
    let graph = format!(
        "{}{}",
        KNOWS_EDGE,
        r#"
        ex:lperson a prec:CreatedNodeLabel ; rdfs:label "Person" .
        ex:a a ex:lperson .
        "#
    );
    let out = convert(
        r#"
        ex:r1 a prec:EdgeRule ;
            prec:edgeLabel "KNOWS" ;
            prec:sourceLabel "Person" ;
            prec:templatedBy prec:RdfStarUnique .
        ex:r3 a prec:EdgeRule ;
            prec:edgeLabel "KNOWS" ;
            prec:templatedBy prec:DirectTriples .
        "#,
        &graph,
    );

    assert!(out.contains(&Quad::new(iri("a"), iri("r1"), iri("b"))));
    assert!(!out.iter().any(|q| q.contains(&iri("r3"))));
}

const COLORS: &str = r#"
    ex:kcolors a prec:PropertyKey ; rdfs:label "colors" .
    ex:alice a pgo:Node ; ex:kcolors _:pv .
    _:pv a prec:PropertyKeyValue ; rdf:value ("red" "green" "blue") .
"#;

#[test]
fn list_values_expand_one_triple_per_individual_value() {
    let out = convert(
        r#"
        ex:color a prec:PropertyRule ;
            prec:propertyName "colors" ;
            prec:templatedBy prec:DirectValue .
        "#,
        COLORS,
    );

    for value in ["red", "green", "blue"] {
        assert!(out.contains(&Quad::new(iri("alice"), iri("color"), Term::literal(value))));
    }
    // The individual-value template consumed the list chain.
    assert!(out.quads_matching(None, Some(&rdf("first")), None, None).is_empty());
    assert!(out.quads_matching(None, Some(&rdf("rest")), None, None).is_empty());
}

#[test]
fn whole_value_template_preserves_the_list_chain() {
    let out = convert("", COLORS);

    // The default property template keeps rdf:value pointing at the intact
    // three-cell list.
    let firsts = out.quads_matching(None, Some(&rdf("first")), None, None);
    let rests = out.quads_matching(None, Some(&rdf("rest")), None, None);
    assert_eq!(firsts.len(), 3);
    assert_eq!(rests.len(), 3);

    let values: Vec<_> = firsts.iter().map(|q| q.object.clone()).collect();
    for value in ["red", "green", "blue"] {
        assert!(values.contains(&Term::literal(value)));
    }
}

#[test]
fn meta_properties_pair_with_every_meta_bucket_quad() {
    let graph = r#"
        ex:kname a prec:PropertyKey ; rdfs:label "name" .
        ex:ksrc a prec:PropertyKey ; rdfs:label "source" .
        ex:kconf a prec:PropertyKey ; rdfs:label "confidence" .
        ex:alice a pgo:Node ; ex:kname _:pv .
        _:pv a prec:PropertyKeyValue ; rdf:value "Alice" ;
            prec:hasMetaProperties _:mp .
        _:mp ex:ksrc _:m1 ; ex:kconf _:m2 .
        _:m1 a prec:PropertyKeyValue ; rdf:value "wiki" .
        _:m2 a prec:PropertyKeyValue ; rdf:value "0.9" .
    "#;
    let out = convert(
        r#"
        ex:MetaTpl prec:composedOf
            << pvar:entity pvar:propertyKey pvar:self >> ,
            << pvar:self rdf:value pvar:propertyValue >> ,
            << pvar:self pvar:metaPropertyPredicate pvar:metaPropertyObject >> ,
            << << pvar:self pvar:metaPropertyPredicate pvar:metaPropertyObject >>
               ex:annotated "yes" >> .
        ex:name a prec:PropertyRule ;
            prec:propertyName "name" ;
            prec:templatedBy ex:MetaTpl .
        "#,
        graph,
    );

    // Two meta-using template quads x two meta-properties = four quads.
    let results = out.match_and_bind(&[
        Quad::new(iri("alice"), iri("name"), Term::var("p")),
        Quad::new(Term::var("p"), rdf("value"), Term::literal("Alice")),
        Quad::new(Term::var("p"), iri("ksrc"), Term::var("m1")),
        Quad::new(Term::var("m1"), rdf("value"), Term::literal("wiki")),
        Quad::new(
            Term::from(Quad::new(Term::var("p"), iri("ksrc"), Term::var("m1"))),
            iri("annotated"),
            Term::literal("yes"),
        ),
        Quad::new(Term::var("p"), iri("kconf"), Term::var("m2")),
        Quad::new(Term::var("m2"), rdf("value"), Term::literal("0.9")),
        Quad::new(
            Term::from(Quad::new(Term::var("p"), iri("kconf"), Term::var("m2"))),
            iri("annotated"),
            Term::literal("yes"),
        ),
    ]);
    assert_eq!(results.len(), 1);
    // The container link is consumed.
    assert!(out
        .quads_matching(
            None,
            Some(&Term::iri("http://bruy.at/prec#hasMetaProperties")),
            None,
            None
        )
        .is_empty());
}

#[test]
fn list_values_and_meta_properties_expand_as_a_cartesian_product() {
    let graph = r#"
        ex:kcolors a prec:PropertyKey ; rdfs:label "colors" .
        ex:ksrc a prec:PropertyKey ; rdfs:label "source" .
        ex:kconf a prec:PropertyKey ; rdfs:label "confidence" .
        ex:alice a pgo:Node ; ex:kcolors _:pv .
        _:pv a prec:PropertyKeyValue ; rdf:value ("red" "green") ;
            prec:hasMetaProperties _:mp .
        _:mp ex:ksrc _:m1 ; ex:kconf _:m2 .
        _:m1 a prec:PropertyKeyValue ; rdf:value "wiki" .
        _:m2 a prec:PropertyKeyValue ; rdf:value "0.9" .
    "#;
    let out = convert(
        r#"
        ex:AnnotatedTpl prec:composedOf
            << pvar:entity ex:has pvar:individualValue >> ,
            << << pvar:entity ex:has pvar:individualValue >>
               pvar:metaPropertyPredicate pvar:metaPropertyObject >> .
        ex:color a prec:PropertyRule ;
            prec:propertyName "colors" ;
            prec:templatedBy ex:AnnotatedTpl .
        "#,
        graph,
    );

    for value in ["red", "green"] {
        assert!(out.contains(&Quad::new(iri("alice"), iri("has"), Term::literal(value))));
    }
    // Two individual values x two meta-properties = four annotation quads.
    let annotations = out.match_and_bind(&[Quad::new(
        Term::from(Quad::new(iri("alice"), iri("has"), Term::var("v"))),
        Term::var("mp"),
        Term::var("mo"),
    )]);
    assert_eq!(annotations.len(), 4);
    for value in ["red", "green"] {
        for meta_key in ["ksrc", "kconf"] {
            assert!(annotations.iter().any(|b| {
                b.get("v") == Some(&Term::literal(value)) && b.get("mp") == Some(&iri(meta_key))
            }));
        }
    }
    // The meta-property nodes keep their own values.
    assert_eq!(
        out.quads_matching(None, Some(&rdf("value")), Some(&Term::literal("wiki")), None)
            .len(),
        1
    );
    // The list chain was consumed along with the property node.
    assert!(out.quads_matching(None, Some(&rdf("first")), None, None).is_empty());
}

#[test]
fn property_shortcut_renames_the_key_end_to_end() {
    let out = convert(r#"ex:name prec:IRIOfProperty "name" ."#, ALICE);

    // The renamed predicate points at a value node carrying rdf:value.
    let results = out.match_and_bind(&[
        Quad::new(iri("alice"), iri("name"), Term::var("p")),
        Quad::new(Term::var("p"), rdf("value"), Term::literal("Alice")),
    ]);
    assert_eq!(results.len(), 1);
    // The generic key node is orphaned and scrubbed.
    assert!(!out.iter().any(|q| q.contains(&iri("kname"))));
}

#[test]
fn empty_context_application_is_idempotent() {
    let graph = format!(
        "{}{}{}",
        KNOWS_EDGE,
        ALICE,
        r#"
        ex:lperson a prec:CreatedNodeLabel ; rdfs:label "Person" .
        ex:a a ex:lperson .
        "#
    );
    let once = convert("", &graph);
    let twice = convert("", &write_ntriples(&once));
    assert!(are_isomorphic(&once, &twice));
}

#[test]
fn conversion_is_deterministic() {
    let graph = format!("{}{}", KNOWS_EDGE, COLORS);
    let context = r#"
        ex:r1 a prec:EdgeRule ;
            prec:edgeLabel "KNOWS" ;
            prec:templatedBy prec:RdfStarUnique .
    "#;
    // One converter, so the anonymous list cells keep the same blank ids and
    // the two runs must serialize byte-for-byte identically.
    let converter = Converter::from_strings(
        &format!("{}{}", CONTEXT_PREFIXES, context),
        &format!("{}{}", GRAPH_PREFIXES, graph),
    )
    .expect("sources should load");
    let first = write_ntriples(&converter.convert().expect("conversion should succeed"));
    let second = write_ntriples(&converter.convert().expect("conversion should succeed"));
    assert_eq!(first, second);

    // Across independent parses only blank labels may differ.
    assert!(are_isomorphic(&convert(context, &graph), &convert(context, &graph)));
}

#[test]
fn ambiguous_contexts_are_rejected_up_front() {
    let result = Converter::from_strings(
        &format!(
            "{}{}",
            CONTEXT_PREFIXES,
            r#"
            ex:a a prec:EdgeRule ; prec:edgeLabel "KNOWS" .
            ex:b a prec:EdgeRule ; prec:edgeLabel "KNOWS" .
            "#
        ),
        GRAPH_PREFIXES,
    );
    assert!(matches!(result, Err(PrecError::MalformedContext(_))));
}

#[test]
fn property_node_without_value_is_a_graph_error() {
    let graph = r#"
        ex:kname a prec:PropertyKey ; rdfs:label "name" .
        ex:alice a pgo:Node ; ex:kname _:pv .
        _:pv a prec:PropertyKeyValue .
    "#;
    let converter = Converter::from_strings(
        CONTEXT_PREFIXES,
        &format!("{}{}", GRAPH_PREFIXES, graph),
    )
    .expect("sources should load");
    assert!(matches!(
        converter.convert(),
        Err(PrecError::MalformedGraph(_))
    ));
}

#[test]
fn property_node_with_two_values_is_a_graph_error() {
    let graph = r#"
        ex:kname a prec:PropertyKey ; rdfs:label "name" .
        ex:alice a pgo:Node ; ex:kname _:pv .
        _:pv a prec:PropertyKeyValue ; rdf:value "Alice", "Bob" .
    "#;
    let converter = Converter::from_strings(
        CONTEXT_PREFIXES,
        &format!("{}{}", GRAPH_PREFIXES, graph),
    )
    .expect("sources should load");
    assert!(matches!(
        converter.convert(),
        Err(PrecError::MalformedGraph(_))
    ));
}

#[test]
fn node_labels_type_nodes_by_default() {
    let graph = r#"
        ex:lperson a prec:CreatedNodeLabel ; rdfs:label "Person" .
        ex:a a pgo:Node, ex:lperson .
    "#;
    let out = convert("", graph);
    assert!(out.contains(&Quad::new(iri("a"), rdf("type"), iri("lperson"))));
}

#[test]
fn node_label_rule_renames_the_label() {
    let graph = r#"
        ex:lperson a prec:CreatedNodeLabel ; rdfs:label "Person" .
        ex:a a pgo:Node, ex:lperson .
    "#;
    let out = convert(
        r#"
        ex:Person a prec:NodeLabelRule ;
            prec:nodeLabel "Person" .
        "#,
        graph,
    );
    assert!(out.contains(&Quad::new(iri("a"), rdf("type"), iri("Person"))));
    assert!(!out.contains(&Quad::new(iri("a"), rdf("type"), iri("lperson"))));
    // The old label node is orphaned and scrubbed.
    assert!(!out.iter().any(|q| q.contains(&iri("lperson"))));
}
