//! The RDF-star term and quad model.
//!
//! Quads may contain other quads as any of their four components, which is
//! what the rest of the engine relies on for RDF-star output and for marking
//! node-label occurrences. Leaf terms reuse the oxrdf value types so IRI
//! validation, literal escaping and N-Triples formatting come for free.

use oxrdf::{BlankNode, Literal, NamedNode, Variable};
use std::fmt;

/// An RDF term: IRI, blank node, literal, pattern variable, or a nested quad.
///
/// Terms are compared by structural equality only; a nested quad equals
/// another nested quad when all four components are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(NamedNode),
    Blank(BlankNode),
    Literal(Literal),
    Variable(Variable),
    Quad(Box<Quad>),
    /// The distinguished sentinel for the default graph position.
    DefaultGraph,
}

impl Term {
    /// Builds an IRI term, panicking on an invalid IRI. Test/vocabulary helper.
    pub fn iri(value: &str) -> Term {
        Term::Iri(NamedNode::new_unchecked(value))
    }

    /// Builds a pattern variable term.
    pub fn var(name: &str) -> Term {
        Term::Variable(Variable::new_unchecked(name))
    }

    /// Builds a simple string literal term.
    pub fn literal(value: &str) -> Term {
        Term::Literal(Literal::new_simple_literal(value))
    }

    /// Builds a fresh blank node term.
    pub fn fresh_blank() -> Term {
        Term::Blank(BlankNode::default())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            Term::Iri(n) => Some(n),
            _ => None,
        }
    }

    /// True if this term equals `searched` or contains it inside a nested
    /// quad, at any depth.
    pub fn contains(&self, searched: &Term) -> bool {
        if self == searched {
            return true;
        }
        match self {
            Term::Quad(q) => q.contains(searched),
            _ => false,
        }
    }

    /// True if the term references no variable at any nesting depth.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Quad(q) => {
                q.subject.is_ground()
                    && q.predicate.is_ground()
                    && q.object.is_ground()
                    && q.graph.is_ground()
            }
            _ => true,
        }
    }

    /// Replaces every subterm exactly equal to a `from` entry of the mapping
    /// with its `to` counterpart, recursing into nested quads. Non-matching
    /// subtrees are returned untouched.
    pub fn remap(&self, mapping: &[(Term, Term)]) -> Term {
        for (to, from) in mapping {
            if self == from {
                return to.clone();
            }
        }
        match self {
            Term::Quad(q) => match q.remap(mapping) {
                Some(changed) => Term::Quad(Box::new(changed)),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Applies `f` to every leaf term, recursing through nested quads first.
    /// Returns `None` when nothing changed, so callers can keep the original
    /// value without rebuilding.
    pub fn rebuild(&self, f: &dyn Fn(&Term) -> Option<Term>) -> Option<Term> {
        match self {
            Term::Quad(q) => q.rebuild(f).map(|changed| Term::Quad(Box::new(changed))),
            _ => f(self),
        }
    }
}

impl From<NamedNode> for Term {
    fn from(value: NamedNode) -> Self {
        Term::Iri(value)
    }
}

impl From<&NamedNode> for Term {
    fn from(value: &NamedNode) -> Self {
        Term::Iri(value.clone())
    }
}

impl From<BlankNode> for Term {
    fn from(value: BlankNode) -> Self {
        Term::Blank(value)
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

impl From<Quad> for Term {
    fn from(value: Quad) -> Self {
        Term::Quad(Box::new(value))
    }
}

impl From<oxrdf::Subject> for Term {
    fn from(value: oxrdf::Subject) -> Self {
        match value {
            oxrdf::Subject::NamedNode(n) => Term::Iri(n),
            oxrdf::Subject::BlankNode(b) => Term::Blank(b),
            oxrdf::Subject::Triple(t) => Term::Quad(Box::new(Quad::from(*t))),
        }
    }
}

impl From<oxrdf::Term> for Term {
    fn from(value: oxrdf::Term) -> Self {
        match value {
            oxrdf::Term::NamedNode(n) => Term::Iri(n),
            oxrdf::Term::BlankNode(b) => Term::Blank(b),
            oxrdf::Term::Literal(l) => Term::Literal(l),
            oxrdf::Term::Triple(t) => Term::Quad(Box::new(Quad::from(*t))),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(n) => write!(f, "{}", n),
            Term::Blank(b) => write!(f, "{}", b),
            Term::Literal(l) => write!(f, "{}", l),
            Term::Variable(v) => write!(f, "{}", v),
            Term::Quad(q) => write!(f, "<< {} {} {} >>", q.subject, q.predicate, q.object),
            Term::DefaultGraph => write!(f, "DEFAULT"),
        }
    }
}

/// A (subject, predicate, object, graph) tuple of terms. Immutable value; no
/// identity beyond structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Term,
}

impl Quad {
    /// Builds a quad in the default graph.
    pub fn new(subject: Term, predicate: Term, object: Term) -> Quad {
        Quad {
            subject,
            predicate,
            object,
            graph: Term::DefaultGraph,
        }
    }

    pub fn new_in_graph(subject: Term, predicate: Term, object: Term, graph: Term) -> Quad {
        Quad {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Component access by position index, in (s, p, o, g) order.
    pub fn components(&self) -> [&Term; 4] {
        [&self.subject, &self.predicate, &self.object, &self.graph]
    }

    /// True if any of the four components equals or contains `searched`.
    pub fn contains(&self, searched: &Term) -> bool {
        self.components().iter().any(|t| t.contains(searched))
    }

    pub fn is_ground(&self) -> bool {
        self.components().iter().all(|t| t.is_ground())
    }

    /// Remaps all components; `None` means the quad is unchanged.
    pub fn remap(&self, mapping: &[(Term, Term)]) -> Option<Quad> {
        let subject = self.subject.remap(mapping);
        let predicate = self.predicate.remap(mapping);
        let object = self.object.remap(mapping);
        let graph = self.graph.remap(mapping);
        if subject == self.subject
            && predicate == self.predicate
            && object == self.object
            && graph == self.graph
        {
            None
        } else {
            Some(Quad {
                subject,
                predicate,
                object,
                graph,
            })
        }
    }

    /// Convenience wrapper over [`Quad::remap`] that returns the quad itself
    /// when unchanged.
    pub fn remapped(&self, mapping: &[(Term, Term)]) -> Quad {
        self.remap(mapping).unwrap_or_else(|| self.clone())
    }

    /// Applies `f` to every leaf term of the quad, recursing through nested
    /// quads first. Returns `None` when no component changed; skipping the
    /// rebuild in that case is an invariant other code relies on, not just an
    /// allocation saving.
    pub fn rebuild(&self, f: &dyn Fn(&Term) -> Option<Term>) -> Option<Quad> {
        let subject = self.subject.rebuild(f);
        let predicate = self.predicate.rebuild(f);
        let object = self.object.rebuild(f);
        let graph = self.graph.rebuild(f);
        if subject.is_none() && predicate.is_none() && object.is_none() && graph.is_none() {
            return None;
        }
        Some(Quad {
            subject: subject.unwrap_or_else(|| self.subject.clone()),
            predicate: predicate.unwrap_or_else(|| self.predicate.clone()),
            object: object.unwrap_or_else(|| self.object.clone()),
            graph: graph.unwrap_or_else(|| self.graph.clone()),
        })
    }
}

impl From<oxrdf::Triple> for Quad {
    fn from(value: oxrdf::Triple) -> Self {
        Quad::new(
            Term::from(value.subject),
            Term::Iri(value.predicate),
            Term::from(value.object),
        )
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Term::DefaultGraph => {
                write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
            }
            g => write!(
                f,
                "{} {} {} {} .",
                self.subject, self.predicate, self.object, g
            ),
        }
    }
}
