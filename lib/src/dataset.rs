//! An in-memory, multi-indexed quad collection with pattern matching.
//!
//! Patterns are ordinary quads whose terms may be variables, including
//! variables buried inside nested quads. `match_and_bind` performs a
//! conjunctive join over a pattern sequence; `find_filter_replace` layers the
//! existential condition check and the delete-then-insert rewrite on top of
//! it and is the primitive the whole marking engine is built from.

use crate::term::{Quad, Term};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A set of variable bindings plus the dataset quads that produced them.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    values: BTreeMap<String, Term>,
    /// The dataset quads matched so far; used for later deletion.
    pub matched: Vec<Quad>,
}

impl Binding {
    pub fn new() -> Binding {
        Binding::default()
    }

    /// The bound term for a variable name, if any. An unbound variable is an
    /// absent key, never a null-like placeholder.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.values.get(name)
    }

    pub fn bind(&mut self, name: &str, term: Term) {
        self.values.insert(name.to_string(), term);
    }

    /// Substitutes bound variables into a term, recursing into nested quads.
    /// Unbound variables are left as-is.
    pub fn substitute(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => match self.values.get(v.as_str()) {
                Some(bound) => bound.clone(),
                None => term.clone(),
            },
            Term::Quad(q) => Term::Quad(Box::new(self.substitute_quad(q))),
            _ => term.clone(),
        }
    }

    pub fn substitute_quad(&self, quad: &Quad) -> Quad {
        Quad {
            subject: self.substitute(&quad.subject),
            predicate: self.substitute(&quad.predicate),
            object: self.substitute(&quad.object),
            graph: self.substitute(&quad.graph),
        }
    }
}

/// Unifies a pattern term against a data term, extending `binding`.
/// Returns false when they cannot be made equal.
fn unify(pattern: &Term, data: &Term, binding: &mut Binding) -> bool {
    match pattern {
        Term::Variable(v) => match binding.get(v.as_str()) {
            Some(bound) => bound.clone() == *data,
            None => {
                binding.bind(v.as_str(), data.clone());
                true
            }
        },
        Term::Quad(pq) => match data {
            Term::Quad(dq) => unify_quad(pq, dq, binding),
            _ => false,
        },
        _ => pattern == data,
    }
}

fn unify_quad(pattern: &Quad, data: &Quad, binding: &mut Binding) -> bool {
    unify(&pattern.subject, &data.subject, binding)
        && unify(&pattern.predicate, &data.predicate, binding)
        && unify(&pattern.object, &data.object, binding)
        && unify(&pattern.graph, &data.graph, binding)
}

/// A mutable, unordered collection of unique quads.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    quads: HashSet<Quad>,
    by_subject: HashMap<Term, HashSet<Quad>>,
    by_predicate: HashMap<Term, HashSet<Quad>>,
    by_object: HashMap<Term, HashSet<Quad>>,
}

impl Dataset {
    pub fn new() -> Dataset {
        Dataset::default()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// Inserts a quad; duplicates are ignored. Returns true when inserted.
    pub fn add(&mut self, quad: Quad) -> bool {
        if !self.quads.insert(quad.clone()) {
            return false;
        }
        self.by_subject
            .entry(quad.subject.clone())
            .or_default()
            .insert(quad.clone());
        self.by_predicate
            .entry(quad.predicate.clone())
            .or_default()
            .insert(quad.clone());
        self.by_object
            .entry(quad.object.clone())
            .or_default()
            .insert(quad);
        true
    }

    /// Removes a quad. Returns true when it was present.
    pub fn delete(&mut self, quad: &Quad) -> bool {
        if !self.quads.remove(quad) {
            return false;
        }
        if let Some(set) = self.by_subject.get_mut(&quad.subject) {
            set.remove(quad);
        }
        if let Some(set) = self.by_predicate.get_mut(&quad.predicate) {
            set.remove(quad);
        }
        if let Some(set) = self.by_object.get_mut(&quad.object) {
            set.remove(quad);
        }
        true
    }

    pub fn remove_quads(&mut self, quads: &[Quad]) {
        for quad in quads {
            self.delete(quad);
        }
    }

    /// Quads matching the given concrete components; `None` is a wildcard.
    pub fn quads_matching(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&Term>,
    ) -> Vec<Quad> {
        // Start from the smallest available index, then filter.
        let candidates: Box<dyn Iterator<Item = &Quad>> = {
            let indexed: Option<&HashSet<Quad>> = [
                subject.and_then(|t| self.by_subject.get(t)),
                predicate.and_then(|t| self.by_predicate.get(t)),
                object.and_then(|t| self.by_object.get(t)),
            ]
            .into_iter()
            .flatten()
            .min_by_key(|set| set.len());

            match (indexed, subject.or(predicate).or(object)) {
                (Some(set), _) => Box::new(set.iter()),
                // A looked-up position with no index entry means no match.
                (None, Some(_)) => Box::new(std::iter::empty()),
                (None, None) => Box::new(self.quads.iter()),
            }
        };

        candidates
            .filter(|q| subject.is_none_or(|t| *t == q.subject))
            .filter(|q| predicate.is_none_or(|t| *t == q.predicate))
            .filter(|q| object.is_none_or(|t| *t == q.object))
            .filter(|q| graph.is_none_or(|t| *t == q.graph))
            .cloned()
            .collect()
    }

    /// Matches one pattern quad under an existing binding. Each result is the
    /// extended binding together with the dataset quad that satisfied it.
    pub fn match_pattern(&self, pattern: &Quad, binding: &Binding) -> Vec<(Binding, Quad)> {
        let pattern = binding.substitute_quad(pattern);

        let key = |t: &Term| -> Option<Term> {
            if t.is_ground() && *t != Term::DefaultGraph {
                Some(t.clone())
            } else {
                None
            }
        };
        let s = key(&pattern.subject);
        let p = key(&pattern.predicate);
        let o = key(&pattern.object);
        let g = if pattern.graph.is_ground() {
            Some(pattern.graph.clone())
        } else {
            None
        };

        self.quads_matching(s.as_ref(), p.as_ref(), o.as_ref(), g.as_ref())
            .into_iter()
            .filter_map(|candidate| {
                let mut extended = binding.clone();
                if unify_quad(&pattern, &candidate, &mut extended) {
                    Some((extended, candidate))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Conjunctive join over a pattern sequence, starting from a single empty
    /// binding. A pattern element yielding zero matches for a partial binding
    /// prunes that branch; it is not an error.
    pub fn match_and_bind(&self, patterns: &[Quad]) -> Vec<Binding> {
        self.match_and_bind_seeded(patterns, &Binding::new())
    }

    /// Same as [`Dataset::match_and_bind`] but starting from pre-existing
    /// bindings, used for evaluating condition blocks per source binding.
    pub fn match_and_bind_seeded(&self, patterns: &[Quad], seed: &Binding) -> Vec<Binding> {
        let mut results = vec![seed.clone()];
        for pattern in patterns {
            let mut next = Vec::new();
            for binding in &results {
                for (mut extended, quad) in self.match_pattern(pattern, binding) {
                    extended.matched.push(quad);
                    next.push(extended);
                }
            }
            results = next;
            if results.is_empty() {
                break;
            }
        }
        results
    }

    /// True when every condition block, seeded with `binding`, matches at
    /// least once somewhere in the dataset. Conditions are independent
    /// existential checks, not joined with each other.
    pub fn conditions_hold(&self, conditions: &[Vec<Quad>], binding: &Binding) -> bool {
        conditions.iter().all(|block| {
            let mut seed = binding.clone();
            seed.matched.clear();
            !self.match_and_bind_seeded(block, &seed).is_empty()
        })
    }

    /// For every binding of `source` whose condition blocks all hold, deletes
    /// the quads that matched `source` and inserts `destination` with the
    /// binding substituted. Deletion and insertion are performed per binding,
    /// in that order, so a destination may legitimately re-add quads the
    /// source consumed (idempotent marks).
    pub fn find_filter_replace(
        &mut self,
        source: &[Quad],
        conditions: &[Vec<Quad>],
        destination: &[Quad],
    ) {
        let bindings: Vec<Binding> = self
            .match_and_bind(source)
            .into_iter()
            .filter(|b| self.conditions_hold(conditions, b))
            .collect();

        for binding in bindings {
            self.remove_quads(&binding.matched);
            for pattern in destination {
                self.add(binding.substitute_quad(pattern));
            }
        }
    }
}

impl FromIterator<Quad> for Dataset {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        let mut ds = Dataset::new();
        for quad in iter {
            ds.add(quad);
        }
        ds
    }
}
