//! Caller-supplied identifier values

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use super::value::Value;

/// A source of identifier values consulted during evaluation.
///
/// Only names from an expression's identifier set are ever looked up, so
/// any other entries are ignored.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<K, V, S> Bindings for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: Clone + Into<Value>,
    S: BuildHasher,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<K, V> Bindings for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Clone + Into<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<K, V> Bindings for [(K, V)]
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.iter()
            .find(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| value.clone().into())
    }
}

impl<K, V, const N: usize> Bindings for [(K, V); N]
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.as_slice().lookup(name)
    }
}

/// No bindings at all, for expressions without identifiers
impl Bindings for () {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<B: Bindings + ?Sized> Bindings for &B {
    fn lookup(&self, name: &str) -> Option<Value> {
        (**self).lookup(name)
    }
}
