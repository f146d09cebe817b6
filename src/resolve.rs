//! Type descriptor resolver: declared shape → what the walkers should do.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::config::TYPE_KEY;
use crate::ir::{RecordType, Shape};
use crate::registry::Registry;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Scalar,
    Optional,
    NestedRecord,
    Sequence,
    Set,
    Mapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    List,
    Tuple,
}

impl SeqKind {
    pub(crate) fn wrap(self, items: Vec<Value>) -> Value {
        match self {
            SeqKind::List => Value::List(items),
            SeqKind::Tuple => Value::Tuple(items),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RecordTarget<'a> {
    Named(&'a Arc<RecordType>),
    /// Resolved per value, from the `__type__` tag.
    Tagged,
}

#[derive(Debug, Clone, Copy)]
pub enum Descriptor<'a> {
    Scalar,
    Optional(&'a Shape),
    NestedRecord(RecordTarget<'a>),
    Sequence(SeqKind, &'a Shape),
    Set(&'a Shape),
    Mapping(&'a Shape, &'a Shape),
}

impl Descriptor<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            Descriptor::Scalar => Kind::Scalar,
            Descriptor::Optional(_) => Kind::Optional,
            Descriptor::NestedRecord(_) => Kind::NestedRecord,
            Descriptor::Sequence(..) => Kind::Sequence,
            Descriptor::Set(_) => Kind::Set,
            Descriptor::Mapping(..) => Kind::Mapping,
        }
    }

    /// Element type arguments: one for optionals and collections, key and
    /// value for mappings.
    pub fn args(&self) -> Vec<&Shape> {
        match *self {
            Descriptor::Scalar | Descriptor::NestedRecord(_) => Vec::new(),
            Descriptor::Optional(x) | Descriptor::Sequence(_, x) | Descriptor::Set(x) => vec![x],
            Descriptor::Mapping(k, v) => vec![k, v],
        }
    }
}

impl Registry {
    /// Classify a declared shape.
    ///
    /// `X | null` unions come back as `Optional(X)`; the caller classifies `X`
    /// again. Record names the registry does not know, other unions and bare
    /// `null` all degrade to `Scalar` and are copied through untouched.
    pub fn classify<'a>(&'a self, shape: &'a Shape) -> Descriptor<'a> {
        match shape {
            Shape::Scalar(_) | Shape::Null => Descriptor::Scalar,
            Shape::Optional(inner) => Descriptor::Optional(&**inner),
            Shape::Record(name) => match self.get(name) {
                Some(ty) => Descriptor::NestedRecord(RecordTarget::Named(ty)),
                None => {
                    tracing::trace!(record = %name, "unregistered record reference, treating as scalar");
                    Descriptor::Scalar
                }
            },
            Shape::AnyRecord => Descriptor::NestedRecord(RecordTarget::Tagged),
            Shape::List(item) => Descriptor::Sequence(SeqKind::List, &**item),
            Shape::Tuple(item) => Descriptor::Sequence(SeqKind::Tuple, &**item),
            Shape::Set(item) => Descriptor::Set(&**item),
            Shape::Map(k, v) => Descriptor::Mapping(&**k, &**v),
            Shape::Union(arms) => self.classify_union(arms),
        }
    }

    // X ∪ null → Optional(X); a lone X → X; anything wider stays opaque
    fn classify_union<'a>(&'a self, arms: &'a [Shape]) -> Descriptor<'a> {
        let had_null = arms.iter().any(|a| matches!(a, Shape::Null));
        let mut rest = arms.iter().filter(|a| !matches!(a, Shape::Null));
        match (rest.next(), rest.next()) {
            (Some(only), None) if had_null => Descriptor::Optional(only),
            (Some(only), None) => self.classify(only),
            _ => Descriptor::Scalar,
        }
    }

    /// Record type named by a mapping's `__type__` tag, if registered.
    pub fn resolve_tagged(&self, data: &Json) -> Option<&Arc<RecordType>> {
        data.get(TYPE_KEY).and_then(Json::as_str).and_then(|name| self.get(name))
    }
}
