//! The object heap.
//!
//! Every runtime value is a [`RuntimeObject`] addressed by [`Id`]. Four ids
//! are reserved and always present; global singletons are seeded by the
//! driver under ids equal to their definition nodes, so compiled bootstrap
//! code can `PUSH` them without a preceding `INSTANTIATE`.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use wollok_model::lang::{BOOLEAN_MODULE, NUMBER_MODULE, OBJECT_MODULE};
use wollok_model::{fast_map_new, FastHashMap, NodeId};

use crate::error::VmError;

/// Heap address. `Copy` on purpose: locals, operands and fields all hold ids,
/// never objects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Id {
    Null,
    Void,
    True,
    False,
    /// Bootstrap-seeded global singleton; equals its definition node id.
    Singleton(NodeId),
    /// Runtime allocation from the heap's counter.
    Cell(u64),
}

impl Id {
    pub fn from_bool(value: bool) -> Id {
        if value {
            Id::True
        } else {
            Id::False
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Id::True | Id::False)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Null => write!(f, "null"),
            Id::Void => write!(f, "void"),
            Id::True => write!(f, "true"),
            Id::False => write!(f, "false"),
            Id::Singleton(node) => write!(f, "singleton({node})"),
            Id::Cell(n) => write!(f, "#{n}"),
        }
    }
}

/// Host-side payload for primitive wrappers.
#[derive(Clone, Debug, PartialEq)]
pub enum InnerValue {
    /// Sentinel payload of the `null` object.
    Null,
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    List(Vec<Id>),
}

#[derive(Clone, Debug)]
pub struct RuntimeObject {
    pub id: Id,
    /// Fully qualified name of the runtime class.
    pub module: Rc<str>,
    pub fields: IndexMap<Rc<str>, Id, ahash::RandomState>,
    pub inner: Option<InnerValue>,
}

impl RuntimeObject {
    fn new(id: Id, module: &str, inner: Option<InnerValue>) -> Self {
        Self {
            id,
            module: Rc::from(module),
            fields: IndexMap::with_hasher(ahash::RandomState::new()),
            inner,
        }
    }

    pub fn field(&self, name: &str) -> Option<Id> {
        self.fields.get(name).copied()
    }

    pub fn number(&self) -> Option<f64> {
        match self.inner {
            Some(InnerValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&Rc<str>> {
        match &self.inner {
            Some(InnerValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self.inner {
            Some(InnerValue::Boolean(b)) => Some(b),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[Id]> {
        match &self.inner {
            Some(InnerValue::List(items)) => Some(items),
            _ => None,
        }
    }
}

/// Numbers carry at most four decimal places, fixed at allocation time.
/// `f64::round` is half-away-from-zero, which is the rounding this core
/// commits to.
pub fn round_decimals(n: f64) -> f64 {
    (n * 10_000.0).round() / 10_000.0
}

pub struct Heap {
    instances: FastHashMap<Id, RuntimeObject>,
    next_cell: u64,
}

impl Heap {
    /// An empty heap with the four reserved objects in place.
    pub fn with_reserved() -> Self {
        let mut heap = Self { instances: fast_map_new(), next_cell: 0 };
        heap.seed(Id::Null, OBJECT_MODULE, Some(InnerValue::Null));
        heap.seed(Id::Void, OBJECT_MODULE, None);
        heap.seed(Id::True, BOOLEAN_MODULE, Some(InnerValue::Boolean(true)));
        heap.seed(Id::False, BOOLEAN_MODULE, Some(InnerValue::Boolean(false)));
        heap
    }

    /// Install an object under a caller-chosen id (reserved ids, bootstrap
    /// singletons).
    pub fn seed(&mut self, id: Id, module: &str, inner: Option<InnerValue>) {
        self.instances.insert(id, RuntimeObject::new(id, module, inner));
    }

    /// Allocate a fresh object and return its id.
    pub fn allocate(&mut self, module: &str, inner: Option<InnerValue>) -> Id {
        let inner = match inner {
            Some(InnerValue::Number(n)) if module == NUMBER_MODULE => {
                Some(InnerValue::Number(round_decimals(n)))
            }
            other => other,
        };
        let id = Id::Cell(self.next_cell);
        self.next_cell += 1;
        self.instances.insert(id, RuntimeObject::new(id, module, inner));
        id
    }

    pub fn get(&self, id: Id) -> Result<&RuntimeObject, VmError> {
        self.instances.get(&id).ok_or(VmError::UndefinedInstance(id))
    }

    pub fn get_mut(&mut self, id: Id) -> Result<&mut RuntimeObject, VmError> {
        self.instances.get_mut(&id).ok_or(VmError::UndefinedInstance(id))
    }

    pub fn contains(&self, id: Id) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.instances.keys().copied()
    }

    /// Duplicate every instance. Field maps and inner payloads are copied;
    /// the ids themselves are stable across the clone.
    pub fn deep_clone(&self) -> Heap {
        Heap { instances: self.instances.clone(), next_cell: self.next_cell }
    }
}
