//! Linked AST model and environment queries for the Wollok execution core.

pub mod builder;
pub mod environment;
pub mod lang;
pub mod node;

pub use builder::{EnvironmentBuilder, LinkError};
pub use environment::Environment;
pub use node::{
    BaseCall, Body, Catch, ClassDef, ConstructorDef, FieldDef, Literal, MethodDef, Node, NodeId,
    NodeKind, Package, Param, Reference, RefTarget, SingletonDef, TestDef, VariableDef,
};

use ahash::RandomState;

pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, RandomState>;

pub fn fast_map_new<K, V>() -> FastHashMap<K, V> {
    FastHashMap::with_hasher(RandomState::new())
}
