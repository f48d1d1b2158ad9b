//! Host-implemented methods.
//!
//! The registry maps `(fully qualified method name, arity)` to a host
//! function. Natives run synchronously: they may allocate, read the heap and
//! push a result onto the current operand stack, but they never suspend.

mod lang;

pub use lang::LangNativeProvider;

use wollok_model::{fast_map_new, FastHashMap};

use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::heap::RuntimeObject;

/// A native receives the evaluation, the receiver, and the argument objects,
/// and mutates the evaluation in place.
pub type NativeFn =
    fn(&mut Evaluation, RuntimeObject, Vec<RuntimeObject>) -> Result<(), VmError>;

pub struct NativeRegistry {
    entries: FastHashMap<String, NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self { entries: fast_map_new() }
    }

    /// A registry with the `wollok.lang` natives installed.
    pub fn with_lang() -> Self {
        let mut registry = Self::new();
        LangNativeProvider.install(&mut registry);
        registry
    }

    pub fn register(&mut self, method: &str, arity: usize, function: NativeFn) {
        self.entries.insert(format!("{method}/{arity}"), function);
    }

    pub fn lookup(&self, method: &str, arity: usize) -> Option<NativeFn> {
        self.entries.get(&format!("{method}/{arity}")).copied()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub trait NativeProvider {
    fn install(&self, registry: &mut NativeRegistry);
}
