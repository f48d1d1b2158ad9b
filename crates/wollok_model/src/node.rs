//! Linked AST data model.
//!
//! Nodes live in the [`Environment`](crate::Environment) arena and point at
//! each other through [`NodeId`]s. References carry their link target, so by
//! the time an environment reaches the execution core every name has already
//! been resolved.

use std::fmt;

/// Index of a node inside an environment arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Package(Package),
    Class(Box<ClassDef>),
    Singleton(Box<SingletonDef>),
    Field(FieldDef),
    Method(Box<MethodDef>),
    Constructor(Box<ConstructorDef>),
    Test(TestDef),
    Body(Body),

    // Sentences
    Variable(VariableDef),
    Return(Option<NodeId>),
    Assignment { target: NodeId, value: NodeId },

    // Expressions
    SelfExpr,
    Reference(Reference),
    Literal(Literal),
    New { class: NodeId, args: Vec<NodeId> },
    Send { receiver: NodeId, message: String, args: Vec<NodeId> },
    Super { args: Vec<NodeId> },
    If { condition: NodeId, then_body: NodeId, else_body: NodeId },
    Throw { exception: NodeId },
    Try { body: NodeId, catches: Vec<Catch>, always: Option<NodeId> },
}

impl NodeKind {
    /// Name of the node when it has one, used to build fully qualified names.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Package(p) => Some(&p.name),
            NodeKind::Class(c) => Some(&c.name),
            NodeKind::Singleton(s) => Some(&s.name),
            NodeKind::Field(f) => Some(&f.name),
            NodeKind::Method(m) => Some(&m.name),
            NodeKind::Test(t) => Some(&t.name),
            _ => None,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self, NodeKind::Class(_) | NodeKind::Singleton(_))
    }
}

#[derive(Clone, Debug)]
pub struct Package {
    pub name: String,
    pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: String,
    /// Reference node linked to the superclass. `None` only for the root
    /// class (`wollok.lang.Object`).
    pub superclass: Option<NodeId>,
    pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct SingletonDef {
    /// Anonymous (literal) singletons get a synthetic name at link time.
    pub name: String,
    /// Reference node linked to the superclass.
    pub superclass: NodeId,
    pub supercall_args: Vec<NodeId>,
    pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub value: NodeId,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub vararg: bool,
}

impl Param {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), vararg: false }
    }

    pub fn vararg(name: &str) -> Self {
        Self { name: name.to_string(), vararg: true }
    }
}

#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: String,
    pub parameters: Vec<Param>,
    pub body: Option<NodeId>,
    pub native: bool,
}

impl MethodDef {
    /// Whether the last parameter absorbs remaining actuals into a list.
    pub fn has_varargs(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.vararg)
    }

    /// Arity matching: exact for fixed-arity, `>= n - 1` for varargs.
    pub fn matches_arity(&self, arity: usize) -> bool {
        if self.has_varargs() {
            arity >= self.parameters.len() - 1
        } else {
            arity == self.parameters.len()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConstructorDef {
    pub parameters: Vec<Param>,
    pub base_call: BaseCall,
    pub body: NodeId,
}

impl ConstructorDef {
    pub fn has_varargs(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.vararg)
    }

    pub fn matches_arity(&self, arity: usize) -> bool {
        if self.has_varargs() {
            arity >= self.parameters.len() - 1
        } else {
            arity == self.parameters.len()
        }
    }
}

/// How a constructor chains into the hierarchy: `super(...)` or delegation
/// to another constructor of the same class.
#[derive(Clone, Debug)]
pub struct BaseCall {
    pub calls_super: bool,
    pub args: Vec<NodeId>,
}

impl BaseCall {
    /// The implicit `super()` chain every constructor gets unless it says
    /// otherwise.
    pub fn implicit() -> Self {
        Self { calls_super: true, args: Vec::new() }
    }

    pub fn to_super(args: Vec<NodeId>) -> Self {
        Self { calls_super: true, args }
    }

    pub fn delegate(args: Vec<NodeId>) -> Self {
        Self { calls_super: false, args }
    }
}

#[derive(Clone, Debug)]
pub struct TestDef {
    pub name: String,
    pub body: NodeId,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub sentences: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct VariableDef {
    pub name: String,
    pub value: NodeId,
}

#[derive(Clone, Debug)]
pub struct Reference {
    pub name: String,
    pub target: RefTarget,
}

/// Link target of a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefTarget {
    /// Parameter or local variable, looked up by name at runtime.
    Local,
    Field(NodeId),
    Module(NodeId),
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Inline object literal; the node is a [`SingletonDef`].
    Singleton(NodeId),
    /// Literal lowered to instantiate-and-init of a library class
    /// (closures, collection literals).
    Construct { class: String, args: Vec<NodeId> },
}

#[derive(Clone, Debug)]
pub struct Catch {
    pub parameter: String,
    /// Reference node linked to the guard class.
    pub parameter_type: NodeId,
    pub body: NodeId,
}
