//! The linked program and its query surface.
//!
//! An [`Environment`] is immutable once linked; the execution core shares it
//! across evaluations and asks it about hierarchy, dispatch targets and node
//! topology.

use crate::node::{Node, NodeId, NodeKind, RefTarget};
use crate::FastHashMap;

pub struct Environment {
    nodes: Vec<Node>,
    root_packages: Vec<NodeId>,
    /// Modules (classes and singletons) by fully qualified name.
    modules: FastHashMap<String, NodeId>,
}

impl Environment {
    pub(crate) fn new(
        nodes: Vec<Node>,
        root_packages: Vec<NodeId>,
        modules: FastHashMap<String, NodeId>,
    ) -> Self {
        Self { nodes, root_packages, modules }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn root_packages(&self) -> &[NodeId] {
        &self.root_packages
    }

    /// Look up a class or singleton by fully qualified name.
    pub fn resolve(&self, fqn: &str) -> Option<NodeId> {
        self.modules.get(fqn).copied()
    }

    /// Follow a reference node to its linked target.
    pub fn resolve_target(&self, reference: NodeId) -> RefTarget {
        match &self.node(reference).kind {
            NodeKind::Reference(r) => r.target,
            _ => RefTarget::Local,
        }
    }

    /// Dotted path from the root package down to the node, skipping unnamed
    /// ancestors (bodies, sentences).
    pub fn fully_qualified_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let Some(name) = node.kind.name() {
                segments.push(name);
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nearest ancestor (the node itself excluded) satisfying the predicate.
    pub fn first_ancestor(
        &self,
        id: NodeId,
        predicate: impl Fn(&Node) -> bool,
    ) -> Option<NodeId> {
        let mut current = self.node(id).parent;
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if predicate(node) {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// All nodes below `id` in preorder, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = self.children_of(id);
        pending.reverse();
        while let Some(next) = pending.pop() {
            out.push(next);
            let mut children = self.children_of(next);
            children.reverse();
            pending.extend(children);
        }
        out
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::Package(p) => p.members.clone(),
            NodeKind::Class(c) => {
                let mut out = Vec::with_capacity(c.members.len() + 1);
                out.extend(c.superclass);
                out.extend(&c.members);
                out
            }
            NodeKind::Singleton(s) => {
                let mut out = Vec::with_capacity(s.members.len() + s.supercall_args.len() + 1);
                out.push(s.superclass);
                out.extend(&s.supercall_args);
                out.extend(&s.members);
                out
            }
            NodeKind::Field(f) => vec![f.value],
            NodeKind::Method(m) => m.body.into_iter().collect(),
            NodeKind::Constructor(c) => {
                let mut out = c.base_call.args.clone();
                out.push(c.body);
                out
            }
            NodeKind::Test(t) => vec![t.body],
            NodeKind::Body(b) => b.sentences.clone(),
            NodeKind::Variable(v) => vec![v.value],
            NodeKind::Return(value) => value.iter().copied().collect(),
            NodeKind::Assignment { target, value } => vec![*target, *value],
            NodeKind::SelfExpr | NodeKind::Reference(_) => Vec::new(),
            NodeKind::Literal(literal) => match literal {
                crate::node::Literal::Singleton(node) => vec![*node],
                crate::node::Literal::Construct { args, .. } => args.clone(),
                _ => Vec::new(),
            },
            NodeKind::New { class, args } => {
                let mut out = vec![*class];
                out.extend(args);
                out
            }
            NodeKind::Send { receiver, args, .. } => {
                let mut out = vec![*receiver];
                out.extend(args);
                out
            }
            NodeKind::Super { args } => args.clone(),
            NodeKind::If { condition, then_body, else_body } => {
                vec![*condition, *then_body, *else_body]
            }
            NodeKind::Throw { exception } => vec![*exception],
            NodeKind::Try { body, catches, always } => {
                let mut out = vec![*body];
                for catch in catches {
                    out.push(catch.parameter_type);
                    out.push(catch.body);
                }
                out.extend(*always);
                out
            }
        }
    }

    /// The module chain from `module` itself up to the root class.
    pub fn hierarchy(&self, module: NodeId) -> Vec<NodeId> {
        let mut out = vec![module];
        let mut current = self.superclass(module);
        while let Some(class) = current {
            out.push(class);
            current = self.superclass(class);
        }
        out
    }

    pub fn superclass(&self, module: NodeId) -> Option<NodeId> {
        let reference = match &self.node(module).kind {
            NodeKind::Class(c) => c.superclass?,
            NodeKind::Singleton(s) => s.superclass,
            _ => return None,
        };
        match self.resolve_target(reference) {
            RefTarget::Module(target) => Some(target),
            _ => None,
        }
    }

    pub fn inherits(&self, sub: NodeId, sup: NodeId) -> bool {
        self.hierarchy(sub).contains(&sup)
    }

    /// Walk the hierarchy from `start` upward for a method matching message
    /// and arity.
    pub fn method_lookup(&self, message: &str, arity: usize, start: NodeId) -> Option<NodeId> {
        for module in self.hierarchy(start) {
            for member in self.members_of(module) {
                if let NodeKind::Method(m) = &self.node(*member).kind {
                    if m.name == message && m.matches_arity(arity) {
                        return Some(*member);
                    }
                }
            }
        }
        None
    }

    /// A class's own declared constructors only; chaining happens through
    /// emitted INIT instructions.
    pub fn constructor_lookup(&self, arity: usize, class: NodeId) -> Option<NodeId> {
        for member in self.members_of(class) {
            if let NodeKind::Constructor(c) = &self.node(*member).kind {
                if c.matches_arity(arity) {
                    return Some(*member);
                }
            }
        }
        None
    }

    pub fn members_of(&self, module: NodeId) -> &[NodeId] {
        match &self.node(module).kind {
            NodeKind::Package(p) => &p.members,
            NodeKind::Class(c) => &c.members,
            NodeKind::Singleton(s) => &s.members,
            _ => &[],
        }
    }

    /// Field members of a single module, in declaration order.
    pub fn fields_of(&self, module: NodeId) -> Vec<NodeId> {
        self.members_of(module)
            .iter()
            .copied()
            .filter(|&m| matches!(self.node(m).kind, NodeKind::Field(_)))
            .collect()
    }

    /// Named singletons declared at package level, in document order.
    pub fn global_singletons(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(n.kind, NodeKind::Singleton(_))
                    && n.parent
                        .is_some_and(|p| matches!(self.node(p).kind, NodeKind::Package(_)))
            })
            .map(|n| n.id)
            .collect()
    }

    /// Every test node in the environment, in document order.
    pub fn tests(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Test(_)))
            .map(|n| n.id)
            .collect()
    }
}
