//! Programmatic construction of linked environments.
//!
//! The parser lives outside this workspace; hosts and tests assemble their
//! programs through [`EnvironmentBuilder`] instead. Nodes are created
//! bottom-up, then [`link`](EnvironmentBuilder::link) resolves superclasses,
//! references and catch guards, synthesizes default constructors, and
//! produces the immutable [`Environment`].

use thiserror::Error;

use crate::node::{
    BaseCall, Body, Catch, ClassDef, ConstructorDef, FieldDef, Literal, MethodDef, Node, NodeId,
    NodeKind, Package, Param, Reference, RefTarget, SingletonDef, TestDef, VariableDef,
};
use crate::{fast_map_new, Environment, FastHashMap};

const LANG_PACKAGE: &str = "wollok.lang";

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unresolved reference to `{0}`")]
    UnresolvedReference(String),
    #[error("unknown module `{0}` in type position")]
    UnknownModule(String),
    #[error("duplicate module `{0}`")]
    DuplicateModule(String),
}

pub struct EnvironmentBuilder {
    nodes: Vec<Node>,
    root_packages: Vec<NodeId>,
    /// References created in type position (superclasses, catch guards).
    type_refs: Vec<NodeId>,
    /// References created in expression position, pending scope resolution.
    expr_refs: Vec<NodeId>,
    anonymous_count: u32,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root_packages: Vec::new(),
            type_refs: Vec::new(),
            expr_refs: Vec::new(),
            anonymous_count: 0,
        }
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { id, parent: None, kind });
        id
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
    }

    fn adopt_all(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.adopt(parent, child);
        }
    }

    fn type_reference(&mut self, fqn: &str) -> NodeId {
        let id = self.add(NodeKind::Reference(Reference {
            name: fqn.to_string(),
            target: RefTarget::Local,
        }));
        self.type_refs.push(id);
        id
    }

    // ---- containers ----------------------------------------------------

    pub fn package(&mut self, name: &str) -> NodeId {
        let id = self.add(NodeKind::Package(Package { name: name.to_string(), members: Vec::new() }));
        self.root_packages.push(id);
        id
    }

    pub fn subpackage(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.add(NodeKind::Package(Package { name: name.to_string(), members: Vec::new() }));
        self.attach_member(parent, id);
        id
    }

    fn attach_member(&mut self, container: NodeId, member: NodeId) {
        self.adopt(container, member);
        match &mut self.nodes[container.index()].kind {
            NodeKind::Package(p) => p.members.push(member),
            NodeKind::Class(c) => c.members.push(member),
            NodeKind::Singleton(s) => s.members.push(member),
            _ => {}
        }
    }

    /// Declare a class. `superclass` is a fully qualified name; only the
    /// root class passes `None`.
    pub fn class(&mut self, package: NodeId, name: &str, superclass: Option<&str>) -> NodeId {
        let superclass = superclass.map(|fqn| self.type_reference(fqn));
        let id = self.add(NodeKind::Class(Box::new(ClassDef {
            name: name.to_string(),
            superclass,
            members: Vec::new(),
        })));
        if let Some(reference) = superclass {
            self.adopt(id, reference);
        }
        self.attach_member(package, id);
        id
    }

    pub fn singleton(
        &mut self,
        package: NodeId,
        name: &str,
        superclass: &str,
        supercall_args: Vec<NodeId>,
    ) -> NodeId {
        let reference = self.type_reference(superclass);
        let id = self.add(NodeKind::Singleton(Box::new(SingletonDef {
            name: name.to_string(),
            superclass: reference,
            supercall_args: supercall_args.clone(),
            members: Vec::new(),
        })));
        self.adopt(id, reference);
        self.adopt_all(id, &supercall_args);
        self.attach_member(package, id);
        id
    }

    /// An unnamed singleton for object literals; wrap it with
    /// [`literal_of`](Self::literal_of) to use it as an expression.
    pub fn anonymous_singleton(&mut self, superclass: &str, supercall_args: Vec<NodeId>) -> NodeId {
        self.anonymous_count += 1;
        let name = format!("anonymousObject_{}", self.anonymous_count);
        let reference = self.type_reference(superclass);
        let id = self.add(NodeKind::Singleton(Box::new(SingletonDef {
            name,
            superclass: reference,
            supercall_args: supercall_args.clone(),
            members: Vec::new(),
        })));
        self.adopt(id, reference);
        self.adopt_all(id, &supercall_args);
        id
    }

    pub fn literal_of(&mut self, singleton: NodeId) -> NodeId {
        let id = self.add(NodeKind::Literal(Literal::Singleton(singleton)));
        self.adopt(id, singleton);
        id
    }

    // ---- members -------------------------------------------------------

    pub fn field(&mut self, module: NodeId, name: &str, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::Field(FieldDef { name: name.to_string(), value }));
        self.adopt(id, value);
        self.attach_member(module, id);
        id
    }

    pub fn method(
        &mut self,
        module: NodeId,
        name: &str,
        parameters: Vec<Param>,
        body: Option<NodeId>,
    ) -> NodeId {
        let id = self.add(NodeKind::Method(Box::new(MethodDef {
            name: name.to_string(),
            parameters,
            body,
            native: false,
        })));
        if let Some(body) = body {
            self.adopt(id, body);
        }
        self.attach_member(module, id);
        id
    }

    pub fn native_method(&mut self, module: NodeId, name: &str, parameters: Vec<Param>) -> NodeId {
        let id = self.add(NodeKind::Method(Box::new(MethodDef {
            name: name.to_string(),
            parameters,
            body: None,
            native: true,
        })));
        self.attach_member(module, id);
        id
    }

    pub fn constructor(
        &mut self,
        class: NodeId,
        parameters: Vec<Param>,
        base_call: BaseCall,
        body: NodeId,
    ) -> NodeId {
        let args = base_call.args.clone();
        let id = self.add(NodeKind::Constructor(Box::new(ConstructorDef {
            parameters,
            base_call,
            body,
        })));
        self.adopt_all(id, &args);
        self.adopt(id, body);
        self.attach_member(class, id);
        id
    }

    pub fn test(&mut self, package: NodeId, name: &str, body: NodeId) -> NodeId {
        let id = self.add(NodeKind::Test(TestDef { name: name.to_string(), body }));
        self.adopt(id, body);
        self.attach_member(package, id);
        id
    }

    // ---- sentences -----------------------------------------------------

    pub fn body(&mut self, sentences: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Body(Body { sentences: sentences.clone() }));
        self.adopt_all(id, &sentences);
        id
    }

    pub fn variable(&mut self, name: &str, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::Variable(VariableDef { name: name.to_string(), value }));
        self.adopt(id, value);
        id
    }

    pub fn return_value(&mut self, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::Return(Some(value)));
        self.adopt(id, value);
        id
    }

    pub fn return_void(&mut self) -> NodeId {
        self.add(NodeKind::Return(None))
    }

    /// `target` must be a reference node created with
    /// [`reference`](Self::reference).
    pub fn assignment(&mut self, target: NodeId, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::Assignment { target, value });
        self.adopt(id, target);
        self.adopt(id, value);
        id
    }

    // ---- expressions ---------------------------------------------------

    pub fn self_expr(&mut self) -> NodeId {
        self.add(NodeKind::SelfExpr)
    }

    pub fn reference(&mut self, name: &str) -> NodeId {
        let id = self.add(NodeKind::Reference(Reference {
            name: name.to_string(),
            target: RefTarget::Local,
        }));
        self.expr_refs.push(id);
        id
    }

    pub fn null_literal(&mut self) -> NodeId {
        self.add(NodeKind::Literal(Literal::Null))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.add(NodeKind::Literal(Literal::Boolean(value)))
    }

    pub fn number(&mut self, value: f64) -> NodeId {
        self.add(NodeKind::Literal(Literal::Number(value)))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::Literal(Literal::String(value.to_string())))
    }

    pub fn construct_literal(&mut self, class: &str, args: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Literal(Literal::Construct {
            class: class.to_string(),
            args: args.clone(),
        }));
        self.adopt_all(id, &args);
        id
    }

    pub fn send(&mut self, receiver: NodeId, message: &str, args: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Send {
            receiver,
            message: message.to_string(),
            args: args.clone(),
        });
        self.adopt(id, receiver);
        self.adopt_all(id, &args);
        id
    }

    pub fn super_send(&mut self, args: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Super { args: args.clone() });
        self.adopt_all(id, &args);
        id
    }

    pub fn new_instance(&mut self, class: &str, args: Vec<NodeId>) -> NodeId {
        let class_ref = self.type_reference(class);
        let id = self.add(NodeKind::New { class: class_ref, args: args.clone() });
        self.adopt(id, class_ref);
        self.adopt_all(id, &args);
        id
    }

    pub fn if_expr(&mut self, condition: NodeId, then_body: NodeId, else_body: NodeId) -> NodeId {
        let id = self.add(NodeKind::If { condition, then_body, else_body });
        self.adopt(id, condition);
        self.adopt(id, then_body);
        self.adopt(id, else_body);
        id
    }

    pub fn throw_expr(&mut self, exception: NodeId) -> NodeId {
        let id = self.add(NodeKind::Throw { exception });
        self.adopt(id, exception);
        id
    }

    /// `catches` are `(parameter, guard class fqn, handler body)` triples.
    pub fn try_expr(
        &mut self,
        body: NodeId,
        catches: Vec<(&str, &str, NodeId)>,
        always: Option<NodeId>,
    ) -> NodeId {
        let catches: Vec<Catch> = catches
            .into_iter()
            .map(|(parameter, guard, handler)| Catch {
                parameter: parameter.to_string(),
                parameter_type: self.type_reference(guard),
                body: handler,
            })
            .collect();
        let id = self.add(NodeKind::Try { body, catches: catches.clone(), always });
        self.adopt(id, body);
        for catch in &catches {
            self.adopt(id, catch.parameter_type);
            self.adopt(id, catch.body);
        }
        if let Some(always) = always {
            self.adopt(id, always);
        }
        id
    }

    // ---- linking -------------------------------------------------------

    pub fn link(mut self) -> Result<Environment, LinkError> {
        let modules = self.collect_modules()?;
        self.resolve_type_references(&modules)?;
        self.synthesize_default_constructors();
        self.resolve_expression_references(&modules)?;
        Ok(Environment::new(self.nodes, self.root_packages, modules))
    }

    fn local_fqn(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.index()];
            if let Some(name) = node.kind.name() {
                segments.push(name);
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    fn collect_modules(&self) -> Result<FastHashMap<String, NodeId>, LinkError> {
        let mut modules: FastHashMap<String, NodeId> = fast_map_new();
        for node in &self.nodes {
            if node.kind.is_module() {
                let fqn = self.local_fqn(node.id);
                if modules.insert(fqn.clone(), node.id).is_some() {
                    return Err(LinkError::DuplicateModule(fqn));
                }
            }
        }
        Ok(modules)
    }

    fn resolve_module(
        modules: &FastHashMap<String, NodeId>,
        name: &str,
    ) -> Option<NodeId> {
        if let Some(&id) = modules.get(name) {
            return Some(id);
        }
        if !name.contains('.') {
            return modules.get(&format!("{LANG_PACKAGE}.{name}")).copied();
        }
        None
    }

    fn resolve_type_references(
        &mut self,
        modules: &FastHashMap<String, NodeId>,
    ) -> Result<(), LinkError> {
        for &reference in &self.type_refs {
            let name = match &self.nodes[reference.index()].kind {
                NodeKind::Reference(r) => r.name.clone(),
                _ => continue,
            };
            let target = Self::resolve_module(modules, &name)
                .ok_or_else(|| LinkError::UnknownModule(name.clone()))?;
            if let NodeKind::Reference(r) = &mut self.nodes[reference.index()].kind {
                r.target = RefTarget::Module(target);
            }
        }
        Ok(())
    }

    fn synthesize_default_constructors(&mut self) {
        let classes: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Class(_)))
            .map(|n| n.id)
            .collect();
        for class in classes {
            let has_constructor = self.members(class).iter().any(|&m| {
                matches!(self.nodes[m.index()].kind, NodeKind::Constructor(_))
            });
            if has_constructor {
                continue;
            }
            let body = self.body(vec![]);
            let id = self.add(NodeKind::Constructor(Box::new(ConstructorDef {
                parameters: Vec::new(),
                base_call: BaseCall::implicit(),
                body,
            })));
            self.adopt(id, body);
            self.attach_member(class, id);
        }
    }

    fn members(&self, module: NodeId) -> Vec<NodeId> {
        match &self.nodes[module.index()].kind {
            NodeKind::Package(p) => p.members.clone(),
            NodeKind::Class(c) => c.members.clone(),
            NodeKind::Singleton(s) => s.members.clone(),
            _ => Vec::new(),
        }
    }

    fn superclass_of(&self, module: NodeId) -> Option<NodeId> {
        let reference = match &self.nodes[module.index()].kind {
            NodeKind::Class(c) => c.superclass?,
            NodeKind::Singleton(s) => s.superclass,
            _ => return None,
        };
        match &self.nodes[reference.index()].kind {
            NodeKind::Reference(r) => match r.target {
                RefTarget::Module(target) => Some(target),
                _ => None,
            },
            _ => None,
        }
    }

    fn resolve_expression_references(
        &mut self,
        modules: &FastHashMap<String, NodeId>,
    ) -> Result<(), LinkError> {
        let references = self.expr_refs.clone();
        for reference in references {
            let name = match &self.nodes[reference.index()].kind {
                NodeKind::Reference(r) => r.name.clone(),
                _ => continue,
            };
            let target = self
                .resolve_in_scope(reference, &name, modules)
                .ok_or_else(|| LinkError::UnresolvedReference(name.clone()))?;
            if let NodeKind::Reference(r) = &mut self.nodes[reference.index()].kind {
                r.target = target;
            }
        }
        Ok(())
    }

    /// Lexical scope walk: locals and parameters of enclosing bodies, catch
    /// parameters, fields of the enclosing module hierarchy, sibling modules
    /// of the enclosing package, then fully qualified names.
    fn resolve_in_scope(
        &self,
        reference: NodeId,
        name: &str,
        modules: &FastHashMap<String, NodeId>,
    ) -> Option<RefTarget> {
        let mut previous = reference;
        let mut current = self.nodes[reference.index()].parent;
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.index()];
            match &node.kind {
                NodeKind::Body(b) => {
                    for &sentence in &b.sentences {
                        if let NodeKind::Variable(v) = &self.nodes[sentence.index()].kind {
                            if v.name == name {
                                return Some(RefTarget::Local);
                            }
                        }
                    }
                }
                NodeKind::Method(m) => {
                    if m.parameters.iter().any(|p| p.name == name) {
                        return Some(RefTarget::Local);
                    }
                }
                NodeKind::Constructor(c) => {
                    if c.parameters.iter().any(|p| p.name == name) {
                        return Some(RefTarget::Local);
                    }
                }
                NodeKind::Try { catches, .. } => {
                    if catches.iter().any(|c| c.body == previous && c.parameter == name) {
                        return Some(RefTarget::Local);
                    }
                }
                NodeKind::Class(_) | NodeKind::Singleton(_) => {
                    let mut module = Some(node_id);
                    while let Some(m) = module {
                        for member in self.members(m) {
                            if let NodeKind::Field(f) = &self.nodes[member.index()].kind {
                                if f.name == name {
                                    return Some(RefTarget::Field(member));
                                }
                            }
                        }
                        module = self.superclass_of(m);
                    }
                }
                NodeKind::Package(p) => {
                    for &member in &p.members {
                        let member_node = &self.nodes[member.index()];
                        if member_node.kind.is_module() && member_node.kind.name() == Some(name) {
                            return Some(RefTarget::Module(member));
                        }
                    }
                }
                _ => {}
            }
            previous = node_id;
            current = node.parent;
        }
        Self::resolve_module(modules, name).map(RefTarget::Module)
    }
}
