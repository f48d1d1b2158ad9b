//! Lowering of linked AST nodes into instruction sequences.
//!
//! Compilation is referentially transparent: the same node always lowers to
//! the same sequence, so results are memoized per node and shared by
//! reference across frames and cloned evaluations. One compiler serves one
//! environment; the memo key is the node alone.

use std::cell::RefCell;
use std::rc::Rc;

use wollok_model::lang::{NUMBER_MODULE, STRING_MODULE};
use wollok_model::{
    fast_map_new, Environment, FastHashMap, Literal, NodeId, NodeKind, RefTarget,
};

use crate::error::VmError;
use crate::heap::{Id, InnerValue};
use crate::instruction::{
    Instruction, InstructionSeq, Interruption, EXCEPTION_LOCAL, SELF,
};

pub struct Compiler {
    environment: Rc<Environment>,
    cache: RefCell<FastHashMap<NodeId, InstructionSeq>>,
}

impl Compiler {
    pub fn new(environment: Rc<Environment>) -> Self {
        Self { environment, cache: RefCell::new(fast_map_new()) }
    }

    pub fn environment(&self) -> &Rc<Environment> {
        &self.environment
    }

    /// Compile a sentence or body node, memoized.
    pub fn compile(&self, node: NodeId) -> Result<InstructionSeq, VmError> {
        if let Some(sequence) = self.cache.borrow().get(&node) {
            return Ok(sequence.clone());
        }
        let mut out = Vec::new();
        self.lower(node, &mut out)?;
        let sequence: InstructionSeq = out.into();
        self.cache.borrow_mut().insert(node, sequence.clone());
        Ok(sequence)
    }

    fn emit(&self, node: NodeId, out: &mut Vec<Instruction>) -> Result<(), VmError> {
        let sequence = self.compile(node)?;
        out.extend(sequence.iter().cloned());
        Ok(())
    }

    fn emit_all(&self, nodes: &[NodeId], out: &mut Vec<Instruction>) -> Result<(), VmError> {
        for &node in nodes {
            self.emit(node, out)?;
        }
        Ok(())
    }

    fn module_fqn(&self, module: NodeId) -> Rc<str> {
        Rc::from(self.environment.fully_qualified_name(module))
    }

    fn target_module(&self, reference: NodeId) -> Result<NodeId, VmError> {
        match self.environment.resolve_target(reference) {
            RefTarget::Module(module) => Ok(module),
            _ => Err(VmError::Uncompilable(reference)),
        }
    }

    fn lower(&self, node: NodeId, out: &mut Vec<Instruction>) -> Result<(), VmError> {
        let environment = &self.environment;
        match &environment.node(node).kind {
            NodeKind::Body(body) => {
                self.emit_all(&body.sentences, out)?;
            }

            NodeKind::Variable(variable) => {
                self.emit(variable.value, out)?;
                out.push(Instruction::Store(variable.name.as_str().into(), false));
            }

            NodeKind::Return(value) => {
                match value {
                    Some(value) => self.emit(*value, out)?,
                    None => out.push(Instruction::Push(Id::Void)),
                }
                out.push(Instruction::Interrupt(Interruption::Return));
            }

            NodeKind::Assignment { target, value } => {
                let name: Rc<str> = match &environment.node(*target).kind {
                    NodeKind::Reference(r) => r.name.as_str().into(),
                    _ => return Err(VmError::Uncompilable(*target)),
                };
                match environment.resolve_target(*target) {
                    RefTarget::Field(_) => {
                        out.push(Instruction::Load(SELF.into()));
                        self.emit(*value, out)?;
                        out.push(Instruction::Set(name));
                    }
                    _ => {
                        self.emit(*value, out)?;
                        out.push(Instruction::Store(name, true));
                    }
                }
            }

            NodeKind::SelfExpr => {
                out.push(Instruction::Load(SELF.into()));
            }

            NodeKind::Reference(reference) => match reference.target {
                RefTarget::Field(_) => {
                    out.push(Instruction::Load(SELF.into()));
                    out.push(Instruction::Get(reference.name.as_str().into()));
                }
                RefTarget::Module(module) => {
                    out.push(Instruction::Load(self.module_fqn(module)));
                }
                RefTarget::Local => {
                    out.push(Instruction::Load(reference.name.as_str().into()));
                }
            },

            NodeKind::Literal(literal) => match literal {
                Literal::Null => out.push(Instruction::Push(Id::Null)),
                Literal::Boolean(value) => out.push(Instruction::Push(Id::from_bool(*value))),
                Literal::Number(value) => out.push(Instruction::Instantiate(
                    NUMBER_MODULE.into(),
                    Some(InnerValue::Number(*value)),
                )),
                Literal::String(value) => out.push(Instruction::Instantiate(
                    STRING_MODULE.into(),
                    Some(InnerValue::String(value.as_str().into())),
                )),
                Literal::Singleton(singleton) => {
                    let definition = match &environment.node(*singleton).kind {
                        NodeKind::Singleton(s) => s,
                        _ => return Err(VmError::Uncompilable(*singleton)),
                    };
                    self.emit_all(&definition.supercall_args, out)?;
                    out.push(Instruction::Instantiate(self.module_fqn(*singleton), None));
                    let superclass = self.target_module(definition.superclass)?;
                    out.push(Instruction::Init {
                        arity: definition.supercall_args.len(),
                        lookup_start: self.module_fqn(superclass),
                        init_fields: true,
                    });
                }
                Literal::Construct { class, args } => {
                    self.emit_all(args, out)?;
                    let class: Rc<str> = class.as_str().into();
                    out.push(Instruction::Instantiate(class.clone(), None));
                    out.push(Instruction::Init {
                        arity: args.len(),
                        lookup_start: class,
                        init_fields: false,
                    });
                }
            },

            NodeKind::New { class, args } => {
                self.emit_all(args, out)?;
                let class = self.target_module(*class)?;
                let fqn = self.module_fqn(class);
                out.push(Instruction::Instantiate(fqn.clone(), None));
                out.push(Instruction::Init {
                    arity: args.len(),
                    lookup_start: fqn,
                    init_fields: true,
                });
            }

            NodeKind::Send { receiver, message, args } => {
                self.emit(*receiver, out)?;
                self.emit_all(args, out)?;
                out.push(Instruction::Call {
                    message: message.as_str().into(),
                    arity: args.len(),
                    lookup_start: None,
                });
            }

            NodeKind::Super { args } => {
                let method = environment
                    .first_ancestor(node, |n| matches!(n.kind, NodeKind::Method(_)))
                    .ok_or(VmError::Uncompilable(node))?;
                let module = environment
                    .first_ancestor(method, |n| n.kind.is_module())
                    .ok_or(VmError::Uncompilable(node))?;
                let message: Rc<str> = match &environment.node(method).kind {
                    NodeKind::Method(m) => m.name.as_str().into(),
                    _ => return Err(VmError::Uncompilable(method)),
                };
                out.push(Instruction::Load(SELF.into()));
                self.emit_all(args, out)?;
                out.push(Instruction::Call {
                    message,
                    arity: args.len(),
                    lookup_start: Some(self.module_fqn(module)),
                });
            }

            NodeKind::If { condition, then_body, else_body } => {
                self.emit(*condition, out)?;
                out.push(Instruction::IfThenElse {
                    then_branch: self.compile(*then_body)?,
                    else_branch: self.compile(*else_body)?,
                });
            }

            NodeKind::Throw { exception } => {
                self.emit(*exception, out)?;
                out.push(Instruction::Interrupt(Interruption::Exception));
            }

            NodeKind::Try { body, catches, always } => {
                let mut catch_arm = Vec::new();
                for catch in catches {
                    let guard = self.target_module(catch.parameter_type)?;
                    let mut handler = vec![
                        Instruction::Push(Id::Void),
                        Instruction::Load(EXCEPTION_LOCAL.into()),
                        Instruction::Store(catch.parameter.as_str().into(), false),
                    ];
                    self.emit(catch.body, &mut handler)?;
                    handler.push(Instruction::Interrupt(Interruption::Result));

                    catch_arm.push(Instruction::Load(EXCEPTION_LOCAL.into()));
                    catch_arm.push(Instruction::Inherits(self.module_fqn(guard)));
                    catch_arm.push(Instruction::ConditionalJump(handler.len()));
                    catch_arm.extend(handler);
                }
                let always = match always {
                    Some(always) => self.compile(*always)?,
                    None => Vec::new().into(),
                };
                out.push(Instruction::TryCatchAlways {
                    body: self.compile(*body)?,
                    catch: catch_arm.into(),
                    always,
                });
            }

            _ => return Err(VmError::Uncompilable(node)),
        }
        Ok(())
    }
}
