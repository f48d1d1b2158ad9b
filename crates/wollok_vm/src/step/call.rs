//! Method dispatch and constructor chaining.

use std::rc::Rc;

use smallvec::SmallVec;
use wollok_model::lang::{LIST_MODULE, STRING_MODULE};
use wollok_model::{fast_map_new, ConstructorDef, FastHashMap, MethodDef, NodeId, NodeKind, Param};

use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::frame::Frame;
use crate::heap::{Id, InnerValue};
use crate::instruction::{Instruction, Interruption, SELF};
use crate::natives::NativeRegistry;

const MESSAGE_NOT_UNDERSTOOD: &str = "messageNotUnderstood";

type ArgIds = SmallVec<[Id; 4]>;

fn pop_args(evaluation: &mut Evaluation, arity: usize) -> Result<ArgIds, VmError> {
    let frame = evaluation.current_frame_mut()?;
    let mut args = ArgIds::with_capacity(arity);
    for _ in 0..arity {
        args.push(frame.pop_operand()?);
    }
    args.reverse();
    Ok(args)
}

/// Dispatch a message: receiver below `arity` arguments on the operand stack.
pub(super) fn call(
    evaluation: &mut Evaluation,
    natives: &NativeRegistry,
    message: &str,
    arity: usize,
    lookup_start: Option<&str>,
) -> Result<(), VmError> {
    let args = pop_args(evaluation, arity)?;
    let receiver = evaluation.current_frame_mut()?.pop_operand()?;
    let receiver_module = evaluation.heap.get(receiver)?.module.clone();

    let (receiver_class, method) = {
        let environment = evaluation.environment();
        let receiver_class = environment
            .resolve(&receiver_module)
            .ok_or_else(|| VmError::UnknownModule(receiver_module.to_string()))?;
        // A super-call starts lookup one class above the anchor in the
        // receiver's hierarchy; at the top there is nowhere left to look.
        let start = match lookup_start {
            Some(anchor_fqn) => {
                let anchor = environment
                    .resolve(anchor_fqn)
                    .ok_or_else(|| VmError::UnknownModule(anchor_fqn.to_string()))?;
                let hierarchy = environment.hierarchy(receiver_class);
                hierarchy
                    .iter()
                    .position(|&class| class == anchor)
                    .and_then(|at| hierarchy.get(at + 1).copied())
            }
            None => Some(receiver_class),
        };
        let method = start.and_then(|s| environment.method_lookup(message, arity, s));
        (receiver_class, method)
    };

    match method {
        Some(method) => invoke_method(evaluation, natives, method, receiver, &args),
        None => {
            // Unlike super-dispatch, this always resolves from the
            // receiver's own module.
            let fallback = evaluation
                .environment()
                .method_lookup(MESSAGE_NOT_UNDERSTOOD, 2, receiver_class)
                .ok_or_else(|| VmError::UnknownMessage {
                    module: receiver_module.to_string(),
                    message: message.to_string(),
                    arity,
                })?;
            let name = evaluation
                .heap
                .allocate(STRING_MODULE, Some(InnerValue::String(message.into())));
            let parameters = evaluation
                .heap
                .allocate(LIST_MODULE, Some(InnerValue::List(args.to_vec())));
            invoke_method(evaluation, natives, fallback, receiver, &[name, parameters])
        }
    }
}

fn invoke_method(
    evaluation: &mut Evaluation,
    natives: &NativeRegistry,
    method: NodeId,
    receiver: Id,
    args: &[Id],
) -> Result<(), VmError> {
    let definition: MethodDef = match &evaluation.environment().node(method).kind {
        NodeKind::Method(m) => (**m).clone(),
        _ => return Err(VmError::Uncompilable(method)),
    };

    if definition.native {
        let fqn = evaluation.environment().fully_qualified_name(method);
        let native = natives
            .lookup(&fqn, args.len())
            .ok_or(VmError::MissingNative { method: fqn, arity: args.len() })?;
        let self_object = evaluation.heap.get(receiver)?.clone();
        let mut arg_objects = Vec::with_capacity(args.len());
        for &arg in args {
            arg_objects.push(evaluation.heap.get(arg)?.clone());
        }
        return native(evaluation, self_object, arg_objects);
    }

    let body = definition.body.ok_or_else(|| {
        VmError::MissingMethodBody(evaluation.environment().fully_qualified_name(method))
    })?;
    let locals = bind_parameters(evaluation, &definition.parameters, receiver, args);

    evaluation.current_frame_mut()?.resume.insert(Interruption::Return);
    let compiled = evaluation.compiler().compile(body)?;
    let mut instructions = Vec::with_capacity(compiled.len() + 2);
    instructions.extend(compiled.iter().cloned());
    // Falling off the end of a method still returns a value.
    instructions.push(Instruction::Push(Id::Void));
    instructions.push(Instruction::Interrupt(Interruption::Return));
    evaluation.push_frame(Frame::with_locals(instructions.into(), locals));
    Ok(())
}

/// Pairwise parameter binding; a trailing vararg absorbs the remaining
/// argument ids into a freshly allocated list.
fn bind_parameters(
    evaluation: &mut Evaluation,
    parameters: &[Param],
    receiver: Id,
    args: &[Id],
) -> FastHashMap<Rc<str>, Id> {
    let mut locals = fast_map_new();
    locals.insert(Rc::from(SELF), receiver);
    if parameters.last().is_some_and(|p| p.vararg) {
        let fixed = parameters.len() - 1;
        for (param, &arg) in parameters[..fixed].iter().zip(args) {
            locals.insert(param.name.as_str().into(), arg);
        }
        let tail = args.get(fixed..).unwrap_or(&[]).to_vec();
        let list = evaluation
            .heap
            .allocate(LIST_MODULE, Some(InnerValue::List(tail)));
        locals.insert(parameters[fixed].name.as_str().into(), list);
    } else {
        for (param, &arg) in parameters.iter().zip(args) {
            locals.insert(param.name.as_str().into(), arg);
        }
    }
    locals
}

/// Run a constructor: `self` on top of `arity` arguments on the operand
/// stack. The pushed frame initializes fields, chains the base call, runs
/// the body, and returns `self`.
pub(super) fn init(
    evaluation: &mut Evaluation,
    arity: usize,
    lookup_start: &Rc<str>,
    init_fields: bool,
) -> Result<(), VmError> {
    let receiver = evaluation.current_frame_mut()?.pop_operand()?;
    let args = pop_args(evaluation, arity)?;

    let (definition, superclass) = {
        let environment = evaluation.environment();
        let class = environment
            .resolve(lookup_start)
            .ok_or_else(|| VmError::UnknownModule(lookup_start.to_string()))?;
        let constructor = environment.constructor_lookup(arity, class).ok_or_else(|| {
            VmError::MissingConstructor { module: lookup_start.to_string(), arity }
        })?;
        let definition: ConstructorDef = match &environment.node(constructor).kind {
            NodeKind::Constructor(c) => (**c).clone(),
            _ => return Err(VmError::Uncompilable(constructor)),
        };
        (definition, environment.superclass(class))
    };

    let locals = bind_parameters(evaluation, &definition.parameters, receiver, &args);
    let mut instructions: Vec<Instruction> = Vec::new();

    if init_fields {
        // Superclass fields are written before subclass fields; declaration
        // order within a class is preserved.
        let initializers: Vec<(Rc<str>, NodeId)> = {
            let environment = evaluation.environment();
            let receiver_module = evaluation.heap.get(receiver)?.module.clone();
            let concrete = environment
                .resolve(&receiver_module)
                .ok_or_else(|| VmError::UnknownModule(receiver_module.to_string()))?;
            let mut out = Vec::new();
            for module in environment.hierarchy(concrete).iter().rev() {
                for field in environment.fields_of(*module) {
                    if let NodeKind::Field(f) = &environment.node(field).kind {
                        out.push((f.name.as_str().into(), f.value));
                    }
                }
            }
            out
        };
        for (name, value) in initializers {
            instructions.push(Instruction::Load(SELF.into()));
            let compiled = evaluation.compiler().compile(value)?;
            instructions.extend(compiled.iter().cloned());
            instructions.push(Instruction::Set(name));
        }
    }

    if superclass.is_some() || !definition.base_call.calls_super {
        for &arg in &definition.base_call.args {
            let compiled = evaluation.compiler().compile(arg)?;
            instructions.extend(compiled.iter().cloned());
        }
        instructions.push(Instruction::Load(SELF.into()));
        let target: Rc<str> = match (definition.base_call.calls_super, superclass) {
            (true, Some(superclass)) => {
                evaluation.environment().fully_qualified_name(superclass).into()
            }
            _ => lookup_start.clone(),
        };
        instructions.push(Instruction::Init {
            arity: definition.base_call.args.len(),
            lookup_start: target,
            init_fields: false,
        });
    }

    let compiled = evaluation.compiler().compile(definition.body)?;
    instructions.extend(compiled.iter().cloned());
    instructions.push(Instruction::Load(SELF.into()));
    instructions.push(Instruction::Interrupt(Interruption::Return));

    evaluation.current_frame_mut()?.resume.insert(Interruption::Return);
    evaluation.push_frame(Frame::with_locals(instructions.into(), locals));
    Ok(())
}
