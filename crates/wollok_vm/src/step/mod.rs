//! The instruction executor.
//!
//! [`step`] interprets exactly one instruction of the top frame. Every
//! instruction is atomic with respect to the evaluation: it finishes
//! mutating heap, locals and stacks before the next one is fetched.

mod call;
mod flow;

use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::heap::Id;
use crate::instruction::Instruction;
use crate::natives::NativeRegistry;

pub fn step(evaluation: &mut Evaluation, natives: &NativeRegistry) -> Result<(), VmError> {
    let instruction = evaluation.current_frame_mut()?.fetch()?;
    match instruction {
        Instruction::Load(name) => {
            let value = evaluation
                .lookup_local(&name)
                .ok_or_else(|| VmError::MissingLocal(name.to_string()))?;
            evaluation.current_frame_mut()?.push_operand(value);
        }

        Instruction::Store(name, lookup) => {
            let value = evaluation.current_frame_mut()?.pop_operand()?;
            evaluation.store_local(name, value, lookup)?;
        }

        Instruction::Push(id) => {
            evaluation.current_frame_mut()?.push_operand(id);
        }

        Instruction::Get(field) => {
            let receiver = evaluation.current_frame_mut()?.pop_operand()?;
            let object = evaluation.heap.get(receiver)?;
            let value = object.field(&field).ok_or_else(|| VmError::UndefinedField {
                module: object.module.to_string(),
                field: field.to_string(),
            })?;
            evaluation.current_frame_mut()?.push_operand(value);
        }

        Instruction::Set(field) => {
            let frame = evaluation.current_frame_mut()?;
            let value = frame.pop_operand()?;
            let receiver = frame.pop_operand()?;
            evaluation.heap.get_mut(receiver)?.fields.insert(field, value);
        }

        Instruction::Swap => {
            let frame = evaluation.current_frame_mut()?;
            let top = frame.pop_operand()?;
            let below = frame.pop_operand()?;
            frame.push_operand(top);
            frame.push_operand(below);
        }

        Instruction::Instantiate(module, inner) => {
            let id = evaluation.heap.allocate(&module, inner);
            evaluation.current_frame_mut()?.push_operand(id);
        }

        Instruction::Inherits(module) => {
            let receiver = evaluation.current_frame_mut()?.pop_operand()?;
            let receiver_module = evaluation.heap.get(receiver)?.module.clone();
            let inherits = {
                let environment = evaluation.environment();
                let sub = environment
                    .resolve(&receiver_module)
                    .ok_or_else(|| VmError::UnknownModule(receiver_module.to_string()))?;
                let sup = environment
                    .resolve(&module)
                    .ok_or_else(|| VmError::UnknownModule(module.to_string()))?;
                environment.inherits(sub, sup)
            };
            evaluation.current_frame_mut()?.push_operand(Id::from_bool(inherits));
        }

        Instruction::ConditionalJump(count) => flow::conditional_jump(evaluation, count)?,

        Instruction::Call { message, arity, lookup_start } => {
            call::call(evaluation, natives, &message, arity, lookup_start.as_deref())?
        }

        Instruction::Init { arity, lookup_start, init_fields } => {
            call::init(evaluation, arity, &lookup_start, init_fields)?
        }

        Instruction::IfThenElse { then_branch, else_branch } => {
            flow::if_then_else(evaluation, &then_branch, &else_branch)?
        }

        Instruction::TryCatchAlways { body, catch, always } => {
            flow::try_catch_always(evaluation, &body, &catch, &always)?
        }

        Instruction::Interrupt(kind) => {
            let value = evaluation.current_frame_mut()?.pop_operand()?;
            evaluation.interrupt(kind, value)?;
        }

        Instruction::ResumeInterruption => flow::resume_interruption(evaluation)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::compiler::Compiler;
    use crate::frame::Frame;
    use crate::heap::Heap;
    use wollok_model::lang::OBJECT_MODULE;

    fn evaluation_with(instructions: Vec<Instruction>) -> Evaluation {
        let mut b = wollok_model::EnvironmentBuilder::new();
        wollok_model::lang::install(&mut b);
        let environment = Rc::new(b.link().unwrap());
        let compiler = Rc::new(Compiler::new(Rc::clone(&environment)));
        Evaluation::new(
            environment,
            compiler,
            Heap::with_reserved(),
            Frame::new(instructions.into()),
        )
    }

    fn drive(evaluation: &mut Evaluation, steps: usize) {
        let natives = NativeRegistry::new();
        for _ in 0..steps {
            step(evaluation, &natives).unwrap();
        }
    }

    #[test]
    fn swap_exchanges_the_two_top_operands() {
        let mut evaluation = evaluation_with(vec![
            Instruction::Push(Id::True),
            Instruction::Push(Id::False),
            Instruction::Swap,
        ]);
        drive(&mut evaluation, 3);
        assert_eq!(
            evaluation.current_frame().unwrap().operand_stack,
            vec![Id::False, Id::True]
        );
    }

    #[test]
    fn set_then_get_round_trips_a_field() {
        let mut evaluation = evaluation_with(vec![
            Instruction::Instantiate(OBJECT_MODULE.into(), None),
            Instruction::Store("o".into(), false),
            Instruction::Load("o".into()),
            Instruction::Push(Id::True),
            Instruction::Set("flag".into()),
            Instruction::Load("o".into()),
            Instruction::Get("flag".into()),
        ]);
        drive(&mut evaluation, 7);
        assert_eq!(
            evaluation.current_frame().unwrap().operand_stack,
            vec![Id::True]
        );
    }

    #[test]
    fn get_on_a_missing_field_is_a_host_failure() {
        let mut evaluation = evaluation_with(vec![
            Instruction::Push(Id::True),
            Instruction::Get("whatever".into()),
        ]);
        drive(&mut evaluation, 1);
        let natives = NativeRegistry::new();
        assert!(matches!(
            step(&mut evaluation, &natives),
            Err(VmError::UndefinedField { .. })
        ));
    }

    #[test]
    fn load_of_an_unbound_name_is_a_host_failure() {
        let mut evaluation = evaluation_with(vec![Instruction::Load("nope".into())]);
        let natives = NativeRegistry::new();
        assert!(matches!(
            step(&mut evaluation, &natives),
            Err(VmError::MissingLocal(name)) if name == "nope"
        ));
    }

    #[test]
    fn stepping_an_exhausted_frame_is_a_host_failure() {
        let mut evaluation = evaluation_with(vec![]);
        let natives = NativeRegistry::new();
        assert!(matches!(
            step(&mut evaluation, &natives),
            Err(VmError::ExhaustedInstructions)
        ));
    }
}
