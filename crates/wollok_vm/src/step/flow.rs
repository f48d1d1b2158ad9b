//! Control-flow instructions: conditional jumps, branch frames, structured
//! exception handling, and the interruption primitives.

use wollok_model::lang::BAD_PARAMETER_EXCEPTION_MODULE;

use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::frame::{Frame, ResumeSet};
use crate::heap::Id;
use crate::instruction::{
    Instruction, Interruption, EXCEPTION_LOCAL, PREVIOUS_INTERRUPTION_LOCAL,
};

/// Pop a condition; when false, advance the cursor by `count`. A landing spot
/// exactly at the end of the sequence is a natural frame completion.
pub(super) fn conditional_jump(evaluation: &mut Evaluation, count: usize) -> Result<(), VmError> {
    let condition = evaluation.current_frame_mut()?.pop_operand()?;
    match condition {
        Id::True => Ok(()),
        Id::False => {
            let frame = evaluation.current_frame_mut()?;
            let target = frame.next_instruction + count;
            if target > frame.instructions.len() {
                return Err(VmError::JumpOutOfBounds {
                    target,
                    length: frame.instructions.len(),
                });
            }
            frame.next_instruction = target;
            Ok(())
        }
        other => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            &format!("expected a boolean condition, got {other}"),
        ),
    }
}

pub(super) fn if_then_else(
    evaluation: &mut Evaluation,
    then_branch: &[Instruction],
    else_branch: &[Instruction],
) -> Result<(), VmError> {
    let condition = evaluation.current_frame_mut()?.pop_operand()?;
    let branch = match condition {
        Id::True => then_branch,
        Id::False => else_branch,
        other => {
            return evaluation.raise_exception(
                BAD_PARAMETER_EXCEPTION_MODULE,
                &format!("expected a boolean condition, got {other}"),
            )
        }
    };
    evaluation.current_frame_mut()?.resume.insert(Interruption::Result);

    let mut instructions = Vec::with_capacity(branch.len() + 2);
    instructions.push(Instruction::Push(Id::Void));
    instructions.extend_from_slice(branch);
    instructions.push(Instruction::Interrupt(Interruption::Result));
    evaluation.push_frame(Frame::new(instructions.into()));
    Ok(())
}

/// Push the three frames of a `try`: always below catch below body, so an
/// interruption from the body threads through them in order.
pub(super) fn try_catch_always(
    evaluation: &mut Evaluation,
    body: &[Instruction],
    catch: &[Instruction],
    always: &[Instruction],
) -> Result<(), VmError> {
    evaluation.current_frame_mut()?.resume.insert(Interruption::Result);

    let mut always_frame = {
        let mut instructions = Vec::with_capacity(always.len() + 3);
        instructions.push(Instruction::Store(PREVIOUS_INTERRUPTION_LOCAL.into(), false));
        instructions.extend_from_slice(always);
        instructions.push(Instruction::Load(PREVIOUS_INTERRUPTION_LOCAL.into()));
        instructions.push(Instruction::ResumeInterruption);
        Frame::new(instructions.into())
    };
    always_frame.resume = ResumeSet::of(&[
        Interruption::Result,
        Interruption::Return,
        Interruption::Exception,
    ]);
    evaluation.push_frame(always_frame);

    let mut catch_frame = {
        let mut instructions = Vec::with_capacity(catch.len() + 3);
        instructions.push(Instruction::Store(EXCEPTION_LOCAL.into(), false));
        instructions.extend_from_slice(catch);
        instructions.push(Instruction::Load(EXCEPTION_LOCAL.into()));
        instructions.push(Instruction::Interrupt(Interruption::Exception));
        Frame::new(instructions.into())
    };
    catch_frame.resume = ResumeSet::of(&[Interruption::Exception]);
    evaluation.push_frame(catch_frame);

    let body_frame = {
        let mut instructions = Vec::with_capacity(body.len() + 2);
        instructions.push(Instruction::Push(Id::Void));
        instructions.extend_from_slice(body);
        instructions.push(Instruction::Interrupt(Interruption::Result));
        Frame::new(instructions.into())
    };
    evaluation.push_frame(body_frame);
    Ok(())
}

/// Re-raise the interruption this frame consumed on entry: the one kind now
/// missing from its resume set.
pub(super) fn resume_interruption(evaluation: &mut Evaluation) -> Result<(), VmError> {
    let frame = evaluation.current_frame_mut()?;
    let kind = frame.resume.sole_missing().ok_or(VmError::AmbiguousResume)?;
    let value = frame.pop_operand()?;
    evaluation.interrupt(kind, value)
}
