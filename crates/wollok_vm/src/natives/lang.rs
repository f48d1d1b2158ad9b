//! Natives for the `wollok.lang` library skeleton.

use wollok_model::lang::{
    BAD_PARAMETER_EXCEPTION_MODULE, BOOLEAN_MODULE, EXCEPTION_MODULE, LIST_MODULE,
    MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE, NUMBER_MODULE, OBJECT_MODULE, STRING_MODULE,
};

use super::{NativeProvider, NativeRegistry};
use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::heap::{Id, InnerValue, RuntimeObject};

pub struct LangNativeProvider;

impl NativeProvider for LangNativeProvider {
    fn install(&self, registry: &mut NativeRegistry) {
        registry.register(&format!("{OBJECT_MODULE}.=="), 1, object_equals);
        registry.register(&format!("{OBJECT_MODULE}.!="), 1, object_not_equals);
        registry.register(
            &format!("{OBJECT_MODULE}.messageNotUnderstood"),
            2,
            message_not_understood,
        );

        registry.register(&format!("{BOOLEAN_MODULE}.&&"), 1, boolean_and);
        registry.register(&format!("{BOOLEAN_MODULE}.||"), 1, boolean_or);
        registry.register(&format!("{BOOLEAN_MODULE}.negate"), 0, boolean_negate);

        registry.register(&format!("{NUMBER_MODULE}.+"), 1, number_plus);
        registry.register(&format!("{NUMBER_MODULE}.-"), 1, number_minus);
        registry.register(&format!("{NUMBER_MODULE}.*"), 1, number_times);
        registry.register(&format!("{NUMBER_MODULE}./"), 1, number_divided_by);
        registry.register(&format!("{NUMBER_MODULE}.>"), 1, number_greater);
        registry.register(&format!("{NUMBER_MODULE}.<"), 1, number_lesser);
        registry.register(&format!("{NUMBER_MODULE}.>="), 1, number_greater_or_equal);
        registry.register(&format!("{NUMBER_MODULE}.<="), 1, number_lesser_or_equal);
        registry.register(&format!("{NUMBER_MODULE}.=="), 1, number_equals);

        registry.register(&format!("{STRING_MODULE}.+"), 1, string_concat);
        registry.register(&format!("{STRING_MODULE}.=="), 1, string_equals);
        registry.register(&format!("{STRING_MODULE}.length"), 0, string_length);

        registry.register(&format!("{LIST_MODULE}.add"), 1, list_add);
        registry.register(&format!("{LIST_MODULE}.size"), 0, list_size);
        registry.register(&format!("{LIST_MODULE}.get"), 1, list_get);
        registry.register(&format!("{LIST_MODULE}.=="), 1, list_equals);
    }
}

fn push_result(evaluation: &mut Evaluation, id: Id) -> Result<(), VmError> {
    evaluation.current_frame_mut()?.push_operand(id);
    Ok(())
}

fn push_number(evaluation: &mut Evaluation, value: f64) -> Result<(), VmError> {
    let id = evaluation
        .heap
        .allocate(NUMBER_MODULE, Some(InnerValue::Number(value)));
    push_result(evaluation, id)
}

fn single(name: &'static str, args: &[RuntimeObject]) -> Result<RuntimeObject, VmError> {
    args.first().cloned().ok_or(VmError::NativeArity(name))
}

// ---- Object -----------------------------------------------------------

fn object_equals(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("Object.==", &args)?;
    push_result(evaluation, Id::from_bool(this.id == other.id))
}

fn object_not_equals(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("Object.!=", &args)?;
    push_result(evaluation, Id::from_bool(this.id != other.id))
}

fn message_not_understood(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let name = single("Object.messageNotUnderstood", &args)?;
    let description = match name.string() {
        Some(message) => format!("{} does not understand {message}", this.module),
        None => format!("{} does not understand the message", this.module),
    };
    evaluation.raise_exception(MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE, &description)
}

// ---- Boolean ----------------------------------------------------------

fn boolean_binary(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
    name: &'static str,
    op: fn(bool, bool) -> bool,
) -> Result<(), VmError> {
    let other = single(name, &args)?;
    match (this.boolean(), other.boolean()) {
        (Some(a), Some(b)) => push_result(evaluation, Id::from_bool(op(a, b))),
        _ => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            &format!("{name} expects a boolean"),
        ),
    }
}

fn boolean_and(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    boolean_binary(evaluation, this, args, "Boolean.&&", |a, b| a && b)
}

fn boolean_or(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    boolean_binary(evaluation, this, args, "Boolean.||", |a, b| a || b)
}

fn boolean_negate(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    _args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    match this.boolean() {
        Some(value) => push_result(evaluation, Id::from_bool(!value)),
        None => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "negate expects a boolean receiver",
        ),
    }
}

// ---- Number -----------------------------------------------------------

fn number_arithmetic(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
    name: &'static str,
    op: fn(f64, f64) -> f64,
) -> Result<(), VmError> {
    let other = single(name, &args)?;
    match (this.number(), other.number()) {
        (Some(a), Some(b)) => push_number(evaluation, op(a, b)),
        _ => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            &format!("{name} expects a number"),
        ),
    }
}

fn number_comparison(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
    name: &'static str,
    op: fn(f64, f64) -> bool,
) -> Result<(), VmError> {
    let other = single(name, &args)?;
    match (this.number(), other.number()) {
        (Some(a), Some(b)) => push_result(evaluation, Id::from_bool(op(a, b))),
        _ => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            &format!("{name} expects a number"),
        ),
    }
}

fn number_plus(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_arithmetic(evaluation, this, args, "Number.+", |a, b| a + b)
}

fn number_minus(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_arithmetic(evaluation, this, args, "Number.-", |a, b| a - b)
}

fn number_times(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_arithmetic(evaluation, this, args, "Number.*", |a, b| a * b)
}

fn number_divided_by(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("Number./", &args)?;
    match (this.number(), other.number()) {
        (Some(_), Some(b)) if b == 0.0 => {
            evaluation.raise_exception(EXCEPTION_MODULE, "division by zero")
        }
        (Some(a), Some(b)) => push_number(evaluation, a / b),
        _ => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "Number./ expects a number",
        ),
    }
}

fn number_greater(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_comparison(evaluation, this, args, "Number.>", |a, b| a > b)
}

fn number_lesser(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_comparison(evaluation, this, args, "Number.<", |a, b| a < b)
}

fn number_greater_or_equal(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_comparison(evaluation, this, args, "Number.>=", |a, b| a >= b)
}

fn number_lesser_or_equal(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    number_comparison(evaluation, this, args, "Number.<=", |a, b| a <= b)
}

fn number_equals(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("Number.==", &args)?;
    let equal = match (this.number(), other.number()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    push_result(evaluation, Id::from_bool(equal))
}

// ---- String -----------------------------------------------------------

/// Textual rendering of a primitive payload for concatenation.
fn text_of(object: &RuntimeObject) -> Option<String> {
    match &object.inner {
        Some(InnerValue::String(s)) => Some(s.to_string()),
        Some(InnerValue::Number(n)) => {
            if n.fract() == 0.0 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{n}"))
            }
        }
        Some(InnerValue::Boolean(b)) => Some(b.to_string()),
        Some(InnerValue::Null) => Some("null".to_string()),
        _ => None,
    }
}

fn string_concat(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("String.+", &args)?;
    let (Some(prefix), Some(suffix)) = (this.string(), text_of(&other)) else {
        return evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "String.+ expects a printable value",
        );
    };
    let id = evaluation.heap.allocate(
        STRING_MODULE,
        Some(InnerValue::String(format!("{prefix}{suffix}").into())),
    );
    push_result(evaluation, id)
}

fn string_equals(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("String.==", &args)?;
    let equal = match (this.string(), other.string()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    push_result(evaluation, Id::from_bool(equal))
}

fn string_length(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    _args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    match this.string() {
        Some(s) => push_number(evaluation, s.chars().count() as f64),
        None => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "length expects a string receiver",
        ),
    }
}

// ---- List -------------------------------------------------------------

fn list_add(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let element = single("List.add", &args)?;
    let object = evaluation.heap.get_mut(this.id)?;
    match &mut object.inner {
        Some(InnerValue::List(items)) => {
            items.push(element.id);
            push_result(evaluation, Id::Void)
        }
        _ => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "add expects a list receiver",
        ),
    }
}

fn list_size(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    _args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    match this.list() {
        Some(items) => push_number(evaluation, items.len() as f64),
        None => evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "size expects a list receiver",
        ),
    }
}

fn list_get(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let index = single("List.get", &args)?;
    let (Some(items), Some(position)) = (this.list(), index.number()) else {
        return evaluation.raise_exception(
            BAD_PARAMETER_EXCEPTION_MODULE,
            "get expects a list receiver and a numeric index",
        );
    };
    if position < 0.0 || position >= items.len() as f64 {
        return evaluation.raise_exception(
            EXCEPTION_MODULE,
            &format!("index {position} out of bounds for a list of {}", items.len()),
        );
    }
    push_result(evaluation, items[position as usize])
}

fn list_equals(
    evaluation: &mut Evaluation,
    this: RuntimeObject,
    args: Vec<RuntimeObject>,
) -> Result<(), VmError> {
    let other = single("List.==", &args)?;
    let equal = match (this.list(), other.list()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    push_result(evaluation, Id::from_bool(equal))
}
