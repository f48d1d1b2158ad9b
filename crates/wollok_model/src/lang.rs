//! The `wollok.lang` core library skeleton.
//!
//! Enough of the language library to bootstrap real programs: the root class,
//! the primitive wrappers, and the exception hierarchy. Methods marked native
//! are implemented by the host's native registry.

use crate::builder::EnvironmentBuilder;
use crate::node::{BaseCall, Param};

pub const OBJECT_MODULE: &str = "wollok.lang.Object";
pub const BOOLEAN_MODULE: &str = "wollok.lang.Boolean";
pub const NUMBER_MODULE: &str = "wollok.lang.Number";
pub const STRING_MODULE: &str = "wollok.lang.String";
pub const LIST_MODULE: &str = "wollok.lang.List";
pub const EXCEPTION_MODULE: &str = "wollok.lang.Exception";
pub const BAD_PARAMETER_EXCEPTION_MODULE: &str = "wollok.lang.BadParameterException";
pub const MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE: &str =
    "wollok.lang.MessageNotUnderstoodException";

/// Install the `wollok.lang` package into a builder.
pub fn install(b: &mut EnvironmentBuilder) {
    let wollok = b.package("wollok");
    let lang = b.subpackage(wollok, "lang");

    let object = b.class(lang, "Object", None);
    b.native_method(object, "==", vec![Param::new("other")]);
    b.native_method(object, "!=", vec![Param::new("other")]);
    b.native_method(object, "messageNotUnderstood", vec![
        Param::new("messageName"),
        Param::new("parameters"),
    ]);

    let boolean = b.class(lang, "Boolean", Some(OBJECT_MODULE));
    b.native_method(boolean, "&&", vec![Param::new("other")]);
    b.native_method(boolean, "||", vec![Param::new("other")]);
    b.native_method(boolean, "negate", vec![]);

    let number = b.class(lang, "Number", Some(OBJECT_MODULE));
    for op in ["+", "-", "*", "/", ">", "<", ">=", "<=", "=="] {
        b.native_method(number, op, vec![Param::new("other")]);
    }

    let string = b.class(lang, "String", Some(OBJECT_MODULE));
    b.native_method(string, "+", vec![Param::new("other")]);
    b.native_method(string, "==", vec![Param::new("other")]);
    b.native_method(string, "length", vec![]);

    let list = b.class(lang, "List", Some(OBJECT_MODULE));
    b.native_method(list, "add", vec![Param::new("element")]);
    b.native_method(list, "size", vec![]);
    b.native_method(list, "get", vec![Param::new("index")]);
    b.native_method(list, "==", vec![Param::new("other")]);

    let exception = b.class(lang, "Exception", Some(OBJECT_MODULE));
    let null = b.null_literal();
    b.field(exception, "message", null);
    let empty = b.body(vec![]);
    b.constructor(exception, vec![], BaseCall::implicit(), empty);
    let assign_body = {
        let target = b.reference("message");
        let value = b.reference("aMessage");
        let assign = b.assignment(target, value);
        b.body(vec![assign])
    };
    b.constructor(exception, vec![Param::new("aMessage")], BaseCall::implicit(), assign_body);
    let message_body = {
        let field = b.reference("message");
        let ret = b.return_value(field);
        b.body(vec![ret])
    };
    b.method(exception, "message", vec![], Some(message_body));

    for name in ["BadParameterException", "MessageNotUnderstoodException"] {
        let class = b.class(lang, name, Some(EXCEPTION_MODULE));
        let empty = b.body(vec![]);
        b.constructor(class, vec![], BaseCall::implicit(), empty);
        let empty = b.body(vec![]);
        let arg = b.reference("aMessage");
        b.constructor(
            class,
            vec![Param::new("aMessage")],
            BaseCall::to_super(vec![arg]),
            empty,
        );
    }
}
