//! Message dispatch edges: messageNotUnderstood, identity equality, and
//! super-calls that run off the top of the hierarchy.

mod common;

use common::{number_of, run_body, run_session};
use wollok_model::lang::{
    MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE, OBJECT_MODULE, STRING_MODULE,
};
use wollok_model::Param;

#[test]
fn a_user_defined_message_not_understood_receives_name_and_args() {
    // class H { method messageNotUnderstood(name, args) = args }
    let (evaluation, result) = run_session(|b| {
        let pkg = b.package("tests");
        let h = b.class(pkg, "H", Some(OBJECT_MODULE));
        let mnu_body = {
            let args = b.reference("args");
            let ret = b.return_value(args);
            b.body(vec![ret])
        };
        b.method(
            h,
            "messageNotUnderstood",
            vec![Param::new("name"), Param::new("args")],
            Some(mnu_body),
        );
        let instance = b.new_instance("tests.H", vec![]);
        let one = b.number(1.0);
        let two = b.number(2.0);
        let call = b.send(instance, "foo", vec![one, two]);
        b.body(vec![call])
    });
    let result = result.unwrap();
    let items = result.list().expect("args must arrive as a list").to_vec();
    assert_eq!(items.len(), 2);
    let values: Vec<f64> = items
        .iter()
        .map(|&id| evaluation.heap.get(id).unwrap().number().unwrap())
        .collect();
    assert_eq!(values, [1.0, 2.0]);
}

#[test]
fn message_not_understood_receives_the_message_name_as_a_string() {
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let h = b.class(pkg, "H", Some(OBJECT_MODULE));
        let mnu_body = {
            let name = b.reference("name");
            let ret = b.return_value(name);
            b.body(vec![ret])
        };
        b.method(
            h,
            "messageNotUnderstood",
            vec![Param::new("name"), Param::new("args")],
            Some(mnu_body),
        );
        let instance = b.new_instance("tests.H", vec![]);
        let call = b.send(instance, "foo", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(&*result.module, STRING_MODULE);
    assert_eq!(result.string().map(|s| &**s), Some("foo"));
}

#[test]
fn the_default_message_not_understood_raises_a_language_exception() {
    let result = run_body(|b| {
        let try_body = {
            let instance = b.new_instance(OBJECT_MODULE, vec![]);
            let call = b.send(instance, "foo", vec![]);
            b.body(vec![call])
        };
        let ninetynine = b.number(99.0);
        let handler = b.body(vec![ninetynine]);
        let guarded = b.try_expr(
            try_body,
            vec![("e", MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE, handler)],
            None,
        );
        b.body(vec![guarded])
    })
    .unwrap();
    assert_eq!(number_of(&result), 99.0);
}

#[test]
fn super_calls_above_the_root_fall_back_to_message_not_understood() {
    // class A { method m() = super() } has no class above Object to answer.
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let a = b.class(pkg, "A", Some(OBJECT_MODULE));
        let m_body = {
            let sup = b.super_send(vec![]);
            let ret = b.return_value(sup);
            b.body(vec![ret])
        };
        b.method(a, "m", vec![], Some(m_body));

        let try_body = {
            let instance = b.new_instance("tests.A", vec![]);
            let call = b.send(instance, "m", vec![]);
            b.body(vec![call])
        };
        let ninetynine = b.number(99.0);
        let handler = b.body(vec![ninetynine]);
        let guarded = b.try_expr(
            try_body,
            vec![("e", MESSAGE_NOT_UNDERSTOOD_EXCEPTION_MODULE, handler)],
            None,
        );
        b.body(vec![guarded])
    })
    .unwrap();
    assert_eq!(number_of(&result), 99.0);
}

#[test]
fn object_equality_is_identity() {
    let result = run_body(|b| {
        let left = b.new_instance(OBJECT_MODULE, vec![]);
        let right = b.new_instance(OBJECT_MODULE, vec![]);
        let compare = b.send(left, "==", vec![right]);
        b.body(vec![compare])
    })
    .unwrap();
    assert_eq!(result.boolean(), Some(false));

    let result = run_body(|b| {
        let instance = b.new_instance(OBJECT_MODULE, vec![]);
        let declare = b.variable("o", instance);
        let left = b.reference("o");
        let right = b.reference("o");
        let compare = b.send(left, "==", vec![right]);
        b.body(vec![declare, compare])
    })
    .unwrap();
    assert_eq!(result.boolean(), Some(true));
}

#[test]
fn number_equality_compares_values_across_allocations() {
    let result = run_body(|b| {
        let left = b.number(3.0);
        let right = b.number(3.0);
        let compare = b.send(left, "==", vec![right]);
        b.body(vec![compare])
    })
    .unwrap();
    assert_eq!(result.boolean(), Some(true));
}

#[test]
fn booleans_answer_their_logic_messages() {
    let result = run_body(|b| {
        let truth = b.boolean(true);
        let falsity = b.boolean(false);
        let conjunction = b.send(truth, "&&", vec![falsity]);
        b.body(vec![conjunction])
    })
    .unwrap();
    assert_eq!(result.boolean(), Some(false));

    let result = run_body(|b| {
        let falsity = b.boolean(false);
        let negated = b.send(falsity, "negate", vec![]);
        b.body(vec![negated])
    })
    .unwrap();
    assert_eq!(result.boolean(), Some(true));
}

#[test]
fn strings_concatenate_and_measure() {
    let result = run_body(|b| {
        let hello = b.string("hello ");
        let world = b.string("world");
        let joined = b.send(hello, "+", vec![world]);
        b.body(vec![joined])
    })
    .unwrap();
    assert_eq!(result.string().map(|s| &**s), Some("hello world"));

    let result = run_body(|b| {
        let word = b.string("hola");
        let length = b.send(word, "length", vec![]);
        b.body(vec![length])
    })
    .unwrap();
    assert_eq!(number_of(&result), 4.0);
}

#[test]
fn anonymous_singletons_evaluate_to_fresh_initialized_instances() {
    let result = run_body(|b| {
        let anon = b.anonymous_singleton(OBJECT_MODULE, vec![]);
        let five = b.number(5.0);
        b.field(anon, "x", five);
        let getter = {
            let field = b.reference("x");
            let ret = b.return_value(field);
            b.body(vec![ret])
        };
        b.method(anon, "x", vec![], Some(getter));
        let literal = b.literal_of(anon);
        let call = b.send(literal, "x", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 5.0);
}
