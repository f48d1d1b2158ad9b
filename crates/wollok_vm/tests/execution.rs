//! End-to-end execution scenarios: literals, fields, dispatch, constructors
//! and the singleton bootstrap.

mod common;

use common::{number_of, run_body, run_session};
use wollok_model::lang::{NUMBER_MODULE, OBJECT_MODULE};
use wollok_model::{BaseCall, Param};
use wollok_vm::Id;

#[test]
fn a_number_literal_evaluates_to_a_rounded_number_instance() {
    let result = run_body(|b| {
        let n = b.number(42.0);
        b.body(vec![n])
    })
    .unwrap();
    assert_eq!(&*result.module, NUMBER_MODULE);
    assert_eq!(number_of(&result), 42.0);

    let result = run_body(|b| {
        let n = b.number(1.23456789);
        b.body(vec![n])
    })
    .unwrap();
    assert_eq!(number_of(&result), 1.2346);
}

#[test]
fn field_writes_are_visible_to_subsequent_reads() {
    // class C { var x = 0; method bump() { x = x + 1; return x } }
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let c = b.class(pkg, "C", Some(OBJECT_MODULE));
        let zero = b.number(0.0);
        b.field(c, "x", zero);
        let bump_body = {
            let x = b.reference("x");
            let one = b.number(1.0);
            let sum = b.send(x, "+", vec![one]);
            let target = b.reference("x");
            let update = b.assignment(target, sum);
            let x_again = b.reference("x");
            let ret = b.return_value(x_again);
            b.body(vec![update, ret])
        };
        b.method(c, "bump", vec![], Some(bump_body));

        let instance = b.new_instance("tests.C", vec![]);
        let call = b.send(instance, "bump", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 1.0);
}

#[test]
fn super_dispatch_starts_above_the_anchor_class() {
    // class A { method m() = 1 }; class B extends A { method m() = super() + 10 }
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let a = b.class(pkg, "A", Some(OBJECT_MODULE));
        let a_body = {
            let one = b.number(1.0);
            let ret = b.return_value(one);
            b.body(vec![ret])
        };
        b.method(a, "m", vec![], Some(a_body));

        let b_class = b.class(pkg, "B", Some("tests.A"));
        let b_body = {
            let sup = b.super_send(vec![]);
            let ten = b.number(10.0);
            let sum = b.send(sup, "+", vec![ten]);
            let ret = b.return_value(sum);
            b.body(vec![ret])
        };
        b.method(b_class, "m", vec![], Some(b_body));

        let instance = b.new_instance("tests.B", vec![]);
        let call = b.send(instance, "m", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 11.0);
}

#[test]
fn constructor_arguments_flow_through_the_base_call() {
    // class A { var tag = 0; constructor(t) { tag = t } }
    // class B extends A { constructor(t) = super(t) }
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let a = b.class(pkg, "A", Some(OBJECT_MODULE));
        let zero = b.number(0.0);
        b.field(a, "tag", zero);
        let a_ctor_body = {
            let target = b.reference("tag");
            let value = b.reference("t");
            let assign = b.assignment(target, value);
            b.body(vec![assign])
        };
        b.constructor(a, vec![Param::new("t")], BaseCall::implicit(), a_ctor_body);

        let b_class = b.class(pkg, "B", Some("tests.A"));
        let empty = b.body(vec![]);
        let arg = b.reference("t");
        b.constructor(b_class, vec![Param::new("t")], BaseCall::to_super(vec![arg]), empty);

        let seven = b.number(7.0);
        let instance = b.new_instance("tests.B", vec![seven]);
        let read = b.send(instance, "tag", vec![]);
        let getter_body = {
            let field = b.reference("tag");
            let ret = b.return_value(field);
            b.body(vec![ret])
        };
        b.method(a, "tag", vec![], Some(getter_body));
        b.body(vec![read])
    })
    .unwrap();
    assert_eq!(number_of(&result), 7.0);
}

#[test]
fn field_initializers_run_superclass_first_in_declaration_order() {
    // Subclass initializer reads a field declared (and initialized) in the
    // superclass.
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let a = b.class(pkg, "A", Some(OBJECT_MODULE));
        let five = b.number(5.0);
        b.field(a, "base", five);
        let b_class = b.class(pkg, "B", Some("tests.A"));
        let derived_init = {
            let base = b.reference("base");
            let one = b.number(1.0);
            b.send(base, "+", vec![one])
        };
        b.field(b_class, "derived", derived_init);
        let getter = {
            let field = b.reference("derived");
            let ret = b.return_value(field);
            b.body(vec![ret])
        };
        b.method(b_class, "derived", vec![], Some(getter));

        let instance = b.new_instance("tests.B", vec![]);
        let call = b.send(instance, "derived", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 6.0);
}

#[test]
fn varargs_bind_the_tail_into_a_fresh_list() {
    // method m(a, rest...) = rest
    let (evaluation, result) = run_session(|b| {
        let pkg = b.package("tests");
        let v = b.class(pkg, "V", Some(OBJECT_MODULE));
        let m_body = {
            let rest = b.reference("rest");
            let ret = b.return_value(rest);
            b.body(vec![ret])
        };
        b.method(v, "m", vec![Param::new("a"), Param::vararg("rest")], Some(m_body));

        let instance = b.new_instance("tests.V", vec![]);
        let one = b.number(1.0);
        let two = b.number(2.0);
        let three = b.number(3.0);
        let call = b.send(instance, "m", vec![one, two, three]);
        b.body(vec![call])
    });
    let result = result.unwrap();
    let items = result.list().expect("vararg parameter must be a list").to_vec();
    assert_eq!(items.len(), 2);
    let values: Vec<f64> = items
        .iter()
        .map(|&id| evaluation.heap.get(id).unwrap().number().unwrap())
        .collect();
    assert_eq!(values, [2.0, 3.0]);
}

#[test]
fn varargs_with_no_tail_actuals_produce_an_empty_list() {
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let v = b.class(pkg, "V", Some(OBJECT_MODULE));
        let m_body = {
            let rest = b.reference("rest");
            let size = b.send(rest, "size", vec![]);
            let ret = b.return_value(size);
            b.body(vec![ret])
        };
        b.method(v, "m", vec![Param::new("a"), Param::vararg("rest")], Some(m_body));

        let instance = b.new_instance("tests.V", vec![]);
        let one = b.number(1.0);
        let call = b.send(instance, "m", vec![one]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 0.0);
}

#[test]
fn global_singletons_are_initialized_during_bootstrap() {
    let result = run_body(|b| {
        let pkg = b.package("tests");
        let registry = b.singleton(pkg, "registry", OBJECT_MODULE, vec![]);
        let five = b.number(5.0);
        b.field(registry, "count", five);
        let getter = {
            let field = b.reference("count");
            let ret = b.return_value(field);
            b.body(vec![ret])
        };
        b.method(registry, "count", vec![], Some(getter));

        let target = b.reference("registry");
        let call = b.send(target, "count", vec![]);
        b.body(vec![call])
    })
    .unwrap();
    assert_eq!(number_of(&result), 5.0);
}

#[test]
fn every_reachable_id_is_backed_by_the_heap() {
    let (evaluation, result) = run_session(|b| {
        let pkg = b.package("tests");
        let registry = b.singleton(pkg, "registry", OBJECT_MODULE, vec![]);
        let word = b.string("state");
        b.field(registry, "label", word);
        let n = b.number(3.0);
        b.body(vec![n])
    });
    result.unwrap();

    for frame in &evaluation.frame_stack {
        for &id in &frame.operand_stack {
            assert!(evaluation.heap.contains(id), "operand {id} must be allocated");
        }
        for (name, &id) in &frame.locals {
            assert!(evaluation.heap.contains(id), "local {name} = {id} must be allocated");
        }
    }
    let ids: Vec<Id> = evaluation.heap.ids().collect();
    for id in ids {
        let object = evaluation.heap.get(id).unwrap();
        for (field, &value) in &object.fields {
            assert!(
                evaluation.heap.contains(value),
                "field {field} of {id} must be allocated"
            );
        }
        if let Some(items) = object.list() {
            for &item in items {
                assert!(evaluation.heap.contains(item));
            }
        }
    }
}

#[test]
fn cloned_evaluations_run_to_identical_heaps() {
    let build = |b: &mut wollok_model::EnvironmentBuilder| {
        let pkg = b.package("tests");
        let c = b.class(pkg, "C", Some(OBJECT_MODULE));
        let zero = b.number(0.0);
        b.field(c, "x", zero);
        let bump_body = {
            let x = b.reference("x");
            let one = b.number(1.0);
            let sum = b.send(x, "+", vec![one]);
            let target = b.reference("x");
            let update = b.assignment(target, sum);
            let x_again = b.reference("x");
            let ret = b.return_value(x_again);
            b.body(vec![update, ret])
        };
        b.method(c, "bump", vec![], Some(bump_body));
        let instance = b.new_instance("tests.C", vec![]);
        let call = b.send(instance, "bump", vec![]);
        b.body(vec![call])
    };

    let mut builder = wollok_model::EnvironmentBuilder::new();
    wollok_model::lang::install(&mut builder);
    let body = build(&mut builder);
    let environment = std::rc::Rc::new(builder.link().unwrap());
    let natives = wollok_vm::NativeRegistry::with_lang();
    let mut evaluation =
        wollok_vm::build_evaluation_for(std::rc::Rc::clone(&environment)).unwrap();
    wollok_vm::bootstrap(&mut evaluation, &natives).unwrap();

    let mut left = evaluation.deep_clone();
    let mut right = evaluation.deep_clone();
    let left_result = wollok_vm::run(&mut left, &natives, body).unwrap();
    let right_result = wollok_vm::run(&mut right, &natives, body).unwrap();

    assert_eq!(left_result.id, right_result.id);
    assert_eq!(left.heap.len(), right.heap.len());
    for id in left.heap.ids() {
        let a = left.heap.get(id).unwrap();
        let b = right.heap.get(id).unwrap();
        assert_eq!(a.module, b.module, "module of {id}");
        assert_eq!(a.inner, b.inner, "inner of {id}");
        assert_eq!(a.fields, b.fields, "fields of {id}");
    }
}
