use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::bounded;
use ntest::timeout;

use rust_jvm_common::classfile::{ACC_PUBLIC, ACC_STATIC};
use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::mhn_consts::ReferenceKind;
use slow_interpreter::class_loading::define_class;
use slow_interpreter::java_values::JavaValue;
use slow_interpreter::stdlib::java::lang::invoke::direct_method_handle::prepared_lambda_form;
use slow_interpreter::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;
use slow_interpreter::view::ClassView;

use rust_jvm_invoke::{CallSite, InvokeError, Lookup, MethodType};

use crate::common::{counter, define_counter, define_greeter, greeter, ints, jvm, method_type, named, set_static};

mod common;

#[test]
fn integer_value_of_through_a_direct_handle() {
    let jvm = jvm();
    let value_of = Lookup::trusted().find_static(&jvm, CClassName::int(), "valueOf", &method_type("(I)Ljava/lang/Integer;")).unwrap();
    let boxed = value_of.invoke_exact(&jvm, ints(&[5])).unwrap();
    assert_eq!(boxed.try_unbox(), Some(JavaValue::Int(5)));

    let generic_type = method_type("(Ljava/lang/Object;)Ljava/lang/Object;");
    let generic = value_of.as_type(&jvm, &generic_type).unwrap();
    let boxed = generic.invoke(&jvm, &generic_type, vec![JavaValue::boxed(JavaValue::Int(5))]).unwrap();
    assert_eq!(boxed.try_unbox(), Some(JavaValue::Int(5)));
    let from_int = generic.invoke(&jvm, &method_type("(I)Ljava/lang/Object;"), ints(&[5])).unwrap();
    assert_eq!(from_int.try_unbox(), Some(JavaValue::Int(5)));
}

#[test]
#[timeout(10000)]
fn concurrent_plan_requests_share_one_plan() {
    let jvm = jvm();
    let invocation_type = MethodType::make(CPDType::DoubleType, vec![CPDType::Class(CClassName::new("plans/Receiver")), CPDType::LongType, CPDType::LongType]).unwrap();
    let forms = crossbeam::scope(|scope| {
        let requests = (0..2).map(|_| scope.spawn(|_| prepared_lambda_form(&jvm, &invocation_type, LambdaFormKind::InvokeVirtual).unwrap())).collect::<Vec<_>>();
        requests.into_iter().map(|request| request.join().unwrap()).collect::<Vec<_>>()
    }).unwrap();
    assert!(Arc::ptr_eq(&forms[0], &forms[1]));
    let cached = invocation_type.basic_type().form().cached_lambda_form(LambdaFormKind::InvokeVirtual).unwrap();
    assert!(Arc::ptr_eq(&forms[0], &cached));

    define_counter(&jvm);
    let handles = crossbeam::scope(|scope| {
        let lookups = (0..2).map(|_| scope.spawn(|_| Lookup::trusted().find_virtual(&jvm, counter(), "increment", &method_type("()I")).unwrap())).collect::<Vec<_>>();
        lookups.into_iter().map(|lookup| lookup.join().unwrap()).collect::<Vec<_>>()
    }).unwrap();
    assert!(Arc::ptr_eq(&handles[0].form(), &handles[1].form()));
}

#[test]
#[timeout(10000)]
fn static_getter_waits_for_a_foreign_initializer() {
    let jvm = jvm();
    let slow = CClassName::new("demo/Slow");
    let (started_tx, started_rx) = bounded::<i32>(1);
    let (release_tx, release_rx) = bounded::<()>(1);
    let slow_class = define_class(&jvm, ClassView::builder(slow)
        .field("value", "I", ACC_PUBLIC | ACC_STATIC)
        .method("<clinit>", "()V", ACC_STATIC, move |jvm, _| {
            let own_getter = Lookup::trusted().find_static_getter(jvm, slow, "value", CPDType::IntType)?;
            let seen = own_getter.invoke_exact(jvm, vec![])?.unwrap_int();
            started_tx.send(seen).map_err(|err| InvokeError::IllegalState(err.to_string()))?;
            release_rx.recv().map_err(|err| InvokeError::IllegalState(err.to_string()))?;
            let class = jvm.lookup_class(slow).ok_or_else(|| InvokeError::IllegalState("demo/Slow vanished".to_string()))?;
            set_static(&class, "value", JavaValue::Int(42));
            Ok(JavaValue::Top)
        })
        .build().unwrap(), jvm.new_loader()).unwrap();

    let getter = Lookup::trusted().find_static_getter(&jvm, slow, "value", CPDType::IntType).unwrap();
    let barrier_form = getter.form();
    let foreign_done = AtomicBool::new(false);
    crossbeam::scope(|scope| {
        let initializer = scope.spawn(|_| getter.invoke_exact(&jvm, vec![]));
        assert_eq!(started_rx.recv().unwrap(), 0);
        let foreign = scope.spawn(|_| {
            let res = getter.invoke_exact(&jvm, vec![]);
            foreign_done.store(true, Ordering::SeqCst);
            res
        });
        thread::sleep(Duration::from_millis(200));
        assert!(!foreign_done.load(Ordering::SeqCst));
        release_tx.send(()).unwrap();
        assert_eq!(initializer.join().unwrap().unwrap(), JavaValue::Int(42));
        assert_eq!(foreign.join().unwrap().unwrap(), JavaValue::Int(42));
    }).unwrap();
    assert!(slow_class.is_initialized());
    assert_eq!(getter.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(42));
    assert!(!Arc::ptr_eq(&barrier_form, &getter.form()));
}

#[test]
fn barrier_is_dropped_after_first_use() {
    let jvm = jvm();
    let counter_class = define_counter(&jvm);
    let zero = Lookup::trusted().find_static(&jvm, counter(), "zero", &method_type("()I")).unwrap();
    let barrier_form = zero.form();
    assert!(!counter_class.is_initialized());
    assert_eq!(zero.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(0));
    assert!(counter_class.is_initialized());
    let swapped = zero.form();
    assert!(!Arc::ptr_eq(&barrier_form, &swapped));
    assert_eq!(zero.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(0));
    assert!(Arc::ptr_eq(&swapped, &zero.form()));

    let later = Lookup::trusted().find_static(&jvm, counter(), "zero", &method_type("()I")).unwrap();
    assert!(Arc::ptr_eq(&later.form(), &swapped));
}

#[test]
fn thrown_exceptions_pass_through_unchanged() {
    let jvm = jvm();
    define_counter(&jvm);
    let fail = Lookup::trusted().find_static(&jvm, counter(), "fail", &method_type("()V")).unwrap();
    let err = fail.invoke_exact(&jvm, vec![]).unwrap_err();
    let thrown = err.try_unwrap_thrown().unwrap();
    assert_eq!(thrown.exception_obj.runtime_type(), CPDType::Class(CClassName::new("java/lang/IllegalStateException")));
    assert_eq!(err.to_string(), "java.lang.IllegalStateException: boom");
    let through_as_type = fail.as_type(&jvm, &method_type("()Ljava/lang/Object;")).unwrap();
    assert!(through_as_type.invoke_exact(&jvm, vec![]).unwrap_err().try_unwrap_thrown().is_some());
}

#[test]
fn instances_fields_and_virtual_calls() {
    let jvm = jvm();
    define_counter(&jvm);
    let lookup = Lookup::trusted();
    let constructor = lookup.find_constructor(&jvm, counter(), &method_type("()V")).unwrap();
    assert_eq!(constructor.type_(), &method_type("()Ldemo/Counter;"));
    let instance = constructor.invoke_exact(&jvm, vec![]).unwrap();
    let increment = lookup.find_virtual(&jvm, counter(), "increment", &method_type("()I")).unwrap();
    assert_eq!(increment.invoke_exact(&jvm, vec![instance.clone()]).unwrap(), JavaValue::Int(1));
    assert_eq!(increment.invoke_exact(&jvm, vec![instance.clone()]).unwrap(), JavaValue::Int(2));
    let count = lookup.find_getter(&jvm, counter(), "count", CPDType::IntType).unwrap();
    assert_eq!(count.invoke_exact(&jvm, vec![instance.clone()]).unwrap(), JavaValue::Int(2));

    let bound = increment.bind_to(&jvm, instance.clone()).unwrap();
    assert_eq!(bound.type_(), &method_type("()I"));
    assert_eq!(bound.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(3));
    let total = lookup.find_static_setter(&jvm, counter(), "total", CPDType::IntType).unwrap();
    total.invoke(&jvm, &method_type("(S)V"), vec![JavaValue::Short(12)]).unwrap();
    let get_total = lookup.find_static_getter(&jvm, counter(), "total", CPDType::IntType).unwrap();
    assert_eq!(get_total.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(12));
}

#[test]
fn interface_calls_on_object_methods_become_virtual() {
    let jvm = jvm();
    define_greeter(&jvm);
    let lookup = Lookup::trusted();
    let instance = lookup.find_constructor(&jvm, greeter(), &method_type("()V")).unwrap().invoke_exact(&jvm, vec![]).unwrap();

    let to_string = lookup.find_virtual(&jvm, named(), "toString", &method_type("()Ljava/lang/String;")).unwrap();
    assert_eq!(to_string.type_(), &method_type("(Ldemo/Named;)Ljava/lang/String;"));
    let info = lookup.reveal_direct(&jvm, &to_string).unwrap();
    assert_eq!(info.reference_kind(), ReferenceKind::InvokeVirtual);
    assert_eq!(info.declaring_class(), CClassName::object());
    assert_eq!(to_string.invoke_exact(&jvm, vec![instance.clone()]).unwrap().try_unwrap_string().unwrap(), "greeter");

    let name = lookup.find_virtual(&jvm, named(), "name", &method_type("()Ljava/lang/String;")).unwrap();
    assert_eq!(lookup.reveal_direct(&jvm, &name).unwrap().reference_kind(), ReferenceKind::InvokeInterface);
    let bound = name.bind_to(&jvm, instance).unwrap();
    assert_eq!(bound.type_(), &method_type("()Ljava/lang/String;"));
    assert_eq!(bound.invoke_exact(&jvm, vec![]).unwrap().try_unwrap_string().unwrap(), "hello");
    assert!(matches!(name.bind_to(&jvm, JavaValue::new_string("not named")), Err(InvokeError::ClassCast { .. })));
}

#[test]
fn call_sites_forward_to_their_current_target() {
    let jvm = jvm();
    define_counter(&jvm);
    let int_int = method_type("(I)I");
    let negate = Lookup::trusted().find_static(&jvm, counter(), "negate", &int_int).unwrap();

    let call_site = CallSite::new(&jvm, int_int.clone()).unwrap();
    assert!(matches!(call_site.get_target().invoke_exact(&jvm, ints(&[1])), Err(InvokeError::IllegalState(_))));
    let link_to_call_site = int_int.invokers().link_to_call_site_form(&jvm).unwrap();
    assert!(matches!(link_to_call_site.invoke(&jvm, vec![JavaValue::Int(3), call_site.clone().into()]), Err(InvokeError::IllegalState(_))));

    call_site.set_target(negate.clone()).unwrap();
    assert_eq!(link_to_call_site.invoke(&jvm, vec![JavaValue::Int(3), call_site.clone().into()]).unwrap(), JavaValue::Int(-3));
    assert_eq!(call_site.dynamic_invoker(&jvm).unwrap().invoke_exact(&jvm, ints(&[4])).unwrap(), JavaValue::Int(-4));

    let link_to_target = int_int.invokers().link_to_target_method_form(&jvm).unwrap();
    assert_eq!(link_to_target.invoke(&jvm, vec![JavaValue::Int(5), negate.clone().into()]).unwrap(), JavaValue::Int(-5));

    let fixed = CallSite::with_target(negate);
    assert_eq!(fixed.type_(), &int_int);
    assert!(matches!(fixed.set_target(call_site.dynamic_invoker(&jvm).unwrap().as_type(&jvm, &method_type("(I)J")).unwrap()), Err(InvokeError::WrongMethodType(_))));
}

#[test]
fn basic_invokers_are_shared_by_erasure() {
    let jvm = jvm();
    let strings = method_type("(Ljava/lang/String;)Ljava/lang/String;");
    let objects = method_type("(Ljava/lang/Object;)Ljava/lang/Object;");
    let a = strings.invokers().basic_invoker(&jvm).unwrap();
    let b = objects.invokers().basic_invoker(&jvm).unwrap();
    assert!(a.ptr_eq(&b));
    assert!(strings.invokers().exact_invoker(&jvm).unwrap().ptr_eq(&strings.invokers().exact_invoker(&jvm).unwrap()));
    assert!(!strings.invokers().exact_invoker(&jvm).unwrap().ptr_eq(&objects.invokers().exact_invoker(&jvm).unwrap()));
}
