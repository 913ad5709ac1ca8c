use ntest::timeout;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::CClassName;
use slow_interpreter::interpreter_util::new_array;
use slow_interpreter::java_values::JavaValue;

use rust_jvm_invoke::{InvokeError, Lookup, method_handles, MethodType};

use crate::common::{counter, define_counter, ints, jvm, method_type};

mod common;

#[test]
#[timeout(10000)]
fn signatures_are_interned_across_threads() {
    let ptypes = vec![CPDType::DoubleType, CPDType::Class(CClassName::new("prop/OnlyHere")), CPDType::FloatType];
    let made = crossbeam::scope(|scope| {
        let handles = (0..8).map(|_| scope.spawn(|_| MethodType::make(CPDType::CharType, ptypes.clone()).unwrap())).collect::<Vec<_>>();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    }).unwrap();
    assert!(made.iter().all(|method_type| method_type.ptr_eq(&made[0])));
    assert!(MethodType::make(CPDType::CharType, ptypes).unwrap().ptr_eq(&made[0]));
}

#[test]
fn slot_limit_counts_wide_parameters_twice() {
    assert!(MethodType::make(CPDType::VoidType, vec![CPDType::IntType; 254]).is_ok());
    assert!(matches!(MethodType::make(CPDType::VoidType, vec![CPDType::IntType; 255]), Err(InvokeError::SlotLimitExceeded { slots: 255 })));
    assert!(MethodType::make(CPDType::VoidType, vec![CPDType::LongType; 127]).is_ok());
    let mut ptypes = vec![CPDType::DoubleType; 127];
    ptypes.push(CPDType::IntType);
    assert!(matches!(MethodType::make(CPDType::VoidType, ptypes), Err(InvokeError::SlotLimitExceeded { .. })));
}

#[test]
fn as_type_to_own_type_is_identity() {
    let jvm = jvm();
    define_counter(&jvm);
    let negate = Lookup::trusted().find_static(&jvm, counter(), "negate", &method_type("(I)I")).unwrap();
    assert!(negate.as_type(&jvm, negate.type_()).unwrap().ptr_eq(&negate));
    let generic = method_type("(Ljava/lang/Object;)Ljava/lang/Object;");
    let first = negate.as_type(&jvm, &generic).unwrap();
    let second = negate.as_type(&jvm, &generic).unwrap();
    assert!(first.ptr_eq(&second));
    let long_result = method_type("(I)J");
    let widened = negate.as_type(&jvm, &long_result).unwrap();
    assert_eq!(widened.invoke_exact(&jvm, ints(&[4])).unwrap(), JavaValue::Long(-4));
    assert!(negate.as_type(&jvm, &generic).unwrap().ptr_eq(&negate.as_type(&jvm, &generic).unwrap()));
    assert!(matches!(negate.as_type(&jvm, &method_type("(Z)I")), Err(InvokeError::WrongMethodType(_))));
    assert!(matches!(negate.as_type(&jvm, &method_type("(II)I")), Err(InvokeError::WrongMethodType(_))));
}

#[test]
fn boxing_round_trip_preserves_ints() {
    let jvm = jvm();
    define_counter(&jvm);
    let negate = Lookup::trusted().find_static(&jvm, counter(), "negate", &method_type("(I)I")).unwrap();
    let generic = negate.as_type(&jvm, &method_type("(Ljava/lang/Object;)Ljava/lang/Object;")).unwrap();
    let round_trip = generic.as_type(&jvm, negate.type_()).unwrap();
    for value in [i32::MIN, -129, -1, 0, 1, 127, 128, 65536, i32::MAX] {
        assert_eq!(round_trip.invoke_exact(&jvm, ints(&[value])).unwrap(), negate.invoke_exact(&jvm, ints(&[value])).unwrap());
    }
    let boxed = generic.invoke_exact(&jvm, vec![JavaValue::boxed(JavaValue::Int(6))]).unwrap();
    assert_eq!(boxed.try_unbox(), Some(JavaValue::Int(-6)));
    assert!(matches!(generic.invoke_exact(&jvm, vec![JavaValue::new_string("six")]), Err(InvokeError::ClassCast { .. })));
    assert!(matches!(generic.invoke_exact(&jvm, vec![JavaValue::null()]), Err(InvokeError::NullPointer(_))));
}

#[test]
fn spreader_then_collector_is_the_original() {
    let jvm = jvm();
    define_counter(&jvm);
    let lookup = Lookup::trusted();
    let int_array = CPDType::array(CPDType::IntType);
    let cases = [("zero", "()I", vec![]), ("negate", "(I)I", ints(&[7])), ("sub", "(II)I", ints(&[10, 4]))];
    for (name, desc, args) in cases {
        let target = lookup.find_static(&jvm, counter(), name, &method_type(desc)).unwrap();
        let n = args.len();
        let spreader = target.as_spreader(&jvm, &int_array, n).unwrap();
        assert_eq!(spreader.type_().last_parameter_type(), Some(int_array));
        assert_eq!(spreader.invoke_exact(&jvm, vec![new_array(CPDType::IntType, args.clone())]).unwrap(), target.invoke_exact(&jvm, args.clone()).unwrap());
        let collector = spreader.as_collector(&jvm, &int_array, n).unwrap();
        assert_eq!(collector.type_(), target.type_());
        assert_eq!(collector.invoke_exact(&jvm, args.clone()).unwrap(), target.invoke_exact(&jvm, args).unwrap());
    }
    let sub = lookup.find_static(&jvm, counter(), "sub", &method_type("(II)I")).unwrap();
    let spreader = sub.as_spreader(&jvm, &int_array, 2).unwrap();
    assert!(matches!(spreader.invoke_exact(&jvm, vec![new_array(CPDType::IntType, ints(&[1]))]), Err(InvokeError::IllegalArgument(_))));
    assert!(matches!(sub.as_spreader(&jvm, &int_array, 3), Err(InvokeError::IllegalArgument(_))));
    assert!(matches!(sub.as_collector(&jvm, &int_array, 2), Err(InvokeError::IllegalArgument(_))));
}

#[test]
fn varargs_collects_only_loose_arguments() {
    let jvm = jvm();
    define_counter(&jvm);
    let count = Lookup::trusted().find_static(&jvm, counter(), "count", &method_type("([Ljava/lang/Object;)I")).unwrap();
    assert!(count.is_varargs_collector());
    let array = new_array(CPDType::object(), vec![JavaValue::null(), JavaValue::null(), JavaValue::null()]);
    assert_eq!(count.invoke(&jvm, &method_type("([Ljava/lang/Object;)I"), vec![array.clone()]).unwrap(), JavaValue::Int(3));
    assert_eq!(count.invoke_exact(&jvm, vec![array]).unwrap(), JavaValue::Int(3));
    assert_eq!(count.invoke(&jvm, &method_type("()I"), vec![]).unwrap(), JavaValue::Int(0));
    let two = vec![JavaValue::new_string("a"), JavaValue::boxed(JavaValue::Int(1))];
    assert_eq!(count.invoke(&jvm, &method_type("(Ljava/lang/String;Ljava/lang/Object;)I"), two).unwrap(), JavaValue::Int(2));
    assert_eq!(count.invoke(&jvm, &method_type("(Ljava/lang/String;)I"), vec![JavaValue::new_string("a")]).unwrap(), JavaValue::Int(1));
    assert_eq!(count.invoke(&jvm, &method_type("(II)I"), ints(&[1, 2])).unwrap(), JavaValue::Int(2));

    let fixed = count.as_fixed_arity();
    assert!(!fixed.is_varargs_collector());
    assert!(matches!(fixed.invoke(&jvm, &method_type("(II)I"), ints(&[1, 2])), Err(InvokeError::WrongMethodType(_))));
    let again = fixed.as_varargs_collector(&jvm, &CPDType::object_array()).unwrap();
    assert_eq!(again.invoke(&jvm, &method_type("(I)I"), ints(&[5])).unwrap(), JavaValue::Int(1));
    assert!(matches!(fixed.as_varargs_collector(&jvm, &CPDType::array(CPDType::IntType)), Err(InvokeError::IllegalArgument(_))));
}

#[test]
fn bind_to_checks_the_leading_parameter() {
    let jvm = jvm();
    let int_identity = method_handles::identity(&jvm, CPDType::IntType).unwrap();
    assert!(matches!(int_identity.bind_to(&jvm, JavaValue::Int(1)), Err(InvokeError::IllegalArgument(_))));
    let nothing = method_handles::constant(&jvm, CPDType::string(), JavaValue::new_string("x")).unwrap();
    assert!(matches!(nothing.bind_to(&jvm, JavaValue::new_string("y")), Err(InvokeError::IllegalArgument(_))));

    let string_identity = method_handles::identity(&jvm, CPDType::string()).unwrap();
    assert!(matches!(string_identity.bind_to(&jvm, JavaValue::boxed(JavaValue::Int(1))), Err(InvokeError::ClassCast { .. })));
    let bound = string_identity.bind_to(&jvm, JavaValue::new_string("bound")).unwrap();
    assert_eq!(bound.type_(), &method_type("()Ljava/lang/String;"));
    assert_eq!(bound.invoke_exact(&jvm, vec![]).unwrap().try_unwrap_string().unwrap(), "bound");
    let bound_null = string_identity.bind_to(&jvm, JavaValue::null()).unwrap();
    assert!(bound_null.invoke_exact(&jvm, vec![]).unwrap().is_null());
}

#[test]
fn invoke_with_arguments_boxes_and_spreads() {
    let jvm = jvm();
    define_counter(&jvm);
    let sub = Lookup::trusted().find_static(&jvm, counter(), "sub", &method_type("(II)I")).unwrap();
    let result = sub.invoke_with_arguments(&jvm, ints(&[9, 2])).unwrap();
    assert_eq!(result.try_unbox(), Some(JavaValue::Int(7)));
    assert!(matches!(sub.invoke_with_arguments(&jvm, ints(&[9])), Err(InvokeError::WrongMethodType(_))));
}

#[test]
fn exact_invocation_checks_arity_and_basic_types() {
    let jvm = jvm();
    define_counter(&jvm);
    let sub = Lookup::trusted().find_static(&jvm, counter(), "sub", &method_type("(II)I")).unwrap();
    assert!(matches!(sub.invoke_exact(&jvm, ints(&[1])), Err(InvokeError::WrongMethodType(_))));
    assert!(matches!(sub.invoke_exact(&jvm, vec![JavaValue::Int(1), JavaValue::Long(2)]), Err(InvokeError::WrongMethodType(_))));
    for i in 0..50 {
        assert_eq!(sub.invoke_exact(&jvm, ints(&[i, 1])).unwrap(), JavaValue::Int(i - 1));
    }
    assert!(sub.form().is_compiled());
}
