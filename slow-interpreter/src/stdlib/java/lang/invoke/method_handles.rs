use std::sync::Arc;

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::instance_of_common::instance_of;
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::bound_method_handle::BoundMethodHandle;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaFormBuilder;
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::method_type_form::LambdaFormKind;
use crate::stdlib::java::lang::invoke::simple_method_handle;

/// `(T)T`, returning its argument.
pub fn identity(jvm: &JVMState, type_: CPDType) -> InvokeResult<MethodHandle> {
    if type_.is_void() {
        return Err(InvokeError::IllegalArgument("identity of void".to_string()));
    }
    let mtype = MethodType::make(type_, vec![type_])?;
    let basic_type = mtype.basic_type();
    let type_form = basic_type.form();
    let form = match type_form.cached_lambda_form(LambdaFormKind::Identity) {
        Some(form) => form,
        None => {
            let basic = BasicType::from_type(&type_);
            let mut builder = LambdaFormBuilder::new("MH.identity", &[BasicType::L, basic]);
            builder.add(basic, Intrinsic::Identity, vec![builder.param(1)]);
            type_form.set_cached_lambda_form(LambdaFormKind::Identity, Arc::new(builder.build_returning_last(jvm)?))
        }
    };
    simple_method_handle::make(mtype, form)
}

/// `()T`, always returning `value` converted to `type_`.
pub fn constant(jvm: &JVMState, type_: CPDType, value: JavaValue) -> InvokeResult<MethodHandle> {
    if type_.is_void() {
        return Err(InvokeError::IllegalArgument("constant of void".to_string()));
    }
    insert_arguments(jvm, &identity(jvm, type_)?, 0, vec![value])
}

/// `value` in the representation of a parameter of type `ptype`: primitives widened or unboxed,
/// references checked and primitives boxed.
fn convert_bound_value(jvm: &JVMState, ptype: &CPDType, value: JavaValue) -> InvokeResult<JavaValue> {
    match Wrapper::for_primitive_type(ptype) {
        Some(to) => {
            let primitive = match value.primitive_wrapper() {
                Some(_) => value.clone(),
                None => value.try_unbox().ok_or_else(|| InvokeError::class_cast(format!("{:?}", value), ptype.java_source_representation()))?,
            };
            match primitive.primitive_wrapper() {
                Some(from) if to.is_convertible_from(from) => primitive.convert_primitive(to).ok_or_else(|| InvokeError::class_cast(format!("{:?}", primitive), ptype.java_source_representation())),
                _ => Err(InvokeError::class_cast(format!("{:?}", primitive), ptype.java_source_representation())),
            }
        }
        None => {
            let value = match value.primitive_wrapper() {
                Some(_) => JavaValue::boxed(value),
                None => value,
            };
            if let Some(object) = value.to_object()? {
                if !instance_of(jvm, object.as_ref(), ptype) {
                    return Err(InvokeError::class_cast(object.runtime_type().java_source_representation(), ptype.java_source_representation()));
                }
            }
            Ok(value)
        }
    }
}

/// `target` with parameters `pos..pos + values.len()` fixed to `values`.
pub fn insert_arguments(jvm: &JVMState, target: &MethodHandle, pos: usize, values: Vec<JavaValue>) -> InvokeResult<MethodHandle> {
    let ptypes = target.type_().parameter_list().to_vec();
    if pos > ptypes.len() || pos + values.len() > ptypes.len() {
        return Err(InvokeError::IllegalArgument(format!("too many values to insert: {} at {} into {}", values.len(), pos, target.type_())));
    }
    if values.is_empty() {
        return Ok(target.clone());
    }
    let mut res = target.rebind(jvm)?;
    for (i, value) in values.into_iter().enumerate() {
        let value = convert_bound_value(jvm, &ptypes[pos + i], value)?;
        res = res.bind_argument(jvm, pos, value)?;
    }
    Ok(res)
}

/// `target` with ignored parameters of `value_types` inserted at `pos`.
pub fn drop_arguments(jvm: &JVMState, target: &MethodHandle, pos: usize, value_types: &[CPDType]) -> InvokeResult<MethodHandle> {
    if value_types.is_empty() {
        return Ok(target.clone());
    }
    let old_type = target.type_();
    if pos > old_type.parameter_count() {
        return Err(InvokeError::IllegalArgument(format!("no argument type to remove at {} in {}", pos, old_type)));
    }
    let new_type = old_type.insert_parameter_types(pos, value_types)?;
    let rebound = target.rebind(jvm)?;
    let form = rebound.form().add_arguments(jvm, pos + 1, &BasicType::from_types(value_types))?;
    BoundMethodHandle::copy_with(&rebound, new_type, Arc::new(form))
}

/// `target` adapted to `new_type`, where target parameter `i` is new parameter `reorder[i]`.
pub fn permute_arguments(jvm: &JVMState, target: &MethodHandle, new_type: &MethodType, reorder: &[usize]) -> InvokeResult<MethodHandle> {
    let old_type = target.type_();
    if new_type.return_type() != old_type.return_type() {
        return Err(InvokeError::IllegalArgument(format!("return types do not match: {} and {}", old_type, new_type)));
    }
    if reorder.len() != old_type.parameter_count() {
        return Err(InvokeError::IllegalArgument(format!("bad reorder array: {:?}", reorder)));
    }
    for (j, i) in reorder.iter().enumerate() {
        let src = new_type.parameter_list().get(*i).ok_or_else(|| InvokeError::IllegalArgument(format!("bad reorder array: {:?}", reorder)))?;
        if *src != old_type.parameter_list()[j] {
            return Err(InvokeError::IllegalArgument(format!("parameter types do not match after reorder: {} and {}", old_type, new_type)));
        }
    }
    let rebound = target.rebind(jvm)?;
    let form = rebound.form().permute_arguments(jvm, 1, reorder, &BasicType::from_types(new_type.parameter_list()))?;
    BoundMethodHandle::copy_with(&rebound, new_type.clone(), Arc::new(form))
}

pub fn exact_invoker(jvm: &JVMState, type_: &MethodType) -> InvokeResult<MethodHandle> {
    type_.invokers().exact_invoker(jvm)
}

pub fn invoker(jvm: &JVMState, type_: &MethodType) -> InvokeResult<MethodHandle> {
    type_.invokers().generic_invoker(jvm)
}

pub fn spread_invoker(jvm: &JVMState, type_: &MethodType, leading_arg_count: usize) -> InvokeResult<MethodHandle> {
    if leading_arg_count > type_.parameter_count() {
        return Err(InvokeError::IllegalArgument(format!("bad argument count {}", leading_arg_count)));
    }
    let spread_type = type_.as_spreader_type(&CPDType::object_array(), type_.parameter_count() - leading_arg_count)?;
    spread_type.invokers().spread_invoker(jvm, leading_arg_count)
}

pub fn varargs_invoker(jvm: &JVMState, type_: &MethodType) -> InvokeResult<MethodHandle> {
    type_.invokers().varargs_invoker(jvm)
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::classfile::{ACC_PUBLIC, ACC_STATIC};
    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::{CClassName, MethodName};
    use rust_jvm_common::mhn_consts::ReferenceKind;

    use crate::bootstrap_classes::arg;
    use crate::class_loading::define_class;
    use crate::exceptions::InvokeError;
    use crate::interpreter_util::new_array;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::stdlib::java::lang::invoke::direct_method_handle::DirectMethodHandle;
    use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
    use crate::stdlib::java::lang::invoke::method_handles;
    use crate::stdlib::java::lang::invoke::method_type::MethodType;
    use crate::stdlib::java::lang::member_name::{MemberName, MemberNameFactory};
    use crate::view::ClassView;

    fn arith() -> CClassName {
        CClassName::new("test/Arith")
    }

    fn jvm_with_arith() -> JVMState {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        define_class(&jvm, ClassView::builder(arith())
            .method("sub", "(II)I", ACC_PUBLIC | ACC_STATIC, |_, args| Ok(JavaValue::Int(arg(&args, 0)?.unwrap_int() - arg(&args, 1)?.unwrap_int())))
            .method("repeat", "(Ljava/lang/String;I)Ljava/lang/String;", ACC_PUBLIC | ACC_STATIC, |_, args| {
                let string = arg(&args, 0)?.try_unwrap_string().unwrap_or_default();
                Ok(JavaValue::new_string(string.repeat(arg(&args, 1)?.unwrap_int() as usize)))
            })
            .build().unwrap(), jvm.new_loader()).unwrap();
        jvm
    }

    fn find_static(jvm: &JVMState, name: &str, desc: &str) -> MethodHandle {
        let member = MemberName::new_method(arith(), MethodName::new(name), MethodType::from_method_descriptor_string(desc).unwrap(), ReferenceKind::InvokeStatic).unwrap();
        let resolved = MemberNameFactory::resolve_or_fail(jvm, ReferenceKind::InvokeStatic, &member, None).unwrap();
        DirectMethodHandle::make_from_member(jvm, &resolved).unwrap()
    }

    fn ints(values: &[i32]) -> Vec<JavaValue> {
        values.iter().map(|value| JavaValue::Int(*value)).collect()
    }

    fn boxed_ints(values: &[i32]) -> JavaValue {
        new_array(CPDType::object(), values.iter().map(|value| JavaValue::boxed(JavaValue::Int(*value))).collect())
    }

    #[test]
    pub fn identity_and_constant() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let identity = method_handles::identity(&jvm, CPDType::IntType).unwrap();
        assert_eq!(identity.type_(), &MethodType::make(CPDType::IntType, vec![CPDType::IntType]).unwrap());
        assert_eq!(identity.invoke_exact(&jvm, ints(&[5])).unwrap(), JavaValue::Int(5));
        assert!(matches!(method_handles::identity(&jvm, CPDType::VoidType), Err(InvokeError::IllegalArgument(_))));

        let widened = method_handles::constant(&jvm, CPDType::LongType, JavaValue::Int(3)).unwrap();
        assert_eq!(widened.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Long(3));
        let unboxed = method_handles::constant(&jvm, CPDType::IntType, JavaValue::boxed(JavaValue::Int(9))).unwrap();
        assert_eq!(unboxed.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(9));
        let hello = method_handles::constant(&jvm, CPDType::string(), JavaValue::new_string("hello")).unwrap();
        assert_eq!(hello.invoke_exact(&jvm, vec![]).unwrap().try_unwrap_string().unwrap(), "hello");
        assert!(matches!(method_handles::constant(&jvm, CPDType::string(), JavaValue::Int(1)), Err(InvokeError::ClassCast { .. })));
        assert!(matches!(method_handles::constant(&jvm, CPDType::IntType, JavaValue::Long(1)), Err(InvokeError::ClassCast { .. })));
    }

    #[test]
    pub fn insert_arguments() {
        let jvm = jvm_with_arith();
        let sub = find_static(&jvm, "sub", "(II)I");
        let minus_two = method_handles::insert_arguments(&jvm, &sub, 1, vec![JavaValue::Short(2)]).unwrap();
        assert_eq!(minus_two.type_(), &MethodType::from_method_descriptor_string("(I)I").unwrap());
        assert_eq!(minus_two.invoke_exact(&jvm, ints(&[10])).unwrap(), JavaValue::Int(8));
        let both = method_handles::insert_arguments(&jvm, &sub, 0, ints(&[1, 4])).unwrap();
        assert_eq!(both.invoke_exact(&jvm, vec![]).unwrap(), JavaValue::Int(-3));
        assert!(method_handles::insert_arguments(&jvm, &sub, 0, vec![]).unwrap().ptr_eq(&sub));
        assert!(matches!(method_handles::insert_arguments(&jvm, &sub, 1, ints(&[1, 2])), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(method_handles::insert_arguments(&jvm, &sub, 0, vec![JavaValue::new_string("x")]), Err(InvokeError::ClassCast { .. })));

        let repeat = find_static(&jvm, "repeat", "(Ljava/lang/String;I)Ljava/lang/String;");
        let ab = method_handles::insert_arguments(&jvm, &repeat, 0, vec![JavaValue::new_string("ab")]).unwrap();
        assert_eq!(ab.invoke_exact(&jvm, ints(&[3])).unwrap().try_unwrap_string().unwrap(), "ababab");
        assert!(matches!(method_handles::insert_arguments(&jvm, &repeat, 0, vec![JavaValue::Int(1)]), Err(InvokeError::ClassCast { .. })));
    }

    #[test]
    pub fn drop_and_permute_arguments() {
        let jvm = jvm_with_arith();
        let sub = find_static(&jvm, "sub", "(II)I");
        let dropped = method_handles::drop_arguments(&jvm, &sub, 1, &[CPDType::LongType, CPDType::string()]).unwrap();
        assert_eq!(dropped.type_(), &MethodType::from_method_descriptor_string("(IJLjava/lang/String;I)I").unwrap());
        assert_eq!(dropped.invoke_exact(&jvm, vec![JavaValue::Int(10), JavaValue::Long(99), JavaValue::new_string("ignored"), JavaValue::Int(3)]).unwrap(), JavaValue::Int(7));
        assert!(matches!(method_handles::drop_arguments(&jvm, &sub, 3, &[CPDType::IntType]), Err(InvokeError::IllegalArgument(_))));

        let int_int = sub.type_().clone();
        let swapped = method_handles::permute_arguments(&jvm, &sub, &int_int, &[1, 0]).unwrap();
        assert_eq!(swapped.invoke_exact(&jvm, ints(&[10, 3])).unwrap(), JavaValue::Int(-7));
        let one_int = MethodType::make(CPDType::IntType, vec![CPDType::IntType]).unwrap();
        let twice = method_handles::permute_arguments(&jvm, &sub, &one_int, &[0, 0]).unwrap();
        assert_eq!(twice.invoke_exact(&jvm, ints(&[42])).unwrap(), JavaValue::Int(0));
        let long_return = int_int.change_return_type(CPDType::LongType);
        assert!(matches!(method_handles::permute_arguments(&jvm, &sub, &long_return, &[0, 1]), Err(InvokeError::IllegalArgument(_))));
        let int_long = MethodType::make(CPDType::IntType, vec![CPDType::IntType, CPDType::LongType]).unwrap();
        assert!(matches!(method_handles::permute_arguments(&jvm, &sub, &int_long, &[0, 1]), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(method_handles::permute_arguments(&jvm, &sub, &int_int, &[0]), Err(InvokeError::IllegalArgument(_))));
    }

    #[test]
    pub fn invoker_handles() {
        let jvm = jvm_with_arith();
        let sub = find_static(&jvm, "sub", "(II)I");
        let int_int = sub.type_().clone();

        let exact = method_handles::exact_invoker(&jvm, &int_int).unwrap();
        assert!(exact.ptr_eq(&method_handles::exact_invoker(&jvm, &int_int).unwrap()));
        let mut args = vec![JavaValue::from(sub.clone())];
        args.extend(ints(&[5, 2]));
        assert_eq!(exact.invoke_exact(&jvm, args).unwrap(), JavaValue::Int(3));

        let spread = method_handles::spread_invoker(&jvm, &int_int, 0).unwrap();
        assert_eq!(spread.type_(), &MethodType::from_method_descriptor_string("(Ljava/lang/invoke/MethodHandle;[Ljava/lang/Object;)I").unwrap());
        assert_eq!(spread.invoke_exact(&jvm, vec![sub.clone().into(), boxed_ints(&[4, 1])]).unwrap(), JavaValue::Int(3));
        let leading_one = method_handles::spread_invoker(&jvm, &int_int, 1).unwrap();
        assert_eq!(leading_one.type_(), &MethodType::from_method_descriptor_string("(Ljava/lang/invoke/MethodHandle;I[Ljava/lang/Object;)I").unwrap());
        assert_eq!(leading_one.invoke_exact(&jvm, vec![sub.clone().into(), JavaValue::Int(9), boxed_ints(&[4])]).unwrap(), JavaValue::Int(5));
        let too_short = leading_one.invoke_exact(&jvm, vec![sub.clone().into(), JavaValue::Int(9), boxed_ints(&[])]);
        assert!(matches!(too_short, Err(InvokeError::IllegalArgument(_))));

        let int_array = MethodType::from_method_descriptor_string("([I)I").unwrap();
        let implied = int_array.invokers().spread_invoker(&jvm, 0).unwrap();
        assert_eq!(implied.type_().last_parameter_type(), Some(CPDType::array(CPDType::array(CPDType::IntType))));
        assert!(matches!(method_handles::spread_invoker(&jvm, &int_int, 3), Err(InvokeError::IllegalArgument(_))));

        let varargs = method_handles::varargs_invoker(&jvm, &int_int).unwrap();
        assert_eq!(varargs.type_(), &MethodType::from_method_descriptor_string("(Ljava/lang/invoke/MethodHandle;[Ljava/lang/Object;)Ljava/lang/Object;").unwrap());
        let result = varargs.invoke_exact(&jvm, vec![sub.into(), boxed_ints(&[8, 5])]).unwrap();
        assert_eq!(result.try_unbox(), Some(JavaValue::Int(3)));
    }

    fn array_len(value: JavaValue) -> usize {
        value.unwrap_object_nonnull().unwrap_array().len()
    }

    #[test]
    pub fn spread_invoker_at_slot_limit() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let widest = MethodType::generic_method_type(254, false).unwrap();
        assert!(matches!(widest.invokers().generic_invoker(&jvm), Err(InvokeError::SlotLimitExceeded { slots: 255 })));
        let spread = widest.invokers().spread_invoker(&jvm, 0).unwrap();
        assert_eq!(spread.type_(), &MethodType::from_method_descriptor_string("(Ljava/lang/invoke/MethodHandle;[Ljava/lang/Object;)Ljava/lang/Object;").unwrap());
        assert!(spread.ptr_eq(&widest.invokers().spread_invoker(&jvm, 0).unwrap()));

        let x = method_handles::constant(&jvm, CPDType::object(), JavaValue::new_string("x")).unwrap();
        let ignores_all = method_handles::drop_arguments(&jvm, &x, 0, &vec![CPDType::object(); 254]).unwrap();
        let args = (0..254).map(JavaValue::Int).collect::<Vec<JavaValue>>();
        assert_eq!(ignores_all.invoke_with_arguments(&jvm, args).unwrap().try_unwrap_string().unwrap(), "x");
        let too_short = spread.invoke_exact(&jvm, vec![ignores_all.into(), boxed_ints(&[1])]);
        assert!(matches!(too_short, Err(InvokeError::IllegalArgument(_))));
    }

    #[test]
    pub fn empty_spread_accepts_null_array() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let seven = method_handles::constant(&jvm, CPDType::IntType, JavaValue::Int(7)).unwrap();
        let spread = seven.as_spreader(&jvm, &CPDType::object_array(), 0).unwrap();
        assert_eq!(spread.type_(), &MethodType::from_method_descriptor_string("([Ljava/lang/Object;)I").unwrap());
        assert_eq!(spread.invoke_exact(&jvm, vec![JavaValue::null()]).unwrap(), JavaValue::Int(7));
        assert_eq!(spread.invoke_exact(&jvm, vec![boxed_ints(&[])]).unwrap(), JavaValue::Int(7));
        assert!(matches!(spread.invoke_exact(&jvm, vec![boxed_ints(&[1])]), Err(InvokeError::IllegalArgument(_))));
    }

    #[test]
    pub fn spread_and_collect_length_window() {
        let jvm = jvm_with_arith();
        let sub = find_static(&jvm, "sub", "(II)I");
        let ints = CPDType::array(CPDType::IntType);
        let longs = CPDType::array(CPDType::LongType);
        let objects = CPDType::object_array();

        let x = method_handles::constant(&jvm, CPDType::object(), JavaValue::new_string("x")).unwrap();
        let ignores_objects = method_handles::drop_arguments(&jvm, &x, 0, &vec![CPDType::object(); 200]).unwrap();
        let spread_objects = ignores_objects.as_spreader(&jvm, &objects, 200).unwrap();
        let two_hundred = new_array(CPDType::object(), vec![JavaValue::null(); 200]);
        assert_eq!(spread_objects.invoke_exact(&jvm, vec![two_hundred]).unwrap().try_unwrap_string().unwrap(), "x");
        let ignores_ints = method_handles::drop_arguments(&jvm, &x, 0, &vec![CPDType::IntType; 200]).unwrap();
        assert!(ignores_ints.as_spreader(&jvm, &ints, 200).is_ok());
        assert!(matches!(sub.as_spreader(&jvm, &longs, 128), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(sub.as_spreader(&jvm, &ints, 256), Err(InvokeError::IllegalArgument(_))));

        let object_collector = method_handles::identity(&jvm, objects).unwrap().as_collector(&jvm, &objects, 200).unwrap();
        assert_eq!(array_len(object_collector.invoke_exact(&jvm, vec![JavaValue::null(); 200]).unwrap()), 200);
        let int_collector = method_handles::identity(&jvm, ints).unwrap().as_collector(&jvm, &ints, 128).unwrap();
        assert_eq!(array_len(int_collector.invoke_exact(&jvm, vec![JavaValue::Int(1); 128]).unwrap()), 128);
        let long_identity = method_handles::identity(&jvm, longs).unwrap();
        let long_collector = long_identity.as_collector(&jvm, &longs, 127).unwrap();
        assert_eq!(array_len(long_collector.invoke_exact(&jvm, vec![JavaValue::Long(1); 127]).unwrap()), 127);
        assert!(matches!(long_identity.as_collector(&jvm, &longs, 128), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(method_handles::identity(&jvm, objects).unwrap().as_collector(&jvm, &objects, 256), Err(InvokeError::IllegalArgument(_))));
    }
}
