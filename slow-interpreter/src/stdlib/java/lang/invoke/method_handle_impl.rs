use std::sync::Arc;

use rust_jvm_common::compressed_classfile::CPDType;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::bound_method_handle::BoundMethodHandle;
use crate::stdlib::java::lang::invoke::lambda_form::basic_type::BasicType;
use crate::stdlib::java::lang::invoke::lambda_form::LambdaFormBuilder;
use crate::stdlib::java::lang::invoke::lambda_form::name::NameArg;
use crate::stdlib::java::lang::invoke::lambda_form::named_function::Intrinsic;
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::stdlib::java::lang::invoke::simple_method_handle;
use crate::stdlib::java::lang::invoke::value_conversions::{value_conversion, ValueConversion};

fn params_with_receiver(type_: &MethodType) -> Vec<BasicType> {
    let mut params = vec![BasicType::L];
    params.extend(BasicType::from_types(type_.parameter_list()));
    params
}

/// `target` adapted to `new_type`: each argument converted to the target's parameter type,
/// the result converted back to `new_type`'s return type.
pub fn make_pairwise_convert(jvm: &JVMState, target: &MethodHandle, new_type: &MethodType) -> InvokeResult<MethodHandle> {
    let old_type = target.type_();
    let mut builder = LambdaFormBuilder::new("MH.convert", &params_with_receiver(new_type));
    let mut args = vec![];
    for (i, (src, dst)) in new_type.parameter_list().iter().zip(old_type.parameter_list().iter()).enumerate() {
        let arg = builder.param(i + 1);
        args.push(match value_conversion(src, dst) {
            None => arg,
            Some(conversion) => builder.add(BasicType::from_type(&conversion.result_type()), Intrinsic::Convert(conversion), vec![arg]),
        });
    }
    let bound_target = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
    args.insert(0, bound_target);
    let old_rtype = old_type.return_type();
    let new_rtype = new_type.return_type();
    let result = builder.add(BasicType::from_type(&old_rtype), Intrinsic::InvokeBasic, args);
    let result = match value_conversion(&old_rtype, &new_rtype) {
        Some(ValueConversion::Discard) => None,
        Some(conversion) => Some(builder.add(BasicType::from_type(&conversion.result_type()), Intrinsic::Convert(conversion), vec![result])),
        None if new_rtype.is_void() => None,
        None => Some(result),
    };
    let form = Arc::new(builder.build(jvm, result)?);
    BoundMethodHandle::make(new_type.clone(), form, vec![target.clone().into()])
}

/// Validates a spread or collect array type and length, returning the component type.
///
/// Lengths up to 127 are always fine; up to 255 only when the components take one slot each.
pub fn spread_array_checks(array_type: &CPDType, array_length: usize) -> InvokeResult<CPDType> {
    let component = array_type.try_unwrap_array_type().ok_or_else(|| InvokeError::IllegalArgument(format!("not an array type: {}", array_type.java_source_representation())))?;
    if (array_length & 0x7F) != array_length {
        if (array_length & 0xFF) != array_length {
            return Err(InvokeError::IllegalArgument(format!("array length is not legal: {}", array_length)));
        }
        if component.is_double_or_long() {
            return Err(InvokeError::IllegalArgument(format!("array length is not legal for long[] or double[]: {}", array_length)));
        }
    }
    Ok(component)
}

/// `target`, whose last `array_length` parameters have the component type of `array_type`,
/// taking those arguments from one array instead.
pub fn make_spreader(jvm: &JVMState, target: &MethodHandle, array_type: &CPDType, array_length: usize) -> InvokeResult<MethodHandle> {
    let component = spread_array_checks(array_type, array_length)?;
    let old_type = target.type_();
    let count = old_type.parameter_count();
    let spread_pos = count - array_length;
    let new_type = old_type.replace_parameter_types(spread_pos, count, &[*array_type])?;
    let mut builder = LambdaFormBuilder::new("MH.spread", &params_with_receiver(&new_type));
    let array = builder.param(spread_pos + 1);
    builder.add(BasicType::V, Intrinsic::CheckSpreadArgument(array_length), vec![array.clone()]);
    let elements = (0..array_length)
        .map(|i| builder.add(BasicType::from_type(&component), Intrinsic::ArrayElement(i), vec![array.clone()]))
        .collect::<Vec<NameArg>>();
    let bound_target = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
    let mut args = vec![bound_target];
    args.extend(builder.params(1..spread_pos + 1));
    args.extend(elements);
    builder.add(BasicType::from_type(&old_type.return_type()), Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    BoundMethodHandle::make(new_type, form, vec![target.clone().into()])
}

/// A handle of type `(C, C, ...)C[]` that returns its arguments as a new array.
pub fn make_array_collector(jvm: &JVMState, array_type: &CPDType, array_length: usize) -> InvokeResult<MethodHandle> {
    let component = spread_array_checks(array_type, array_length)?;
    let type_ = MethodType::make(*array_type, vec![component; array_length])?;
    let builder_params = params_with_receiver(&type_);
    let mut builder = LambdaFormBuilder::new("MH.collect", &builder_params);
    let elements = builder.params(1..array_length + 1);
    builder.add(BasicType::L, Intrinsic::NewArray(component), elements);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    simple_method_handle::make(type_, form)
}

/// `target` with its trailing array parameter replaced by `array_length` separate arguments.
pub fn make_collector(jvm: &JVMState, target: &MethodHandle, array_type: &CPDType, array_length: usize) -> InvokeResult<MethodHandle> {
    let old_type = target.type_();
    let collect_pos = old_type.parameter_count() - 1;
    let new_type = old_type.as_collector_type(array_type, array_length)?;
    let collector = make_array_collector(jvm, array_type, array_length)?;
    let mut builder = LambdaFormBuilder::new("MH.collectArguments", &params_with_receiver(&new_type));
    let array = builder.add(BasicType::L, collector, builder.params(collect_pos + 1..collect_pos + 1 + array_length));
    let bound_target = builder.add(BasicType::L, Intrinsic::BoundArgument(0), vec![builder.param(0)]);
    let mut args = vec![bound_target];
    args.extend(builder.params(1..collect_pos + 1));
    args.push(array);
    builder.add(BasicType::from_type(&old_type.return_type()), Intrinsic::InvokeBasic, args);
    let form = Arc::new(builder.build_returning_last(jvm)?);
    BoundMethodHandle::make(new_type, form, vec![target.clone().into()])
}

#[cfg(test)]
pub mod test {
    use rust_jvm_common::compressed_classfile::CPDType;

    use crate::exceptions::InvokeError;
    use crate::stdlib::java::lang::invoke::method_handle_impl::spread_array_checks;

    #[test]
    pub fn spread_lengths() {
        let ints = CPDType::array(CPDType::IntType);
        let longs = CPDType::array(CPDType::LongType);
        assert_eq!(spread_array_checks(&ints, 127).unwrap(), CPDType::IntType);
        assert_eq!(spread_array_checks(&ints, 200).unwrap(), CPDType::IntType);
        assert!(spread_array_checks(&longs, 127).is_ok());
        assert!(matches!(spread_array_checks(&longs, 128), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(spread_array_checks(&ints, 256), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(spread_array_checks(&CPDType::object(), 1), Err(InvokeError::IllegalArgument(_))));
    }
}
