use std::fmt::{Debug, Formatter};

use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumDiscriminants, EnumIter, IntoStaticStr};

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::exceptions::InvokeResult;
use crate::java_values::JavaValue;
use crate::jvm_state::JVMState;
use crate::stdlib::java::lang::invoke::lambda_form::intrinsics;
use crate::stdlib::java::lang::invoke::method_handle::MethodHandle;
use crate::stdlib::java::lang::invoke::value_conversions::ValueConversion;

/// The fixed set of primitive operations lambda forms are built from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumDiscriminants)]
#[strum_discriminants(name(IntrinsicKind))]
#[strum_discriminants(derive(Hash, EnumIter, EnumCount, IntoStaticStr))]
pub enum Intrinsic {
    /// `(mh, args...)`: runs `mh`'s form with no type checks.
    InvokeBasic,
    /// `(args..., member)`: the trailing argument is a resolved member name.
    LinkToVirtual,
    LinkToStatic,
    LinkToSpecial,
    LinkToInterface,
    InternalMemberName,
    InternalMemberNameEnsureInit,
    ConstructorMethod,
    AllocateInstance,
    EnsureInitialized,
    CheckReceiver,
    CheckBase,
    CheckCast,
    FieldOffset,
    StaticBase,
    StaticOffset,
    GetField { field_kind: Wrapper, is_volatile: bool },
    PutField { field_kind: Wrapper, is_volatile: bool },
    BoundArgument(usize),
    DelegateTarget,
    CheckExactType,
    CheckGenericType,
    SpreadTarget,
    GetCallSiteTarget,
    CheckSpreadArgument(usize),
    ArrayElement(usize),
    NewArray(CPDType),
    Convert(ValueConversion),
    ThrowUninitializedCallSite,
    Identity,
}

pub type IntrinsicImpl = fn(&JVMState, Intrinsic, Vec<JavaValue>) -> InvokeResult<JavaValue>;

lazy_static! {
    static ref INTRINSIC_TABLE: Vec<IntrinsicImpl> = IntrinsicKind::iter().map(intrinsics::implementation).collect();
}

impl Intrinsic {
    pub fn kind(&self) -> IntrinsicKind {
        self.into()
    }

    pub fn name(&self) -> &'static str {
        self.kind().into()
    }

    pub fn implementation(&self) -> IntrinsicImpl {
        INTRINSIC_TABLE[self.kind() as usize]
    }
}

/// What a non-parameter name calls: a primitive, or another handle through `invoke_basic`.
#[derive(Clone)]
pub enum NamedFunction {
    Intrinsic(Intrinsic),
    Invoke(MethodHandle),
}

impl NamedFunction {
    pub fn invoke(&self, jvm: &JVMState, args: Vec<JavaValue>) -> InvokeResult<JavaValue> {
        match self {
            NamedFunction::Intrinsic(intrinsic) => (intrinsic.implementation())(jvm, *intrinsic, args),
            NamedFunction::Invoke(method_handle) => method_handle.invoke_basic(jvm, args),
        }
    }
}

impl From<Intrinsic> for NamedFunction {
    fn from(intrinsic: Intrinsic) -> Self {
        NamedFunction::Intrinsic(intrinsic)
    }
}

impl From<MethodHandle> for NamedFunction {
    fn from(method_handle: MethodHandle) -> Self {
        NamedFunction::Invoke(method_handle)
    }
}

impl Debug for NamedFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NamedFunction::Intrinsic(Intrinsic::BoundArgument(i)) => write!(f, "BoundArgument{}", i),
            NamedFunction::Intrinsic(Intrinsic::ArrayElement(i)) => write!(f, "ArrayElement{}", i),
            NamedFunction::Intrinsic(intrinsic) => write!(f, "{}", intrinsic.name()),
            NamedFunction::Invoke(method_handle) => write!(f, "invoke{}", method_handle.type_()),
        }
    }
}
