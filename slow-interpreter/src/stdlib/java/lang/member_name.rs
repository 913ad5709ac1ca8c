use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use itertools::Itertools;

use rust_jvm_common::classfile::{ACC_ABSTRACT, ACC_FINAL, ACC_NATIVE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC, ACC_VARARGS, ACC_VOLATILE};
use rust_jvm_common::compressed_classfile::{CCString, CPDType};
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName, MethodName};
use rust_jvm_common::loading::LoaderName;
use rust_jvm_common::method_shape::MethodShape;
use rust_jvm_common::mhn_consts::{IS_CONSTRUCTOR, IS_FIELD, IS_METHOD, RECOGNIZED_MODIFIERS, REFERENCE_KIND_MASK, REFERENCE_KIND_SHIFT, ReferenceKind};

use crate::class_loading::check_loaded_class;
use crate::exceptions::{InvokeError, InvokeResult};
use crate::jvm_state::JVMState;
use crate::resolvers::fields::{FieldLocation, resolve_field};
use crate::resolvers::methods::{MethodLocation, resolve_interface_method, resolve_method};
use crate::resolvers::ResolutionFailure;
use crate::runtime_class::RuntimeClass;
use crate::stdlib::java::lang::invoke::method_type::MethodType;
use crate::view::HasAccessFlags;

#[derive(Clone, Eq, PartialEq, Hash)]
pub enum MemberType {
    Method(MethodType),
    Field(CPDType),
}

impl Display for MemberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberType::Method(method_type) => write!(f, "{}", method_type),
            MemberType::Field(field_type) => write!(f, "{}", field_type.java_source_representation()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldBinding {
    pub location: FieldLocation,
    /// Index into the instance field array, or into the declaring class's statics.
    pub offset: usize,
    pub is_static: bool,
}

/// What a resolved member name is linked to.
#[derive(Clone, Debug)]
pub enum MemberBinding {
    Method(MethodLocation),
    Field(FieldBinding),
}

impl MemberBinding {
    pub fn declaring_class(&self) -> &Arc<RuntimeClass> {
        match self {
            MemberBinding::Method(location) => &location.class,
            MemberBinding::Field(binding) => &binding.location.class,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Resolution {
    Unresolved,
    Resolved(MemberBinding),
    Failed(ResolutionFailure),
}

struct MemberNameInner {
    clazz: CClassName,
    name: CCString,
    type_: MemberType,
    flags: u32,
    resolution: Resolution,
}

/// A symbolic reference to a method, constructor or field, possibly resolved.
///
/// Equality and hashing consider only the owner, reference kind, name and type.
#[derive(Clone)]
pub struct MemberName(Arc<MemberNameInner>);

fn flags_mods(kind_flags: u32, modifiers: u16, ref_kind: ReferenceKind) -> u32 {
    kind_flags | (modifiers as u32 & RECOGNIZED_MODIFIERS) | ref_kind.to_flags()
}

impl MemberName {
    fn new_unresolved(clazz: CClassName, name: CCString, type_: MemberType, flags: u32) -> Self {
        MemberName(Arc::new(MemberNameInner { clazz, name, type_, flags, resolution: Resolution::Unresolved }))
    }

    /// A method or constructor query. `<init>` makes it a constructor, which needs a special or new-special kind.
    pub fn new_method(clazz: CClassName, name: MethodName, type_: MethodType, ref_kind: ReferenceKind) -> InvokeResult<Self> {
        let kind_flags = if name.is_constructor() { IS_CONSTRUCTOR } else { IS_METHOD };
        let res = Self::new_unresolved(clazz, name.0, MemberType::Method(type_), flags_mods(kind_flags, 0, ref_kind));
        if !res.reference_kind_is_consistent() {
            return Err(InvokeError::IllegalArgument(format!("bad reference kind {} for {}", ref_kind.name(), res)));
        }
        Ok(res)
    }

    pub fn new_field(clazz: CClassName, name: FieldName, type_: CPDType, ref_kind: ReferenceKind) -> InvokeResult<Self> {
        if !ref_kind.is_field() {
            return Err(InvokeError::IllegalArgument(format!("bad reference kind {} for field {}", ref_kind.name(), name)));
        }
        if type_.is_void() {
            return Err(InvokeError::IllegalArgument(format!("field {} cannot be void", name)));
        }
        Ok(Self::new_unresolved(clazz, name.0, MemberType::Field(type_), flags_mods(IS_FIELD, 0, ref_kind)))
    }

    pub fn new_constructor(clazz: CClassName, type_: MethodType) -> InvokeResult<Self> {
        if !type_.return_type().is_void() {
            return Err(InvokeError::IllegalArgument(format!("constructor type must return void: {}", type_)));
        }
        Self::new_method(clazz, MethodName::constructor_init(), type_, ReferenceKind::NewInvokeSpecial)
    }

    /// The fully general constructor: the reference kind decides whether `type_` must be a field or method type.
    pub fn new_with_ref_kind(ref_kind: ReferenceKind, clazz: CClassName, name: &str, type_: MemberType) -> InvokeResult<Self> {
        match (ref_kind.is_field(), type_) {
            (true, MemberType::Field(field_type)) => Self::new_field(clazz, FieldName::new(name), field_type, ref_kind),
            (true, MemberType::Method(_)) => Err(InvokeError::IllegalArgument("not a field type".to_string())),
            (false, MemberType::Method(method_type)) => {
                let name = MethodName::new(name);
                if ref_kind.is_constructor() && !name.is_constructor() {
                    return Err(InvokeError::IllegalArgument("not a constructor type or name".to_string()));
                }
                Self::new_method(clazz, name, method_type, ref_kind)
            }
            (false, MemberType::Field(_)) => Err(InvokeError::IllegalArgument("not a method type".to_string())),
        }
    }

    /// A resolved name for a method found by reflection. Constructors get the new-special kind, interface methods
    /// the interface kind.
    pub fn from_method(location: &MethodLocation) -> InvokeResult<Self> {
        let view = location.view();
        let method_type = MethodType::from_descriptor(&view.desc)?;
        let declaring = &location.class;
        let (kind_flags, ref_kind) = if view.is_constructor() {
            (IS_CONSTRUCTOR, ReferenceKind::NewInvokeSpecial)
        } else if view.is_static() {
            (IS_METHOD, ReferenceKind::InvokeStatic)
        } else if view.is_private() {
            (IS_METHOD, ReferenceKind::InvokeSpecial)
        } else if declaring.view.is_interface() {
            (IS_METHOD, ReferenceKind::InvokeInterface)
        } else {
            (IS_METHOD, ReferenceKind::InvokeVirtual)
        };
        Ok(MemberName(Arc::new(MemberNameInner {
            clazz: declaring.view.name(),
            name: view.name.0,
            type_: MemberType::Method(method_type),
            flags: flags_mods(kind_flags, view.access_flags, ref_kind),
            resolution: Resolution::Resolved(MemberBinding::Method(location.clone())),
        })))
    }

    pub fn from_field(location: &FieldLocation, is_setter: bool) -> InvokeResult<Self> {
        let view = location.view();
        let getter = if view.is_static() { ReferenceKind::GetStatic } else { ReferenceKind::GetField };
        let ref_kind = if is_setter { getter.as_setter().unwrap_or(getter) } else { getter };
        let offset = field_offset(location)?;
        Ok(MemberName(Arc::new(MemberNameInner {
            clazz: location.class.view.name(),
            name: view.name.0,
            type_: MemberType::Field(view.field_type),
            flags: flags_mods(IS_FIELD, view.access_flags, ref_kind),
            resolution: Resolution::Resolved(MemberBinding::Field(FieldBinding { location: location.clone(), offset, is_static: view.is_static() })),
        })))
    }

    pub fn get_declaring_class(&self) -> CClassName {
        self.0.clazz
    }

    pub fn name_str(&self) -> &'static str {
        self.0.name.to_str()
    }

    pub fn method_name(&self) -> MethodName {
        MethodName(self.0.name)
    }

    pub fn field_name(&self) -> FieldName {
        FieldName(self.0.name)
    }

    pub fn member_type(&self) -> &MemberType {
        &self.0.type_
    }

    pub fn get_flags(&self) -> u32 {
        self.0.flags
    }

    pub fn get_modifiers(&self) -> u16 {
        (self.0.flags & RECOGNIZED_MODIFIERS) as u16
    }

    pub fn get_reference_kind(&self) -> Option<ReferenceKind> {
        ReferenceKind::from_flags(self.0.flags)
    }

    fn reference_kind(&self) -> ReferenceKind {
        match self.get_reference_kind() {
            Some(ref_kind) => ref_kind,
            None => unreachable!("member names are always created with a reference kind"),
        }
    }

    pub fn get_method_type(&self) -> Option<&MethodType> {
        match &self.0.type_ {
            MemberType::Method(method_type) => Some(method_type),
            MemberType::Field(_) => None,
        }
    }

    pub fn get_field_type(&self) -> Option<CPDType> {
        match &self.0.type_ {
            MemberType::Method(_) => None,
            MemberType::Field(field_type) => Some(*field_type),
        }
    }

    /// The method type for methods; `()T` for a getter and `(T)void` for a setter.
    pub fn get_method_or_field_type(&self) -> InvokeResult<MethodType> {
        match &self.0.type_ {
            MemberType::Method(method_type) => Ok(method_type.clone()),
            MemberType::Field(field_type) => {
                if self.reference_kind().is_getter() {
                    MethodType::make(*field_type, vec![])
                } else {
                    MethodType::make(CPDType::VoidType, vec![*field_type])
                }
            }
        }
    }

    /// The type a direct handle on this member has: receivers prepended, constructors returning the new instance.
    pub fn get_invocation_type(&self) -> InvokeResult<MethodType> {
        let method_or_field_type = self.get_method_or_field_type()?;
        let owner = CPDType::Class(self.0.clazz);
        if self.is_constructor() && self.reference_kind() == ReferenceKind::NewInvokeSpecial {
            return Ok(method_or_field_type.change_return_type(owner));
        }
        if !self.is_static() {
            return method_or_field_type.insert_parameter_types(0, &[owner]);
        }
        Ok(method_or_field_type)
    }

    fn test_flags(&self, mask: u32, value: u32) -> bool {
        self.0.flags & mask == value
    }

    fn test_all_flags(&self, mask: u32) -> bool {
        self.test_flags(mask, mask)
    }

    pub fn is_method(&self) -> bool {
        self.test_all_flags(IS_METHOD)
    }

    pub fn is_constructor(&self) -> bool {
        self.test_all_flags(IS_CONSTRUCTOR)
    }

    pub fn is_field(&self) -> bool {
        self.test_all_flags(IS_FIELD)
    }

    pub fn is_invocable(&self) -> bool {
        self.is_method() || self.is_constructor()
    }

    /// Static-ness as the reference kind states it; resolved names also carry the member's own modifiers.
    pub fn is_static(&self) -> bool {
        self.reference_kind().is_static()
    }

    pub fn is_public(&self) -> bool {
        self.test_all_flags(ACC_PUBLIC as u32)
    }

    pub fn is_private(&self) -> bool {
        self.test_all_flags(ACC_PRIVATE as u32)
    }

    pub fn is_protected(&self) -> bool {
        self.test_all_flags(ACC_PROTECTED as u32)
    }

    pub fn is_final(&self) -> bool {
        self.test_all_flags(ACC_FINAL as u32)
    }

    pub fn is_abstract(&self) -> bool {
        self.test_all_flags(ACC_ABSTRACT as u32)
    }

    pub fn is_native(&self) -> bool {
        self.test_all_flags(ACC_NATIVE as u32)
    }

    pub fn is_synthetic(&self) -> bool {
        self.test_all_flags(ACC_SYNTHETIC as u32)
    }

    pub fn is_varargs(&self) -> bool {
        self.is_invocable() && self.test_all_flags(ACC_VARARGS as u32)
    }

    pub fn is_volatile(&self) -> bool {
        self.is_field() && self.test_all_flags(ACC_VOLATILE as u32)
    }

    pub fn is_getter(&self) -> bool {
        self.reference_kind().is_getter()
    }

    pub fn is_setter(&self) -> bool {
        self.reference_kind().is_setter()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.0.resolution, Resolution::Resolved(_))
    }

    pub fn resolution(&self) -> &Resolution {
        &self.0.resolution
    }

    pub fn resolution_failure(&self) -> Option<&ResolutionFailure> {
        match &self.0.resolution {
            Resolution::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn binding(&self) -> InvokeResult<&MemberBinding> {
        match &self.0.resolution {
            Resolution::Resolved(binding) => Ok(binding),
            Resolution::Failed(failure) => Err(failure.to_error()),
            Resolution::Unresolved => Err(InvokeError::IllegalState(format!("unresolved member {}", self))),
        }
    }

    pub fn method_location(&self) -> InvokeResult<&MethodLocation> {
        match self.binding()? {
            MemberBinding::Method(location) => Ok(location),
            MemberBinding::Field(_) => Err(InvokeError::IllegalState(format!("{} is not a method", self))),
        }
    }

    pub fn field_binding(&self) -> InvokeResult<&FieldBinding> {
        match self.binding()? {
            MemberBinding::Field(binding) => Ok(binding),
            MemberBinding::Method(_) => Err(InvokeError::IllegalState(format!("{} is not a field", self))),
        }
    }

    pub fn declaring_runtime_class(&self) -> InvokeResult<&Arc<RuntimeClass>> {
        Ok(self.binding()?.declaring_class())
    }

    pub fn reference_kind_is_consistent(&self) -> bool {
        let ref_kind = match self.get_reference_kind() {
            Some(ref_kind) => ref_kind,
            None => return false,
        };
        let static_is_consistent = match &self.0.resolution {
            Resolution::Resolved(_) => self.test_all_flags(ACC_STATIC as u32) == ref_kind.is_static(),
            _ => true,
        };
        if self.is_field() {
            static_is_consistent && ref_kind.is_field()
        } else if self.is_constructor() {
            matches!(ref_kind, ReferenceKind::NewInvokeSpecial | ReferenceKind::InvokeSpecial)
        } else if self.is_method() {
            static_is_consistent && ref_kind.is_method()
        } else {
            false
        }
    }

    fn change_reference_kind(&self, new_ref_kind: ReferenceKind) -> Self {
        let flags = (self.0.flags & !((REFERENCE_KIND_MASK) << REFERENCE_KIND_SHIFT)) | new_ref_kind.to_flags();
        MemberName(Arc::new(MemberNameInner {
            clazz: self.0.clazz,
            name: self.0.name,
            type_: self.0.type_.clone(),
            flags,
            resolution: self.0.resolution.clone(),
        }))
    }

    fn bad_transition(&self, target: &str) -> InvokeError {
        InvokeError::IllegalArgument(format!("cannot convert {} to {}", self, target))
    }

    pub fn as_special(&self) -> InvokeResult<Self> {
        match self.reference_kind() {
            ReferenceKind::InvokeSpecial => Ok(self.clone()),
            ReferenceKind::InvokeVirtual | ReferenceKind::InvokeInterface | ReferenceKind::NewInvokeSpecial => Ok(self.change_reference_kind(ReferenceKind::InvokeSpecial)),
            _ => Err(self.bad_transition("invokeSpecial")),
        }
    }

    pub fn as_constructor(&self) -> InvokeResult<Self> {
        match self.reference_kind() {
            ReferenceKind::InvokeSpecial if self.is_constructor() => Ok(self.change_reference_kind(ReferenceKind::NewInvokeSpecial)),
            ReferenceKind::NewInvokeSpecial => Ok(self.clone()),
            _ => Err(self.bad_transition("newInvokeSpecial")),
        }
    }

    pub fn as_setter(&self) -> InvokeResult<Self> {
        match self.reference_kind().as_setter() {
            Some(setter) => Ok(self.change_reference_kind(setter)),
            None => Err(self.bad_transition("a setter")),
        }
    }

    /// Undoes `as_special`: virtual, interface and special methods go back to the kind a normal call uses.
    pub fn as_normal_original(&self, jvm: &JVMState) -> InvokeResult<Self> {
        let ref_kind = self.reference_kind();
        if !matches!(ref_kind, ReferenceKind::InvokeVirtual | ReferenceKind::InvokeInterface | ReferenceKind::InvokeSpecial) || self.is_constructor() {
            return Ok(self.clone());
        }
        let is_interface = match self.declaring_runtime_class() {
            Ok(class) => class.view.is_interface(),
            Err(_) => check_loaded_class(jvm, self.0.clazz)?.view.is_interface(),
        };
        let normal = if is_interface { ReferenceKind::InvokeInterface } else { ReferenceKind::InvokeVirtual };
        if normal == ref_kind {
            return Ok(self.clone());
        }
        Ok(self.change_reference_kind(normal))
    }

    fn with_resolution(&self, clazz: CClassName, modifiers: u16, resolution: Resolution) -> Self {
        let flags = (self.0.flags & !RECOGNIZED_MODIFIERS) | modifiers as u32;
        MemberName(Arc::new(MemberNameInner { clazz, name: self.0.name, type_: self.0.type_.clone(), flags, resolution }))
    }

    fn failed(&self, failure: ResolutionFailure) -> Self {
        MemberName(Arc::new(MemberNameInner { clazz: self.0.clazz, name: self.0.name, type_: self.0.type_.clone(), flags: self.0.flags, resolution: Resolution::Failed(failure) }))
    }
}

fn field_offset(location: &FieldLocation) -> InvokeResult<usize> {
    let view = location.view();
    let field_number = if view.is_static() {
        location.class.lookup_static_field(view.name)
    } else {
        location.class.lookup_instance_field(location.class.view.name(), view.name)
    };
    field_number.map(|field_number| field_number.number).ok_or_else(|| InvokeError::IllegalState(format!("no storage for field {}.{}", location.class.view.name(), view.name)))
}

impl PartialEq for MemberName {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.0.clazz == other.0.clazz && self.get_reference_kind() == other.get_reference_kind() && self.0.name == other.0.name && self.0.type_ == other.0.type_
    }
}

impl Eq for MemberName {}

impl Hash for MemberName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.clazz.hash(state);
        self.get_reference_kind().hash(state);
        self.0.name.hash(state);
        self.0.type_.hash(state);
    }
}

impl Display for MemberName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let owner = CPDType::Class(self.0.clazz).java_source_representation();
        let ref_kind = self.get_reference_kind().map(|ref_kind| ref_kind.name()).unwrap_or("none");
        match &self.0.type_ {
            MemberType::Method(method_type) => write!(f, "{}.{}{}/{}", owner, self.name_str(), method_type, ref_kind),
            MemberType::Field(field_type) => write!(f, "{}.{}/{}/{}", owner, self.name_str(), field_type.java_source_representation(), ref_kind),
        }
    }
}

impl Debug for MemberName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        match &self.0.resolution {
            Resolution::Unresolved => write!(f, "/unresolved"),
            Resolution::Resolved(_) => Ok(()),
            Resolution::Failed(failure) => write!(f, "/failed: {}", failure),
        }
    }
}

/// Resolves symbolic member names against the loaded classes.
pub struct MemberNameFactory;

/// A type is visible from a loader if it is primitive, a bootstrap class, or a class that loader defined.
fn is_type_visible(jvm: &JVMState, cpdtype: &CPDType, loader: LoaderName) -> bool {
    let mut element = *cpdtype;
    while let Some(component) = element.try_unwrap_array_type() {
        element = component;
    }
    match element.try_unwrap_class_type() {
        None => true,
        Some(class_name) => match jvm.lookup_class(class_name) {
            None => false,
            Some(class) => class.loader == LoaderName::BootstrapLoader || class.loader == loader,
        },
    }
}

fn check_for_type_alias(jvm: &JVMState, member: &MemberName, declaring: &Arc<RuntimeClass>) -> Result<(), ResolutionFailure> {
    match member.member_type() {
        MemberType::Method(method_type) => {
            if method_type.erase() == *method_type {
                return Ok(());
            }
            let types = method_type.parameter_list().iter().chain(std::iter::once(&method_type.return_type())).copied().collect_vec();
            if types.iter().all(|cpdtype| is_type_visible(jvm, cpdtype, declaring.loader)) {
                return Ok(());
            }
            Err(ResolutionFailure::Linkage(format!("bad method type alias: {} not visible from {}", method_type, declaring.view.name())))
        }
        MemberType::Field(field_type) => {
            if is_type_visible(jvm, field_type, declaring.loader) {
                return Ok(());
            }
            Err(ResolutionFailure::Linkage(format!("bad field type alias: {} not visible from {}", field_type.java_source_representation(), declaring.view.name())))
        }
    }
}

fn incompatible_static(member: &MemberName, expected_static: bool) -> ResolutionFailure {
    ResolutionFailure::Linkage(format!("IncompatibleClassChangeError: Expected {} {}", if expected_static { "static" } else { "non-static" }, member))
}

fn lookup_member(jvm: &JVMState, member: &MemberName, ref_class: &Arc<RuntimeClass>) -> Result<(MemberBinding, u16), ResolutionFailure> {
    let ref_kind = member.reference_kind();
    match member.member_type() {
        MemberType::Method(method_type) => {
            let shape = MethodShape::new(member.method_name(), method_type.to_descriptor());
            let location = if member.is_constructor() {
                ref_class.view.lookup_method(&shape)
                    .map(|method_i| MethodLocation { class: ref_class.clone(), method_i })
                    .ok_or_else(|| ResolutionFailure::NoSuchMethod(format!("{}.{}", ref_class.view.name(), shape)))?
            } else if ref_class.view.is_interface() && ref_kind != ReferenceKind::InvokeVirtual {
                resolve_interface_method(jvm, ref_class, &shape)?
            } else {
                resolve_method(ref_class, &shape)?
            };
            let view = location.view();
            if view.is_static() != ref_kind.is_static() {
                return Err(incompatible_static(member, ref_kind.is_static()));
            }
            Ok((MemberBinding::Method(location.clone()), view.access_flags))
        }
        MemberType::Field(field_type) => {
            let location = resolve_field(ref_class, member.field_name(), field_type)?;
            let view = location.view();
            if view.is_static() != ref_kind.is_static() {
                return Err(incompatible_static(member, ref_kind.is_static()));
            }
            let offset = field_offset(&location).map_err(|err| ResolutionFailure::Linkage(err.to_string()))?;
            let access_flags = view.access_flags;
            Ok((MemberBinding::Field(FieldBinding { location, offset, is_static: ref_kind.is_static() }), access_flags))
        }
    }
}

impl MemberNameFactory {
    /// Resolves a copy of `member` as seen from `lookup_class` (`None` for a trusted lookup). Failures are
    /// recorded in the returned name.
    pub fn resolve(jvm: &JVMState, ref_kind: ReferenceKind, member: &MemberName, lookup_class: Option<&Arc<RuntimeClass>>) -> MemberName {
        let member = if member.get_reference_kind() == Some(ref_kind) { member.clone() } else { member.change_reference_kind(ref_kind) };
        let res = Self::resolve_inner(jvm, &member, lookup_class);
        let outcome = match &res {
            Ok(_) => Ok(()),
            Err(failure) => Err(failure as &dyn Display),
        };
        jvm.tracing().trace_member_resolution(&member, outcome);
        match res {
            Ok(resolved) => resolved,
            Err(failure) => member.failed(failure),
        }
    }

    fn resolve_inner(jvm: &JVMState, member: &MemberName, lookup_class: Option<&Arc<RuntimeClass>>) -> Result<MemberName, ResolutionFailure> {
        let ref_class = check_loaded_class(jvm, member.get_declaring_class()).map_err(|err| ResolutionFailure::Linkage(err.to_string()))?;
        let (binding, modifiers) = lookup_member(jvm, member, &ref_class)?;
        let declaring = binding.declaring_class().clone();
        if let Some(lookup_class) = lookup_class {
            let access_control = jvm.access_control();
            if !access_control.is_class_accessible(&ref_class, lookup_class) || !access_control.is_member_accessible(&ref_class, &declaring, modifiers, lookup_class) {
                return Err(ResolutionFailure::IllegalAccess(format!("member is not accessible: {}, from {}", member, lookup_class.view.name().to_str())));
            }
        }
        check_for_type_alias(jvm, member, &declaring)?;
        let resolved = member.with_resolution(declaring.view.name(), modifiers, Resolution::Resolved(binding));
        if !resolved.reference_kind_is_consistent() {
            return Err(ResolutionFailure::Linkage(format!("inconsistent reference kind for {}", resolved)));
        }
        Ok(resolved)
    }

    pub fn resolve_or_fail(jvm: &JVMState, ref_kind: ReferenceKind, member: &MemberName, lookup_class: Option<&Arc<RuntimeClass>>) -> InvokeResult<MemberName> {
        let resolved = Self::resolve(jvm, ref_kind, member, lookup_class);
        match resolved.resolution() {
            Resolution::Resolved(_) => Ok(resolved),
            Resolution::Failed(failure) => Err(failure.to_error()),
            Resolution::Unresolved => Err(InvokeError::IllegalState(format!("{} was not resolved", resolved))),
        }
    }

    pub fn resolve_or_null(jvm: &JVMState, ref_kind: ReferenceKind, member: &MemberName, lookup_class: Option<&Arc<RuntimeClass>>) -> Option<MemberName> {
        let resolved = Self::resolve(jvm, ref_kind, member, lookup_class);
        if resolved.is_resolved() {
            Some(resolved)
        } else {
            None
        }
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::HashSet;

    use rust_jvm_common::classfile::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName, MethodName};
    use rust_jvm_common::mhn_consts::ReferenceKind;

    use crate::class_loading::define_class;
    use crate::exceptions::InvokeError;
    use crate::java_values::JavaValue;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::resolvers::ResolutionFailure;
    use crate::stdlib::java::lang::invoke::method_type::MethodType;
    use crate::stdlib::java::lang::member_name::{MemberName, MemberNameFactory, MemberType};
    use crate::view::ClassView;

    fn value_of() -> MemberName {
        let method_type = MethodType::make(CPDType::Class(CClassName::int()), vec![CPDType::IntType]).unwrap();
        MemberName::new_method(CClassName::int(), MethodName::method_valueOf(), method_type, ReferenceKind::InvokeStatic).unwrap()
    }

    #[test]
    pub fn construction_checks_reference_kind() {
        let method_type = MethodType::make(CPDType::VoidType, vec![]).unwrap();
        assert!(matches!(MemberName::new_method(CClassName::object(), MethodName::new("run"), method_type.clone(), ReferenceKind::GetField), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(MemberName::new_field(CClassName::object(), FieldName::new("x"), CPDType::IntType, ReferenceKind::InvokeStatic), Err(InvokeError::IllegalArgument(_))));
        assert!(matches!(MemberName::new_with_ref_kind(ReferenceKind::NewInvokeSpecial, CClassName::object(), "notInit", MemberType::Method(method_type.clone())), Err(InvokeError::IllegalArgument(_))));
        assert!(MemberName::new_constructor(CClassName::object(), method_type).unwrap().is_constructor());
        assert_eq!(value_of().to_string(), "java.lang.Integer.valueOf(int)Integer/invokeStatic");
    }

    #[test]
    pub fn transitions() {
        let method_type = MethodType::make(CPDType::string(), vec![]).unwrap();
        let virtual_ = MemberName::new_method(CClassName::object(), MethodName::method_toString(), method_type, ReferenceKind::InvokeVirtual).unwrap();
        let special = virtual_.as_special().unwrap();
        assert_eq!(special.get_reference_kind(), Some(ReferenceKind::InvokeSpecial));
        assert!(special.as_constructor().is_err());
        assert!(value_of().as_special().is_err());
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        assert_eq!(special.as_normal_original(&jvm).unwrap(), virtual_);
        let getter = MemberName::new_field(CClassName::object(), FieldName::new("x"), CPDType::IntType, ReferenceKind::GetStatic).unwrap();
        assert_eq!(getter.as_setter().unwrap().get_reference_kind(), Some(ReferenceKind::PutStatic));
        assert!(virtual_.as_setter().is_err());
    }

    #[test]
    pub fn equality_ignores_resolution() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let unresolved = value_of();
        let resolved = MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeStatic, &unresolved, None).unwrap();
        assert!(resolved.is_resolved());
        assert!(!unresolved.is_resolved());
        assert_eq!(resolved, unresolved);
        let set = HashSet::from([resolved, unresolved]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    pub fn failures_are_data_until_asked() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let missing = MemberName::new_method(CClassName::int(), MethodName::new("noSuchThing"), MethodType::make(CPDType::VoidType, vec![]).unwrap(), ReferenceKind::InvokeStatic).unwrap();
        let resolved = MemberNameFactory::resolve(&jvm, ReferenceKind::InvokeStatic, &missing, None);
        assert!(matches!(resolved.resolution_failure(), Some(ResolutionFailure::NoSuchMethod(_))));
        assert!(MemberNameFactory::resolve_or_null(&jvm, ReferenceKind::InvokeStatic, &missing, None).is_none());
        assert!(matches!(MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeStatic, &missing, None), Err(InvokeError::NoSuchMember(_))));
        let wrong_kind = MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeVirtual, &value_of(), None);
        assert!(matches!(wrong_kind, Err(InvokeError::Linkage(_))));
    }

    #[test]
    pub fn private_members_are_checked_against_the_lookup_class() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let loader = jvm.new_loader();
        let secretive = define_class(&jvm, ClassView::builder(CClassName::new("test/Secretive"))
            .method("hidden", "()I", ACC_PRIVATE | ACC_STATIC, |_, _| Ok(JavaValue::Int(1)))
            .build().unwrap(), loader).unwrap();
        let outsider = define_class(&jvm, ClassView::builder(CClassName::new("other/Outsider")).access_flags(ACC_PUBLIC).build().unwrap(), loader).unwrap();
        let hidden = MemberName::new_method(CClassName::new("test/Secretive"), MethodName::new("hidden"), MethodType::make(CPDType::IntType, vec![]).unwrap(), ReferenceKind::InvokeStatic).unwrap();
        assert!(MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeStatic, &hidden, Some(&secretive)).is_ok());
        assert!(matches!(MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeStatic, &hidden, Some(&outsider)), Err(InvokeError::IllegalAccess(_))));
    }

    #[test]
    pub fn type_alias_check_rejects_invisible_types() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let loader_a = jvm.new_loader();
        let loader_b = jvm.new_loader();
        define_class(&jvm, ClassView::builder(CClassName::new("a/Hidden")).build().unwrap(), loader_a).unwrap();
        define_class(&jvm, ClassView::builder(CClassName::new("b/User"))
            .method("take", "(La/Hidden;)V", ACC_PUBLIC | ACC_STATIC, |_, _| Ok(JavaValue::Top))
            .build().unwrap(), loader_b).unwrap();
        let take = MemberName::new_method(CClassName::new("b/User"), MethodName::new("take"), MethodType::from_method_descriptor_string("(La/Hidden;)V").unwrap(), ReferenceKind::InvokeStatic).unwrap();
        assert!(matches!(MemberNameFactory::resolve_or_fail(&jvm, ReferenceKind::InvokeStatic, &take, None), Err(InvokeError::Linkage(_))));
    }
}
