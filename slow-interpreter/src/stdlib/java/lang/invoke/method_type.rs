use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use itertools::Itertools;
use lazy_static::lazy_static;
use parking_lot::RwLock;

use rust_jvm_common::compressed_classfile::{CMethodDescriptor, CPDType};
use rust_jvm_common::compressed_classfile::names::CClassName;
use rust_jvm_common::descriptor_parser::parse_method_descriptor;
use rust_jvm_common::MAX_MH_ARITY;
use rust_jvm_common::primitive_wrapper::Wrapper;

use crate::exceptions::{InvokeError, InvokeResult};
use crate::stdlib::java::lang::invoke::invokers::{InvokerCache, Invokers};
use crate::stdlib::java::lang::invoke::method_type_form::MethodTypeForm;

#[derive(Clone, Eq, PartialEq, Hash)]
struct MethodTypeKey {
    rtype: CPDType,
    ptypes: Box<[CPDType]>,
}

struct InternTable {
    entries: HashMap<MethodTypeKey, Weak<MethodTypeInner>>,
    purge_threshold: usize,
}

impl InternTable {
    fn purge_dead_entries(&mut self) {
        if self.entries.len() >= self.purge_threshold {
            self.entries.retain(|_, entry| entry.strong_count() > 0);
            self.purge_threshold = (self.entries.len() * 2).max(INITIAL_PURGE_THRESHOLD);
        }
    }
}

const INITIAL_PURGE_THRESHOLD: usize = 256;

lazy_static! {
    static ref INTERN_TABLE: RwLock<InternTable> = RwLock::new(InternTable { entries: HashMap::new(), purge_threshold: INITIAL_PURGE_THRESHOLD });
}

/// An erased signature owns its form. Every other signature holds its erasure, and through it the form,
/// so nothing a form refers to points back at the signatures using it.
enum FormLink {
    Own(Arc<MethodTypeForm>),
    Erased(MethodType),
}

pub struct MethodTypeInner {
    rtype: CPDType,
    ptypes: Box<[CPDType]>,
    form: OnceLock<FormLink>,
    wrap_alt: RwLock<Weak<MethodTypeInner>>,
    invokers: OnceLock<InvokerCache>,
}

/// An interned method signature. Equal signatures are the same instance, so equality and hashing are by identity.
#[derive(Clone)]
pub struct MethodType(Arc<MethodTypeInner>);

impl PartialEq for MethodType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MethodType {}

impl Hash for MethodType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state)
    }
}

fn check_ptypes(ptypes: &[CPDType]) -> InvokeResult<()> {
    if let Some(void_i) = ptypes.iter().position(|ptype| ptype.is_void()) {
        return Err(InvokeError::InvalidSignature(format!("parameter {} is void", void_i)));
    }
    let slots = ptypes.iter().map(|ptype| ptype.slot_size()).sum::<usize>();
    if slots > MAX_MH_ARITY {
        return Err(InvokeError::SlotLimitExceeded { slots });
    }
    Ok(())
}

fn check_index(index: usize, len: usize) -> InvokeResult<()> {
    if index >= len {
        return Err(InvokeError::IndexOutOfRange { index, len });
    }
    Ok(())
}

fn check_range(start: usize, end: usize, len: usize) -> InvokeResult<()> {
    if end > len {
        return Err(InvokeError::IndexOutOfRange { index: end, len });
    }
    if start > end {
        return Err(InvokeError::IndexOutOfRange { index: start, len: end });
    }
    Ok(())
}

impl MethodType {
    /// Finds or creates the signature `(ptypes)rtype`.
    pub fn make(rtype: CPDType, ptypes: impl Into<Vec<CPDType>>) -> InvokeResult<Self> {
        let ptypes = ptypes.into();
        check_ptypes(ptypes.as_slice())?;
        Ok(Self::make_trusted(rtype, ptypes))
    }

    /// Interning without argument checks, for signatures derived from a valid one.
    pub(crate) fn make_trusted(rtype: CPDType, ptypes: Vec<CPDType>) -> Self {
        let key = MethodTypeKey { rtype, ptypes: ptypes.into_boxed_slice() };
        if let Some(existing) = INTERN_TABLE.read().entries.get(&key).and_then(Weak::upgrade) {
            return MethodType(existing);
        }
        let mut table = INTERN_TABLE.write();
        if let Some(existing) = table.entries.get(&key).and_then(Weak::upgrade) {
            return MethodType(existing);
        }
        let inner = Arc::new(MethodTypeInner {
            rtype: key.rtype,
            ptypes: key.ptypes.clone(),
            form: OnceLock::new(),
            wrap_alt: RwLock::new(Weak::new()),
            invokers: OnceLock::new(),
        });
        table.entries.insert(key, Arc::downgrade(&inner));
        table.purge_dead_entries();
        MethodType(inner)
    }

    pub fn from_descriptor(desc: &CMethodDescriptor) -> InvokeResult<Self> {
        Self::make(desc.return_type, desc.arg_types.clone())
    }

    /// `(Object * object_arg_count [, Object[]])Object`
    pub fn generic_method_type(object_arg_count: usize, final_array: bool) -> InvokeResult<Self> {
        let mut ptypes = vec![CPDType::object(); object_arg_count];
        if final_array {
            ptypes.push(CPDType::object_array());
        }
        Self::make(CPDType::object(), ptypes)
    }

    pub fn from_method_descriptor_string(descriptor: &str) -> InvokeResult<Self> {
        let desc = parse_method_descriptor(descriptor).ok_or_else(|| InvokeError::InvalidSignature(descriptor.to_string()))?;
        Self::from_descriptor(&desc)
    }

    pub fn to_method_descriptor_string(&self) -> String {
        self.to_descriptor().jvm_representation()
    }

    pub fn to_descriptor(&self) -> CMethodDescriptor {
        CMethodDescriptor { arg_types: self.0.ptypes.to_vec(), return_type: self.0.rtype }
    }

    pub fn return_type(&self) -> CPDType {
        self.0.rtype
    }

    pub fn parameter_list(&self) -> &[CPDType] {
        &self.0.ptypes
    }

    pub fn parameter_count(&self) -> usize {
        self.0.ptypes.len()
    }

    pub fn parameter_type(&self, i: usize) -> InvokeResult<CPDType> {
        check_index(i, self.parameter_count())?;
        Ok(self.0.ptypes[i])
    }

    pub fn last_parameter_type(&self) -> Option<CPDType> {
        self.0.ptypes.last().copied()
    }

    pub fn parameter_slot_count(&self) -> usize {
        self.0.ptypes.iter().map(|ptype| ptype.slot_size()).sum()
    }

    pub fn change_parameter_type(&self, i: usize, ptype: CPDType) -> InvokeResult<Self> {
        check_index(i, self.parameter_count())?;
        if self.0.ptypes[i] == ptype {
            return Ok(self.clone());
        }
        let mut ptypes = self.0.ptypes.to_vec();
        ptypes[i] = ptype;
        Self::make(self.0.rtype, ptypes)
    }

    pub fn insert_parameter_types(&self, pos: usize, to_insert: &[CPDType]) -> InvokeResult<Self> {
        if pos > self.parameter_count() {
            return Err(InvokeError::IndexOutOfRange { index: pos, len: self.parameter_count() });
        }
        if to_insert.is_empty() {
            return Ok(self.clone());
        }
        let ptypes = self.0.ptypes[..pos].iter().chain(to_insert.iter()).chain(self.0.ptypes[pos..].iter()).copied().collect_vec();
        Self::make(self.0.rtype, ptypes)
    }

    pub fn append_parameter_types(&self, to_append: &[CPDType]) -> InvokeResult<Self> {
        self.insert_parameter_types(self.parameter_count(), to_append)
    }

    /// Removes the parameters in `start..end`.
    pub fn drop_parameter_types(&self, start: usize, end: usize) -> InvokeResult<Self> {
        check_range(start, end, self.parameter_count())?;
        if start == end {
            return Ok(self.clone());
        }
        let ptypes = self.0.ptypes[..start].iter().chain(self.0.ptypes[end..].iter()).copied().collect_vec();
        Ok(Self::make_trusted(self.0.rtype, ptypes))
    }

    pub fn replace_parameter_types(&self, start: usize, end: usize, replacements: &[CPDType]) -> InvokeResult<Self> {
        check_range(start, end, self.parameter_count())?;
        if &self.0.ptypes[start..end] == replacements {
            return Ok(self.clone());
        }
        let ptypes = self.0.ptypes[..start].iter().chain(replacements.iter()).chain(self.0.ptypes[end..].iter()).copied().collect_vec();
        Self::make(self.0.rtype, ptypes)
    }

    pub fn change_return_type(&self, rtype: CPDType) -> Self {
        if self.0.rtype == rtype {
            return self.clone();
        }
        Self::make_trusted(rtype, self.0.ptypes.to_vec())
    }

    fn form_link(&self) -> &FormLink {
        self.0.form.get_or_init(|| {
            let erased = self.erase_uncached();
            if erased == *self {
                FormLink::Own(Arc::new(MethodTypeForm::new(self)))
            } else {
                FormLink::Erased(erased)
            }
        })
    }

    pub fn form(&self) -> &Arc<MethodTypeForm> {
        match self.form_link() {
            FormLink::Own(form) => form,
            FormLink::Erased(erased) => erased.form(),
        }
    }

    fn erase_uncached(&self) -> Self {
        let erase = |cpdtype: &CPDType| if cpdtype.is_reference() { CPDType::object() } else { *cpdtype };
        Self::make_trusted(erase(&self.0.rtype), self.0.ptypes.iter().map(erase).collect())
    }

    /// Every reference type replaced by `Object`; primitives kept.
    pub fn erase(&self) -> Self {
        match self.form_link() {
            FormLink::Own(_) => self.clone(),
            FormLink::Erased(erased) => erased.clone(),
        }
    }

    /// Erased, with subword primitives widened to `int`.
    pub fn basic_type(&self) -> Self {
        match self.form().basic_type() {
            Some(basic_type) => basic_type.clone(),
            None => self.erase(),
        }
    }

    /// Every type, return type included, replaced by `Object`.
    pub fn generic(&self) -> Self {
        Self::make_trusted(CPDType::object(), vec![CPDType::object(); self.parameter_count()])
    }

    pub fn is_generic(&self) -> bool {
        self.0.rtype.is_object() && self.0.ptypes.iter().all(|ptype| ptype.is_object())
    }

    pub fn has_primitives(&self) -> bool {
        self.0.rtype.is_primitive() || self.0.ptypes.iter().any(|ptype| ptype.is_primitive())
    }

    pub fn has_wrappers(&self) -> bool {
        self.unwrap() != *self
    }

    fn cached_wrap_alt(&self) -> Option<Self> {
        self.0.wrap_alt.read().upgrade().map(MethodType)
    }

    /// Primitives replaced by their box classes, `void` by `Void`.
    pub fn wrap(&self) -> Self {
        if !self.has_primitives() {
            return self.clone();
        }
        if let Some(cached) = self.cached_wrap_alt() {
            return cached;
        }
        let wrap = |cpdtype: &CPDType| match Wrapper::for_primitive_type(cpdtype) {
            None => *cpdtype,
            Some(wrapper) => wrapper.wrapper_type(),
        };
        let res = Self::make_trusted(wrap(&self.0.rtype), self.0.ptypes.iter().map(wrap).collect());
        *self.0.wrap_alt.write() = Arc::downgrade(&res.0);
        res
    }

    /// Box classes replaced by their primitives. A `Void` return becomes `void`; `Void` parameters stay.
    pub fn unwrap(&self) -> Self {
        let cacheable = !self.has_primitives();
        if cacheable {
            if let Some(cached) = self.cached_wrap_alt() {
                return cached;
            }
        }
        let unwrap = |cpdtype: &CPDType, allow_void: bool| match cpdtype.try_unwrap_class_type().and_then(Wrapper::for_wrapper_class) {
            Some(Wrapper::Object) | None => *cpdtype,
            Some(Wrapper::Void) if !allow_void => *cpdtype,
            Some(wrapper) => wrapper.primitive_type(),
        };
        let res = Self::make_trusted(unwrap(&self.0.rtype, true), self.0.ptypes.iter().map(|ptype| unwrap(ptype, false)).collect());
        if cacheable {
            *self.0.wrap_alt.write() = Arc::downgrade(&res.0);
        }
        res
    }

    /// This signature with a leading `MethodHandle` parameter: the type of an invoker for it.
    pub fn invoker_type(&self) -> InvokeResult<Self> {
        self.insert_parameter_types(0, &[CPDType::method_handle()])
    }

    /// The trailing `array_length` parameters replaced by the array's component type.
    pub fn as_spreader_type(&self, array_type: &CPDType, array_length: usize) -> InvokeResult<Self> {
        let component = array_type.try_unwrap_array_type().ok_or_else(|| InvokeError::IllegalArgument(format!("not an array type: {}", array_type.java_source_representation())))?;
        let count = self.parameter_count();
        if array_length > count {
            return Err(InvokeError::IllegalArgument("bad spread array length".to_string()));
        }
        self.replace_parameter_types(count - array_length, count, vec![component; array_length].as_slice())
    }

    /// The trailing array parameter replaced by `array_length` parameters of its component type.
    pub fn as_collector_type(&self, array_type: &CPDType, array_length: usize) -> InvokeResult<Self> {
        let component = array_type.try_unwrap_array_type().ok_or_else(|| InvokeError::IllegalArgument(format!("not an array type: {}", array_type.java_source_representation())))?;
        let count = self.parameter_count();
        if count == 0 {
            return Err(InvokeError::IllegalArgument("no trailing parameter to collect into".to_string()));
        }
        self.replace_parameter_types(count - 1, count, vec![component; array_length].as_slice())
    }

    /// Whether a call of type `new_type` can be adapted to this signature by `as_type`.
    pub fn is_convertible_to(&self, new_type: &MethodType) -> bool {
        if Arc::ptr_eq(self.form(), new_type.form()) {
            return true;
        }
        if !can_convert(&self.0.rtype, &new_type.0.rtype) {
            return false;
        }
        let src_types = new_type.parameter_list();
        let dst_types = self.parameter_list();
        if src_types.len() != dst_types.len() {
            return false;
        }
        src_types.iter().zip(dst_types.iter()).all(|(src, dst)| can_convert(src, dst))
    }

    pub fn invokers(&self) -> Invokers<'_> {
        Invokers::new(self, self.0.invokers.get_or_init(|| InvokerCache::new(self.parameter_count())))
    }

    pub fn ptr_eq(&self, other: &MethodType) -> bool {
        self == other
    }
}

/// `dst.isAssignableFrom(wrapper class of src_wrapper)`, answered from the fixed supertypes of the box classes.
fn box_class_assignable_to(wrapper: Wrapper, dst: &CPDType) -> bool {
    let class_name = match dst.try_unwrap_class_type() {
        Some(class_name) => class_name,
        None => return false,
    };
    if class_name == wrapper.wrapper_class() || class_name == CClassName::object() {
        return true;
    }
    if wrapper == Wrapper::Void {
        return false;
    }
    if class_name == CClassName::serializable() || class_name == CClassName::comparable() {
        return true;
    }
    class_name == CClassName::number() && wrapper.is_numeric() && wrapper != Wrapper::Char
}

/// Whether a single value of type `src` can be converted to `dst` by `as_type`.
pub fn can_convert(src: &CPDType, dst: &CPDType) -> bool {
    if src == dst || src.is_object() || dst.is_object() {
        return true;
    }
    if let Some(src_wrapper) = Wrapper::for_primitive_type(src) {
        if src_wrapper == Wrapper::Void {
            return true;
        }
        match Wrapper::for_primitive_type(dst) {
            Some(dst_wrapper) => dst_wrapper.is_convertible_from(src_wrapper),
            None => box_class_assignable_to(src_wrapper, dst),
        }
    } else if let Some(dst_wrapper) = Wrapper::for_primitive_type(dst) {
        if dst_wrapper == Wrapper::Void {
            return true;
        }
        if let CPDType::Class(src_class) = src {
            if box_class_assignable_to(dst_wrapper, &CPDType::Class(*src_class)) {
                return true;
            }
            if let Some(src_wrapper) = Wrapper::for_wrapper_class(*src_class) {
                return dst_wrapper.is_convertible_from(src_wrapper);
            }
        }
        false
    } else {
        true
    }
}

impl Display for MethodType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}){}", self.0.ptypes.iter().map(|ptype| ptype.short_representation()).join(","), self.0.rtype.short_representation())
    }
}

impl Debug for MethodType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use rust_jvm_common::compressed_classfile::CPDType;
    use rust_jvm_common::compressed_classfile::names::CClassName;

    use crate::exceptions::InvokeError;
    use crate::jvm_state::JVMState;
    use crate::options::JVMOptions;
    use crate::stdlib::java::lang::invoke::method_type::{can_convert, MethodType};

    #[test]
    pub fn interned_by_content() {
        let a = MethodType::make(CPDType::IntType, vec![CPDType::object(), CPDType::LongType]).unwrap();
        let b = MethodType::make(CPDType::IntType, vec![CPDType::object(), CPDType::LongType]).unwrap();
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a.to_string(), "(Object,long)int");
        assert_eq!(a.to_method_descriptor_string(), "(Ljava/lang/Object;J)I");
        assert_eq!(MethodType::from_method_descriptor_string("(Ljava/lang/Object;J)I").unwrap(), a);
    }

    #[test]
    pub fn slot_limit() {
        assert!(MethodType::make(CPDType::VoidType, vec![CPDType::IntType; 254]).is_ok());
        assert!(matches!(MethodType::make(CPDType::VoidType, vec![CPDType::IntType; 255]), Err(InvokeError::SlotLimitExceeded { slots: 255 })));
        assert!(matches!(MethodType::make(CPDType::VoidType, vec![CPDType::LongType; 128]), Err(InvokeError::SlotLimitExceeded { slots: 256 })));
        assert!(matches!(MethodType::make(CPDType::VoidType, vec![CPDType::VoidType]), Err(InvokeError::InvalidSignature(_))));
    }

    #[test]
    pub fn derived_views() {
        let int_class = CPDType::Class(CClassName::int());
        let mt = MethodType::make(int_class, vec![CPDType::string(), CPDType::ShortType]).unwrap();
        assert_eq!(mt.erase().to_string(), "(Object,short)Object");
        assert_eq!(mt.basic_type().to_string(), "(Object,int)Object");
        assert_eq!(mt.basic_type().basic_type(), mt.basic_type());
        assert_eq!(mt.generic().to_string(), "(Object,Object)Object");
        assert_eq!(mt.wrap().to_string(), "(String,Short)Integer");
        assert_eq!(mt.unwrap().to_string(), "(String,short)int");
        assert_eq!(mt.wrap().unwrap(), mt.unwrap());
        assert!(mt.has_wrappers());
        assert!(Arc::ptr_eq(mt.form(), mt.erase().form()));
    }

    #[test]
    pub fn dropped_signature_is_reclaimed() {
        let jvm = JVMState::new(JVMOptions::default()).unwrap();
        let holder = CPDType::Class(CClassName::new("reclaim/Holder"));
        let mt = MethodType::make(CPDType::FloatType, vec![holder, CPDType::ShortType, CPDType::CharType]).unwrap();
        assert_eq!(mt.basic_type().to_string(), "(Object,int,int)float");
        let invokers = mt.invokers();
        invokers.exact_invoker(&jvm).unwrap();
        invokers.generic_invoker(&jvm).unwrap();
        invokers.basic_invoker(&jvm).unwrap();
        invokers.spread_invoker(&jvm, 2).unwrap();
        invokers.varargs_invoker(&jvm).unwrap();
        let call_site_target = invokers.uninitialized_call_site(&jvm).unwrap();
        assert!(call_site_target.ptr_eq(&invokers.uninitialized_call_site(&jvm).unwrap()));
        drop(call_site_target);
        let signature = Arc::downgrade(&mt.0);
        let erased = Arc::downgrade(&mt.erase().0);
        drop(mt);
        assert!(signature.upgrade().is_none());
        assert!(erased.upgrade().is_none());
        assert_eq!(MethodType::make(CPDType::FloatType, vec![holder, CPDType::ShortType, CPDType::CharType]).unwrap().to_string(), "(Holder,short,char)float");
    }

    #[test]
    pub fn structural_edits() {
        let mt = MethodType::make(CPDType::VoidType, vec![CPDType::IntType, CPDType::object()]).unwrap();
        assert_eq!(mt.change_parameter_type(0, CPDType::IntType).unwrap(), mt);
        assert_eq!(mt.drop_parameter_types(0, 1).unwrap().to_string(), "(Object)void");
        assert_eq!(mt.insert_parameter_types(1, &[CPDType::LongType]).unwrap().to_string(), "(int,long,Object)void");
        assert_eq!(mt.invoker_type().unwrap().to_string(), "(MethodHandle,int,Object)void");
        assert!(matches!(mt.parameter_type(2), Err(InvokeError::IndexOutOfRange { index: 2, len: 2 })));
        assert!(matches!(mt.drop_parameter_types(1, 3), Err(InvokeError::IndexOutOfRange { .. })));
    }

    #[test]
    pub fn conversion_rules() {
        let integer = CPDType::Class(CClassName::int());
        let number = CPDType::Class(CClassName::number());
        assert!(can_convert(&CPDType::IntType, &CPDType::LongType));
        assert!(!can_convert(&CPDType::LongType, &CPDType::IntType));
        assert!(can_convert(&CPDType::CharType, &CPDType::IntType));
        assert!(!can_convert(&CPDType::ByteType, &CPDType::CharType));
        assert!(!can_convert(&CPDType::BooleanType, &CPDType::IntType));
        assert!(can_convert(&CPDType::IntType, &number));
        assert!(!can_convert(&CPDType::IntType, &CPDType::string()));
        assert!(can_convert(&number, &CPDType::IntType));
        assert!(can_convert(&integer, &CPDType::LongType));
        assert!(!can_convert(&CPDType::Class(CClassName::long()), &CPDType::IntType));
        assert!(can_convert(&CPDType::VoidType, &CPDType::IntType));
        assert!(can_convert(&CPDType::IntType, &CPDType::VoidType));
        assert!(can_convert(&CPDType::string(), &integer));
    }
}
