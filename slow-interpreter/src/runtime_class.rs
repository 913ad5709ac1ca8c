use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::ThreadId;

use parking_lot::{Condvar, Mutex, RwLock};

use rust_jvm_common::compressed_classfile::CPDType;
use rust_jvm_common::compressed_classfile::names::{CClassName, FieldName};
use rust_jvm_common::loading::LoaderName;
use rust_jvm_common::method_shape::MethodShape;

use crate::java_values::{ClassMirror, default_value, JavaValue, Object};
use crate::view::{ClassView, HasAccessFlags};

#[derive(Copy, Clone, Debug)]
pub struct FieldNumber {
    pub number: usize,
    pub cpdtype: CPDType,
    pub access_flags: u16,
    pub declaring_class: CClassName,
    pub field_i: usize,
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClassStatus {
    PREPARED,
    INITIALIZING,
    INITIALIZED,
    ERRONEOUS,
}

pub(crate) struct InitState {
    pub(crate) status: ClassStatus,
    pub(crate) initializing_thread: Option<ThreadId>,
}

pub struct RuntimeClass {
    pub view: Arc<ClassView>,
    pub loader: LoaderName,
    pub parent: Option<Arc<RuntimeClass>>,
    pub interfaces: Vec<Arc<RuntimeClass>>,
    instance_fields: HashMap<(CClassName, FieldName), FieldNumber>,
    recursive_num_fields: usize,
    static_fields: HashMap<FieldName, FieldNumber>,
    pub static_vars: RwLock<Vec<JavaValue>>,
    pub(crate) init_state: Mutex<InitState>,
    pub(crate) init_cond: Condvar,
    dispatch_cache: RwLock<HashMap<MethodShape, Option<(Weak<RuntimeClass>, usize)>>>,
    mirror: OnceLock<Arc<Object>>,
}

impl RuntimeClass {
    pub fn new(view: Arc<ClassView>, loader: LoaderName, parent: Option<Arc<RuntimeClass>>, interfaces: Vec<Arc<RuntimeClass>>) -> Self {
        let mut instance_fields = parent.as_ref().map(|parent| parent.instance_fields.clone()).unwrap_or_default();
        let mut recursive_num_fields = parent.as_ref().map(|parent| parent.recursive_num_fields).unwrap_or(0);
        let mut static_fields = HashMap::new();
        let mut static_vars = vec![];
        for (field_i, field) in view.fields() {
            if field.is_static() {
                static_fields.insert(field.name, FieldNumber {
                    number: static_vars.len(),
                    cpdtype: field.field_type,
                    access_flags: field.access_flags,
                    declaring_class: view.name(),
                    field_i,
                });
                static_vars.push(default_value(&field.field_type));
            } else {
                instance_fields.insert((view.name(), field.name), FieldNumber {
                    number: recursive_num_fields,
                    cpdtype: field.field_type,
                    access_flags: field.access_flags,
                    declaring_class: view.name(),
                    field_i,
                });
                recursive_num_fields += 1;
            }
        }
        Self {
            view,
            loader,
            parent,
            interfaces,
            instance_fields,
            recursive_num_fields,
            static_fields,
            static_vars: RwLock::new(static_vars),
            init_state: Mutex::new(InitState { status: ClassStatus::PREPARED, initializing_thread: None }),
            init_cond: Condvar::new(),
            dispatch_cache: RwLock::new(HashMap::new()),
            mirror: OnceLock::new(),
        }
    }

    pub fn cpdtype(&self) -> CPDType {
        self.view.type_()
    }

    pub fn status(&self) -> ClassStatus {
        self.init_state.lock().status
    }

    pub fn is_initialized(&self) -> bool {
        self.status() == ClassStatus::INITIALIZED
    }

    pub fn lookup_instance_field(&self, declaring_class: CClassName, name: FieldName) -> Option<&FieldNumber> {
        self.instance_fields.get(&(declaring_class, name))
    }

    pub fn lookup_static_field(&self, name: FieldName) -> Option<&FieldNumber> {
        self.static_fields.get(&name)
    }

    pub fn num_instance_fields(&self) -> usize {
        self.recursive_num_fields
    }

    pub fn instance_field_types(&self) -> Vec<CPDType> {
        let mut types = vec![CPDType::object(); self.recursive_num_fields];
        for field_number in self.instance_fields.values() {
            types[field_number.number] = field_number.cpdtype;
        }
        types
    }

    /// This class followed by its superclasses, nearest first.
    pub fn class_hierarchy(self: &Arc<Self>) -> impl Iterator<Item=Arc<RuntimeClass>> {
        let mut current = Some(self.clone());
        std::iter::from_fn(move || {
            let res = current.take()?;
            current = res.parent.clone();
            Some(res)
        })
    }

    pub fn is_subclass_of(self: &Arc<Self>, other: CClassName) -> bool {
        self.class_hierarchy().any(|class| class.view.name() == other)
    }

    /// True if this class or interface is `other` or has it among its superinterfaces.
    pub fn implements(self: &Arc<Self>, other: CClassName) -> bool {
        self.class_hierarchy().any(|class| class.view.name() == other || class.interfaces.iter().any(|interface| interface.implements(other)))
    }

    pub fn mirror(&self) -> Arc<Object> {
        self.mirror.get_or_init(|| Arc::new(Object::Class(ClassMirror { cpdtype: self.cpdtype() }))).clone()
    }

    pub(crate) fn cached_dispatch(&self, shape: &MethodShape) -> Option<Option<(Arc<RuntimeClass>, usize)>> {
        let guard = self.dispatch_cache.read();
        let cached = guard.get(shape)?;
        match cached {
            None => Some(None),
            Some((class, method_i)) => class.upgrade().map(|class| Some((class, *method_i))),
        }
    }

    pub(crate) fn cache_dispatch(&self, shape: MethodShape, selected: Option<(&Arc<RuntimeClass>, usize)>) {
        self.dispatch_cache.write().insert(shape, selected.map(|(class, method_i)| (Arc::downgrade(class), method_i)));
    }
}

impl Debug for RuntimeClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RuntimeClass({}, loader: {})", self.view.name(), self.loader)
    }
}
