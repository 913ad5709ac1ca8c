pub use compressed_descriptors::{CFieldDescriptor, CMethodDescriptor, CompressedFieldDescriptor, CompressedMethodDescriptor};
pub use compressed_types::{CompressedParsedDescriptorType, CPDType, NonArrayCompressedParsedDescriptorType};
pub use string_pool::{CCString, CompressedClassfileString, CompressedClassfileStringPool};

pub mod string_pool;
pub mod class_names;
pub mod names;
pub mod compressed_types;
pub mod compressed_descriptors;
