//! The lookup side of method handles: finding members by name and type, enumerating them, and
//! turning them into direct handles.

pub mod get_members;
pub mod init;
pub mod lookup;
pub mod method_handle_info;
pub mod offsets;
pub mod resolve;

pub use lookup::Lookup;
pub use method_handle_info::MethodHandleInfo;
