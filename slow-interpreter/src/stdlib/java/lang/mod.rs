pub mod invoke;
pub mod member_name;
