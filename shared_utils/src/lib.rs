pub mod env;
pub mod num;
