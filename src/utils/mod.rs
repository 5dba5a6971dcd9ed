pub mod annotation;
pub mod phone;
