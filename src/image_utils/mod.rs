pub mod padding;
pub mod preprocessing;
