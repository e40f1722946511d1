pub mod lifecycle;
pub mod tracking;
