pub mod span;
pub mod vec2;
