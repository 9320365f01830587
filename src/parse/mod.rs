pub mod lexer;
pub mod operators;
pub mod source;
pub mod span;
