// loopc — loop optimizing compiler for a tiny array language
//
// Library root. Front end (lexer, parser), IR lowering, the three loop
// optimizations, and source emission.

pub mod ast;
pub mod diag;
pub mod emit;
pub mod fuse;
pub mod ir;
pub mod lexer;
pub mod licm;
pub mod lower;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod unroll;

pub use pipeline::{compile, compile_with, CompilationError};
