//! A compiler and virtual machine for Small Basic.
//!
//! To execute a script:
//! 1. describe the libraries the host provides in a [`core::LibraryManifest`], and put it
//!    into [`compilation::CompilerOptions`] together with the [`core::RunMode`].
//! 1. compile the source with [`compilation::Compilation::new`]. This runs the
//!    [`scanner`], the [`parser`], the [`binder`] and, if none of them reported a
//!    diagnostic, the instruction generator in [`compiler`].
//! 1. if [`diagnostics()`](compilation::Compilation::diagnostics) is empty,
//!    [`program()`](compilation::Compilation::program) returns the compiled program.
//! 1. create a [`vm::Engine`] from the program and the library implementations, then
//!    drive it:
//!
//!    ```ignore
//!    loop {
//!        match engine.run()? {
//!            RunOutcome::Terminated => break,
//!            RunOutcome::Paused => { /* stepping, show where we are */ }
//!            RunOutcome::Suspended(continuation) => {
//!                let value = wait_for_the_library();
//!                engine.resume(&continuation, value)?;
//!            }
//!        }
//!    }
//!    ```
//!
//! A compiled [`core::Program`] can be stored with
//! [`to_bytes()`](core::Program::to_bytes) and loaded again later.
pub mod binder;
pub mod compilation;
pub mod compiler;
pub mod core;
pub mod parser;
pub mod scanner;
pub mod utils;
pub mod vm;

pub use compilation::{Compilation, CompilerOptions};
