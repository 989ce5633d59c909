//! Building blocks shared by every scenario: keyword arguments, command lines
//! and generated resource names.

pub mod command;
pub mod kwargs;
pub mod names;

pub use command::CommandLine;
pub use kwargs::{render_value, Kwargs};
pub use names::NameGenerator;
