//! Shader program building.
//!
//! Sources go through three steps:
//! - `ShaderSource`: stage text, loaded from disk or given inline
//! - `compile_stage`: one driver stage object per source
//! - `link_program`: both stages linked into a `ShaderProgram`
//!
//! A failure at any step is terminal for that attempt. Stage objects never
//! outlive `link_program`, whether linking succeeded or not.

mod builder;
mod program;
mod source;

pub use builder::{CompiledStage, build_program, compile_stage, link_program};
pub use program::ShaderProgram;
pub use source::ShaderSource;
