//! 2D texture upload.
//!
//! Decoding image files is the caller's job; this module takes the decoded
//! pixels as a `DecodedImage` and turns them into a sampled texture bound to
//! a texture unit.

mod decoded;
mod texture2d;

pub use decoded::DecodedImage;
pub use texture2d::Texture2d;
