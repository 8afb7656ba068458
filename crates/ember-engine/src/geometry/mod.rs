//! Geometry buffer management.
//!
//! Raw vertex and index arrays become driver buffers here, and a
//! `VertexLayout` tells the driver how the vertex bytes map to shader
//! attributes. `Mesh` ties one vertex buffer, its layout and an optional
//! index buffer together and knows which draw call it needs.
//!
//! Every object is owned by exactly one value and freed through `release`.

mod buffer;
mod layout;
mod mesh;

pub use buffer::{GeometryBuffer, IndexBuffer};
pub use layout::{VertexAttribute, VertexLayout};
pub use mesh::{DrawCall, Mesh};

use crate::error::DriverError;

/// Keeps the first error of a sequence of release calls.
pub(crate) fn first_error(
    results: impl IntoIterator<Item = Result<(), DriverError>>,
) -> Result<(), DriverError> {
    let mut first = Ok(());
    for result in results {
        if first.is_ok() {
            first = result;
        }
    }
    first
}
