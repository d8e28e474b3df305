//! Flat binary loader.
//!
//! Reads the positional input path as a flat binary image (no ELF
//! parsing) and copies it verbatim into guest memory starting at
//! address 0. The loader has no knowledge of instruction semantics;
//! it is a pure byte-mover.

use std::fs;
use std::path::Path;

use crate::error::LoaderError;
use crate::memory::{Memory, MEMORY_SIZE};

/// Read `path` and copy its contents into `memory` at address 0.
pub fn load_flat_binary(path: impl AsRef<Path>, memory: &mut Memory) -> Result<(), LoaderError> {
    let path = path.as_ref();
    let image = fs::read(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;
    memory
        .load_image(&image)
        .map_err(|_| LoaderError::ImageTooLarge {
            image_size: image.len(),
            memory_size: MEMORY_SIZE,
        })
}
