//! Error taxonomy.
//!
//! Every layer boundary gets its own `thiserror`-derived enum rather
//! than raw strings. `exit_code` maps each fatal condition to the
//! process exit status the CLI reports.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("could not read program image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("program image is {image_size} bytes, which overflows the {memory_size}-byte address space")]
    ImageTooLarge {
        image_size: usize,
        memory_size: usize,
    },
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("program counter 0x{0:016x} is outside the simulated address space")]
    InvalidProgramCounter(u64),
    #[error("fetched all-zero instruction at 0x{0:016x}")]
    InvalidInstruction(u64),
    #[error("misaligned atomic access to 0x{address:016x} for a {width}-byte operation")]
    MisalignedAtomic { address: u64, width: u64 },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl SimError {
    /// All host-level and fatal simulator errors exit 1; the guest's
    /// own exit code (from the a0=1 ECALL convention) never flows
    /// through this type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
