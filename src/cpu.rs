//! The fetch-decode-execute driver and the `Cpu` struct that owns all
//! architectural state: register file, memory, reservation table, and
//! hart context.

use crate::error::ExecutionError;
use crate::memory::{Memory, Wordsize, MEMORY_SIZE};
use crate::registers::RegisterFile;
use crate::reservation::{HartContext, ReservationTable};
use crate::{fields, opcodes, rv64a, rv64i, rv64m, system};

pub struct Cpu {
    pub regs: RegisterFile,
    pub mem: Memory,
    pub reservations: ReservationTable,
    pub hart: HartContext,
    pub pc: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            mem: Memory::new(),
            reservations: ReservationTable::new(),
            hart: HartContext::default(),
            pc: 0,
        }
    }

    /// Read register `i`. The bit-field decoders only ever produce
    /// 5-bit indices, so this can never observe an out-of-range
    /// register; the panic documents that contract rather than
    /// guarding against a reachable error.
    pub fn x(&self, i: u8) -> u64 {
        self.regs.read(i).expect("register index from a 5-bit field is always < 32")
    }

    /// Write register `i`. See `x` for the in-range contract.
    pub fn set_x(&mut self, i: u8, value: u64) {
        self.regs
            .write(i, value)
            .expect("register index from a 5-bit field is always < 32");
    }

    /// Render the sixteen-line, two-registers-per-line diagnostic
    /// dump used for fatal errors and on guest exit.
    pub fn register_dump(&self) -> String {
        let mut out = String::new();
        let values: Vec<u64> = self.regs.iter().collect();
        for row in 0..16 {
            let a = row * 2;
            let b = a + 1;
            out.push_str(&format!(
                "x{a}:\t0x{:016x}\tx{b}:\t0x{:016x}\n",
                values[a], values[b]
            ));
        }
        out
    }

    /// Run a single fetch-decode-execute step. Returns `Some(code)`
    /// once the guest requests termination via the a0=1 ECALL
    /// convention, `None` to continue.
    pub fn step(&mut self, trace: bool) -> Result<Option<i32>, ExecutionError> {
        if self.pc >= MEMORY_SIZE as u64 {
            return Err(ExecutionError::InvalidProgramCounter(self.pc));
        }
        let instr = self.mem.read(self.pc, Wordsize::Word) as u32;

        if instr == 0 {
            log::error!("invalid instruction at pc 0x{:016x}", self.pc);
            log::error!("{}", self.register_dump());
            return Err(ExecutionError::InvalidInstruction(self.pc));
        }

        if trace {
            log::trace!("fetched: 0x{instr:08x} @ 0x{:08x}", self.pc);
        }

        let exit = self.execute(instr)?;
        if exit.is_none() {
            self.pc = self.pc.wrapping_add(4);
        }
        Ok(exit)
    }

    fn execute(&mut self, instr: u32) -> Result<Option<i32>, ExecutionError> {
        let op = fields::opcode(instr);
        let exit = match op {
            opcodes::OP_LUI => {
                rv64i::lui(self, instr);
                None
            }
            opcodes::OP_AUIPC => {
                rv64i::auipc(self, instr);
                None
            }
            opcodes::OP_JAL => {
                rv64i::jal(self, instr);
                None
            }
            opcodes::OP_JALR => {
                rv64i::jalr(self, instr);
                None
            }
            opcodes::OP_BRANCH => {
                rv64i::branch(self, instr);
                None
            }
            opcodes::OP_LOAD => {
                rv64i::load(self, instr);
                None
            }
            opcodes::OP_STORE => {
                rv64i::store(self, instr);
                None
            }
            opcodes::OP_IMM => {
                rv64i::op_imm(self, instr);
                None
            }
            opcodes::OP_IMM_32 => {
                rv64i::op_imm_32(self, instr);
                None
            }
            opcodes::OP => {
                if fields::funct7(instr) == opcodes::FUNCT7_MULDIV {
                    rv64m::op_muldiv(self, instr);
                } else {
                    rv64i::op(self, instr);
                }
                None
            }
            opcodes::OP_32 => {
                if fields::funct7(instr) == opcodes::FUNCT7_MULDIV {
                    rv64m::op_muldiv_32(self, instr);
                } else {
                    rv64i::op_32(self, instr);
                }
                None
            }
            opcodes::OP_AMO => {
                rv64a::amo(self, instr)?;
                None
            }
            opcodes::OP_SYSTEM => system::system(self, instr),
            // MISC-MEM (FENCE) and any unrecognized opcode are no-ops.
            _ => None,
        };
        Ok(exit)
    }

    /// Run to completion, driving `step` until exit or fatal error.
    pub fn run(&mut self, trace: bool) -> Result<i32, ExecutionError> {
        loop {
            if let Some(code) = self.step(trace)? {
                return Ok(code);
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
