//! A-extension: Load-Reserved/Store-Conditional and the
//! read-modify-write atomic memory operations.

use crate::cpu::Cpu;
use crate::error::ExecutionError;
use crate::fields;
use crate::memory::Wordsize;
use crate::opcodes::*;

fn sign_extend_to_width(value: u64, size: Wordsize) -> u64 {
    match size {
        Wordsize::Word => (value as u32) as i32 as i64 as u64,
        Wordsize::Doubleword => value,
        _ => unreachable!("AMO only operates at word or doubleword width"),
    }
}

fn mask_to_width(value: u64, size: Wordsize) -> u64 {
    match size {
        Wordsize::Word => value & 0xffff_ffff,
        Wordsize::Doubleword => value,
        _ => unreachable!("AMO only operates at word or doubleword width"),
    }
}

/// Apply the read-modify-write operation selected by `funct5`. `old`
/// and `rs2` are passed pre-normalized in both signed (sign-extended)
/// and unsigned (zero-extended) form at the access width, so signed
/// and unsigned comparisons each use the representation they need.
fn combine(funct5: u32, old_signed: u64, rs2_signed: u64, old_unsigned: u64, rs2_unsigned: u64) -> u64 {
    match funct5 {
        FUNCT5_AMOSWAP => rs2_signed,
        FUNCT5_AMOADD => old_signed.wrapping_add(rs2_signed),
        FUNCT5_AMOXOR => old_signed ^ rs2_signed,
        FUNCT5_AMOAND => old_signed & rs2_signed,
        FUNCT5_AMOOR => old_signed | rs2_signed,
        FUNCT5_AMOMIN => {
            if (rs2_signed as i64) < (old_signed as i64) {
                rs2_signed
            } else {
                old_signed
            }
        }
        FUNCT5_AMOMAX => {
            if (rs2_signed as i64) > (old_signed as i64) {
                rs2_signed
            } else {
                old_signed
            }
        }
        FUNCT5_AMOMINU => {
            if rs2_unsigned < old_unsigned {
                rs2_signed
            } else {
                old_signed
            }
        }
        FUNCT5_AMOMAXU => {
            if rs2_unsigned > old_unsigned {
                rs2_signed
            } else {
                old_signed
            }
        }
        _ => old_signed, // unrecognized funct5: no-op, memory unchanged
    }
}

pub fn amo(cpu: &mut Cpu, instr: u32) -> Result<(), ExecutionError> {
    let rd = fields::rd(instr);
    let rs1 = fields::rs1(instr);
    let rs2 = fields::rs2(instr);
    let funct3 = fields::funct3(instr);
    let size = match funct3 {
        FUNCT3_AMO_W => Wordsize::Word,
        FUNCT3_AMO_D => Wordsize::Doubleword,
        _ => return Ok(()), // unrecognized width: no-op
    };
    let width = size.bytes();
    let addr = cpu.x(rs1);
    if addr % width != 0 {
        return Err(ExecutionError::MisalignedAtomic { address: addr, width });
    }

    let funct5 = fields::funct5(instr);
    let old_signed = sign_extend_to_width(cpu.mem.read(addr, size), size);

    match funct5 {
        FUNCT5_LR => {
            cpu.reservations.reserve(addr, cpu.pc);
            cpu.hart.last_lr = Some(cpu.pc);
            cpu.set_x(rd, old_signed);
        }
        FUNCT5_SC => {
            let prior = cpu.reservations.invalidate(addr);
            let success = matches!(
                (cpu.hart.last_lr, prior),
                (Some(marker), Some(reserved)) if marker == reserved
            );
            if success {
                cpu.mem.write(addr, cpu.x(rs2), size);
                cpu.set_x(rd, 0);
                cpu.hart.last_lr = None;
            } else {
                cpu.set_x(rd, 1);
            }
        }
        _ => {
            let old_unsigned = mask_to_width(cpu.mem.read(addr, size), size);
            let rs2_signed = sign_extend_to_width(cpu.x(rs2), size);
            let rs2_unsigned = mask_to_width(cpu.x(rs2), size);
            let new = combine(funct5, old_signed, rs2_signed, old_unsigned, rs2_unsigned);
            cpu.reservations.invalidate(addr);
            cpu.mem.write(addr, new, size);
            cpu.set_x(rd, old_signed);
        }
    }
    Ok(())
}
