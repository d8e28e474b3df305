//! Base integer instruction set (RV64I): OP-IMM, OP-IMM-32, the
//! integer subset of OP and OP-32, branches, jumps, LUI/AUIPC, and
//! loads/stores. M-extension handling of OP/OP-32 lives in `rv64m`.

use crate::cpu::Cpu;
use crate::fields;
use crate::memory::Wordsize;
use crate::opcodes::*;

/// Sign-extend a 32-bit immediate already carried in `i32` out to a
/// 64-bit two's-complement value, returned as its bit pattern.
fn imm64(imm: i32) -> u64 {
    imm as i64 as u64
}

pub fn lui(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let imm = fields::imm_utype(instr);
    cpu.set_x(rd, imm64(imm));
}

pub fn auipc(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let imm = fields::imm_utype(instr);
    cpu.set_x(rd, cpu.pc.wrapping_add(imm64(imm)));
}

pub fn jal(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let imm = fields::imm_jtype(instr);
    cpu.set_x(rd, cpu.pc.wrapping_add(4));
    cpu.pc = cpu.pc.wrapping_add(imm64(imm)).wrapping_sub(4);
}

/// JALR writes only PC; it must not also write the computed target
/// back into rs1, even when rd == rs1.
pub fn jalr(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = fields::rs1(instr);
    let imm = fields::imm_itype(instr);
    let rs1_value = cpu.x(rs1);
    cpu.set_x(rd, cpu.pc.wrapping_add(4));
    let target = rs1_value.wrapping_add(imm64(imm)) & !1u64;
    cpu.pc = target.wrapping_sub(4);
}

pub fn branch(cpu: &mut Cpu, instr: u32) {
    let rs1 = cpu.x(fields::rs1(instr));
    let rs2 = cpu.x(fields::rs2(instr));
    let taken = match fields::funct3(instr) {
        FUNCT3_BEQ => rs1 == rs2,
        FUNCT3_BNE => rs1 != rs2,
        FUNCT3_BLT => (rs1 as i64) < (rs2 as i64),
        FUNCT3_BGE => (rs1 as i64) >= (rs2 as i64),
        FUNCT3_BLTU => rs1 < rs2,
        FUNCT3_BGEU => rs1 >= rs2,
        _ => false, // unrecognized funct3: no-op
    };
    if taken {
        let imm = fields::imm_btype(instr);
        log::trace!("branch taken, immediate = {imm}");
        cpu.pc = cpu.pc.wrapping_add(imm64(imm)).wrapping_sub(4);
    }
}

pub fn load(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = cpu.x(fields::rs1(instr));
    let imm = fields::imm_itype(instr);
    let addr = rs1.wrapping_add(imm64(imm));
    let value = match fields::funct3(instr) {
        FUNCT3_B => cpu.mem.read_signed(addr, Wordsize::Byte) as u64,
        FUNCT3_H => cpu.mem.read_signed(addr, Wordsize::Halfword) as u64,
        FUNCT3_W => cpu.mem.read_signed(addr, Wordsize::Word) as u64,
        FUNCT3_D => cpu.mem.read(addr, Wordsize::Doubleword),
        FUNCT3_BU => cpu.mem.read(addr, Wordsize::Byte),
        FUNCT3_HU => cpu.mem.read(addr, Wordsize::Halfword),
        FUNCT3_WU => cpu.mem.read(addr, Wordsize::Word),
        _ => return, // unrecognized funct3: no-op
    };
    cpu.set_x(rd, value);
}

pub fn store(cpu: &mut Cpu, instr: u32) {
    let rs1 = cpu.x(fields::rs1(instr));
    let rs2 = cpu.x(fields::rs2(instr));
    let imm = fields::imm_stype(instr);
    let addr = rs1.wrapping_add(imm64(imm));
    let size = match fields::funct3(instr) {
        FUNCT3_B => Wordsize::Byte,
        FUNCT3_H => Wordsize::Halfword,
        FUNCT3_W => Wordsize::Word,
        FUNCT3_D => Wordsize::Doubleword,
        _ => return, // unrecognized funct3: no-op
    };
    cpu.mem.write(addr, rs2, size);
}

pub fn op_imm(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = cpu.x(fields::rs1(instr));
    let imm = fields::imm_itype(instr);
    let shamt = fields::shamt64(instr);
    let result = match fields::funct3(instr) {
        FUNCT3_ADDI => rs1.wrapping_add(imm64(imm)),
        FUNCT3_SLTI => ((rs1 as i64) < (imm as i64)) as u64,
        FUNCT3_SLTIU => (rs1 < imm64(imm)) as u64,
        FUNCT3_XORI => rs1 ^ imm64(imm),
        FUNCT3_ORI => rs1 | imm64(imm),
        FUNCT3_ANDI => rs1 & imm64(imm),
        FUNCT3_SLLI => rs1 << shamt,
        FUNCT3_SRLI_SRAI => {
            if fields::is_arithmetic_shift(instr) {
                ((rs1 as i64) >> shamt) as u64
            } else {
                rs1 >> shamt
            }
        }
        _ => return, // unrecognized funct3: no-op
    };
    cpu.set_x(rd, result);
}

pub fn op_imm_32(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = cpu.x(fields::rs1(instr)) as u32;
    let shamt = fields::shamt32(instr);
    let result = match fields::funct3(instr) {
        FUNCT3_ADDI => {
            let imm = fields::imm_itype(instr);
            (rs1 as i32).wrapping_add(imm) as i64 as u64
        }
        FUNCT3_SLLI => (rs1 << shamt) as i32 as i64 as u64,
        FUNCT3_SRLI_SRAI => {
            // Bit 30 of the immediate selects SRAIW over SRLIW; a
            // magnitude comparison against 30 is wrong.
            if fields::is_arithmetic_shift(instr) {
                ((rs1 as i32) >> shamt) as i64 as u64
            } else {
                (rs1 >> shamt) as i32 as i64 as u64
            }
        }
        _ => return, // unrecognized funct3: no-op
    };
    cpu.set_x(rd, result);
}

pub fn op(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = cpu.x(fields::rs1(instr));
    let rs2 = cpu.x(fields::rs2(instr));
    let shamt = rs2 & 0x3f;
    let result = match (fields::funct3(instr), fields::funct7(instr)) {
        (FUNCT3_ADD_SUB, FUNCT7_ADD_SRL) => rs1.wrapping_add(rs2),
        (FUNCT3_ADD_SUB, FUNCT7_SUB_SRA) => rs1.wrapping_sub(rs2),
        (FUNCT3_SLL, _) => rs1 << shamt,
        (FUNCT3_SLT, _) => ((rs1 as i64) < (rs2 as i64)) as u64,
        (FUNCT3_SLTU, _) => (rs1 < rs2) as u64,
        (FUNCT3_XOR, _) => rs1 ^ rs2,
        (FUNCT3_SRL_SRA, FUNCT7_ADD_SRL) => rs1 >> shamt,
        (FUNCT3_SRL_SRA, FUNCT7_SUB_SRA) => ((rs1 as i64) >> shamt) as u64,
        (FUNCT3_OR, _) => rs1 | rs2,
        (FUNCT3_AND, _) => rs1 & rs2,
        _ => return, // unrecognized funct3/funct7 combination: no-op
    };
    cpu.set_x(rd, result);
}

pub fn op_32(cpu: &mut Cpu, instr: u32) {
    let rd = fields::rd(instr);
    let rs1 = cpu.x(fields::rs1(instr)) as u32;
    let rs2 = cpu.x(fields::rs2(instr)) as u32;
    let shamt = rs2 & 0x1f;
    let result = match (fields::funct3(instr), fields::funct7(instr)) {
        (FUNCT3_ADD_SUB, FUNCT7_ADD_SRL) => rs1.wrapping_add(rs2) as i32 as i64 as u64,
        (FUNCT3_ADD_SUB, FUNCT7_SUB_SRA) => rs1.wrapping_sub(rs2) as i32 as i64 as u64,
        (FUNCT3_SLL, _) => (rs1 << shamt) as i32 as i64 as u64,
        (FUNCT3_SRL_SRA, FUNCT7_ADD_SRL) => (rs1 >> shamt) as i32 as i64 as u64,
        (FUNCT3_SRL_SRA, FUNCT7_SUB_SRA) => ((rs1 as i32) >> shamt) as i64 as u64,
        _ => return, // unrecognized funct3/funct7 combination: no-op
    };
    cpu.set_x(rd, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MEMORY_SIZE;

    fn run_one(cpu: &mut Cpu, instr: u32) {
        cpu.mem.write(cpu.pc, instr as u64, Wordsize::Word);
        cpu.step(false).unwrap();
    }

    #[test]
    fn addiw_sign_extends() {
        let mut cpu = Cpu::new();
        cpu.set_x(5, 0x0000_0000_7fff_ffff);
        cpu.set_x(6, 0x0000_0000_0000_0001);
        // addw x7, x5, x6
        let instr = (FUNCT7_ADD_SRL << 25) | (6 << 20) | (5 << 15) | (FUNCT3_ADD_SUB << 12) | (7 << 7) | OP_32;
        run_one(&mut cpu, instr);
        assert_eq!(cpu.x(7), 0xffff_ffff_8000_0000);
    }

    #[test]
    fn sraiw_uses_bit_30_not_magnitude_comparison() {
        let mut cpu = Cpu::new();
        cpu.set_x(5, 0x0000_0000_8000_0000);
        // srai is selected with bit 30 of imm set and shamt=1
        let imm = (1u32 << 10) | 1; // bit 30 of instr = bit 10 of the 12-bit imm field
        let instr = (imm << 20) | (5 << 15) | (FUNCT3_SRLI_SRAI << 12) | (6 << 7) | OP_IMM_32;
        run_one(&mut cpu, instr);
        // arithmetic shift of a negative 32-bit value right by 1
        assert_eq!(cpu.x(6), 0xffff_ffff_c000_0000);
    }

    #[test]
    fn srliw_is_not_misclassified_as_sraiw() {
        let mut cpu = Cpu::new();
        cpu.set_x(5, 0x0000_0000_8000_0000);
        let imm = 1u32; // bit 30 clear -> logical shift
        let instr = (imm << 20) | (5 << 15) | (FUNCT3_SRLI_SRAI << 12) | (6 << 7) | OP_IMM_32;
        run_one(&mut cpu, instr);
        assert_eq!(cpu.x(6), 0x4000_0000);
    }

    #[test]
    fn branch_target_matches_edge_scenario() {
        let mut cpu = Cpu::new();
        cpu.pc = 0x40;
        cpu.set_x(5, 7);
        cpu.set_x(6, 7);
        // beq x5, x6, +8
        let rd_field = (0b0100u32 << 1) | 0; // imm[4:1]=0100, imm[11]=0
        let instr = (0 << 25) | (6 << 20) | (5 << 15) | (FUNCT3_BEQ << 12) | (rd_field << 7) | OP_BRANCH;
        run_one(&mut cpu, instr);
        assert_eq!(cpu.pc, 0x48);
    }

    #[test]
    fn jalr_does_not_write_rs1() {
        let mut cpu = Cpu::new();
        cpu.set_x(1, 0x100);
        // jalr x1, x1, 0  -- rd == rs1 is the case the bug would corrupt
        let instr = (0 << 20) | (1 << 15) | (0 << 12) | (1 << 7) | OP_JALR;
        run_one(&mut cpu, instr);
        // rd (=x1) must hold the return address, not the jump target
        assert_eq!(cpu.x(1), 4);
        assert_eq!(cpu.pc, 0x100);
    }

    #[test]
    fn sb_then_lb_sign_extends_low_byte() {
        // Base address is well clear of the code at pc=0,4 so the
        // store can't clobber the next fetched instruction.
        let mut cpu = Cpu::new();
        cpu.set_x(10, 0x1000);
        cpu.set_x(11, 0xff);
        let sb = (0u32 << 25) | (11 << 20) | (10 << 15) | (FUNCT3_B << 12) | (0 << 7) | OP_STORE;
        run_one(&mut cpu, sb);
        let lb = (0u32 << 20) | (10 << 15) | (FUNCT3_B << 12) | (12 << 7) | OP_LOAD;
        run_one(&mut cpu, lb);
        assert_eq!(cpu.x(12), 0xffff_ffff_ffff_ffff);
    }

    #[test]
    fn sb_then_lbu_zero_extends_low_byte() {
        let mut cpu = Cpu::new();
        cpu.set_x(10, 0x1000);
        cpu.set_x(11, 0xff);
        let sb = (0u32 << 25) | (11 << 20) | (10 << 15) | (FUNCT3_B << 12) | (0 << 7) | OP_STORE;
        run_one(&mut cpu, sb);
        let lbu = (0u32 << 20) | (10 << 15) | (FUNCT3_BU << 12) | (12 << 7) | OP_LOAD;
        run_one(&mut cpu, lbu);
        assert_eq!(cpu.x(12), 0xff);
    }

    #[test]
    fn sd_then_ld_round_trips() {
        let mut cpu = Cpu::new();
        cpu.set_x(10, 0x1000);
        cpu.set_x(11, 0x0123_4567_89ab_cdef);
        let sd = (0u32 << 25) | (11 << 20) | (10 << 15) | (FUNCT3_D << 12) | (0 << 7) | OP_STORE;
        run_one(&mut cpu, sd);
        let ld = (0u32 << 20) | (10 << 15) | (FUNCT3_D << 12) | (12 << 7) | OP_LOAD;
        run_one(&mut cpu, ld);
        assert_eq!(cpu.x(12), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn load_address_wraps_past_memory_size() {
        let mut cpu = Cpu::new();
        cpu.pc = 0x10; // clear of the data written at address 0
        cpu.set_x(10, MEMORY_SIZE as u64);
        let instr = (0u32 << 20) | (10 << 15) | (FUNCT3_W << 12) | (5 << 7) | OP_LOAD;
        cpu.mem.write(0, 0x1234_5678, Wordsize::Word);
        run_one(&mut cpu, instr);
        assert_eq!(cpu.x(5), 0x1234_5678);
    }
}
