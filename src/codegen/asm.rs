//! Typed representation of the emitted assembly.
//!
//! Covers exactly the subset of AT&T-syntax x86-64 the code generator needs;
//! `Display` renders each entry as one line of the final listing.
use std::fmt::Display;

/// General purpose registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Reg::Rax => "%rax",
            Reg::Rcx => "%rcx",
            Reg::Rdx => "%rdx",
            Reg::Rsi => "%rsi",
            Reg::Rdi => "%rdi",
            Reg::Rbp => "%rbp",
            Reg::Rsp => "%rsp",
            Reg::R8 => "%r8",
            Reg::R9 => "%r9",
            Reg::R10 => "%r10",
            Reg::R11 => "%r11",
        })
    }
}

/// Instruction operands.
#[derive(Debug, Clone)]
pub enum Operand {
    Register(Reg),
    Immediate(i64),
    /// A base-relative memory operand, rendered as `offset(reg)`.
    Memory(i64, Reg),
    /// The GOT-relative address of a global symbol.
    GotPcRel(String),
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{reg}"),
            Operand::Immediate(value) => write!(f, "${value}"),
            Operand::Memory(0, reg) => write!(f, "({reg})"),
            Operand::Memory(offset, reg) => write!(f, "{offset}({reg})"),
            Operand::GotPcRel(name) => write!(f, "{name}@GOTPCREL(%rip)"),
        }
    }
}

/// Condition codes of the `cmov` family.
#[derive(Debug, Clone, Copy)]
pub enum Cc {
    Ge,
    G,
    Le,
    L,
    E,
    Ne,
}

impl Display for Cc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Cc::Ge => "ge",
            Cc::G => "g",
            Cc::Le => "le",
            Cc::L => "l",
            Cc::E => "e",
            Cc::Ne => "ne",
        })
    }
}

#[derive(Debug, Clone)]
pub enum Instruction {
    Label(String),
    Globl(String),
    /// `.comm name, bytes, 8`: zero-initialised common storage.
    Comm(String, u64),
    Text,
    Movq(Operand, Operand),
    Addq(Operand, Operand),
    Subq(Operand, Operand),
    Imulq(Operand, Operand),
    Idivq(Operand),
    Cqto,
    Cmpq(Operand, Operand),
    Cmov(Cc, Operand, Operand),
    Jmp(String),
    Je(String),
    Enter(i64),
    Leave,
    Ret,
    Call(String),
    Pushq(Operand),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::Globl(name) => write!(f, "\t.globl {name}"),
            Instruction::Comm(name, bytes) => write!(f, "\t.comm {name}, {bytes}, 8"),
            Instruction::Text => write!(f, "\t.text"),
            Instruction::Movq(src, dst) => write!(f, "\tmovq {src}, {dst}"),
            Instruction::Addq(src, dst) => write!(f, "\taddq {src}, {dst}"),
            Instruction::Subq(src, dst) => write!(f, "\tsubq {src}, {dst}"),
            Instruction::Imulq(src, dst) => write!(f, "\timulq {src}, {dst}"),
            Instruction::Idivq(divisor) => write!(f, "\tidivq {divisor}"),
            Instruction::Cqto => write!(f, "\tcqto"),
            Instruction::Cmpq(src, dst) => write!(f, "\tcmpq {src}, {dst}"),
            Instruction::Cmov(cc, src, dst) => write!(f, "\tcmov{cc} {src}, {dst}"),
            Instruction::Jmp(label) => write!(f, "\tjmp {label}"),
            Instruction::Je(label) => write!(f, "\tje {label}"),
            Instruction::Enter(bytes) => write!(f, "\tenter ${bytes}, $0"),
            Instruction::Leave => write!(f, "\tleave"),
            Instruction::Ret => write!(f, "\tret"),
            Instruction::Call(name) => write!(f, "\tcall {name}"),
            Instruction::Pushq(src) => write!(f, "\tpushq {src}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_render_att_syntax() {
        assert_eq!(Operand::Register(Reg::Rax).to_string(), "%rax");
        assert_eq!(Operand::Immediate(-7).to_string(), "$-7");
        assert_eq!(Operand::Memory(-16, Reg::Rbp).to_string(), "-16(%rbp)");
        assert_eq!(Operand::Memory(0, Reg::R10).to_string(), "(%r10)");
        assert_eq!(
            Operand::GotPcRel("g".to_owned()).to_string(),
            "g@GOTPCREL(%rip)"
        );
    }

    #[test]
    fn instructions_render_one_line_each() {
        assert_eq!(
            Instruction::Movq(
                Operand::Immediate(42),
                Operand::Memory(-8, Reg::Rbp)
            )
            .to_string(),
            "\tmovq $42, -8(%rbp)"
        );
        assert_eq!(
            Instruction::Cmov(
                Cc::Ge,
                Operand::Register(Reg::R10),
                Operand::Register(Reg::Rax)
            )
            .to_string(),
            "\tcmovge %r10, %rax"
        );
        assert_eq!(Instruction::Enter(16).to_string(), "\tenter $16, $0");
        assert_eq!(
            Instruction::Comm("g".to_owned(), 40).to_string(),
            "\t.comm g, 40, 8"
        );
    }
}
