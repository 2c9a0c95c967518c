use std::fmt::Display;
use std::rc::Rc;

use crate::ast::Symbol;

use super::{AddressVar, LocalVar, Value};

/// Index of an instruction in its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub usize);

/// An instruction together with its successor edges.
#[derive(Debug)]
pub struct Node {
    pub inst: Inst,
    pub successors: [Option<InstId>; 2],
}

/// Arithmetic operators of [`Inst::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Comparison predicates of [`Inst::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Ge,
    Gt,
    Le,
    Lt,
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub enum Inst {
    /// `dst <- src`
    Copy { dst: LocalVar, src: Value },
    /// `dst <- lhs op rhs`
    Binary {
        op: BinaryOp,
        dst: LocalVar,
        lhs: Value,
        rhs: Value,
    },
    /// `dst <- lhs pred rhs`, producing a boolean
    Compare {
        pred: Predicate,
        dst: LocalVar,
        lhs: Value,
        rhs: Value,
    },
    /// Boolean negation: `dst <- !src`
    Not { dst: LocalVar, src: Value },
    /// Two-way branch: successor 0 is taken when `pred` is false, successor
    /// 1 when it is true.
    Jump { pred: Value },
    /// Effective address of a global, or of the element `base[offset]` when
    /// an offset is present.
    AddressAt {
        dst: AddressVar,
        base: Rc<Symbol>,
        offset: Option<LocalVar>,
    },
    /// Read through an address temporary.
    Load { dst: LocalVar, src: AddressVar },
    /// Write through an address temporary.
    Store { src: LocalVar, dst: AddressVar },
    /// Call with evaluated arguments; `dst` is absent for void callees.
    Call {
        dst: Option<LocalVar>,
        callee: Rc<Symbol>,
        args: Vec<LocalVar>,
    },
    /// Terminator returning control, optionally with a value.
    Return { value: Option<LocalVar> },
    /// Structural glue for joins and empty regions.
    Nop,
}

impl Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inst::Copy { dst, src } => write!(f, "{dst} <- {src}"),
            Inst::Binary { op, dst, lhs, rhs } => {
                let op = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Sub => "sub",
                    BinaryOp::Mul => "mul",
                    BinaryOp::Div => "div",
                };
                write!(f, "{dst} <- {op} {lhs}, {rhs}")
            }
            Inst::Compare {
                pred,
                dst,
                lhs,
                rhs,
            } => {
                let pred = match pred {
                    Predicate::Ge => ">=",
                    Predicate::Gt => ">",
                    Predicate::Le => "<=",
                    Predicate::Lt => "<",
                    Predicate::Eq => "==",
                    Predicate::Ne => "!=",
                };
                write!(f, "{dst} <- {lhs} {pred} {rhs}")
            }
            Inst::Not { dst, src } => write!(f, "{dst} <- !{src}"),
            Inst::Jump { pred } => write!(f, "jump {pred}"),
            Inst::AddressAt { dst, base, offset } => match offset {
                Some(offset) => write!(f, "{dst} <- &{base}[{offset}]"),
                None => write!(f, "{dst} <- &{base}"),
            },
            Inst::Load { dst, src } => write!(f, "{dst} <- load {src}"),
            Inst::Store { src, dst } => write!(f, "store {src}, {dst}"),
            Inst::Call { dst, callee, args } => {
                let args = args
                    .iter()
                    .map(LocalVar::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                match dst {
                    Some(dst) => write!(f, "{dst} <- call {callee}({args})"),
                    None => write!(f, "call {callee}({args})"),
                }
            }
            Inst::Return { value } => match value {
                Some(value) => write!(f, "return {value}"),
                None => write!(f, "return"),
            },
            Inst::Nop => write!(f, "nop"),
        }
    }
}
