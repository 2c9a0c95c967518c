//! x86-64 code generation.
//!
//! Linearises each function's CFG into AT&T-syntax assembly for the
//! System-V AMD64 ABI on Linux. There is no register allocation: every
//! temporary lives in a stack slot of the frame, and each operation reads
//! its operands into the scratch registers %r10, %r11 and %rax, computes,
//! and writes the result back.
mod asm;

pub use self::asm::*;

use std::collections::{HashMap, HashSet};

use crate::ir::{AddressVar, BinaryOp, Function, Inst, InstId, LocalVar, Predicate, Program, Value};

use Instruction::*;
use Operand::*;
use Reg::*;

/// Argument registers of the calling convention, in order.
const ARGUMENT_REGISTERS: [Reg; 6] = [Rdi, Rsi, Rdx, Rcx, R8, R9];

/// One entry of a linearised body: either place an instruction here, or jump
/// to one that has already been placed.
enum Step {
    Emit(InstId),
    JumpTo(InstId),
}

/// Stack homes of every temporary of one function. Slots are 1-based and
/// assigned in order of first mention, so the assignment is injective; slot
/// `n` lives at `-8n(%rbp)`. Value and address temporaries have separate id
/// spaces but share the pool of slots.
#[derive(Default)]
struct FrameLayout {
    slots: HashMap<Temp, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Temp {
    Local(usize),
    Address(usize),
}

impl FrameLayout {
    fn claim(&mut self, temp: Temp) -> usize {
        let next = self.slots.len() + 1;
        *self.slots.entry(temp).or_insert(next)
    }

    fn claim_value(&mut self, value: &Value) {
        if let Value::Local(var) = value {
            self.claim(Temp::Local(var.id));
        }
    }

    fn local(&self, var: &LocalVar) -> Operand {
        Memory(-8 * self.slots[&Temp::Local(var.id)] as i64, Rbp)
    }

    fn address(&self, var: &AddressVar) -> Operand {
        Memory(-8 * self.slots[&Temp::Address(var.id)] as i64, Rbp)
    }

    fn value(&self, value: &Value) -> Operand {
        match value {
            Value::IntConstant(value) => Immediate(*value),
            Value::BoolConstant(value) => Immediate(i64::from(*value)),
            Value::Local(var) => self.local(var),
        }
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

pub struct CodeGenerator {
    label_count: usize,
}

impl CodeGenerator {
    /// Emit the assembly listing for a whole program.
    pub fn generate(program: &Program) -> String {
        let mut generator = CodeGenerator { label_count: 0 };
        let mut instructions = vec![];

        for global in &program.globals {
            instructions.push(Comm(global.symbol.name.clone(), 8 * global.num_elements));
        }
        instructions.push(Text);

        for function in &program.functions {
            generator.generate_function(function, &mut instructions);
        }

        let mut listing = String::new();
        for instruction in &instructions {
            listing.push_str(&instruction.to_string());
            listing.push('\n');
        }
        listing
    }

    fn generate_function(&mut self, function: &Function, out: &mut Vec<Instruction>) {
        let order = linearise(function);
        let labels = self.assign_labels(function, &order);
        let layout = assign_slots(function, &order);

        // round the frame up to an even slot count so %rsp stays 16-byte
        // aligned after the prologue
        let mut frame_slots = layout.slot_count();
        if frame_slots % 2 == 1 {
            frame_slots += 1;
        }

        out.push(Globl(function.name.clone()));
        out.push(Label(function.name.clone()));
        out.push(Enter(8 * frame_slots as i64));

        for (index, param) in function.params.iter().enumerate() {
            let home = layout.local(param);
            if index < ARGUMENT_REGISTERS.len() {
                out.push(Movq(Register(ARGUMENT_REGISTERS[index]), home));
            } else {
                // stack-passed arguments sit above the saved base pointer
                let offset = 16 + 8 * (index - ARGUMENT_REGISTERS.len()) as i64;
                out.push(Movq(Memory(offset, Rbp), Register(R10)));
                out.push(Movq(Register(R10), home));
            }
        }

        for step in &order {
            match step {
                Step::JumpTo(id) => out.push(Jmp(labels[id].clone())),
                Step::Emit(id) => {
                    if let Some(label) = labels.get(id) {
                        out.push(Label(label.clone()));
                    }
                    emit(
                        function.inst(*id),
                        function.successors(*id),
                        &layout,
                        &labels,
                        out,
                    );
                    if function.successors(*id).iter().all(Option::is_none) {
                        out.push(Leave);
                        out.push(Ret);
                    }
                }
            }
        }
    }

    /// Label every placed instruction that is a branch target: the true
    /// edge of a `jump`, or any instruction with more than one predecessor.
    /// Labels are unique and counted monotonically across the program.
    fn assign_labels(&mut self, function: &Function, order: &[Step]) -> HashMap<InstId, String> {
        let mut in_degree: HashMap<InstId, usize> = HashMap::new();
        let mut branch_targets: HashSet<InstId> = HashSet::new();

        for step in order {
            let Step::Emit(id) = step else { continue };
            let successors = function.successors(*id);
            for succ in successors.iter().flatten() {
                *in_degree.entry(*succ).or_insert(0) += 1;
            }
            if matches!(function.inst(*id), Inst::Jump { .. }) {
                if let Some(target) = successors[1] {
                    branch_targets.insert(target);
                }
            }
        }

        let mut labels = HashMap::new();
        for step in order {
            let Step::Emit(id) = step else { continue };
            if branch_targets.contains(id) || in_degree.get(id).copied().unwrap_or(0) > 1 {
                labels.insert(*id, format!(".L{}", self.label_count));
                self.label_count += 1;
            }
        }
        labels
    }
}

/// Depth-first linearisation from the function start. Successors are pushed
/// in reverse edge order so that edge 0 is popped first and becomes the
/// fall-through; reaching an already placed instruction produces an explicit
/// jump to its label instead.
fn linearise(function: &Function) -> Vec<Step> {
    let mut order = vec![];
    let mut visited = HashSet::new();
    let mut stack = vec![function.start];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            order.push(Step::JumpTo(id));
            continue;
        }
        order.push(Step::Emit(id));
        for succ in function.successors(id).iter().rev().flatten() {
            stack.push(*succ);
        }
    }
    order
}

/// Walk the placed instructions once, giving every mentioned temporary its
/// stack slot. Parameters claim the first slots in declaration order.
fn assign_slots(function: &Function, order: &[Step]) -> FrameLayout {
    let mut layout = FrameLayout::default();
    for param in &function.params {
        layout.claim(Temp::Local(param.id));
    }

    for step in order {
        let Step::Emit(id) = step else { continue };
        match function.inst(*id) {
            Inst::Copy { dst, src } => {
                layout.claim_value(src);
                layout.claim(Temp::Local(dst.id));
            }
            Inst::Binary { dst, lhs, rhs, .. } | Inst::Compare { dst, lhs, rhs, .. } => {
                layout.claim_value(lhs);
                layout.claim_value(rhs);
                layout.claim(Temp::Local(dst.id));
            }
            Inst::Not { dst, src } => {
                layout.claim_value(src);
                layout.claim(Temp::Local(dst.id));
            }
            Inst::Jump { pred } => layout.claim_value(pred),
            Inst::AddressAt { dst, offset, .. } => {
                if let Some(offset) = offset {
                    layout.claim(Temp::Local(offset.id));
                }
                layout.claim(Temp::Address(dst.id));
            }
            Inst::Load { dst, src } => {
                layout.claim(Temp::Address(src.id));
                layout.claim(Temp::Local(dst.id));
            }
            Inst::Store { src, dst } => {
                layout.claim(Temp::Local(src.id));
                layout.claim(Temp::Address(dst.id));
            }
            Inst::Call { dst, args, .. } => {
                for arg in args {
                    layout.claim(Temp::Local(arg.id));
                }
                if let Some(dst) = dst {
                    layout.claim(Temp::Local(dst.id));
                }
            }
            Inst::Return { value } => {
                if let Some(value) = value {
                    layout.claim(Temp::Local(value.id));
                }
            }
            Inst::Nop => {}
        }
    }
    layout
}

fn emit(
    inst: &Inst,
    successors: &[Option<InstId>; 2],
    layout: &FrameLayout,
    labels: &HashMap<InstId, String>,
    out: &mut Vec<Instruction>,
) {
    match inst {
        Inst::Nop => {}
        Inst::Copy { dst, src } => match src {
            Value::Local(src) => {
                out.push(Movq(layout.local(src), Register(R10)));
                out.push(Movq(Register(R10), layout.local(dst)));
            }
            constant => out.push(Movq(layout.value(constant), layout.local(dst))),
        },
        Inst::Binary {
            op: BinaryOp::Div,
            dst,
            lhs,
            rhs,
        } => {
            out.push(Movq(layout.value(lhs), Register(Rax)));
            out.push(Cqto);
            match rhs {
                Value::Local(rhs) => out.push(Idivq(layout.local(rhs))),
                constant => {
                    out.push(Movq(layout.value(constant), Register(R11)));
                    out.push(Idivq(Register(R11)));
                }
            }
            out.push(Movq(Register(Rax), layout.local(dst)));
        }
        Inst::Binary { op, dst, lhs, rhs } => {
            out.push(Movq(layout.value(lhs), Register(R10)));
            let rhs = layout.value(rhs);
            out.push(match op {
                BinaryOp::Add => Addq(rhs, Register(R10)),
                BinaryOp::Sub => Subq(rhs, Register(R10)),
                BinaryOp::Mul => Imulq(rhs, Register(R10)),
                BinaryOp::Div => unreachable!("division is handled above"),
            });
            out.push(Movq(Register(R10), layout.local(dst)));
        }
        Inst::Compare {
            pred,
            dst,
            lhs,
            rhs,
        } => {
            out.push(Movq(Immediate(1), Register(R10)));
            out.push(Movq(Immediate(0), Register(Rax)));
            out.push(Movq(layout.value(lhs), Register(R11)));
            out.push(Cmpq(layout.value(rhs), Register(R11)));
            let cc = match pred {
                Predicate::Ge => Cc::Ge,
                Predicate::Gt => Cc::G,
                Predicate::Le => Cc::Le,
                Predicate::Lt => Cc::L,
                Predicate::Eq => Cc::E,
                Predicate::Ne => Cc::Ne,
            };
            out.push(Cmov(cc, Register(R10), Register(Rax)));
            out.push(Movq(Register(Rax), layout.local(dst)));
        }
        Inst::Not { dst, src } => {
            out.push(Movq(Immediate(1), Register(R11)));
            out.push(Subq(layout.value(src), Register(R11)));
            out.push(Movq(Register(R11), layout.local(dst)));
        }
        Inst::Jump { pred } => {
            match pred {
                Value::Local(pred) => out.push(Cmpq(Immediate(1), layout.local(pred))),
                constant => {
                    out.push(Movq(layout.value(constant), Register(R10)));
                    out.push(Cmpq(Immediate(1), Register(R10)));
                }
            }
            let target = successors[1].expect("branches have a true successor");
            out.push(Je(labels[&target].clone()));
            // the false edge falls through
        }
        Inst::AddressAt { dst, base, offset } => {
            out.push(Movq(GotPcRel(base.name.clone()), Register(R11)));
            if let Some(offset) = offset {
                out.push(Movq(layout.local(offset), Register(R10)));
                out.push(Imulq(Immediate(8), Register(R10)));
                out.push(Addq(Register(R10), Register(R11)));
            }
            out.push(Movq(Register(R11), layout.address(dst)));
        }
        Inst::Load { dst, src } => {
            out.push(Movq(layout.address(src), Register(R10)));
            out.push(Movq(Memory(0, R10), Register(R10)));
            out.push(Movq(Register(R10), layout.local(dst)));
        }
        Inst::Store { src, dst } => {
            out.push(Movq(layout.local(src), Register(R10)));
            out.push(Movq(layout.address(dst), Register(R11)));
            out.push(Movq(Register(R10), Memory(0, R11)));
        }
        Inst::Call { dst, callee, args } => {
            for (index, arg) in args.iter().take(ARGUMENT_REGISTERS.len()).enumerate() {
                out.push(Movq(layout.local(arg), Register(ARGUMENT_REGISTERS[index])));
            }

            let stack_args: &[LocalVar] = if args.len() > ARGUMENT_REGISTERS.len() {
                &args[ARGUMENT_REGISTERS.len()..]
            } else {
                &[]
            };
            let mut pushed = 8 * stack_args.len() as i64;
            if stack_args.len() % 2 == 1 {
                // keep %rsp 16-byte aligned at the call
                out.push(Pushq(Immediate(0)));
                pushed += 8;
            }
            for arg in stack_args.iter().rev() {
                out.push(Pushq(layout.local(arg)));
            }

            out.push(Call(callee.name.clone()));

            if pushed > 0 {
                // rebalance immediately instead of unwinding at ret
                out.push(Addq(Immediate(pushed), Register(Rsp)));
            }
            if let Some(dst) = dst {
                out.push(Movq(Register(Rax), layout.local(dst)));
            }
        }
        Inst::Return { value } => {
            if let Some(value) = value {
                out.push(Movq(layout.local(value), Register(Rax)));
            }
            // leave and ret follow from the terminal handling
        }
    }
}
