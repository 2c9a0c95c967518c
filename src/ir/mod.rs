//! Three-address IR organised as per-function control-flow graphs.
//!
//! Instructions live in a flat arena owned by their function; `InstId`s are
//! indices into it and the CFG is the subgraph reachable from
//! [`Function::start`]. Successor edges are stored per instruction as a
//! fixed pair of optional indices, so loops and shared join points need no
//! shared ownership.
mod instruction;
mod lower;

pub use self::instruction::*;
pub use self::lower::*;

use std::fmt::Display;
use std::rc::Rc;

use crate::{ast::Symbol, typechecker::Type};

/// A lowered compilation unit: global storage declarations plus one CFG per
/// function.
#[derive(Debug, Default)]
pub struct Program {
    pub globals: Vec<GlobalDecl>,
    pub functions: Vec<Function>,
}

/// Backing storage for a global scalar (`num_elements == 1`) or array.
#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub symbol: Rc<Symbol>,
    pub num_elements: u64,
}

/// A function body under construction or after lowering.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub ty: Type,
    pub params: Vec<LocalVar>,
    pub start: InstId,
    nodes: Vec<Node>,
    temp_count: usize,
    address_count: usize,
}

impl Function {
    pub fn new(name: impl ToString, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            params: vec![],
            start: InstId(0),
            nodes: vec![],
            temp_count: 0,
            address_count: 0,
        }
    }

    /// Append an instruction to the arena, initially with no successors.
    pub fn add(&mut self, inst: Inst) -> InstId {
        self.nodes.push(Node {
            inst,
            successors: [None, None],
        });
        InstId(self.nodes.len() - 1)
    }

    /// Wire the given edge of `from` to `to`. Edge 0 is the fall-through or
    /// false edge, edge 1 the true edge of a branch.
    pub fn connect(&mut self, from: InstId, edge: usize, to: InstId) {
        self.nodes[from.0].successors[edge] = Some(to);
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.nodes[id.0].inst
    }

    pub fn successors(&self, id: InstId) -> &[Option<InstId>; 2] {
        &self.nodes[id.0].successors
    }

    /// Number of instructions in the arena, including any that lowering
    /// left unreachable.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fresh value temporary of the given type.
    pub fn new_temp(&mut self, ty: Type) -> LocalVar {
        let id = self.temp_count;
        self.temp_count += 1;
        LocalVar { id, ty }
    }

    /// Fresh address temporary. Address temps count separately from value
    /// temps.
    pub fn new_address(&mut self, ty: Type) -> AddressVar {
        let id = self.address_count;
        self.address_count += 1;
        AddressVar { id, ty }
    }
}

/// An 8-byte value temporary.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub id: usize,
    pub ty: Type,
}

impl Display for LocalVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.id)
    }
}

/// A temporary holding the computed address of a global or array element.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressVar {
    pub id: usize,
    pub ty: Type,
}

impl Display for AddressVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.id)
    }
}

/// Operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    IntConstant(i64),
    BoolConstant(bool),
    Local(LocalVar),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::IntConstant(value) => write!(f, "{value}"),
            Value::BoolConstant(value) => write!(f, "{value}"),
            Value::Local(var) => write!(f, "{var}"),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for global in &self.globals {
            writeln!(f, "global {}[{}]", global.symbol.name, global.num_elements)?;
        }
        for function in &self.functions {
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self
            .params
            .iter()
            .map(LocalVar::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "func {}({params}) start={}:", self.name, self.start.0)?;
        for (index, node) in self.nodes.iter().enumerate() {
            write!(f, "  {index:>3}: {}", node.inst)?;
            match node.successors {
                [None, None] => {}
                [Some(next), None] => write!(f, "  -> {}", next.0)?,
                [falsy, truthy] => write!(
                    f,
                    "  -> [false: {:?}, true: {:?}]",
                    falsy.map(|id| id.0),
                    truthy.map(|id| id.0)
                )?,
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
