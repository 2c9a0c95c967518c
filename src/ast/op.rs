use std::fmt::Display;

/// Operators as they appear in Crux expressions. All are binary except
/// [`Operation::Not`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ge,
    Le,
    Ne,
    Eq,
    Gt,
    Lt,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Not,
}

impl Operation {
    pub(crate) fn from_symbol(symbol: &str) -> Operation {
        match symbol {
            ">=" => Operation::Ge,
            "<=" => Operation::Le,
            "!=" => Operation::Ne,
            "==" => Operation::Eq,
            ">" => Operation::Gt,
            "<" => Operation::Lt,
            "+" => Operation::Add,
            "-" => Operation::Sub,
            "*" => Operation::Mul,
            "/" => Operation::Div,
            "&&" => Operation::And,
            "||" => Operation::Or,
            "!" => Operation::Not,
            _ => unreachable!("unknown operator '{symbol}'"),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Ge => ">=",
            Operation::Le => "<=",
            Operation::Ne => "!=",
            Operation::Eq => "==",
            Operation::Gt => ">",
            Operation::Lt => "<",
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "*",
            Operation::Div => "/",
            Operation::And => "&&",
            Operation::Or => "||",
            Operation::Not => "!",
        })
    }
}
