use std::fmt::Display;

use crate::ast::Operation;

/// Semantic types of Crux.
///
/// Every operation of the language is a method here; the fallback arm of
/// each method produces [`Type::Error`] carrying the rejection message, so
/// the checker can decide whether a diagnostic is warranted or the error is
/// a downstream effect of an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Bool,
    Void,
    Array { base: Box<Type>, extent: u64 },
    Func { params: Vec<Type>, ret: Box<Type> },
    Error(String),
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("bool"),
            Type::Void => f.write_str("void"),
            Type::Array { base, extent } => write!(f, "array[{extent},{base}]"),
            Type::Func { params, ret } => {
                let params = params
                    .iter()
                    .map(Type::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "func({params}):{ret}")
            }
            Type::Error(message) => write!(f, "{message}"),
        }
    }
}

impl Type {
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error(_))
    }

    /// Structural equivalence. Arrays compare by base type only (the extent
    /// is metadata); function types are never equivalent to each other, call
    /// sites compare argument lists directly.
    pub fn equivalent(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Int, Type::Int) | (Type::Bool, Type::Bool) | (Type::Void, Type::Void) => true,
            (Type::Array { base: left, .. }, Type::Array { base: right, .. }) => {
                left.equivalent(right)
            }
            _ => false,
        }
    }

    fn reject(op: &str, lhs: &Type, rhs: &Type) -> Type {
        Type::Error(format!("cannot {op} {lhs} with {rhs}"))
    }

    pub fn add(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Int, Type::Int) => Type::Int,
            _ => Self::reject("add", self, other),
        }
    }

    pub fn sub(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Int, Type::Int) => Type::Int,
            _ => Self::reject("sub", self, other),
        }
    }

    pub fn mul(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Int, Type::Int) => Type::Int,
            _ => Self::reject("mul", self, other),
        }
    }

    pub fn div(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Int, Type::Int) => Type::Int,
            _ => Self::reject("div", self, other),
        }
    }

    /// Comparison under any of the six predicates. The relational four are
    /// defined on integers only; equality extends to booleans.
    pub fn compare(&self, op: Operation, other: &Type) -> Type {
        let defined = match op {
            Operation::Eq | Operation::Ne => {
                matches!(
                    (self, other),
                    (Type::Int, Type::Int) | (Type::Bool, Type::Bool)
                )
            }
            _ => matches!((self, other), (Type::Int, Type::Int)),
        };

        if defined {
            Type::Bool
        } else {
            Self::reject("compare", self, other)
        }
    }

    pub fn and(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Bool, Type::Bool) => Type::Bool,
            _ => Self::reject("and", self, other),
        }
    }

    pub fn or(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Bool, Type::Bool) => Type::Bool,
            _ => Self::reject("or", self, other),
        }
    }

    pub fn not(&self) -> Type {
        match self {
            Type::Bool => Type::Bool,
            _ => Type::Error(format!("cannot negate {self}")),
        }
    }

    /// Element type of an index access.
    pub fn index(&self, index: &Type) -> Type {
        match (self, index) {
            (Type::Array { base, .. }, Type::Int) => (**base).clone(),
            _ => Type::Error(format!("cannot index {self} with {index}")),
        }
    }

    /// Type of an assignment with `self` as the target.
    pub fn assign(&self, value: &Type) -> Type {
        if self.equivalent(value) {
            self.clone()
        } else {
            Type::Error(format!("cannot assign {value} to {self}"))
        }
    }

    /// Result type of calling `self` with the given argument types.
    pub fn call(&self, args: &[Type]) -> Type {
        if let Type::Func { params, ret } = self {
            if params.len() == args.len()
                && params.iter().zip(args).all(|(param, arg)| param.equivalent(arg))
            {
                return (**ret).clone();
            }
        }

        let args = args
            .iter()
            .map(Type::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Type::Error(format!("cannot call {self} with ({args})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(base: Type, extent: u64) -> Type {
        Type::Array {
            base: Box::new(base),
            extent,
        }
    }

    fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::Func {
            params,
            ret: Box::new(ret),
        }
    }

    #[test]
    fn arithmetic_is_integer_only() {
        assert_eq!(Type::Int.add(&Type::Int), Type::Int);
        assert_eq!(Type::Int.div(&Type::Int), Type::Int);
        assert!(Type::Int.add(&Type::Bool).is_error());
        assert!(Type::Bool.mul(&Type::Bool).is_error());
        assert_eq!(
            Type::Int.add(&Type::Bool),
            Type::Error("cannot add int with bool".into())
        );
    }

    #[test]
    fn relational_compare_is_integer_only() {
        assert_eq!(Type::Int.compare(Operation::Lt, &Type::Int), Type::Bool);
        assert!(Type::Bool.compare(Operation::Ge, &Type::Bool).is_error());
    }

    #[test]
    fn equality_extends_to_booleans() {
        assert_eq!(Type::Bool.compare(Operation::Eq, &Type::Bool), Type::Bool);
        assert_eq!(Type::Int.compare(Operation::Ne, &Type::Int), Type::Bool);
        assert!(Type::Int.compare(Operation::Eq, &Type::Bool).is_error());
        assert!(Type::Void.compare(Operation::Eq, &Type::Void).is_error());
    }

    #[test]
    fn logic_is_boolean_only() {
        assert_eq!(Type::Bool.and(&Type::Bool), Type::Bool);
        assert_eq!(Type::Bool.or(&Type::Bool), Type::Bool);
        assert_eq!(Type::Bool.not(), Type::Bool);
        assert!(Type::Int.and(&Type::Int).is_error());
        assert!(Type::Int.not().is_error());
    }

    #[test]
    fn indexing_yields_the_base_type() {
        assert_eq!(array(Type::Int, 5).index(&Type::Int), Type::Int);
        assert!(array(Type::Int, 5).index(&Type::Bool).is_error());
        assert!(Type::Int.index(&Type::Int).is_error());
    }

    #[test]
    fn arrays_are_equivalent_by_base_type_only() {
        assert!(array(Type::Int, 5).equivalent(&array(Type::Int, 9)));
        assert!(!array(Type::Int, 5).equivalent(&array(Type::Bool, 5)));
    }

    #[test]
    fn function_types_are_never_equivalent() {
        let ty = func(vec![Type::Int], Type::Void);
        assert!(!ty.equivalent(&ty.clone()));
    }

    #[test]
    fn calls_match_arguments_elementwise() {
        let ty = func(vec![Type::Int, Type::Bool], Type::Int);
        assert_eq!(ty.call(&[Type::Int, Type::Bool]), Type::Int);
        assert!(ty.call(&[Type::Int]).is_error());
        assert!(ty.call(&[Type::Bool, Type::Int]).is_error());
        assert!(Type::Int.call(&[]).is_error());
    }

    #[test]
    fn assignment_requires_equivalence() {
        assert_eq!(Type::Int.assign(&Type::Int), Type::Int);
        assert!(Type::Int.assign(&Type::Bool).is_error());
        assert!(Type::Void.assign(&Type::Error("x".into())).is_error());
    }
}
