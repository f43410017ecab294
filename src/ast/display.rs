//! ノードのソーステキスト表示
//!
//! assertの失敗メッセージやAST表示で使う正規化された表記を生成する。

use std::fmt;

use super::{AddOp, CompareOp, LogicOp, MulOp, Node, NodeKind, Param};

impl fmt::Display for AddOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddOp::Add => "+",
            AddOp::Subtract => "-",
        })
    }
}

impl fmt::Display for MulOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MulOp::Multiply => "*",
            MulOp::Divide => "/",
            MulOp::Modulo => "%",
        })
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Xor => "xor",
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Greater => ">",
        })
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if param.reference {
            f.write_str("&")?;
        }
        f.write_str(&param.name)?;
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, nodes: &[super::NodeRef]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeKind::*;

        match &self.kind {
            Null => f.write_str(";"),
            BooleanLit(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            IntegerLit(v) => write!(f, "{}", v),
            RealLit(v) => write!(f, "{}", v),
            StringLit(s) => write!(f, "'{}'", s),
            Identifier { name, base_only } => {
                if *base_only {
                    f.write_str("`")?;
                }
                f.write_str(name)
            }
            ArrayLit(elements) => {
                f.write_str("{")?;
                write_list(f, elements)?;
                f.write_str("}")
            }
            Lambda { params, body } => {
                f.write_str("lambda (")?;
                write_params(f, params)?;
                write!(f, ") {}", body)
            }
            AddChain { first, rest } => {
                write!(f, "{}", first)?;
                for (op, operand) in rest {
                    write!(f, " {} {}", op, operand)?;
                }
                Ok(())
            }
            MulChain { first, rest } => {
                write!(f, "{}", first)?;
                for (op, operand) in rest {
                    write!(f, " {} {}", op, operand)?;
                }
                Ok(())
            }
            LogicChain { op, operands } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "{}", operand)?;
                }
                Ok(())
            }
            Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Power { base, exponent } => write!(f, "{} ^ {}", base, exponent),
            Not(operand) => write!(f, "not {}", operand),
            Negate(operand) => write!(f, "-{}", operand),
            Assign { target, value } => write!(f, "{} = {}", target, value),
            Member { base, name } => write!(f, "{}.{}", base, name),
            Index { base, index } => write!(f, "{}[{}]", base, index),
            Call { callee, args } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Block(statements) => {
                f.write_str("begin ")?;
                for statement in statements {
                    write!(f, "{}; ", statement)?;
                }
                f.write_str("end")
            }
            If { condition, then_branch, else_branch } => {
                write!(f, "if {} then {}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            While { condition, body } => write!(f, "while {} do {}", condition, body),
            RepeatUntil { body, condition } => {
                f.write_str("repeat ")?;
                for statement in body {
                    write!(f, "{}; ", statement)?;
                }
                write!(f, "until {}", condition)
            }
            For { target, from, to, step, body } => {
                write!(f, "for {} = {} to {}", target, from, to)?;
                if let Some(step) = step {
                    write!(f, " step {}", step)?;
                }
                write!(f, " {}", body)
            }
            ForEach { reference, id, collection, body } => {
                write!(
                    f,
                    "foreach {}{} in {} {}",
                    if *reference { "&" } else { "" },
                    id,
                    collection,
                    body
                )
            }
            Declare { ty, name } => write!(f, "declare {} as {}", ty, name),
            DeclareReference { name, target } => {
                write!(f, "declare reference {} = {}", name, target)
            }
            DeclareType { ty, name } => write!(f, "declare type {} as {}", ty, name),
            DeclareFunction { name, params, body } => {
                write!(f, "declare function {}(", name)?;
                write_params(f, params)?;
                write!(f, ") {}", body)
            }
            LockStatement(name) => write!(f, "lock {}", name),
            Return(value) => write!(f, "return {}", value),
            Assert { condition, .. } => write!(f, "assert ({})", condition),
            Switch { scrutinee, cases, otherwise } => {
                write!(f, "switch {} ", scrutinee)?;
                for case in cases {
                    write!(f, "{} : {} ", case.guard, case.body)?;
                }
                if let Some(otherwise) = otherwise {
                    write!(f, "otherwise : {} ", otherwise)?;
                }
                f.write_str("end")
            }
            BooleanType => f.write_str("boolean"),
            IntegerType => f.write_str("integer"),
            RangedIntegerType { min, max, bounds } => {
                write!(f, "integer({}, {}, {})", min, max, bounds)
            }
            RealType => f.write_str("real"),
            RangedRealType { min, max, bounds } => {
                write!(f, "real({}, {}, {})", min, max, bounds)
            }
            StringType => f.write_str("string"),
            ArrayType { from, to, element } => {
                write!(f, "array [{} to {}] of {}", from, to, element)
            }
            DictionaryType => f.write_str("dictionary"),
            StructureType(members) => {
                f.write_str("structure ")?;
                for (name, ty) in members {
                    write!(f, "declare {} as {}; ", ty, name)?;
                }
                f.write_str("end")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Location;

    use super::super::{AddOp, Node, NodeKind};

    #[test]
    fn test_renders_chain_source_text() {
        let loc = Location::unknown;
        let chain = Node::new(
            NodeKind::AddChain {
                first: Node::new(NodeKind::IntegerLit(1), loc()),
                rest: vec![
                    (AddOp::Add, Node::new(NodeKind::IntegerLit(2), loc())),
                    (AddOp::Subtract, Node::new(NodeKind::IntegerLit(3), loc())),
                ],
            },
            loc(),
        );

        assert_eq!(chain.to_string(), "1 + 2 - 3");
    }

    #[test]
    fn test_renders_comparison_for_assert_messages() {
        let loc = Location::unknown;
        let cmp = Node::new(
            NodeKind::Compare {
                op: super::super::CompareOp::Equal,
                lhs: Node::new(NodeKind::IntegerLit(1), loc()),
                rhs: Node::new(NodeKind::RealLit(1.0), loc()),
            },
            loc(),
        );

        assert_eq!(cmp.to_string(), "1 == 1");
    }
}
