//! ノードの構造的等価性
//!
//! 実行時の値の等価性とは別物で、同じ形・同じ子を持つ部分木かどうかを
//! 判定する。位置情報は無視する。キャッシュされたリテラル・識別子の
//! 重複検出に使われる。

use super::{Node, NodeKind, NodeRef, SwitchCase};

impl Node {
    /// 構造的に等しいかどうか（位置は考慮しない）
    pub fn structural_eq(&self, other: &Node) -> bool {
        use NodeKind::*;

        match (&self.kind, &other.kind) {
            (Null, Null) => true,
            (BooleanLit(a), BooleanLit(b)) => a == b,
            (IntegerLit(a), IntegerLit(b)) => a == b,
            (RealLit(a), RealLit(b)) => a == b,
            (StringLit(a), StringLit(b)) => a == b,

            (
                Identifier { name: a, base_only: ab },
                Identifier { name: b, base_only: bb },
            ) => a == b && ab == bb,

            (ArrayLit(a), ArrayLit(b)) => nodes_eq(a, b),

            (
                Lambda { params: ap, body: abody },
                Lambda { params: bp, body: bbody },
            ) => ap == bp && abody.structural_eq(bbody),

            (
                AddChain { first: af, rest: ar },
                AddChain { first: bf, rest: br },
            ) => {
                af.structural_eq(bf)
                    && ar.len() == br.len()
                    && ar
                        .iter()
                        .zip(br.iter())
                        .all(|((aop, an), (bop, bn))| aop == bop && an.structural_eq(bn))
            }

            (
                MulChain { first: af, rest: ar },
                MulChain { first: bf, rest: br },
            ) => {
                af.structural_eq(bf)
                    && ar.len() == br.len()
                    && ar
                        .iter()
                        .zip(br.iter())
                        .all(|((aop, an), (bop, bn))| aop == bop && an.structural_eq(bn))
            }

            (
                LogicChain { op: aop, operands: a },
                LogicChain { op: bop, operands: b },
            ) => aop == bop && nodes_eq(a, b),

            (
                Compare { op: aop, lhs: al, rhs: ar },
                Compare { op: bop, lhs: bl, rhs: br },
            ) => aop == bop && al.structural_eq(bl) && ar.structural_eq(br),

            (
                Power { base: ab, exponent: ae },
                Power { base: bb, exponent: be },
            ) => ab.structural_eq(bb) && ae.structural_eq(be),

            (Not(a), Not(b)) => a.structural_eq(b),
            (Negate(a), Negate(b)) => a.structural_eq(b),

            (
                Assign { target: at, value: av },
                Assign { target: bt, value: bv },
            ) => at.structural_eq(bt) && av.structural_eq(bv),

            (
                Member { base: ab, name: an },
                Member { base: bb, name: bn },
            ) => an == bn && ab.structural_eq(bb),

            (
                Index { base: ab, index: ai },
                Index { base: bb, index: bi },
            ) => ab.structural_eq(bb) && ai.structural_eq(bi),

            (
                Call { callee: ac, args: aa },
                Call { callee: bc, args: ba },
            ) => ac.structural_eq(bc) && nodes_eq(aa, ba),

            (Block(a), Block(b)) => nodes_eq(a, b),

            (
                If { condition: ac, then_branch: at, else_branch: ae },
                If { condition: bc, then_branch: bt, else_branch: be },
            ) => {
                ac.structural_eq(bc)
                    && at.structural_eq(bt)
                    && option_eq(ae, be)
            }

            (
                While { condition: ac, body: ab },
                While { condition: bc, body: bb },
            ) => ac.structural_eq(bc) && ab.structural_eq(bb),

            (
                RepeatUntil { body: ab, condition: ac },
                RepeatUntil { body: bb, condition: bc },
            ) => nodes_eq(ab, bb) && ac.structural_eq(bc),

            (
                For { target: at, from: af, to: ato, step: astep, body: ab },
                For { target: bt, from: bf, to: bto, step: bstep, body: bb },
            ) => {
                at.structural_eq(bt)
                    && af.structural_eq(bf)
                    && ato.structural_eq(bto)
                    && option_eq(astep, bstep)
                    && ab.structural_eq(bb)
            }

            (
                ForEach { reference: ar, id: ai, collection: ac, body: ab },
                ForEach { reference: br, id: bi, collection: bc, body: bb },
            ) => ar == br && ai == bi && ac.structural_eq(bc) && ab.structural_eq(bb),

            (
                Declare { ty: aty, name: an },
                Declare { ty: bty, name: bn },
            ) => an == bn && aty.structural_eq(bty),

            (
                DeclareReference { name: an, target: at },
                DeclareReference { name: bn, target: bt },
            ) => an == bn && at.structural_eq(bt),

            (
                DeclareType { ty: aty, name: an },
                DeclareType { ty: bty, name: bn },
            ) => an == bn && aty.structural_eq(bty),

            (
                DeclareFunction { name: an, params: ap, body: ab },
                DeclareFunction { name: bn, params: bp, body: bb },
            ) => an == bn && ap == bp && ab.structural_eq(bb),

            (LockStatement(a), LockStatement(b)) => a == b,
            (Return(a), Return(b)) => a.structural_eq(b),

            (
                Assert { condition: ac, .. },
                Assert { condition: bc, .. },
            ) => ac.structural_eq(bc),

            (
                Switch { scrutinee: asc, cases: acs, otherwise: ao },
                Switch { scrutinee: bsc, cases: bcs, otherwise: bo },
            ) => {
                asc.structural_eq(bsc)
                    && cases_eq(acs, bcs)
                    && option_eq(ao, bo)
            }

            (BooleanType, BooleanType)
            | (IntegerType, IntegerType)
            | (RealType, RealType)
            | (StringType, StringType)
            | (DictionaryType, DictionaryType) => true,

            (
                RangedIntegerType { min: amin, max: amax, bounds: abnd },
                RangedIntegerType { min: bmin, max: bmax, bounds: bbnd },
            )
            | (
                RangedRealType { min: amin, max: amax, bounds: abnd },
                RangedRealType { min: bmin, max: bmax, bounds: bbnd },
            ) => {
                amin.structural_eq(bmin)
                    && amax.structural_eq(bmax)
                    && abnd.structural_eq(bbnd)
            }

            (
                ArrayType { from: af, to: at, element: ae },
                ArrayType { from: bf, to: bt, element: be },
            ) => af.structural_eq(bf) && at.structural_eq(bt) && ae.structural_eq(be),

            (StructureType(a), StructureType(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((an, aty), (bn, bty))| an == bn && aty.structural_eq(bty))
            }

            _ => false,
        }
    }
}

fn nodes_eq(a: &[NodeRef], b: &[NodeRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
}

fn option_eq(a: &Option<NodeRef>, b: &Option<NodeRef>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.structural_eq(y),
        (None, None) => true,
        _ => false,
    }
}

fn cases_eq(a: &[SwitchCase], b: &[SwitchCase]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.guard.structural_eq(&y.guard) && x.body.structural_eq(&y.body))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::error::Location;

    use super::super::{Node, NodeKind};

    fn node(kind: NodeKind) -> Rc<Node> {
        Node::new(kind, Location::unknown())
    }

    #[test]
    fn test_literals_compare_by_value() {
        assert!(node(NodeKind::IntegerLit(7)).structural_eq(&node(NodeKind::IntegerLit(7))));
        assert!(!node(NodeKind::IntegerLit(7)).structural_eq(&node(NodeKind::IntegerLit(8))));
        // 整数と実数は形が違う
        assert!(!node(NodeKind::IntegerLit(1)).structural_eq(&node(NodeKind::RealLit(1.0))));
    }

    #[test]
    fn test_identifiers_respect_the_accent_flag() {
        let plain = node(NodeKind::Identifier {
            name: "x".to_string(),
            base_only: false,
        });
        let accented = node(NodeKind::Identifier {
            name: "x".to_string(),
            base_only: true,
        });
        assert!(!plain.structural_eq(&accented));
    }

    #[test]
    fn test_location_is_ignored() {
        let a = Node::new(NodeKind::IntegerLit(3), Location::unknown());
        let b = Node::new(
            NodeKind::IntegerLit(3),
            crate::error::Location::new(
                "other.koto".into(),
                9,
                9,
                crate::error::Span::new(4, 5),
            ),
        );
        assert!(a.structural_eq(&b));
    }
}
