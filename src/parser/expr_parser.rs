//! 式の構文解析
//!
//! 優先順位（低い順）: 代入 → 論理チェーン → 比較 → 加算チェーン →
//! 乗算チェーン → 冪乗 → 単項 → 後置 → 終端。
//! 同じ優先順位の演算子の並びは二分木ではなくチェーンノード一つに
//! まとめられる。

use crate::ast::{AddOp, CompareOp, LogicOp, MulOp, Node, NodeKind, NodeRef};
use crate::error::KotoResult;
use crate::lexer::Token;

use super::parser_impl::Parser;

impl Parser {
    /// 式を一つ解析する（代入を含む）
    pub(super) fn expression(&mut self) -> KotoResult<NodeRef> {
        let lhs = self.logical()?;

        // 代入は右結合
        if self.check(&Token::Assign) {
            let location = lhs.location.clone();
            self.advance()?;
            let value = self.expression()?;
            return Ok(Node::new(NodeKind::Assign { target: lhs, value }, location));
        }

        Ok(lhs)
    }

    /// `and` / `or` / `xor` のチェーン
    ///
    /// 同じ演算子が続く限り一つのチェーンに畳み込む。演算子が切り替わると
    /// それまでのチェーンが次のチェーンの先頭オペランドになる。
    fn logical(&mut self) -> KotoResult<NodeRef> {
        let mut node = self.comparison()?;

        loop {
            let op = match self.current() {
                Token::And => LogicOp::And,
                Token::Or => LogicOp::Or,
                Token::Xor => LogicOp::Xor,
                _ => break,
            };

            let location = node.location.clone();
            let mut operands = vec![node];

            while self.logic_op_at_current() == Some(op) {
                self.advance()?;
                operands.push(self.comparison()?);
            }

            node = Node::new(NodeKind::LogicChain { op, operands }, location);
        }

        Ok(node)
    }

    fn logic_op_at_current(&self) -> Option<LogicOp> {
        match self.current() {
            Token::And => Some(LogicOp::And),
            Token::Or => Some(LogicOp::Or),
            Token::Xor => Some(LogicOp::Xor),
            _ => None,
        }
    }

    /// 比較は連鎖しない二項演算
    fn comparison(&mut self) -> KotoResult<NodeRef> {
        let lhs = self.additive()?;

        let op = match self.current() {
            Token::Less => CompareOp::Less,
            Token::LessEqual => CompareOp::LessEqual,
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::GreaterEqual => CompareOp::GreaterEqual,
            Token::Greater => CompareOp::Greater,
            _ => return Ok(lhs),
        };

        let location = lhs.location.clone();
        self.advance()?;
        let rhs = self.additive()?;

        Ok(Node::new(NodeKind::Compare { op, lhs, rhs }, location))
    }

    /// `+` / `-` のチェーン
    fn additive(&mut self) -> KotoResult<NodeRef> {
        let first = self.multiplicative()?;

        if !matches!(self.current(), Token::Plus | Token::Minus) {
            return Ok(first);
        }

        let location = first.location.clone();
        let mut rest = Vec::new();

        loop {
            let op = match self.current() {
                Token::Plus => AddOp::Add,
                Token::Minus => AddOp::Subtract,
                _ => break,
            };
            self.advance()?;
            rest.push((op, self.multiplicative()?));
        }

        Ok(Node::new(NodeKind::AddChain { first, rest }, location))
    }

    /// `*` / `/` / `%` のチェーン
    fn multiplicative(&mut self) -> KotoResult<NodeRef> {
        let first = self.power()?;

        if !matches!(self.current(), Token::Star | Token::Slash | Token::Percent) {
            return Ok(first);
        }

        let location = first.location.clone();
        let mut rest = Vec::new();

        loop {
            let op = match self.current() {
                Token::Star => MulOp::Multiply,
                Token::Slash => MulOp::Divide,
                Token::Percent => MulOp::Modulo,
                _ => break,
            };
            self.advance()?;
            rest.push((op, self.power()?));
        }

        Ok(Node::new(NodeKind::MulChain { first, rest }, location))
    }

    /// `^` は右結合
    fn power(&mut self) -> KotoResult<NodeRef> {
        let base = self.unary()?;

        if !self.check(&Token::Caret) {
            return Ok(base);
        }

        let location = base.location.clone();
        self.advance()?;
        let exponent = self.power()?;

        Ok(Node::new(NodeKind::Power { base, exponent }, location))
    }

    /// `not` と単項マイナス
    fn unary(&mut self) -> KotoResult<NodeRef> {
        match self.current() {
            Token::Not => {
                let location = self.location();
                self.advance()?;
                let operand = self.unary()?;
                Ok(Node::new(NodeKind::Not(operand), location))
            }
            Token::Minus => {
                let location = self.location();
                self.advance()?;
                let operand = self.unary()?;

                // 数値リテラルの否定はリテラルへ畳み込む（キャッシュを通す）
                match operand.kind {
                    NodeKind::IntegerLit(v) => {
                        Ok(self.caches.borrow_mut().integer_literal(-v, location))
                    }
                    NodeKind::RealLit(v) => {
                        Ok(self.caches.borrow_mut().real_literal(-v, location))
                    }
                    _ => Ok(Node::new(NodeKind::Negate(operand), location)),
                }
            }
            _ => self.postfix_expression(),
        }
    }

    /// 後置演算（メンバ参照・添字・関数呼び出し）を終端に適用する
    pub(super) fn postfix_expression(&mut self) -> KotoResult<NodeRef> {
        let mut node = self.terminal()?;

        loop {
            match self.current() {
                Token::Dot => {
                    let location = self.location();
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    node = Node::new(NodeKind::Member { base: node, name }, location);
                }

                Token::LeftBracket => {
                    let location = self.location();
                    self.advance()?;
                    let index = self.expression()?;
                    self.expect(Token::RightBracket)?;
                    node = Node::new(NodeKind::Index { base: node, index }, location);
                }

                Token::LeftParen => {
                    let location = self.location();
                    self.advance()?;

                    let mut args = Vec::new();
                    if !self.check(&Token::RightParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.check(&Token::Comma) {
                                break;
                            }
                            self.advance()?;
                        }
                    }
                    self.expect(Token::RightParen)?;

                    // 呼び出し先が素の識別子なら引数の数で名前をマングルする。
                    // 式の値を呼ぶ場合（ラムダなど）はそのまま。
                    let callee = match &node.kind {
                        NodeKind::Identifier { name, base_only } => {
                            let mangled = format!("{}_{}", name, args.len());
                            self.caches.borrow_mut().identifier(
                                &mangled,
                                *base_only,
                                node.location.clone(),
                            )
                        }
                        _ => node,
                    };

                    node = Node::new(NodeKind::Call { callee, args }, location);
                }

                _ => break,
            }
        }

        Ok(node)
    }

    /// 終端（リテラル・識別子・配列リテラル・ラムダ・括弧式）
    fn terminal(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();

        match self.current().clone() {
            Token::IntegerLit(v) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().integer_literal(v, location))
            }
            Token::RealLit(v) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().real_literal(v, location))
            }
            Token::StringLit(s) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().string_literal(&s, location))
            }
            Token::True => {
                self.advance()?;
                Ok(Node::new(NodeKind::BooleanLit(true), location))
            }
            Token::False => {
                self.advance()?;
                Ok(Node::new(NodeKind::BooleanLit(false), location))
            }
            Token::Identifier(name) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().identifier(&name, false, location))
            }
            Token::AccentedIdentifier(name) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().identifier(&name, true, location))
            }

            Token::LeftBrace => {
                self.advance()?;

                let mut elements = Vec::new();
                if !self.check(&Token::RightBrace) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.check(&Token::Comma) {
                            break;
                        }
                        self.advance()?;
                    }
                }
                self.expect(Token::RightBrace)?;

                Ok(Node::new(NodeKind::ArrayLit(elements), location))
            }

            Token::Lambda => {
                self.advance()?;
                let params = self.parameter_list()?;
                let body = self.statement()?;

                Ok(Node::new(NodeKind::Lambda { params, body }, location))
            }

            Token::LeftParen => {
                self.advance()?;
                let expr = self.expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            _ => Err(self.unexpected("式")),
        }
    }
}
