//! 型記述子の構文解析

use crate::ast::{Node, NodeKind, NodeRef};
use crate::error::KotoResult;
use crate::lexer::Token;

use super::parser_impl::Parser;

impl Parser {
    /// 型記述子を解析する
    ///
    /// 組み込み型のほか、`declare type` で名前を付けた型を識別子で
    /// 参照できる。
    pub(super) fn parse_type(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();

        match self.current().clone() {
            Token::Boolean => {
                self.advance()?;
                Ok(Node::new(NodeKind::BooleanType, location))
            }

            Token::Integer => {
                self.advance()?;
                if !self.check(&Token::LeftParen) {
                    return Ok(Node::new(NodeKind::IntegerType, location));
                }
                let (min, max, bounds) = self.range_arguments()?;
                Ok(Node::new(
                    NodeKind::RangedIntegerType { min, max, bounds },
                    location,
                ))
            }

            Token::Real => {
                self.advance()?;
                if !self.check(&Token::LeftParen) {
                    return Ok(Node::new(NodeKind::RealType, location));
                }
                let (min, max, bounds) = self.range_arguments()?;
                Ok(Node::new(
                    NodeKind::RangedRealType { min, max, bounds },
                    location,
                ))
            }

            Token::String => {
                self.advance()?;
                Ok(Node::new(NodeKind::StringType, location))
            }

            Token::Dictionary => {
                self.advance()?;
                Ok(Node::new(NodeKind::DictionaryType, location))
            }

            Token::Array => {
                self.advance()?;
                self.expect(Token::LeftBracket)?;
                let from = self.expression()?;
                self.expect(Token::To)?;
                let to = self.expression()?;
                self.expect(Token::RightBracket)?;
                self.expect(Token::Of)?;
                let element = self.parse_type()?;

                Ok(Node::new(NodeKind::ArrayType { from, to, element }, location))
            }

            Token::Structure => {
                self.advance()?;

                let mut members = Vec::new();
                while self.check(&Token::Declare) {
                    self.advance()?;
                    let ty = self.parse_type()?;
                    self.expect(Token::As)?;
                    let name = self.expect_identifier()?;
                    self.expect(Token::Semicolon)?;
                    members.push((name, ty));
                }
                self.expect(Token::End)?;

                Ok(Node::new(NodeKind::StructureType(members), location))
            }

            // declare type で定義された名前付きの型
            Token::Identifier(name) => {
                self.advance()?;
                Ok(self.caches.borrow_mut().identifier(&name, false, location))
            }

            _ => Err(self.unexpected("型")),
        }
    }

    /// `( 下限 , 上限 [, 境界動作] )`
    ///
    /// 境界動作の省略時は 0（範囲外をエラーにするモード）のリテラルを補う。
    fn range_arguments(&mut self) -> KotoResult<(NodeRef, NodeRef, NodeRef)> {
        self.expect(Token::LeftParen)?;

        let min = self.expression()?;
        self.expect(Token::Comma)?;
        let max = self.expression()?;

        let bounds = if self.check(&Token::Comma) {
            self.advance()?;
            self.expression()?
        } else {
            let location = self.location();
            self.caches.borrow_mut().integer_literal(0, location)
        };

        self.expect(Token::RightParen)?;
        Ok((min, max, bounds))
    }
}
