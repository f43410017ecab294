//! 宣言文の構文解析

use crate::ast::{Node, NodeKind, NodeRef, Param};
use crate::error::KotoResult;
use crate::lexer::Token;

use super::parser_impl::Parser;

impl Parser {
    /// `declare` で始まる文を解析する
    ///
    /// 四つの形がある:
    /// - `declare reference 識別子 = 式 ;`
    /// - `declare type 型 as 識別子 ;`
    /// - `declare function 識別子 ( 仮引数 ) 文`
    /// - `declare 型 as 識別子 [= 式] ;`
    pub(super) fn declaration(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        match self.current() {
            Token::Reference => {
                self.advance()?;
                let name = self.expect_identifier()?;
                self.expect(Token::Assign)?;
                let target = self.expression()?;
                self.expect(Token::Semicolon)?;

                Ok(Node::new(NodeKind::DeclareReference { name, target }, location))
            }

            Token::Type => {
                self.advance()?;
                let ty = self.parse_type()?;
                self.expect(Token::As)?;
                let name = self.expect_identifier()?;
                self.expect(Token::Semicolon)?;

                Ok(Node::new(NodeKind::DeclareType { ty, name }, location))
            }

            Token::Function => {
                self.advance()?;
                let base_name = self.expect_identifier()?;
                let params = self.parameter_list()?;
                let body = self.statement()?;

                // 関数名は引数の数でマングルされ、引数の数が違えば別名になる
                let name = format!("{}_{}", base_name, params.len());

                Ok(Node::new(
                    NodeKind::DeclareFunction { name, params, body },
                    location,
                ))
            }

            _ => {
                let ty = self.parse_type()?;
                self.expect(Token::As)?;
                let name = self.expect_identifier()?;
                let declare = Node::new(NodeKind::Declare { ty, name }, location.clone());

                // 初期化子は宣言を包む代入として表す
                if self.check(&Token::Assign) {
                    self.advance()?;
                    let value = self.expression()?;
                    self.expect(Token::Semicolon)?;

                    Ok(Node::new(
                        NodeKind::Assign {
                            target: declare,
                            value,
                        },
                        location,
                    ))
                } else {
                    self.expect(Token::Semicolon)?;
                    Ok(declare)
                }
            }
        }
    }

    /// `( [&]識別子 [, [&]識別子]* )` の仮引数リスト
    pub(super) fn parameter_list(&mut self) -> KotoResult<Vec<Param>> {
        self.expect(Token::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                let reference = if self.check(&Token::Ampersand) {
                    self.advance()?;
                    true
                } else {
                    false
                };
                let name = self.expect_identifier()?;
                params.push(Param { name, reference });

                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance()?;
            }
        }

        self.expect(Token::RightParen)?;
        Ok(params)
    }
}
