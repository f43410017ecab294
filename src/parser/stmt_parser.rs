//! 文の構文解析

use std::rc::Rc;

use crate::ast::{Node, NodeKind, NodeRef, SwitchCase};
use crate::error::KotoResult;
use crate::lexer::Token;

use super::parser_impl::Parser;

impl Parser {
    /// 文を一つ解析する
    pub(super) fn statement(&mut self) -> KotoResult<NodeRef> {
        match self.current() {
            Token::Semicolon => {
                let location = self.location();
                self.advance()?;
                Ok(Node::new(NodeKind::Null, location))
            }
            Token::Begin => self.block(),
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::Repeat => self.repeat_statement(),
            Token::For => self.for_statement(),
            Token::ForEach => self.foreach_statement(),
            Token::Declare => self.declaration(),
            Token::Lock => self.lock_statement(),
            Token::Return => self.return_statement(),
            Token::Assert => self.assert_statement(),
            Token::Switch => self.switch_statement(),
            _ => {
                let expr = self.expression()?;
                self.expect(Token::Semicolon)?;
                Ok(expr)
            }
        }
    }

    /// `begin 文* end ;`
    fn block(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let mut statements = Vec::new();
        while !self.check(&Token::End) {
            if matches!(self.current(), Token::EndOfInput) {
                return Err(self.unexpected("'end'"));
            }
            statements.push(self.statement()?);
        }

        self.expect(Token::End)?;
        self.expect(Token::Semicolon)?;

        Ok(Node::new(NodeKind::Block(statements), location))
    }

    /// `if 式 then 文 [else 文]`
    fn if_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let condition = self.expression()?;
        self.expect(Token::Then)?;
        let then_branch = self.statement()?;

        let else_branch = if self.check(&Token::Else) {
            self.advance()?;
            Some(self.statement()?)
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            location,
        ))
    }

    /// `while 式 do 文`
    fn while_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let condition = self.expression()?;
        self.expect(Token::Do)?;
        let body = self.statement()?;

        Ok(Node::new(NodeKind::While { condition, body }, location))
    }

    /// `repeat 文* until 式 ;`
    fn repeat_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let mut body = Vec::new();
        while !self.check(&Token::Until) {
            if matches!(self.current(), Token::EndOfInput) {
                return Err(self.unexpected("'until'"));
            }
            body.push(self.statement()?);
        }

        self.expect(Token::Until)?;
        let condition = self.expression()?;
        self.expect(Token::Semicolon)?;

        Ok(Node::new(NodeKind::RepeatUntil { body, condition }, location))
    }

    /// `for 代入先 = 式 to 式 [step 式] 文`
    ///
    /// 上限は包含で、step省略時は1刻み。
    fn for_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let target = self.postfix_expression()?;
        self.expect(Token::Assign)?;
        let from = self.expression()?;
        self.expect(Token::To)?;
        let to = self.expression()?;

        let step = if self.check(&Token::Step) {
            self.advance()?;
            Some(self.expression()?)
        } else {
            None
        };

        let body = self.statement()?;

        Ok(Node::new(
            NodeKind::For {
                target,
                from,
                to,
                step,
                body,
            },
            location,
        ))
    }

    /// `foreach [&] 識別子 in コレクション 文`
    fn foreach_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let reference = if self.check(&Token::Ampersand) {
            self.advance()?;
            true
        } else {
            false
        };

        let id = self.expect_identifier()?;
        self.expect(Token::In)?;
        let collection = self.postfix_expression()?;
        let body = self.statement()?;

        Ok(Node::new(
            NodeKind::ForEach {
                reference,
                id,
                collection,
                body,
            },
            location,
        ))
    }

    /// `lock 識別子 ;`
    fn lock_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let name = self.expect_identifier()?;
        self.expect(Token::Semicolon)?;

        Ok(Node::new(NodeKind::LockStatement(name), location))
    }

    /// `return 式 ;`
    fn return_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let value = self.expression()?;
        self.expect(Token::Semicolon)?;

        Ok(Node::new(NodeKind::Return(value), location))
    }

    /// `assert ( 式 ) ;`
    ///
    /// 失敗時の診断のため、条件式のソーステキストをノードに保持する。
    fn assert_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        self.expect(Token::LeftParen)?;
        let condition = self.expression()?;
        self.expect(Token::RightParen)?;
        self.expect(Token::Semicolon)?;

        let text = condition.to_string();

        Ok(Node::new(NodeKind::Assert { condition, text }, location))
    }

    /// `switch 式 (ガード[, ガード]* : 文)* [otherwise : 文] end ;`
    ///
    /// 一つの分岐に複数のガードを書けるが、本体のノードは共有される。
    fn switch_statement(&mut self) -> KotoResult<NodeRef> {
        let location = self.location();
        self.advance()?;

        let scrutinee = self.expression()?;
        let mut cases = Vec::new();
        let mut otherwise = None;

        loop {
            match self.current() {
                Token::End => break,
                Token::Otherwise => {
                    self.advance()?;
                    self.expect(Token::Colon)?;
                    otherwise = Some(self.statement()?);
                    break;
                }
                Token::EndOfInput => return Err(self.unexpected("'end'")),
                _ => {
                    let mut guards = vec![self.expression()?];
                    while self.check(&Token::Comma) {
                        self.advance()?;
                        guards.push(self.expression()?);
                    }

                    self.expect(Token::Colon)?;
                    let body = self.statement()?;

                    for guard in guards {
                        cases.push(SwitchCase {
                            guard,
                            body: Rc::clone(&body),
                        });
                    }
                }
            }
        }

        self.expect(Token::End)?;
        self.expect(Token::Semicolon)?;

        Ok(Node::new(
            NodeKind::Switch {
                scrutinee,
                cases,
                otherwise,
            },
            location,
        ))
    }
}
