//! スタック化されたストリーミングトークナイザ
//!
//! `import` は解析の途中で新しいソースをスタックに積む。トークンは常に
//! 最上段のソースから供給され、使い切ると下のソースへ戻る。底のソースが
//! 元々要求されたプログラムであり、スタックが一段だけの間は
//! `is_entry_point()` が真を返す。

use std::rc::Rc;

use logos::Logos;

use crate::error::{LexerError, Location, Span};

use super::source::SourceText;
use super::token::Token;

/// ソース一つ分のトークン列と読み取り位置
#[derive(Debug)]
struct Frame {
    source: Rc<SourceText>,
    items: Vec<(Result<Token, ()>, Span)>,
    pos: usize,
}

impl Frame {
    fn new(source: Rc<SourceText>) -> Self {
        let items = Token::lexer(source.text())
            .spanned()
            .map(|(result, range)| (result, Span::from(range)))
            .collect();

        Self {
            source,
            items,
            pos: 0,
        }
    }
}

/// ソーススタックの上を進むトークナイザ
#[derive(Debug)]
pub struct Tokenizer {
    stack: Vec<Frame>,
    current: Token,
    current_span: Span,
    current_source: Rc<SourceText>,
}

impl Tokenizer {
    /// エントリポイントのソースでトークナイザを作り、最初のトークンまで進める
    pub fn new(name: &str, text: &str) -> Result<Self, LexerError> {
        let source = SourceText::new(name, text);
        let frame = Frame::new(source.clone());

        let mut tokenizer = Self {
            stack: vec![frame],
            current: Token::EndOfInput,
            current_span: Span::dummy(),
            current_source: source,
        };
        tokenizer.advance()?;

        Ok(tokenizer)
    }

    /// 現在のトークン（消費しない）
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// 現在のトークンの位置
    pub fn current_location(&self) -> Location {
        self.current_source.location(self.current_span)
    }

    /// 次のトークンへ進める。ソースを使い切ると下のソースへ戻り、
    /// 底も使い切ると `EndOfInput` になる。
    pub fn advance(&mut self) -> Result<&Token, LexerError> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.current = Token::EndOfInput;
                return Ok(&self.current);
            };

            if frame.pos >= frame.items.len() {
                let popped = self.stack.pop();
                if let Some(popped) = popped {
                    log::debug!("ソース '{}' を読み終えました", popped.source.name());
                }
                continue;
            }

            let (result, span) = frame.items[frame.pos].clone();
            frame.pos += 1;

            self.current_source = frame.source.clone();
            self.current_span = span;

            return match result {
                Ok(token) => {
                    self.current = token;
                    Ok(&self.current)
                }
                Err(()) => Err(self.classify_error(span)),
            };
        }
    }

    /// `import` されたソースをスタックに積む。以後のトークンは
    /// このソースから供給される。
    pub fn push_source(&mut self, name: &str, text: &str) {
        log::info!("'{}' をインポートします", name);

        let source = SourceText::new(name, text);
        self.stack.push(Frame::new(source));
    }

    /// 現在のトークンがエントリポイントのソース由来かどうか
    pub fn is_entry_point(&self) -> bool {
        self.stack.len() <= 1
    }

    /// 入力をすべて読み終えたかどうか
    pub fn is_exhausted(&self) -> bool {
        matches!(self.current, Token::EndOfInput)
    }

    /// logosが弾いたトークンを字句エラーへ分類する
    fn classify_error(&self, span: Span) -> LexerError {
        let slice = self.current_source.slice(span);
        let location = self.current_source.location(span);

        if slice.starts_with('\'') || slice.starts_with('"') {
            if slice.len() >= 2 && slice.ends_with(slice.chars().next().unwrap_or('"')) {
                // 引用符で閉じているのにエラーなら、エスケープが不正
                LexerError::InvalidEscape {
                    sequence: slice.to_string(),
                    location,
                }
            } else {
                LexerError::UnterminatedString { location }
            }
        } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
            LexerError::InvalidNumber {
                message: format!("'{}'", slice),
                location,
            }
        } else {
            LexerError::UnrecognizedToken {
                token: slice.to_string(),
                location,
            }
        }
    }
}
