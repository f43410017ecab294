//! パーサ本体と補助メソッド

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::NodeRef;
use crate::error::{KotoError, KotoResult, Location, ParseError};
use crate::lexer::{Token, Tokenizer};

use super::cache::NodeCaches;

/// Koto言語の構文解析器
///
/// ノードキャッシュはインタプリタと共有される（`ReleaseCachedNodes` が
/// 実行側から解放するため）。
pub struct Parser {
    pub(super) tokenizer: Tokenizer,
    pub(super) caches: Rc<RefCell<NodeCaches>>,
    import_base: PathBuf,
    /// 直近に解析した文の先頭トークンがエントリポイント由来だったか。
    /// 解析が進むとトークナイザはインポート元へ戻ってしまうため、
    /// 文の先頭で記録しておく。
    statement_entry_point: bool,
}

impl Parser {
    /// エントリポイントのソースからパーサを作る
    pub fn new(name: &str, text: &str, caches: Rc<RefCell<NodeCaches>>) -> KotoResult<Self> {
        let import_base = Path::new(name)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            tokenizer: Tokenizer::new(name, text)?,
            caches,
            import_base,
            statement_entry_point: true,
        })
    }

    /// 次の文を一つ解析する。入力を読み終えたら `None` を返す。
    ///
    /// `import` はここで処理され、文としては現れない。インポートされた
    /// ソースの最初の文が代わりに返る。
    pub fn parse_statement(&mut self) -> KotoResult<Option<NodeRef>> {
        loop {
            match self.tokenizer.current() {
                Token::EndOfInput => return Ok(None),
                Token::Import => self.parse_import()?,
                _ => {
                    self.statement_entry_point = self.tokenizer.is_entry_point();
                    return self.statement().map(Some);
                }
            }
        }
    }

    /// 直近に解析した文がエントリポイントのソース由来かどうか
    pub fn is_entry_point(&self) -> bool {
        self.statement_entry_point
    }

    /// `import '<file>' ;` を処理してソースをスタックに積む
    fn parse_import(&mut self) -> KotoResult<()> {
        self.advance()?;

        let path = match self.tokenizer.current().clone() {
            Token::StringLit(path) => {
                self.advance()?;
                path
            }
            _ => return Err(self.unexpected("インポートするファイル名")),
        };

        // セミコロンを確認した上でソースを積み、その後に消費する。
        // advance() はインポート先の最初のトークンを返す。
        if self.tokenizer.current() != &Token::Semicolon {
            return Err(self.unexpected("';'"));
        }

        let text = self.load_import(&path)?;
        self.tokenizer.push_source(&path, &text);
        self.advance()?;

        Ok(())
    }

    /// インポート対象のファイルを読む。指定されたパスをそのまま試し、
    /// 見つからなければエントリポイントのディレクトリから探す。
    fn load_import(&self, path: &str) -> KotoResult<String> {
        if let Ok(text) = std::fs::read_to_string(path) {
            return Ok(text);
        }

        let relative = self.import_base.join(path);
        std::fs::read_to_string(&relative).map_err(|e| {
            KotoError::Io(format!("'{}' を読み込めません: {}", path, e))
        })
    }

    // ---- トークン操作の補助メソッド ----

    pub(super) fn current(&self) -> &Token {
        self.tokenizer.current()
    }

    pub(super) fn location(&self) -> Location {
        self.tokenizer.current_location()
    }

    pub(super) fn advance(&mut self) -> KotoResult<()> {
        self.tokenizer.advance()?;
        Ok(())
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.tokenizer.current() == token
    }

    /// 現在のトークンが期待どおりであれば消費し、違えばエラーを返す
    pub(super) fn expect(&mut self, expected: Token) -> KotoResult<()> {
        if self.tokenizer.current() == &expected {
            self.advance()
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    pub(super) fn expect_identifier(&mut self) -> KotoResult<String> {
        match self.tokenizer.current().clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("識別子")),
        }
    }

    pub(super) fn unexpected(&self, expected: &str) -> KotoError {
        let location = self.tokenizer.current_location();
        let found = self.tokenizer.current();

        if matches!(found, Token::EndOfInput) {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                location,
            }
            .into()
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.describe(),
                location,
            }
            .into()
        }
    }
}
