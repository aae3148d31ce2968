//! スコープ管理と逐次終端（incremental closing）
//!
//! ルート Producer が所有し、子 Producer は可変借用で共有する状態。
//!
//! ## スコープスタック
//!
//! 同時に開いていられるのはルートから最深スコープまでの 1 本の経路だけなので、
//! 開いているスコープを配列（インデックス = ネストの深さ）で管理する。
//!
//! ```text
//! 例: ルート list に子 dict を開き、その中に子 list を開いた状態
//!
//!   l i1e d 1:a l i2e e e e
//!   │     │     │     │ │ └ ルートの終端      (next[0] = cursor + 2)
//!   │     │     │     │ └── dict の終端       (next[1] = cursor + 1)
//!   │     │     │     └──── 子 list の終端    (next[2] = cursor)
//!   │     │     └────────── from[2]
//!   │     └──────────────── from[1]
//!   └────────────────────── from[0]
//! ```
//!
//! `cursor` は最深スコープの次の書き込み位置で、その後ろには常に
//! 開いているスコープ数ぶんの `e` が書かれている。

use alloc::vec::Vec;

use crate::error::{ProducerError, StateError};
use crate::sink::{Sink, END};
use crate::Config;

pub(crate) struct Encoder<'b> {
    /// 出力先
    sink: Sink<'b>,
    /// 開いているスコープの開始位置（`l` / `d` を書いたオフセット）
    scopes: Vec<usize>,
    /// 最深スコープの次の書き込み位置
    cursor: usize,
    /// ルート生成時に渡された設定（子スコープにも引き継ぐ）
    config: Config,
}

impl<'b> Encoder<'b> {
    /// Owned モードのルートを生成する（`le` / `de` を書いた状態）
    pub(crate) fn owned(token: u8, config: Config) -> Self {
        let mut buf = Vec::with_capacity(config.reserve.max(2));
        buf.push(token);
        buf.push(END);
        Encoder {
            sink: Sink::Owned(buf),
            scopes: alloc::vec![0],
            cursor: 1,
            config,
        }
    }

    /// 外部バッファモードのルートを生成する
    ///
    /// # エラー
    /// - `CapacityExceeded`: バッファが空の list/dict（2 バイト）を保持できない
    pub(crate) fn external(
        buf: &'b mut [u8],
        token: u8,
        config: Config,
    ) -> Result<Self, ProducerError> {
        let mut enc = Encoder {
            sink: Sink::External(buf),
            scopes: Vec::new(),
            cursor: 0,
            config,
        };
        enc.open(&[], token)?;
        Ok(enc)
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// 開いているスコープ数
    pub(crate) fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// `level` のスコープが子を持っていないことを確認する
    pub(crate) fn check_innermost(&self, level: usize) -> Result<(), ProducerError> {
        if level + 1 == self.depth() {
            Ok(())
        } else {
            Err(StateError::ChildActive.into())
        }
    }

    /// ペイロードを `cursor` に書き込み、終端を書き直してカーソルを進める
    pub(crate) fn emit(&mut self, parts: &[&[u8]]) -> Result<(), ProducerError> {
        let written = self.sink.write(self.cursor, parts, self.scopes.len())?;
        self.cursor += written;
        Ok(())
    }

    /// `lead`（dict のキー等）と開始トークンを書き、新しいスコープを開く
    ///
    /// キーと開始トークンは 1 回の書き込みで行うので、容量不足で失敗しても
    /// 値のないキーが残ることはない。
    ///
    /// # 戻り値
    /// 新しいスコープの深さ（ルート = 0）
    pub(crate) fn open(&mut self, lead: &[&[u8]], token: u8) -> Result<usize, ProducerError> {
        debug_assert!(lead.len() <= 3);
        let lead_len: usize = lead.iter().map(|p| p.len()).sum();
        let token = [token];

        let empty: &[u8] = &[];
        let mut parts = [empty; 4];
        parts[..lead.len()].copy_from_slice(lead);
        parts[lead.len()] = &token;

        let level = self.scopes.len();
        self.scopes.push(self.cursor + lead_len);
        if let Err(e) = self.emit(&parts[..=lead.len()]) {
            self.scopes.pop();
            return Err(e);
        }

        log::trace!("bt: opened scope level={} at offset={}", level, self.scopes[level]);
        Ok(level)
    }

    /// `level` のスコープ（とその下に残っている子孫）を閉じる
    ///
    /// 終端バイトは既に書かれているので、カーソルを進めるだけでよい。
    ///
    /// # 戻り値
    /// 閉じられずに残っていた子孫がいなければ `true`
    pub(crate) fn close(&mut self, level: usize) -> bool {
        let open = self.scopes.len();
        if level >= open {
            return true;
        }
        self.cursor += open - level;
        self.scopes.truncate(level);
        log::trace!("bt: closed scope level={} cursor={}", level, self.cursor);
        open - level == 1
    }

    /// `level` のスコープの `next`（終端バイトの位置）
    fn next_of(&self, level: usize) -> usize {
        self.cursor + (self.scopes.len() - 1 - level)
    }

    /// `level` のスコープのバイト列（自身の終端バイトを含む）
    pub(crate) fn view(&self, level: usize) -> &[u8] {
        let from = self.scopes[level];
        &self.sink.bytes()[from..=self.next_of(level)]
    }

    /// `level` のスコープの終端バイトの次のオフセット
    pub(crate) fn end(&self, level: usize) -> usize {
        self.next_of(level) + 1
    }

    /// ルートから見た書き込み済みバイト列全体（開いている終端を含む）
    pub(crate) fn output(&self) -> &[u8] {
        &self.sink.bytes()[..self.cursor + self.scopes.len()]
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.sink.reserve(additional);
    }

    pub(crate) fn is_external(&self) -> bool {
        self.sink.is_external()
    }

    pub(crate) fn capacity(&self) -> Option<usize> {
        self.sink.capacity()
    }

    /// Owned モードのルートから出力を取り出し、空の list/dict に戻す
    pub(crate) fn take(&mut self, level: usize) -> Result<Vec<u8>, ProducerError> {
        if level != 0 {
            return Err(StateError::NotRoot.into());
        }
        if self.sink.is_external() {
            return Err(StateError::ExternalBuffer.into());
        }
        self.check_innermost(level)?;

        let token = self.sink.bytes()[self.scopes[0]];
        let out = self
            .sink
            .replace_owned(&[token, END])
            .ok_or(ProducerError::IllegalState(StateError::ExternalBuffer))?;
        self.cursor = 1;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_root_is_closed() {
        let enc = Encoder::owned(b'l', Config::default());
        assert_eq!(enc.output(), b"le");
        assert_eq!(enc.view(0), b"le");
        assert_eq!(enc.depth(), 1);
    }

    #[test]
    fn test_open_and_close_nested() {
        let mut enc = Encoder::owned(b'l', Config::default());
        enc.emit(&[b"i1e"]).unwrap();
        let child = enc.open(&[], b'd').unwrap();
        assert_eq!(child, 1);
        assert_eq!(enc.output(), b"li1edee");
        assert_eq!(enc.view(1), b"de");
        assert_eq!(enc.view(0), b"li1edee");

        enc.emit(&[b"1:a", b"i2e"]).unwrap();
        assert_eq!(enc.output(), b"li1ed1:ai2eee");
        assert!(enc.check_innermost(0).is_err());

        assert!(enc.close(child));
        assert!(enc.check_innermost(0).is_ok());
        enc.emit(&[b"0:"]).unwrap();
        assert_eq!(enc.output(), b"li1ed1:ai2ee0:e");
        assert_eq!(enc.end(0), enc.output().len());
    }

    #[test]
    fn test_close_with_leaked_descendant() {
        let mut enc = Encoder::owned(b'l', Config::default());
        let child = enc.open(&[], b'l').unwrap();
        let _grandchild = enc.open(&[], b'l').unwrap();
        assert_eq!(enc.output(), b"llleee");

        // 孫が閉じられていなくても、子を閉じると孫ごと閉じる
        assert!(!enc.close(child));
        assert_eq!(enc.depth(), 1);
        enc.emit(&[b"i0e"]).unwrap();
        assert_eq!(enc.output(), b"llleei0ee");
    }

    #[test]
    fn test_external_open_failure_restores_scopes() {
        let mut buf = [0u8; 3];
        let mut enc = Encoder::external(&mut buf, b'l', Config::default()).unwrap();
        // 子 list を開くと "llee" の 4 バイトが必要
        let result = enc.open(&[], b'l');
        assert!(matches!(result, Err(ProducerError::CapacityExceeded { .. })));
        assert_eq!(enc.depth(), 1);
        assert_eq!(enc.output(), b"le");
    }

    #[test]
    fn test_take_resets_root() {
        let mut enc = Encoder::owned(b'd', Config::default());
        enc.emit(&[b"1:k", b"0:"]).unwrap();
        let out = enc.take(0).unwrap();
        assert_eq!(out, b"d1:k0:e");
        assert_eq!(enc.output(), b"de");
        assert_eq!(
            enc.take(1),
            Err(ProducerError::IllegalState(StateError::NotRoot))
        );
    }
}
