//! 動的割当用のポート範囲.
use std::fs;
use std::path::Path;
use trackable::error::ErrorKindExt;

use crate::{ErrorKind, Result};

/// 動的割当の対象となるポート範囲(両端を含む).
///
/// この範囲が使われるのは、動的割当の探索時のみ.
/// 明示的に指定されたポートの割当は、範囲外であっても許可される.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    begin: u16,
    end: u16,
}
impl PortRange {
    /// デフォルトの範囲の始端.
    pub const DEFAULT_BEGIN: u16 = 49153;

    /// デフォルトの範囲の終端.
    pub const DEFAULT_END: u16 = 65535;

    /// Linuxにおける、ローカルポート範囲の設定ファイル.
    pub const SYSTEM_FILE: &'static str = "/proc/sys/net/ipv4/ip_local_port_range";

    /// 新しい`PortRange`インスタンスを生成する.
    ///
    /// # Errors
    ///
    /// 以下のいずれかの場合には、種類が`ErrorKind::InvalidInput`のエラーが返される:
    ///
    /// - `begin`が`0`である (`0`は動的割当要求を表す値のため)
    /// - `begin`が`end`よりも大きい
    ///
    /// # Examples
    ///
    /// ```
    /// use portalloc::ErrorKind;
    /// use portalloc::range::PortRange;
    ///
    /// let range = PortRange::new(8000, 8009).unwrap();
    /// assert_eq!(range.len(), 10);
    ///
    /// assert_eq!(PortRange::new(8009, 8000).err().map(|e| *e.kind()),
    ///            Some(ErrorKind::InvalidInput));
    /// ```
    pub fn new(begin: u16, end: u16) -> Result<Self> {
        track_assert!(begin != 0, ErrorKind::InvalidInput, "Port 0 cannot be a range bound");
        track_assert!(
            begin <= end,
            ErrorKind::InvalidInput,
            "Invalid port range: {}-{}",
            begin,
            end
        );
        Ok(PortRange { begin, end })
    }

    /// `ip_local_port_range`形式の文字列をパースする.
    ///
    /// 空白文字(典型的にはタブ)で区切られた二つの整数を、始端と終端として扱う.
    pub fn parse(s: &str) -> Result<Self> {
        let mut fields = s.split_whitespace();
        let begin = track_assert_some!(fields.next(), ErrorKind::InvalidInput, "Empty range");
        let end = track_assert_some!(
            fields.next(),
            ErrorKind::InvalidInput,
            "Missing range end: {:?}",
            s
        );
        track_assert_eq!(fields.next(), None, ErrorKind::InvalidInput);

        let begin = track!(begin
            .parse::<u16>()
            .map_err(|e| ErrorKind::InvalidInput.cause(e)))?;
        let end = track!(end
            .parse::<u16>()
            .map_err(|e| ErrorKind::InvalidInput.cause(e)))?;
        track!(Self::new(begin, end))
    }

    /// `path`で指定されたファイルから範囲を読み込む.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = track_io!(fs::read_to_string(path.as_ref()))?;
        track!(Self::parse(&content), "path={:?}", path.as_ref())
    }

    /// システム(カーネル)に設定されているローカルポート範囲を読み込む.
    pub fn system() -> Result<Self> {
        track!(Self::read_from_file(Self::SYSTEM_FILE))
    }

    /// 範囲の始端を返す.
    pub fn begin(&self) -> u16 {
        self.begin
    }

    /// 範囲の終端を返す.
    pub fn end(&self) -> u16 {
        self.end
    }

    /// 範囲に含まれるポートの数を返す.
    pub fn len(&self) -> u32 {
        u32::from(self.end) - u32::from(self.begin) + 1
    }

    /// `port`が範囲に含まれるかどうかを判定する.
    pub fn contains(&self, port: u16) -> bool {
        self.begin <= port && port <= self.end
    }
}
impl Default for PortRange {
    fn default() -> Self {
        PortRange {
            begin: Self::DEFAULT_BEGIN,
            end: Self::DEFAULT_END,
        }
    }
}
