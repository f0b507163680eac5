//! トランスポートプロトコル.
use std::fmt;
use std::str::FromStr;

use crate::{Error, ErrorKind, Result};

/// ポート割当の対象となるトランスポートプロトコル.
///
/// プロトコルが異なれば、同じアドレスおよびポート番号でも互いに独立に割り当てられる.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP.
    Tcp,

    /// UDP.
    Udp,
}
impl Protocol {
    /// プロトコル名を返す.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}
impl FromStr for Protocol {
    type Err = Error;

    /// プロトコル名から`Protocol`を生成する.
    ///
    /// 大文字小文字は区別される.
    ///
    /// # Errors
    ///
    /// `"tcp"`と`"udp"`以外の文字列が渡された場合には、
    /// 種類が`ErrorKind::UnknownProtocol`のエラーが返される.
    ///
    /// # Examples
    ///
    /// ```
    /// use portalloc::ErrorKind;
    /// use portalloc::protocol::Protocol;
    ///
    /// assert_eq!("udp".parse::<Protocol>().ok(), Some(Protocol::Udp));
    /// assert_eq!("tcpp".parse::<Protocol>().err().map(|e| *e.kind()),
    ///            Some(ErrorKind::UnknownProtocol));
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => track_panic!(ErrorKind::UnknownProtocol, "protocol={:?}", s),
        }
    }
}
impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
