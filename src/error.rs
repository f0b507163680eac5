use std::net::IpAddr;
use trackable::error::ErrorKindExt;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if let Some(e) = e.get_ref().and_then(|e| e.downcast_ref::<Error>()).cloned() {
            e
        } else if e.kind() == std::io::ErrorKind::InvalidInput {
            ErrorKind::InvalidInput.cause(e).into()
        } else {
            ErrorKind::Other.cause(e).into()
        }
    }
}
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ErrorKind::Other.cause(e.to_string()).into()
    }
}

/// 発生し得るエラーの種別.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 未知のプロトコルが指定された.
    ///
    /// 認識されるのは`"tcp"`と`"udp"`のみ.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    UnknownProtocol,

    /// 明示的に要求されたポートが、既に同じアドレスおよびプロトコルで割当済み.
    ///
    /// # 典型的な対応策
    ///
    /// - 別のポートを指定してリトライする
    /// - 動的割当(`ANY_PORT`)に切り替える
    PortAlreadyAllocated {
        /// 要求に使われたバインドアドレス.
        address: IpAddr,

        /// 衝突したポート番号.
        port: u16,
    },

    /// 動的割当の範囲内のポートが全て使用中.
    ///
    /// # 典型的な対応策
    ///
    /// - 不要になったポートを解放した後にリトライする
    /// - 動的割当の範囲を広げて再構築する
    AllPortsAllocated,

    /// 入力が不正.
    ///
    /// E.g., 不正なポート範囲
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムや設定を修正して入力を正しくする
    InvalidInput,

    /// その他エラー.
    ///
    /// E.g., I/Oエラー、ロックのポイズニング
    Other,
}
impl trackable::error::ErrorKind for ErrorKind {}
