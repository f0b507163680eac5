//! Port Allocator.
//!
//! `portalloc`は、コンテナが公開するポートを、共有ホストのネットワーク名前空間上で
//! 衝突なく割り当てるための、メモリ上の台帳.
//!
//! # 特徴
//!
//! - `(プロトコル, バインドアドレス, ポート)`の組ごとに使用状況を管理する
//! - 二種類の割当要求をサポート:
//!   - 動的割当: 設定された範囲内の空きポートを一つ選んで返す
//!   - 明示的割当: 指定されたポートをそのまま割り当てる (範囲外のポートも可)
//! - 動的割当の探索は、前回の割当位置から開始し、範囲の終端で先頭に折り返す
//! - 全ての操作は単一のロックの下で直列化される
//! - 実際のソケットの`bind`は行わない
//!   - OS上でポートが利用可能かどうかの確認は、上位層の責務
//! - 状態は永続化されない
//!
//! # モジュールの依存関係
//!
//! ```text
//! allocator => metrics, range, protocol
//! ```
//!
//! - [allocator]モジュール:
//!   - 主に[PortAllocator]構造体を提供
//!   - `portalloc`の利用者が直接触るのはこの構造体
//! - [metrics]モジュール:
//!   - アロケータの[Prometheus]用メトリクスである[PortAllocatorMetrics]を提供
//! - [range]モジュール:
//!   - 動的割当の範囲を表す[PortRange]を提供
//! - [protocol]モジュール:
//!   - 認識されるトランスポートプロトコルを表す[Protocol]を提供
//!
//! [allocator]: ./allocator/index.html
//! [PortAllocator]: ./allocator/struct.PortAllocator.html
//! [metrics]: ./metrics/index.html
//! [PortAllocatorMetrics]: ./metrics/struct.PortAllocatorMetrics.html
//! [Prometheus]: https://prometheus.io/
//! [range]: ./range/index.html
//! [PortRange]: ./range/struct.PortRange.html
//! [protocol]: ./protocol/index.html
//! [Protocol]: ./protocol/enum.Protocol.html
#![warn(missing_docs)]
extern crate fixedbitset;
extern crate prometrics;
#[cfg(test)]
extern crate tempdir;
#[macro_use]
extern crate trackable;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};

macro_rules! track_io {
    ($expr:expr) => {
        $expr.map_err(|e: ::std::io::Error| track!(crate::Error::from(e)))
    };
}

pub mod allocator;
pub mod metrics;
pub mod protocol;
pub mod range;

mod error;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
