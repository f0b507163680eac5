//! ポートアロケータ.
//!
//! アロケータは、`(プロトコル, バインドアドレス)`の組ごとに使用中のポートを記録し、
//! 動的割当要求(任意の空きポート)と明示的割当要求(特定のポート)に応える.
//!
//! アロケータが担当するのは台帳の管理のみで、ソケットの`bind`等を、この中で行うことは無い.
//! 上位層は、ここで割り当てたポートを使って実際のバインドを行い、
//! コンテナの破棄時にポートを解放する責務を負う.
//!
//! # アドレスの扱い
//!
//! バインドアドレスは単なるキーとして扱われる.
//! 未指定アドレス(e.g., `0.0.0.0`)と特定のアドレスの間にも特別な関係は無く、
//! `0.0.0.0:80`を割り当てた後でも`192.168.0.1:80`の割当は成功する.
//! 実際のソケットでは前者のバインドが後者を妨げるため、
//! 必要であれば利用者側でこの差異を考慮する必要がある.
use slog::Logger;
use std::net::IpAddr;
use std::sync::Mutex;

pub use self::builder::PortAllocatorBuilder;

use self::table::{AllocationTable, Leaf};
use crate::metrics::PortAllocatorMetrics;
use crate::protocol::Protocol;
use crate::range::PortRange;
use crate::{Error, ErrorKind, Result};

mod builder;
mod table;

/// 動的割当を要求する際に指定するポート番号.
pub const ANY_PORT: u16 = 0;

/// ポートアロケータ.
///
/// [モジュールドキュメント](index.html)も参照のこと.
///
/// 全ての操作は単一のロックの下で直列化される.
/// 複数スレッドから利用する場合には`Arc`で共有すること.
///
/// この実装自体は、完全にメモリ上のデータ構造であり、状態は永続化されない.
#[derive(Debug)]
pub struct PortAllocator {
    range: PortRange,
    table: Mutex<AllocationTable>,
    metrics: PortAllocatorMetrics,
    logger: Logger,
}
impl PortAllocator {
    /// デフォルト設定でアロケータを生成する.
    ///
    /// 動的割当の範囲にはシステムのローカルポート範囲が使用される.
    /// 設定を変更したい場合には`PortAllocatorBuilder`を使用すること.
    pub fn new() -> Self {
        PortAllocatorBuilder::new().finish()
    }

    /// ポートの割当を行う.
    ///
    /// `port`に`ANY_PORT`が指定された場合には動的割当となり、
    /// 範囲内の空きポートが一つ選ばれて返される.
    /// それ以外の場合には、`port`自体が割り当てられる.
    /// 明示的に指定されたポートは、範囲外であっても割当可能.
    ///
    /// # Errors
    ///
    /// - `protocol`が`"tcp"`でも`"udp"`でもない場合には`ErrorKind::UnknownProtocol`
    /// - 明示的に指定されたポートが使用中の場合には`ErrorKind::PortAlreadyAllocated`
    /// - 動的割当で、範囲内の全てのポートが使用中の場合には`ErrorKind::AllPortsAllocated`
    ///
    /// いずれの場合も、アロケータの状態は変更されない.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::{IpAddr, Ipv4Addr};
    /// use portalloc::ErrorKind;
    /// use portalloc::allocator::{PortAllocatorBuilder, ANY_PORT};
    /// use portalloc::range::PortRange;
    ///
    /// let allocator = PortAllocatorBuilder::new()
    ///     .port_range(PortRange::new(8000, 8001).unwrap())
    ///     .finish();
    /// let addr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    ///
    /// assert_eq!(allocator.request_port(addr, "tcp", ANY_PORT).ok(), Some(8000));
    /// assert_eq!(allocator.request_port(addr, "tcp", 80).ok(), Some(80));
    /// assert_eq!(allocator.request_port(addr, "tcp", 80).err().map(|e| *e.kind()),
    ///            Some(ErrorKind::PortAlreadyAllocated { address: addr, port: 80 }));
    /// ```
    pub fn request_port(&self, address: IpAddr, protocol: &str, port: u16) -> Result<u16> {
        let protocol = track!(self.parse_protocol(protocol))?;
        let mut table = track!(self.table.lock().map_err(Error::from))?;
        let leaf = table.leaf_for(protocol, address);
        if port == ANY_PORT {
            track!(self.allocate_dynamic_port(leaf, protocol, address))
        } else {
            track!(self.allocate_specific_port(leaf, protocol, address, port))
        }
    }

    /// ポートの解放を行う.
    ///
    /// 割り当てられていないポートが指定された場合には、何も行わずに成功する.
    /// そのため、同じポートを重複して解放しても問題はない.
    /// 一度も割当要求を受けていない`(プロトコル, バインドアドレス)`の組に対しても、
    /// 割当表に新しいエントリは作られない.
    ///
    /// # Errors
    ///
    /// `protocol`が`"tcp"`でも`"udp"`でもない場合には`ErrorKind::UnknownProtocol`が返される.
    pub fn release_port(&self, address: IpAddr, protocol: &str, port: u16) -> Result<()> {
        let protocol = track!(self.parse_protocol(protocol))?;
        let mut table = track!(self.table.lock().map_err(Error::from))?;
        if let Some(leaf) = table.get_mut(protocol, address) {
            if leaf.mark_free(port) {
                self.metrics.count_releasion(1);
                debug!(self.logger, "Port is released";
                       "protocol" => %protocol, "address" => %address, "port" => port,
                       "used" => leaf.used_ports());
            }
        }
        Ok(())
    }

    /// 全てのポートを解放する.
    ///
    /// 各`(プロトコル, バインドアドレス)`の探索カーソルはリセットされないが、
    /// 解放されたポートは折り返し探索によって再び見つかる.
    pub fn release_all(&self) -> Result<()> {
        let mut table = track!(self.table.lock().map_err(Error::from))?;
        let released = table.release_all();
        self.metrics.count_releasion(released);
        self.metrics.resets.increment();
        debug!(self.logger, "All ports are released";
               "released" => released, "leaves" => table.leaves());
        Ok(())
    }

    /// `port`が割当済みかどうかを判定する.
    ///
    /// `request_port`とは異なり、未知の`(プロトコル, バインドアドレス)`の組が
    /// 指定されても、割当表に新しいエントリは作られない.
    pub fn is_allocated(&self, address: IpAddr, protocol: &str, port: u16) -> Result<bool> {
        let protocol = track!(protocol.parse::<Protocol>())?;
        let table = track!(self.table.lock().map_err(Error::from))?;
        Ok(table
            .get(protocol, address)
            .map_or(false, |leaf| leaf.is_used(port)))
    }

    /// 動的割当の範囲を返す.
    pub fn range(&self) -> PortRange {
        self.range
    }

    /// 動的割当の範囲の始端を返す.
    pub fn begin(&self) -> u16 {
        self.range.begin()
    }

    /// 動的割当の範囲の終端を返す.
    pub fn end(&self) -> u16 {
        self.range.end()
    }

    /// アロケータ用のメトリクスを返す.
    pub fn metrics(&self) -> &PortAllocatorMetrics {
        &self.metrics
    }

    pub(crate) fn new_with(range: PortRange, metrics: PortAllocatorMetrics, logger: Logger) -> Self {
        PortAllocator {
            range,
            table: Mutex::new(AllocationTable::new()),
            metrics,
            logger,
        }
    }

    fn parse_protocol(&self, protocol: &str) -> Result<Protocol> {
        protocol.parse::<Protocol>().map_err(|e| {
            self.metrics.unknown_protocol_failures.increment();
            track!(e)
        })
    }

    fn allocate_dynamic_port(
        &self,
        leaf: &mut Leaf,
        protocol: Protocol,
        address: IpAddr,
    ) -> Result<u16> {
        match find_free_port(leaf, self.range) {
            Some(port) => {
                leaf.mark_used(port);
                self.metrics.count_allocation(true);
                debug!(self.logger, "Port is allocated dynamically";
                       "protocol" => %protocol, "address" => %address, "port" => port);
                Ok(port)
            }
            None => {
                self.metrics.exhaustion_failures.increment();
                warn!(self.logger, "All ports are allocated";
                      "protocol" => %protocol, "address" => %address,
                      "begin" => self.range.begin(), "end" => self.range.end());
                track_panic!(
                    ErrorKind::AllPortsAllocated,
                    "protocol={}, address={}, range={}-{}",
                    protocol,
                    address,
                    self.range.begin(),
                    self.range.end()
                );
            }
        }
    }

    fn allocate_specific_port(
        &self,
        leaf: &mut Leaf,
        protocol: Protocol,
        address: IpAddr,
        port: u16,
    ) -> Result<u16> {
        if leaf.is_used(port) {
            self.metrics.conflict_failures.increment();
            debug!(self.logger, "Port is already allocated";
                   "protocol" => %protocol, "address" => %address, "port" => port);
            track_panic!(
                ErrorKind::PortAlreadyAllocated { address, port },
                "Bind for {}:{} failed: port is already allocated",
                address,
                port
            );
        }
        leaf.mark_used(port);
        self.metrics.count_allocation(false);
        debug!(self.logger, "Port is allocated";
               "protocol" => %protocol, "address" => %address, "port" => port);
        Ok(port)
    }
}
impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// `leaf`の中から、`range`内の空きポートを探す.
///
/// 探索はカーソルの次の位置から始まり、`range`の終端に達したら始端に折り返す.
/// 範囲を一周しても空きが見つからなければ`None`を返す.
///
/// カーソルが未設定ないし範囲外の場合には、`range`の始端から探索する
/// (i.e., カーソルが`begin - 1`を指している場合と同じ挙動となる).
fn find_free_port(leaf: &Leaf, range: PortRange) -> Option<u16> {
    let begin = u32::from(range.begin());
    let len = range.len();

    // `offset`は`begin`からの相対位置
    let mut offset = match leaf.cursor() {
        Some(cursor) if range.contains(cursor) => u32::from(cursor) - begin,
        _ => len - 1,
    };
    for _ in 0..len {
        offset = (offset + 1) % len;
        let port = (begin + offset) as u16;
        if !leaf.is_used(port) {
            return Some(port);
        }
    }
    None
}
