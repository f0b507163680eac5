//! 割当表.
use fixedbitset::FixedBitSet;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use crate::protocol::Protocol;

/// ポート空間全体(`u16`)を表現するのに必要なビット数.
const PORT_SPACE: usize = 1 << 16;

/// `(プロトコル, バインドアドレス)`の組ごとのポート使用状況.
///
/// 組に対応する葉は初回の割当要求時に生成され、以後削除されることはない.
/// 全てのポートが解放された後も葉(とそのカーソル)は保持され続けるので、
/// 同じアドレスが再利用された場合でも、動的割当の探索位置は引き継がれる.
///
/// 各葉はポート空間全体分のビットマップ(8KiB)を固定で確保する.
/// そのため、メモリ使用量は「これまでに割当要求を受けた組の数」に比例して増え続ける.
/// 解放操作や参照操作では葉は生成されない.
///
/// 独自のロックは持たず、排他制御は`PortAllocator`側で行われる.
#[derive(Debug, Default)]
pub struct AllocationTable {
    // `BTreeMap`の方が`HashMap`よりもメモリ効率が良いので、こちらを採用
    protocols: BTreeMap<Protocol, BTreeMap<IpAddr, Leaf>>,
}
impl AllocationTable {
    /// 空の割当表を生成する.
    pub fn new() -> Self {
        AllocationTable {
            protocols: BTreeMap::new(),
        }
    }

    /// `(protocol, address)`に対応する葉を返す.
    ///
    /// まだ存在しない場合には、空の葉を生成して登録した上で返す.
    pub fn leaf_for(&mut self, protocol: Protocol, address: IpAddr) -> &mut Leaf {
        self.protocols
            .entry(protocol)
            .or_insert_with(BTreeMap::new)
            .entry(address)
            .or_insert_with(Leaf::new)
    }

    /// `(protocol, address)`に対応する葉が存在すればそれを返す.
    pub fn get(&self, protocol: Protocol, address: IpAddr) -> Option<&Leaf> {
        self.protocols
            .get(&protocol)
            .and_then(|leaves| leaves.get(&address))
    }

    /// `(protocol, address)`に対応する葉が存在すればそれを返す(更新用).
    pub fn get_mut(&mut self, protocol: Protocol, address: IpAddr) -> Option<&mut Leaf> {
        self.protocols
            .get_mut(&protocol)
            .and_then(|leaves| leaves.get_mut(&address))
    }

    /// 全ての葉の使用中ポートを解放し、解放したポートの数を返す.
    ///
    /// 葉自体とそのカーソルは保持される.
    pub fn release_all(&mut self) -> u64 {
        self.protocols
            .values_mut()
            .flat_map(|leaves| leaves.values_mut())
            .map(|leaf| leaf.clear() as u64)
            .sum()
    }

    /// 登録されている葉の数を返す.
    pub fn leaves(&self) -> usize {
        self.protocols.values().map(|leaves| leaves.len()).sum()
    }
}

/// 一つの`(プロトコル, バインドアドレス)`に対応する、使用中ポートの集合と探索カーソル.
pub struct Leaf {
    used: FixedBitSet,
    used_ports: usize,
    cursor: Option<u16>,
}
impl Leaf {
    fn new() -> Self {
        Leaf {
            used: FixedBitSet::with_capacity(PORT_SPACE),
            used_ports: 0,
            cursor: None,
        }
    }

    /// `port`が使用中かどうかを判定する.
    pub fn is_used(&self, port: u16) -> bool {
        self.used.contains(usize::from(port))
    }

    /// `port`を使用中にして、カーソルをその位置に移動する.
    ///
    /// # 事前条件
    ///
    /// - `port`は未使用である
    pub fn mark_used(&mut self, port: u16) {
        let was_used = self.used.put(usize::from(port));
        debug_assert!(!was_used, "port {} is already used", port);
        if !was_used {
            self.used_ports += 1;
        }
        self.cursor = Some(port);
    }

    /// `port`を未使用に戻す.
    ///
    /// 元々未使用だった場合には何もせずに`false`を返す.
    pub fn mark_free(&mut self, port: u16) -> bool {
        let port = usize::from(port);
        if !self.used.contains(port) {
            return false;
        }
        self.used.set(port, false);
        self.used_ports -= 1;
        true
    }

    /// 直近に割り当てられたポート(i.e., 動的割当の探索カーソル)を返す.
    ///
    /// これは探索を開始する位置のヒントに過ぎず、割当の正しさには影響しない.
    pub fn cursor(&self) -> Option<u16> {
        self.cursor
    }

    /// 使用中のポートの数を返す.
    pub fn used_ports(&self) -> usize {
        self.used_ports
    }

    fn clear(&mut self) -> usize {
        let released = self.used_ports;
        if released > 0 {
            self.used.clear();
            self.used_ports = 0;
        }
        released
    }
}
impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // ビットマップ全体は巨大なので使用中のポート数のみを出力する
        f.debug_struct("Leaf")
            .field("used_ports", &self.used_ports)
            .field("cursor", &self.cursor)
            .finish()
    }
}
