//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

use crate::range::PortRange;

/// [`PortAllocator`]のメトリクス.
///
/// [`PortAllocator`]: ../allocator/struct.PortAllocator.html
#[derive(Debug, Clone)]
pub struct PortAllocatorMetrics {
    pub(crate) allocated_dynamic_ports: Counter,
    pub(crate) allocated_specific_ports: Counter,
    pub(crate) released_ports: Counter,
    pub(crate) conflict_failures: Counter,
    pub(crate) exhaustion_failures: Counter,
    pub(crate) unknown_protocol_failures: Counter,
    pub(crate) resets: Counter,
    pub(crate) range_begin: Gauge,
    pub(crate) range_end: Gauge,
}
impl PortAllocatorMetrics {
    /// 割り当てたポートの数.
    ///
    /// 返り値のタプルの第一要素は`request="dynamic"`ラベルを持ち、第二要素は`request="specific"`ラベルを持つ.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_allocated_ports_total { request="dynamic|specific" } <COUNTER>
    /// ```
    pub fn allocated_ports(&self) -> (u64, u64) {
        (
            self.allocated_dynamic_ports.value() as u64,
            self.allocated_specific_ports.value() as u64,
        )
    }

    /// 解放したポートの数.
    ///
    /// 実際に使用中だったポートの解放のみが数えられる.
    /// `release_all`によって解放されたポートも含む.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_released_ports_total <COUNTER>
    /// ```
    pub fn released_ports(&self) -> u64 {
        self.released_ports.value() as u64
    }

    /// 現在使用中のポートの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// sum(portalloc_allocator_allocated_ports_total) - portalloc_allocator_released_ports_total
    /// ```
    pub fn usage(&self) -> u64 {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.released_ports();
        let (dynamic, specific) = self.allocated_ports();
        dynamic + specific - dec
    }

    /// 明示的に要求されたポートが使用中だったために失敗した回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_conflict_failures_total <COUNTER>
    /// ```
    pub fn conflict_failures(&self) -> u64 {
        self.conflict_failures.value() as u64
    }

    /// 動的割当の範囲が枯渇していたために失敗した回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_exhaustion_failures_total <COUNTER>
    /// ```
    pub fn exhaustion_failures(&self) -> u64 {
        self.exhaustion_failures.value() as u64
    }

    /// 未知のプロトコルが指定されたために失敗した回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_unknown_protocol_failures_total <COUNTER>
    /// ```
    pub fn unknown_protocol_failures(&self) -> u64 {
        self.unknown_protocol_failures.value() as u64
    }

    /// `release_all`の呼び出し回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_resets_total <COUNTER>
    /// ```
    pub fn resets(&self) -> u64 {
        self.resets.value() as u64
    }

    /// 動的割当の範囲.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// portalloc_allocator_range_begin <GAUGE>
    /// portalloc_allocator_range_end <GAUGE>
    /// ```
    pub fn range(&self) -> (u16, u16) {
        (
            self.range_begin.value() as u16,
            self.range_end.value() as u16,
        )
    }

    pub(crate) fn new(builder: &MetricBuilder, range: PortRange) -> Self {
        let mut builder = builder.clone();
        builder.namespace("portalloc").subsystem("allocator");
        let metrics = PortAllocatorMetrics {
            allocated_dynamic_ports: builder
                .counter("allocated_ports_total")
                .help("Number of allocated ports")
                .label("request", "dynamic")
                .finish()
                .expect("Never fails"),
            allocated_specific_ports: builder
                .counter("allocated_ports_total")
                .help("Number of allocated ports")
                .label("request", "specific")
                .finish()
                .expect("Never fails"),
            released_ports: builder
                .counter("released_ports_total")
                .help("Number of released ports")
                .finish()
                .expect("Never fails"),
            conflict_failures: builder
                .counter("conflict_failures_total")
                .help("Number of allocation failures caused by already allocated ports")
                .finish()
                .expect("Never fails"),
            exhaustion_failures: builder
                .counter("exhaustion_failures_total")
                .help("Number of allocation failures caused by no available port in the range")
                .finish()
                .expect("Never fails"),
            unknown_protocol_failures: builder
                .counter("unknown_protocol_failures_total")
                .help("Number of requests rejected because of unknown protocols")
                .finish()
                .expect("Never fails"),
            resets: builder
                .counter("resets_total")
                .help("Number of bulk releases")
                .finish()
                .expect("Never fails"),
            range_begin: builder
                .gauge("range_begin")
                .help("First port of the dynamic allocation range")
                .finish()
                .expect("Never fails"),
            range_end: builder
                .gauge("range_end")
                .help("Last port of the dynamic allocation range")
                .finish()
                .expect("Never fails"),
        };
        metrics.range_begin.set(f64::from(range.begin()));
        metrics.range_end.set(f64::from(range.end()));
        metrics
    }

    pub(crate) fn count_allocation(&self, dynamic: bool) {
        if dynamic {
            self.allocated_dynamic_ports.increment();
        } else {
            self.allocated_specific_ports.increment();
        }
    }

    pub(crate) fn count_releasion(&self, ports: u64) {
        self.released_ports.add_u64(ports);
    }
}
