use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use std::path::PathBuf;

use super::PortAllocator;
use crate::metrics::PortAllocatorMetrics;
use crate::range::PortRange;

/// `PortAllocator`のビルダ.
#[derive(Debug, Clone)]
pub struct PortAllocatorBuilder {
    range: Option<PortRange>,
    system_port_range_file: PathBuf,
    metrics: MetricBuilder,
    logger: Logger,
}
impl PortAllocatorBuilder {
    /// デフォルト設定で`PortAllocatorBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        PortAllocatorBuilder {
            range: None,
            system_port_range_file: PathBuf::from(PortRange::SYSTEM_FILE),
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// 動的割当の範囲を設定する.
    ///
    /// 本メソッドが呼ばれていない場合には、
    /// `system_port_range_file`で指定されたファイルから範囲が読み込まれる.
    pub fn port_range(&mut self, range: PortRange) -> &mut Self {
        self.range = Some(range);
        self
    }

    /// システムのローカルポート範囲が記載されたファイルのパスを設定する.
    ///
    /// `port_range`で明示的に範囲が指定されていない場合にのみ参照される.
    /// ファイルの読み込みやパースに失敗した場合には、警告ログを出力した上で
    /// `PortRange::default()`が使用される.
    ///
    /// デフォルト値は`PortRange::SYSTEM_FILE`.
    pub fn system_port_range_file<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.system_port_range_file = path.into();
        self
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// アロケータ用の logger を登録する.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// 設定に従って`PortAllocator`を生成する.
    pub fn finish(&self) -> PortAllocator {
        let range = self.range.unwrap_or_else(|| self.system_port_range());
        let metrics = PortAllocatorMetrics::new(&self.metrics, range);
        info!(self.logger, "Port allocator is created";
              "begin" => range.begin(), "end" => range.end());
        PortAllocator::new_with(range, metrics, self.logger.clone())
    }

    fn system_port_range(&self) -> PortRange {
        match track!(PortRange::read_from_file(&self.system_port_range_file)) {
            Ok(range) => range,
            Err(e) => {
                let range = PortRange::default();
                warn!(self.logger, "Cannot read the system port range; falling back to the default";
                      "path" => %self.system_port_range_file.display(),
                      "begin" => range.begin(), "end" => range.end(),
                      "error" => %e);
                range
            }
        }
    }
}
impl Default for PortAllocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use tempdir::TempDir;
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn explicit_range_works() -> TestResult {
        let range = track!(PortRange::new(8000, 8099))?;
        let allocator = PortAllocatorBuilder::new()
            .port_range(range)
            .system_port_range_file("/nonexistent/ip_local_port_range")
            .finish();
        assert_eq!(allocator.range(), range);
        assert_eq!(allocator.metrics().range(), (8000, 8099));
        Ok(())
    }

    #[test]
    fn system_range_works() -> TestResult {
        let dir = track_io!(TempDir::new("portalloc_test"))?;
        let path = dir.path().join("ip_local_port_range");
        let mut file = track_io!(File::create(&path))?;
        track_io!(file.write_all(b"32768\t61000\n"))?;

        let allocator = PortAllocatorBuilder::new()
            .system_port_range_file(&path)
            .finish();
        assert_eq!(allocator.begin(), 32768);
        assert_eq!(allocator.end(), 61000);
        Ok(())
    }

    #[test]
    fn falls_back_to_default_range() -> TestResult {
        let dir = track_io!(TempDir::new("portalloc_test"))?;
        let allocator = PortAllocatorBuilder::new()
            .system_port_range_file(dir.path().join("missing"))
            .finish();
        assert_eq!(allocator.range(), PortRange::default());

        let path = dir.path().join("broken");
        let mut file = track_io!(File::create(&path))?;
        track_io!(file.write_all(b"61000\t32768\n"))?;
        let allocator = PortAllocatorBuilder::new()
            .system_port_range_file(&path)
            .finish();
        assert_eq!(allocator.range(), PortRange::default());
        Ok(())
    }
}
