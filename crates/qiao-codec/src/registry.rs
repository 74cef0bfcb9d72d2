//! H.264 后端注册表.
//!
//! 按类别优先级 (硬件 → 软件 → 空后端) 依次尝试初始化, 第一个成功的后端被选中.
//! 同一类别内按注册顺序尝试.

use log::{debug, warn};
use qiao_core::{QiaoError, QiaoResult};

use crate::backend::{BackendKind, H264Backend};

/// 后端工厂函数类型
pub type BackendFactory = fn() -> Box<dyn H264Backend>;

/// 后端注册条目
struct BackendEntry {
    name: String,
    kind: BackendKind,
    factory: BackendFactory,
}

/// 后端注册表
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
}

impl BackendRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 注册一个后端
    pub fn register(&mut self, name: impl Into<String>, kind: BackendKind, factory: BackendFactory) {
        self.entries.push(BackendEntry {
            name: name.into(),
            kind,
            factory,
        });
    }

    /// 按选择顺序列出已注册的后端
    pub fn list(&self) -> Vec<(&str, BackendKind)> {
        self.ordered()
            .map(|entry| (entry.name.as_str(), entry.kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按优先级初始化后端, 返回第一个初始化成功的实例
    pub fn select(&self, compressor: bool) -> QiaoResult<Box<dyn H264Backend>> {
        for entry in self.ordered() {
            let mut backend = (entry.factory)();
            match backend.init(compressor) {
                Ok(()) => {
                    debug!(
                        "H264: 选用后端 {} ({}), compressor={}",
                        entry.name, entry.kind, compressor
                    );
                    return Ok(backend);
                }
                Err(e) => {
                    warn!("H264: 后端 {} 初始化失败: {}", entry.name, e);
                }
            }
        }
        Err(QiaoError::NoBackend)
    }

    fn ordered(&self) -> impl Iterator<Item = &BackendEntry> {
        // 稳定排序, 同类别保持注册顺序
        let mut sorted: Vec<&BackendEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| entry.kind);
        sorted.into_iter()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
