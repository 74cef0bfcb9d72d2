//! 空后端.
//!
//! 总能初始化成功, 解码调用一律返回状态码 -1, 不支持编码.
//! 在没有任何真实编解码库可用时保证上下文仍可创建.

use qiao_core::{QiaoError, QiaoResult};

use crate::backend::{BackendCaps, BackendKind, Decoded, H264Backend};

#[derive(Debug, Default)]
pub struct NullBackend {
    initialized: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 工厂函数
    pub fn create() -> Box<dyn H264Backend> {
        Box::new(Self::new())
    }
}

impl H264Backend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn capabilities(&self) -> BackendCaps {
        BackendCaps::empty()
    }

    fn init(&mut self, _compressor: bool) -> QiaoResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn uninit(&mut self) {
        self.initialized = false;
    }

    fn decompress(&mut self, _src: &[u8]) -> QiaoResult<Decoded<'_>> {
        Err(QiaoError::Backend {
            code: -1,
            message: "空后端无法解码".into(),
        })
    }
}
