//! 内置后端.
//!
//! 硬件与软件编解码库通过 [`BackendRegistry::register`] 由调用方接入,
//! 这里只提供始终可用的空后端.

pub mod null;

use crate::backend::BackendKind;
use crate::registry::BackendRegistry;

/// 注册所有内置后端
pub fn register_all_backends(registry: &mut BackendRegistry) {
    registry.register("null", BackendKind::Null, null::NullBackend::create);
}
