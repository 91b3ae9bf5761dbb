//! Модуль для работы с OpenCL
//!
//! Содержит привязки, загружаемые во время выполнения, и безопасные обертки:
//! обнаружение устройств, контекст и очередь, сборку программ, память и ядра

pub mod bindings;
pub mod callbacks;
pub mod context;
pub mod discovery;
pub mod info;
pub mod kernel;
pub mod memory;
pub mod program;
pub mod resource;
pub mod types;
pub mod utils;
