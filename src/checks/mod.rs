//! Реестр проверок
//!
//! Таблица собирается явно при старте; порядок записей задает порядок
//! запуска.

mod convolution;
mod histogram;
mod rotation;
mod vector_add;

use anyhow::{Context as _, Result};
use opencl_kit::opencl::program::KERNEL_EXTENSION;
use opencl_kit::{build_default_context_set, ContextSet};
use std::path::PathBuf;

/// Общие настройки запуска
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Каталог с `<check>.cl` и входными изображениями
    pub resources: PathBuf,
    /// Каталог для выходных изображений
    pub output_dir: PathBuf,
}

impl HarnessConfig {
    /// Путь к исходному коду ядра проверки `name`
    pub fn kernel_source(&self, name: &str) -> PathBuf {
        self.resources.join(format!("{}.{}", name, KERNEL_EXTENSION))
    }

    /// Путь ко входному файлу из каталога ресурсов
    pub fn resource(&self, file: &str) -> PathBuf {
        self.resources.join(file)
    }
}

/// Именованная проверка
pub struct Check {
    pub name: &'static str,
    pub run: fn(&HarnessConfig) -> Result<()>,
}

pub fn registry() -> Vec<Check> {
    vec![
        Check {
            name: vector_add::NAME,
            run: vector_add::run,
        },
        Check {
            name: histogram::NAME,
            run: histogram::run,
        },
        Check {
            name: convolution::NAME,
            run: convolution::run,
        },
        Check {
            name: rotation::NAME,
            run: rotation::run,
        },
    ]
}

/// Входное изображение всех проверок с изображениями
pub const INPUT_IMAGE: &str = "input.bmp";

fn context_set() -> Result<ContextSet> {
    build_default_context_set().context("no gpu context")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn check_names_are_unique() {
        let checks = registry();
        let names: HashSet<_> = checks.iter().map(|check| check.name).collect();
        assert_eq!(names.len(), checks.len());
    }

    #[test]
    fn every_check_ships_a_kernel() {
        let config = HarnessConfig {
            resources: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources"),
            output_dir: std::env::temp_dir(),
        };
        for check in registry() {
            assert!(config.kernel_source(check.name).is_file(), "{}", check.name);
        }
        assert!(config.resource(INPUT_IMAGE).is_file());
    }
}
