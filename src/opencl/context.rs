//! Контекст и очередь команд
//!
//! Выбор устройства вынесен в `DeviceSelector`; по умолчанию берется первое
//! устройство первой найденной платформы.

use super::bindings::{api, OpenCl};
use super::callbacks::context_notify;
use super::discovery::{discover_all, DeviceId, PlatformDevices, PlatformId};
use super::resource::{native, Managed, Shared};
use super::types::*;
use crate::cl_create;
use anyhow::{Context as _, Result};
use std::ptr;

/// Контекст и очередь команд для одного выбранного устройства
///
/// Очередь объявлена раньше контекста и освобождается первой.
#[derive(Debug, Clone)]
pub struct ContextSet {
    pub queue: Shared<cl_command_queue>,
    pub context: Shared<cl_context>,
    pub platform: PlatformId,
    pub device: DeviceId,
}

/// Стратегия выбора устройства по карте обнаружения
pub trait DeviceSelector {
    fn select(&self, platform_devices: &PlatformDevices) -> Option<(PlatformId, DeviceId)>;
}

/// Первая платформа карты, первое устройство в ней
///
/// Порядок обхода карты между запусками не гарантирован.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstDevice;

impl DeviceSelector for FirstDevice {
    fn select(&self, platform_devices: &PlatformDevices) -> Option<(PlatformId, DeviceId)> {
        let (platform, devices) = platform_devices.iter().next()?;
        devices.first().map(|device| (*platform, *device))
    }
}

fn create_context(api: &OpenCl, platform: PlatformId, devices: &[DeviceId]) -> Result<Shared<cl_context>> {
    // список свойств завершается нулем
    let properties: [cl_context_properties; 3] =
        [CL_CONTEXT_PLATFORM, platform.0 as cl_context_properties, 0];
    let raw_devices: Vec<cl_device_id> = devices.iter().map(|device| device.0).collect();

    let context = cl_create!(api.clCreateContext(
        properties.as_ptr(),
        raw_devices.len() as cl_uint,
        raw_devices.as_ptr(),
        // ошибки при создании и во время жизни контекста
        Some(context_notify),
        ptr::null_mut()
    ))?;
    Managed::wrap(context, native(api.clReleaseContext)).context("null context")
}

fn create_queue(api: &OpenCl, device: DeviceId, context: &Managed<cl_context>) -> Result<Shared<cl_command_queue>> {
    // in-order очередь без профилирования
    let queue = cl_create!(api.clCreateCommandQueue(context.raw(), device.0, 0))?;
    Managed::wrap(queue, native(api.clReleaseCommandQueue)).context("null command queue")
}

/// Контекст для платформы и списка устройств; `None` при ошибке драйвера
pub fn build_context(platform: PlatformId, devices: &[DeviceId]) -> Option<Shared<cl_context>> {
    match api().and_then(|api| create_context(api, platform, devices)) {
        Ok(context) => Some(context),
        Err(e) => {
            log::error!("error creating gpu device context: {:#}", e);
            None
        }
    }
}

/// Очередь команд для устройства в контексте; `None` при ошибке драйвера
pub fn build_queue(device: DeviceId, context: &Managed<cl_context>) -> Option<Shared<cl_command_queue>> {
    match api().and_then(|api| create_queue(api, device, context)) {
        Ok(queue) => Some(queue),
        Err(e) => {
            log::error!("error creating gpu device cmd queue: {:#}", e);
            None
        }
    }
}

/// Контекст и очередь для устройства, выбранного стратегией из карты
pub fn context_set_from<S: DeviceSelector + ?Sized>(
    platform_devices: &PlatformDevices,
    selector: &S,
) -> Option<ContextSet> {
    if platform_devices.is_empty() {
        log::error!("no gpu device found");
        return None;
    }
    let Some((platform, device)) = selector.select(platform_devices) else {
        log::error!("device selector declined all {} platform(s)", platform_devices.len());
        return None;
    };

    let context = build_context(platform, &[device])?;
    let queue = build_queue(device, &context)?;
    Some(ContextSet {
        queue,
        context,
        platform,
        device,
    })
}

/// Обнаружение + выбор устройства стратегией + контекст и очередь
pub fn build_context_set_with<S: DeviceSelector + ?Sized>(selector: &S) -> Option<ContextSet> {
    context_set_from(&discover_all(), selector)
}

/// Контекст и очередь для первого найденного GPU устройства
pub fn build_default_context_set() -> Option<ContextSet> {
    build_context_set_with(&FirstDevice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opencl::discovery::{discover_with, tests::FakeSource};

    struct Nobody;

    impl DeviceSelector for Nobody {
        fn select(&self, _: &PlatformDevices) -> Option<(PlatformId, DeviceId)> {
            None
        }
    }

    #[test]
    fn first_device_takes_head_of_list() {
        let map = discover_with(&FakeSource(vec![(5, 3)]));
        let (platform, device) = FirstDevice.select(&map).unwrap();
        assert_eq!(platform, PlatformId(5 as cl_platform_id));
        assert_eq!(device, DeviceId(501 as cl_device_id));
    }

    #[test]
    fn first_device_belongs_to_selected_platform() {
        let map = discover_with(&FakeSource(vec![(1, 2), (2, 0), (3, 4)]));
        let (platform, device) = FirstDevice.select(&map).unwrap();
        assert_eq!(map[&platform][0], device);
    }

    #[test]
    fn empty_environment_gives_no_context_set() {
        assert!(context_set_from(&PlatformDevices::new(), &FirstDevice).is_none());
    }

    #[test]
    fn declining_selector_gives_no_context_set() {
        let map = discover_with(&FakeSource(vec![(1, 1)]));
        assert!(context_set_from(&map, &Nobody).is_none());
    }

    #[test]
    fn default_set_is_bound_to_one_discovered_device() {
        let map = discover_all();
        match build_default_context_set() {
            Some(set) => {
                assert!(map.values().flatten().any(|device| *device == set.device));
                assert_eq!(crate::opencl::info::context_devices(&set.context), vec![set.device]);
            }
            None => log::info!("no usable gpu device, skipping"),
        }
    }
}
