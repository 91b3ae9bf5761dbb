//! Гистограмма 8-битных отсчетов изображения с локальными атомиками

use super::{context_set, HarnessConfig, INPUT_IMAGE};
use anyhow::{bail, ensure, Context as _, Result};
use opencl_kit::imaging::{Depth, HostImage};
use opencl_kit::opencl::info::{max_compute_units, max_work_group_size, max_work_item_sizes};
use opencl_kit::opencl::kernel::{enqueue_kernel, fill_buffer, read_buffer, set_arg, set_arg_object};
use opencl_kit::opencl::memory::create_buffer;
use opencl_kit::opencl::program::{build_program, create_kernel};
use opencl_kit::opencl::types::*;

pub const NAME: &str = "histogram_4_2";

/// Должно совпадать с HIST_BINS в ядре
const BINS: usize = 256;

/// Потолок размера рабочей группы
const LOCAL_SIZE: usize = 64;

/// Глобальный и локальный размер: одна рабочая группа на вычислительный
/// блок, группа не больше `LOCAL_SIZE` и пределов устройства по первому
/// измерению
fn topology(units: usize, group_limit: usize, item_limits: &[usize]) -> Option<(usize, usize)> {
    let item_limit = item_limits.first().copied().unwrap_or(0);
    let local = group_limit.min(item_limit).min(LOCAL_SIZE);
    if units == 0 || local == 0 {
        return None;
    }
    Some((units * local, local))
}

/// Гистограмма на хосте; отсчеты всех каналов подряд
fn host_histogram(samples: &[u8]) -> Vec<i32> {
    let mut histogram = vec![0i32; BINS];
    for &sample in samples {
        histogram[sample as usize] += 1;
    }
    histogram
}

pub fn run(config: &HarnessConfig) -> Result<()> {
    let set = context_set()?;

    let image = HostImage::decode(config.resource(INPUT_IMAGE))?;
    ensure!(
        image.depth == Depth::U8,
        "input image must contain unsigned 8-bit samples, got {:?}",
        image.depth
    );
    let samples = image.samples::<u8>()?;

    let device_image = create_buffer(
        &set.context,
        CL_MEM_READ_ONLY | CL_MEM_HOST_WRITE_ONLY,
        samples.len(),
        Some(&samples),
    )
    .context("image buffer")?;
    let device_histogram =
        create_buffer::<i32>(&set.context, CL_MEM_WRITE_ONLY | CL_MEM_HOST_READ_ONLY, BINS, None)
            .context("histogram buffer")?;
    let cleared = fill_buffer(&set.queue, &device_histogram, &0i32, BINS)?;

    let program = build_program(&set.context, config.kernel_source(NAME)).context("program")?;
    let kernel = create_kernel(&program, NAME).context("kernel")?;
    set_arg_object(&kernel, 0, &device_image)?;
    set_arg(&kernel, 1, &(samples.len() as cl_int))?;
    set_arg_object(&kernel, 2, &device_histogram)?;

    let Some((global, local)) = topology(
        max_compute_units(set.device) as usize,
        max_work_group_size(set.device),
        &max_work_item_sizes(set.device),
    ) else {
        bail!("unable to determine work-items topology");
    };
    log::info!(
        "input image: {} samples, global size {}, local size {}",
        samples.len(),
        global,
        local
    );

    let done = enqueue_kernel(&set.queue, &kernel, &[global], Some(&[local]), &[&cleared])?;
    let mut histogram = vec![0i32; BINS];
    read_buffer(&set.queue, &device_histogram, &mut histogram, &[&done])?;

    let expected = host_histogram(&samples);
    for bin in 0..BINS {
        ensure!(
            histogram[bin] == expected[bin],
            "opencl histogram[{}] = {} != {} = host histogram[{}]",
            bin,
            histogram[bin],
            expected[bin],
            bin
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_respects_work_item_limit() {
        assert_eq!(topology(4, 256, &[1024, 1024, 64]), Some((4 * LOCAL_SIZE, LOCAL_SIZE)));
        assert_eq!(topology(4, 256, &[16, 16, 16]), Some((64, 16)));
        assert_eq!(topology(2, 32, &[1024]), Some((64, 32)));
    }

    #[test]
    fn topology_needs_every_limit() {
        assert_eq!(topology(0, 256, &[64]), None);
        assert_eq!(topology(4, 0, &[64]), None);
        assert_eq!(topology(4, 256, &[]), None);
    }

    #[test]
    fn host_histogram_counts_every_sample() {
        let histogram = host_histogram(&[0, 0, 255, 7]);
        assert_eq!(histogram.len(), BINS);
        assert_eq!(histogram[0], 2);
        assert_eq!(histogram[7], 1);
        assert_eq!(histogram[255], 1);
        assert_eq!(histogram.iter().sum::<i32>(), 4);
    }
}
