//! Размытие Гаусса 5x5 над RGBA float изображением

use super::{context_set, HarnessConfig, INPUT_IMAGE};
use anyhow::{ensure, Context as _, Result};
use opencl_kit::imaging::{create_output_image, load_input_image, to_float, to_rgba};
use opencl_kit::opencl::kernel::{enqueue_kernel, read_image, set_arg, set_arg_object};
use opencl_kit::opencl::memory::{create_buffer, create_sampler};
use opencl_kit::opencl::program::{build_program, create_kernel};
use opencl_kit::opencl::types::*;

pub const NAME: &str = "image_convolution_4_8";

const FILTER_WIDTH: usize = 5;
const FILTER_FACTOR: f32 = 273.0;
#[rustfmt::skip]
const GAUSSIAN_BLUR: [f32; FILTER_WIDTH * FILTER_WIDTH] = [
    1.0,  4.0,  7.0,  4.0, 1.0,
    4.0, 16.0, 26.0, 16.0, 4.0,
    7.0, 26.0, 41.0, 26.0, 7.0,
    4.0, 16.0, 26.0, 16.0, 4.0,
    1.0,  4.0,  7.0,  4.0, 1.0,
];

const TOLERANCE: f32 = 1e-4;

fn normalized_filter() -> Vec<f32> {
    GAUSSIAN_BLUR.iter().map(|weight| weight / FILTER_FACTOR).collect()
}

/// Свертка RGBA на хосте с прижатием координат к краю
fn host_convolution(pixels: &[f32], width: usize, height: usize, filter: &[f32], filter_width: usize) -> Vec<f32> {
    let radius = (filter_width / 2) as isize;
    let clamp = |value: isize, size: usize| value.clamp(0, size as isize - 1) as usize;
    let mut output = vec![0.0f32; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = [0.0f32; 4];
            let mut index = 0;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sx = clamp(x as isize + dx, width);
                    let sy = clamp(y as isize + dy, height);
                    let pixel = &pixels[(sy * width + sx) * 4..][..4];
                    for (channel, value) in sum.iter_mut().enumerate() {
                        *value += filter[index] * pixel[channel];
                    }
                    index += 1;
                }
            }
            output[(y * width + x) * 4..][..4].copy_from_slice(&sum);
        }
    }
    output
}

fn save_rgba(pixels: &[f32], width: usize, height: usize, path: &std::path::Path) -> Result<()> {
    let bytes: Vec<u8> = pixels
        .iter()
        .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let image = ::image::RgbaImage::from_raw(width as u32, height as u32, bytes).context("output image size")?;
    image
        .save(path)
        .with_context(|| format!("error saving filtered image to {}", path.display()))
}

pub fn run(config: &HarnessConfig) -> Result<()> {
    let set = context_set()?;

    // ядро ожидает RGBA float
    let input = load_input_image(
        &set.context,
        CL_MEM_READ_ONLY | CL_MEM_HOST_WRITE_ONLY,
        config.resource(INPUT_IMAGE),
        &[to_rgba, to_float],
    )
    .context("input image")?;
    let host = &input.host;
    let output = create_output_image(&set.context, CL_MEM_WRITE_ONLY | CL_MEM_HOST_READ_ONLY, host)
        .context("output image")?;

    let filter = normalized_filter();
    let device_filter = create_buffer(
        &set.context,
        CL_MEM_READ_ONLY | CL_MEM_HOST_WRITE_ONLY,
        filter.len(),
        Some(&filter),
    )
    .context("filter buffer")?;
    // за границы исходного изображения не выходим
    let sampler = create_sampler(&set.context, CL_ADDRESS_CLAMP_TO_EDGE, CL_FILTER_NEAREST).context("sampler")?;

    let program = build_program(&set.context, config.kernel_source(NAME)).context("program")?;
    let kernel = create_kernel(&program, NAME).context("kernel")?;
    set_arg(&kernel, 0, &(host.width as cl_int))?;
    set_arg(&kernel, 1, &(host.height as cl_int))?;
    set_arg_object(&kernel, 2, &input.memory)?;
    set_arg_object(&kernel, 3, &output)?;
    set_arg_object(&kernel, 4, &device_filter)?;
    set_arg(&kernel, 5, &(FILTER_WIDTH as cl_int))?;
    set_arg_object(&kernel, 6, &sampler)?;

    // work-item = пиксель
    let done = enqueue_kernel(&set.queue, &kernel, &[host.width, host.height], None, &[])?;
    let row_pitch = host.width * host.pixel_bytes();
    let mut bytes = vec![0u8; row_pitch * host.height];
    read_image(&set.queue, &output, (host.width, host.height), row_pitch, &mut bytes, &[&done])?;
    let filtered: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);

    let expected = host_convolution(&host.samples::<f32>()?, host.width, host.height, &filter, FILTER_WIDTH);
    for (i, (got, want)) in filtered.iter().zip(&expected).enumerate() {
        ensure!(
            (got - want).abs() <= TOLERANCE,
            "pixel {} channel {}: opencl {} != {} host",
            i / 4,
            i % 4,
            got,
            want
        );
    }

    let path = config.output_dir.join(format!("{}.png", NAME));
    save_rgba(&filtered, host.width, host.height, &path)?;
    println!("filtered image saved in {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_weights_sum_to_one() {
        let sum: f32 = normalized_filter().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn flat_image_stays_flat() {
        let pixels: Vec<f32> = [0.25f32, 0.5, 0.75, 1.0].repeat(3 * 2);
        let blurred = host_convolution(&pixels, 3, 2, &normalized_filter(), FILTER_WIDTH);
        for (got, want) in blurred.iter().zip(&pixels) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn edges_are_clamped() {
        // одиночный пиксель: все выборки прижаты к нему
        let blurred = host_convolution(&[1.0, 0.0, 0.0, 1.0], 1, 1, &normalized_filter(), FILTER_WIDTH);
        assert!((blurred[0] - 1.0).abs() < 1e-6);
        assert!(blurred[1].abs() < 1e-6);
    }
}
