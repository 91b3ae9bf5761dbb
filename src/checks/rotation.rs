//! Поворот изображения вокруг центра

use super::{context_set, HarnessConfig, INPUT_IMAGE};
use anyhow::{bail, Context as _, Result};
use opencl_kit::imaging::{create_output_image, load_input_image, to_float, to_rgba};
use opencl_kit::opencl::kernel::{enqueue_kernel, read_image, set_arg, set_arg_object};
use opencl_kit::opencl::program::{build_program, create_kernel};
use opencl_kit::opencl::types::*;

pub const NAME: &str = "image_rotation_4_5";

/// Поворот на 180 градусов: точный для целых координат
const SIN_THETA: f32 = 0.0;
const COS_THETA: f32 = -1.0;

/// Поворот RGBA на 180 градусов на хосте
fn host_half_turn(pixels: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut output = vec![0.0f32; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let source = ((height - 1 - y) * width + (width - 1 - x)) * 4;
            output[(y * width + x) * 4..][..4].copy_from_slice(&pixels[source..source + 4]);
        }
    }
    output
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

    let program = build_program(&set.context, config.kernel_source(NAME)).context("program")?;
    let kernel = create_kernel(&program, NAME).context("kernel")?;
    set_arg_object(&kernel, 0, &input.memory)?;
    set_arg_object(&kernel, 1, &output)?;
    set_arg(&kernel, 2, &(host.width as cl_int))?;
    set_arg(&kernel, 3, &(host.height as cl_int))?;
    set_arg(&kernel, 4, &SIN_THETA)?;
    set_arg(&kernel, 5, &COS_THETA)?;

    let done = enqueue_kernel(&set.queue, &kernel, &[host.width, host.height], None, &[])?;
    let row_pitch = host.width * host.pixel_bytes();
    let mut bytes = vec![0u8; row_pitch * host.height];
    read_image(&set.queue, &output, (host.width, host.height), row_pitch, &mut bytes, &[&done])?;
    let rotated: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);

    let expected = host_half_turn(&host.samples::<f32>()?, host.width, host.height);
    if let Some(index) = rotated.iter().zip(&expected).position(|(got, want)| got != want) {
        bail!("rotated pixel {} differs from host rotation", index / 4);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_turn_reverses_pixel_order() {
        let pixels: Vec<f32> = (0..6).flat_map(|i| [i as f32; 4]).collect();
        let rotated = host_half_turn(&pixels, 3, 2);
        let firsts: Vec<f32> = rotated.chunks(4).map(|pixel| pixel[0]).collect();
        assert_eq!(firsts, vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }
}
