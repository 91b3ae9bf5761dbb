//! Поэлементное сложение двух векторов int на устройстве

use super::{context_set, HarnessConfig};
use anyhow::{ensure, Context as _, Result};
use opencl_kit::opencl::kernel::{enqueue_kernel, read_buffer, set_arg_object};
use opencl_kit::opencl::memory::create_buffer;
use opencl_kit::opencl::program::{build_program, create_kernel};
use opencl_kit::opencl::types::*;
use rand::Rng;

pub const NAME: &str = "vector_add_3_4";

/// Элементов в каждом векторе
const ELEMENTS: usize = 2048;

pub fn run(config: &HarnessConfig) -> Result<()> {
    let set = context_set()?;

    let mut rng = rand::thread_rng();
    let a: Vec<i32> = (0..ELEMENTS).map(|_| rng.gen()).collect();
    let b: Vec<i32> = (0..ELEMENTS).map(|_| rng.gen()).collect();

    let input = CL_MEM_READ_ONLY | CL_MEM_HOST_WRITE_ONLY;
    let device_a = create_buffer(&set.context, input, ELEMENTS, Some(&a)).context("buffer A")?;
    let device_b = create_buffer(&set.context, input, ELEMENTS, Some(&b)).context("buffer B")?;
    let device_c = create_buffer::<i32>(&set.context, CL_MEM_WRITE_ONLY | CL_MEM_HOST_READ_ONLY, ELEMENTS, None)
        .context("buffer C")?;

    let program = build_program(&set.context, config.kernel_source(NAME)).context("program")?;
    let kernel = create_kernel(&program, NAME).context("kernel")?;
    set_arg_object(&kernel, 0, &device_a)?;
    set_arg_object(&kernel, 1, &device_b)?;
    set_arg_object(&kernel, 2, &device_c)?;

    // work-item = индекс элемента
    let done = enqueue_kernel(&set.queue, &kernel, &[ELEMENTS], None, &[])?;
    let mut c = vec![0i32; ELEMENTS];
    read_buffer(&set.queue, &device_c, &mut c, &[&done])?;

    for i in 0..ELEMENTS {
        let expected = a[i].wrapping_add(b[i]);
        ensure!(
            c[i] == expected,
            "c[{}] = {} != {} = {} + {}",
            i,
            c[i],
            expected,
            a[i],
            b[i]
        );
    }
    Ok(())
}
