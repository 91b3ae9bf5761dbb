//! Полный путь: обнаружение -> контекст и очередь -> программа -> буферы ->
//! ядро -> чтение результата
//!
//! Тесты, которым нужен GPU, пропускаются, если устройств нет.

use opencl_kit::opencl::kernel::{
    enqueue_kernel, finish, read_buffer, read_image, set_arg, set_arg_local, set_arg_object, wait, write_buffer,
};
use opencl_kit::opencl::memory::create_buffer;
use opencl_kit::opencl::program::{build_log, build_program, create_kernel};
use opencl_kit::*;
use std::io::Write;

const VECTOR_ADD: &str = "__kernel void add(__global const int* a, __global const int* b, __global int* c)\n\
{\n\
    int i = get_global_id(0);\n\
    c[i] = a[i] + b[i];\n\
}";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context_set_or_skip() -> Option<ContextSet> {
    init_logging();
    if discover_all().is_empty() {
        eprintln!("no gpu device, skipping");
        return None;
    }
    build_default_context_set()
}

fn kernel_file(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".cl").tempfile().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn vector_add_matches_host_sum() {
    let Some(set) = context_set_or_skip() else { return };
    const N: usize = 2048;
    let a: Vec<i32> = (0..N as i32).map(|i| i * 3 - 1000).collect();
    let b: Vec<i32> = (0..N as i32).map(|i| 7 - i).collect();

    let flags = CL_MEM_READ_ONLY | CL_MEM_HOST_WRITE_ONLY;
    let device_a = create_buffer(&set.context, flags, N, Some(&a)).unwrap();
    let device_b = create_buffer(&set.context, flags, N, Some(&b)).unwrap();
    let device_c = create_buffer::<i32>(&set.context, CL_MEM_WRITE_ONLY, N, None).unwrap();

    let source = kernel_file(VECTOR_ADD);
    let program = build_program(&set.context, source.path()).unwrap();
    let kernel = create_kernel(&program, "add").unwrap();
    set_arg_object(&kernel, 0, &device_a).unwrap();
    set_arg_object(&kernel, 1, &device_b).unwrap();
    set_arg_object(&kernel, 2, &device_c).unwrap();

    let done = enqueue_kernel(&set.queue, &kernel, &[N], None, &[]).unwrap();
    let mut c = vec![0i32; N];
    read_buffer(&set.queue, &device_c, &mut c, &[&done]).unwrap();

    for i in 0..N {
        assert_eq!(c[i], a[i] + b[i], "index {}", i);
    }
}

#[test]
fn local_scratch_and_host_writes() {
    let Some(set) = context_set_or_skip() else { return };
    const N: usize = 256;
    const LOCAL: usize = 16;
    let source = kernel_file(
        "__kernel void scale(__global int* data, __local int* scratch, int factor)\n\
         {\n\
             int l = get_local_id(0);\n\
             scratch[l] = data[get_global_id(0)] * factor;\n\
             barrier(CLK_LOCAL_MEM_FENCE);\n\
             data[get_global_id(0)] = scratch[l];\n\
         }",
    );
    let program = build_program(&set.context, source.path()).unwrap();
    assert!(build_log(&program, set.device).is_some());
    let kernel = create_kernel(&program, "scale").unwrap();

    let data: Vec<i32> = (0..N as i32).collect();
    let device_data = create_buffer::<i32>(&set.context, CL_MEM_READ_WRITE, N, None).unwrap();
    write_buffer(&set.queue, &device_data, &data).unwrap();
    set_arg_object(&kernel, 0, &device_data).unwrap();
    set_arg_local(&kernel, 1, LOCAL * std::mem::size_of::<i32>()).unwrap();
    set_arg(&kernel, 2, &3i32).unwrap();

    let done = enqueue_kernel(&set.queue, &kernel, &[N], Some(&[LOCAL]), &[]).unwrap();
    wait(&[&done]).unwrap();
    finish(&set.queue).unwrap();

    let mut scaled = vec![0i32; N];
    read_buffer(&set.queue, &device_data, &mut scaled, &[]).unwrap();
    assert!(scaled.iter().zip(&data).all(|(got, x)| *got == x * 3));
}

#[test]
fn mismatched_local_size_is_rejected() {
    let Some(set) = context_set_or_skip() else { return };
    let source = kernel_file(VECTOR_ADD);
    let program = build_program(&set.context, source.path()).unwrap();
    let kernel = create_kernel(&program, "add").unwrap();
    assert!(enqueue_kernel(&set.queue, &kernel, &[64], Some(&[8, 8]), &[]).is_err());
}

#[test]
fn missing_program_source_gives_no_program() {
    let Some(set) = context_set_or_skip() else { return };
    assert!(build_program(&set.context, "/nonexistent/kernel.cl").is_none());
    // контекст остается рабочим
    assert!(create_buffer::<u8>(&set.context, CL_MEM_READ_WRITE, 16, None).is_some());
}

#[test]
fn broken_source_gives_no_program() {
    let Some(set) = context_set_or_skip() else { return };
    let source = kernel_file("__kernel void broken(__global int* a) { a[0] = ; }");
    assert!(build_program(&set.context, source.path()).is_none());
}

#[test]
fn unknown_kernel_name_gives_no_kernel() {
    let Some(set) = context_set_or_skip() else { return };
    let source = kernel_file(VECTOR_ADD);
    let program = build_program(&set.context, source.path()).unwrap();
    assert!(create_kernel(&program, "sub").is_none());
}

#[test]
fn image_survives_round_trip() {
    use opencl_kit::imaging::{load_input_image, to_float, to_rgba};

    let Some(set) = context_set_or_skip() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");
    ::image::RgbImage::from_fn(5, 3, |x, y| ::image::Rgb([x as u8 * 50, y as u8 * 100, 255]))
        .save(&path)
        .unwrap();

    let input = load_input_image(&set.context, CL_MEM_READ_ONLY, &path, &[to_rgba, to_float]).unwrap();
    assert_eq!(input.host.channels, 4);
    assert_eq!(input.host.depth, Depth::F32);

    let row_pitch = input.host.width * input.host.pixel_bytes();
    let mut bytes = vec![0u8; row_pitch * input.host.height];
    read_image(&set.queue, &input.memory, (5, 3), row_pitch, &mut bytes, &[]).unwrap();
    let pixels: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(pixels, input.host.samples::<f32>().unwrap());
}

#[test]
fn no_environment_means_no_context_set() {
    init_logging();
    if discover_all().is_empty() {
        assert!(build_default_context_set().is_none());
    }
}
