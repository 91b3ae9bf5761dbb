use parking_lot::Mutex;
use std::ffi::{c_char, c_void, CStr};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Общая для всех контекстов блокировка: асинхронные отчеты драйвера
/// выводятся строго по одному
static ERROR_LOG: Mutex<()> = parking_lot::const_mutex(());
static REPORTED: AtomicUsize = AtomicUsize::new(0);

/// Callback ошибок контекста, регистрируется в clCreateContext
///
/// Драйвер может вызвать его из любого своего потока в течение всей жизни
/// контекста.
pub unsafe extern "C" fn context_notify(
    errinfo: *const c_char,
    _private_info: *const c_void,
    _cb: usize,
    _user_data: *mut c_void,
) {
    let message = if errinfo.is_null() {
        "<no error info>".into()
    } else {
        unsafe { CStr::from_ptr(errinfo) }.to_string_lossy()
    };

    let _guard = ERROR_LOG.lock();
    REPORTED.fetch_add(1, Ordering::SeqCst);
    log::error!("opencl error: {}", message);
}

/// Количество асинхронных отчетов об ошибках с начала работы процесса
pub fn reported_errors() -> usize {
    REPORTED.load(Ordering::SeqCst)
}
