#[macro_export]
macro_rules! t_info {
    ($id:expr, $($arg:tt)*) => {
        log::info!("[{}] {}", $id, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! t_warn {
    ($id:expr, $($arg:tt)*) => {
        log::warn!("[{}] {}", $id, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! t_error {
    ($id:expr, $($arg:tt)*) => {
        log::error!("[{}] {}", $id, format!($($arg)*))
    };
}
