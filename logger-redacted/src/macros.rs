// Logging macros that scrub the formatted message before emitting it

#[macro_export]
macro_rules! redacted_warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!("{}", $crate::redact(&::std::format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! redacted_error {
    ($($arg:tt)*) => {
        $crate::tracing::error!("{}", $crate::redact(&::std::format!($($arg)*)))
    };
}
