//! Conditional logging macros gated on a module-level `ENABLE_LOGS` const.
//!
//! The tick path can log once per second; modules on it define
//! `const ENABLE_LOGS: bool = ...` and use these instead of calling `log`
//! directly so the chatter can be switched off per module.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
