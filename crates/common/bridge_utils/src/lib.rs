pub mod fs;
pub mod signals;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "fs-notify")]
pub mod notify;
