#![forbid(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod escape;
pub mod lint;
pub mod printf;
pub mod spec;
pub mod sprintf;
pub mod template;
pub mod value;

pub use printf::Error;
pub use sprintf::{Options, Sprintf};
pub use value::Value;

#[cfg(test)]
pub mod tests {
    static INIT: std::sync::Once = std::sync::Once::new();

    /// Initialize test
    ///
    /// This ensures `color_eyre` is setup once.
    pub(crate) fn init() {
        INIT.call_once(|| {
            color_eyre::install().ok();
        });
    }
}
