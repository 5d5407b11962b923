//! Minimal cdylib fixture used by the assembly-loader integration tests
//! (`core/tests/assembly_loader.rs`, `#[ignore]`d by default — build this
//! crate first with `cargo build -p sample_module`).
//!
//! Exports the conventional module init symbol so `PluginManager` has a
//! real entry point to locate. The runtime never calls through it:
//! locating a language module's init entry point is as far as the core
//! goes (see DESIGN.md, "module init entry points are located, not
//! invoked").

use std::os::raw::c_char;

#[unsafe(no_mangle)]
pub extern "C" fn InitPlugifyLanguageModule() -> *const c_char {
    static NAME: &[u8] = b"sample_module\0";
    NAME.as_ptr() as *const c_char
}
