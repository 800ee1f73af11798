//! # libosdc
//!
//! Lossless compression codec and rasterizer for on-screen-display overlays.
//!
//! Canvases made of rectangles, thick lines and bitmaps are drawn straight
//! into the compressed bitstream consumed by the OSD compositor hardware, or
//! painted into raw pixel buffers. The library builds natively and as
//! WebAssembly, where [`OsdCompositor`] is the JavaScript entry point.

mod canvas;
mod cmpr;
mod compositor;
mod error;
mod utils;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global allocator.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize the WASM module. Call this once before using other functions.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

pub use canvas::*;
pub use cmpr::*;
pub use compositor::*;
pub use error::*;
