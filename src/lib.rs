/// QR Pocket - Chrome extension for generating, reading and keeping QR codes
/// Built with Rust + WASM + Yew

pub mod background;
pub mod controller;
pub mod error;
pub mod history;
pub mod messages;
pub mod qr_content;
pub mod settings;
pub mod storage;
pub mod transfer;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the Yew app for the options page
#[wasm_bindgen]
pub fn start_options() {
    yew::Renderer::<ui::options::OptionsPage>::new().render();
}

// Register the service worker listeners
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}
