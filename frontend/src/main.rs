//! Entry point for the WASM application

pub fn main() {
    hems_frontend::start();
}
