//! Generates the foreign bindings for the `smartkey` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
