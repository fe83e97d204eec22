fn main() {
    // The headless policy core builds without the Tauri context.
    if std::env::var_os("CARGO_FEATURE_DESKTOP").is_some() {
        tauri_build::build()
    }
}
