pub mod api;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod router;
pub mod session;
pub mod store;

mod app;
mod components;
mod pages;
mod state;

pub use app::App;

use config::AppConfig;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_missing_window_env_gives_defaults() {
        let config = AppConfig::from_window();
        assert_eq!(config.graphql_path, "/graphql");
    }

    #[wasm_bindgen_test]
    fn test_logging_init_twice_is_harmless() {
        logging::init("debug");
        logging::init("info");
        tracing::info!("console writer is installed");
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    let config = AppConfig::from_window();
    logging::init(&config.log_filter);
    tracing::info!(api_url = %config.api_url, "starting management app");
    mount_to_body(move || view! { <App config=config /> });
}
