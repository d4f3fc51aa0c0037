// Runtime config falls back to these when the app launches without an environment.
const BAKED_ENV: &[&str] = &[
    "QUOTEPAD_PUSH_PROJECT_ID",
    "QUOTEPAD_APP_ID",
    "QUOTEPAD_PUSH_SERVICE_URL",
    "QUOTEPAD_BACKEND_URL",
    "QUOTEPAD_BACKEND_ANON_KEY",
    "QUOTEPAD_PUSH_CHANNEL_ID",
    "QUOTEPAD_PUSH_DISABLED",
];

fn main() {
    for key in BAKED_ENV {
        println!("cargo:rerun-if-env-changed={}", key);
    }
    tauri_build::build();
}
