//! Exports the node configuration from `.env` (or the build environment) as
//! compile-time environment variables read by `app_state::node_config`.

const CONFIG_KEYS: [&str; 2] = ["RHTP_DEVICE_ADDRESS", "RHTP_LOCAL_ECHO"];

fn main() {
    println!("cargo:rerun-if-changed=.env");

    // A missing .env is fine: the defaults in DeviceConfig apply.
    let _ = dotenvy::dotenv();

    for key in CONFIG_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
