use rhtp_core::DeviceConfig;

/// Node configuration baked in at build time from `.env` by `build.rs`.
pub fn device_config() -> DeviceConfig {
    DeviceConfig::from_env_values(
        option_env!("RHTP_DEVICE_ADDRESS"),
        option_env!("RHTP_LOCAL_ECHO"),
    )
}
