pub(crate) const DEFAULT_USER_AGENT: &str = concat!("vidstress/", env!("CARGO_PKG_VERSION"));

/// Password used for provisioned accounts; satisfies the service's min length.
pub(crate) const DEFAULT_SIGNUP_PASSWORD: &str = "SecurePassword123!";

/// Default config filenames checked when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["vidstress.toml", "vidstress.json"];
