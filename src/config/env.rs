use super::schema::Config;
use tracing::debug;

macro_rules! define_env_overrides {
    ($( $env:literal => $($path:ident).+ );* $(;)?) => {
        /// Every environment variable that can override a config field.
        pub const ENV_OVERRIDES: &[&str] = &[$($env),*];

        /// Apply overrides from `lookup`. Unset or empty values are ignored.
        pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
        where
            F: Fn(&str) -> Option<String>,
        {
            $(
                if let Some(val) = lookup($env)
                    && !val.is_empty()
                {
                    debug!("config override from {}", $env);
                    config.$($path).+ = val;
                }
            )*
        }
    };
}

define_env_overrides! {
    "SESSIONVAULT_BACKEND"     => session.backend;
    "SESSIONVAULT_STORAGE_DIR" => session.storage_dir;
    "SESSIONVAULT_TTL"         => session.ttl;
}

/// Apply `SESSIONVAULT_*` environment overrides, so a deployment can switch
/// backend or storage location without touching the config file.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}
