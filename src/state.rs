use serde::{Deserialize, Serialize};
use std::{env, fs::File, io::Read};

#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    pub bot_token: String,

    #[serde(default = "default_prefix")]
    pub command_prefix: String,
}

fn default_prefix() -> String {
    "!".to_string()
}

impl Config {
    const FILE_NAME: &str = "config.ron";
    const TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";

    /// config.ron if present, otherwise the token from the environment
    pub fn load() -> Option<Self> {
        Self::restore().or_else(Self::from_env)
    }

    pub fn restore() -> Option<Self> {
        File::open(Self::FILE_NAME)
            .ok()
            .and_then(|mut file| {
                let mut contents = String::new();
                file.read_to_string(&mut contents).map(|_| contents).ok()
            })
            .and_then(|content| ron::from_str(&content).ok())
    }

    fn from_env() -> Option<Self> {
        env::var(Self::TOKEN_VAR).ok().map(|bot_token| Self {
            bot_token,
            command_prefix: default_prefix(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_defaults_when_missing() {
        let config: Config = ron::from_str(r#"(bot_token: "abc")"#).unwrap();

        assert_eq!(config.bot_token, "abc");
        assert_eq!(config.command_prefix, "!");
    }

    #[test]
    fn prefix_can_be_overridden() {
        let config: Config =
            ron::from_str(r#"(bot_token: "abc", command_prefix: "~")"#).unwrap();

        assert_eq!(config.command_prefix, "~");
    }

    #[test]
    fn env_token_provides_a_fallback_config() {
        env::set_var(Config::TOKEN_VAR, "env-token");

        // No config.ron ships with the crate, so load falls through to
        // the environment
        let config = Config::load().unwrap();
        assert_eq!(config.bot_token, "env-token");
        assert_eq!(config.command_prefix, "!");

        env::remove_var(Config::TOKEN_VAR);
        assert!(Config::from_env().is_none());
    }

    #[test]
    fn round_trips_through_ron() {
        let config = Config {
            bot_token: "token".to_string(),
            command_prefix: "!".to_string(),
        };

        let restored: Config = ron::from_str(&ron::to_string(&config).unwrap()).unwrap();
        assert_eq!(restored.bot_token, config.bot_token);
        assert_eq!(restored.command_prefix, config.command_prefix);
    }
}
