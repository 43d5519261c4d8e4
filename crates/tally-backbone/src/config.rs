use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::Args;

#[derive(Deserialize, Debug)]
pub(crate) struct ApplicationConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logger: LoggerSection,
    pub cors: Option<CorsConfig>,
    pub bootstrap: BootstrapConfig,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub auth: DatabaseAuthConfig,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseAuthConfig {
    pub username: String,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoggerSection {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self { format: LogFormat::default(), level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum CorsConfig {
    AllowAll,
    AllowList(Vec<String>),
}

#[derive(Deserialize, Debug, Clone)]
pub struct BootstrapConfig {
    pub team_name: String,
    pub admin_name: String,
    pub admin_password: String,
}

pub(super) fn load_config(args: Args) -> anyhow::Result<ApplicationConfig> {
    let config_file_path = if let Some(path_override) = args.config {
        path_override
    } else {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("tally")?;

        let user_config_dir = xdg_dirs.get_config_home();
        if !user_config_dir.exists() {
            std::fs::create_dir_all(&user_config_dir)?;
        }

        let config_file_path = user_config_dir.join("backbone_config.toml");

        if !config_file_path.exists() {
            write_default_config_file(&config_file_path)?;
        }

        config_file_path
    };

    let config: ApplicationConfig = Config::builder()
        .set_default("port", 8080)?
        .add_source(File::from(config_file_path).format(FileFormat::Toml))
        .set_override_option("port", args.port)?
        .set_override_option("database.host", args.database_host)?
        .set_override_option("database.port", args.database_port)?
        .set_override_option("database.database_name", args.database_name)?
        .set_override_option("database.auth.username", args.database_username)?
        .set_override_option("database.auth.password", args.database_password)?
        .build()?
        .try_deserialize()?;

    Ok(config)
}

fn write_default_config_file(path: &Path) -> anyhow::Result<()> {
    let default_config_content = include_str!("../static/default_config.toml");
    std::fs::write(path, default_config_content)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::{load_config, CorsConfig, LogFormat};
    use crate::Args;

    fn args_with_config(path: std::path::PathBuf) -> Args {
        Args {
            config: Some(path),
            port: None,
            database_host: None,
            database_port: None,
            database_name: None,
            database_username: None,
            database_password: None,
        }
    }

    fn write_temp_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("tally-{name}-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).expect("creating temp config should be successful");
        file.write_all(content.as_bytes()).expect("writing temp config should be successful");
        path
    }

    #[test]
    fn when_loading_default_config_then_every_section_is_deserialized() {
        let path = write_temp_config("default", include_str!("../static/default_config.toml"));

        let config = load_config(args_with_config(path)).expect("loading config should be successful");

        assert_eq!(config.port, 8080);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.logger.format, LogFormat::Json);
        assert_eq!(config.bootstrap.admin_name, "admin");
        assert!(config.cors.is_none());
    }

    #[test]
    fn when_arguments_are_given_then_they_override_the_file() {
        let path = write_temp_config(
            "override",
            r#"
            [database]
            host = "db"
            port = 5432
            database_name = "tally"

            [database.auth]
            username = "tally"

            [cors]
            allow_list = ["https://*.example.com"]

            [bootstrap]
            team_name = "admin"
            admin_name = "admin"
            admin_password = "admin"
            "#,
        );
        let mut args = args_with_config(path);
        args.port = Some(9000);
        args.database_host = Some("override-host".to_owned());

        let config = load_config(args).expect("loading config should be successful");

        assert_eq!(config.port, 9000);
        assert_eq!(config.database.host, "override-host");
        assert_eq!(config.database.auth.password, None);
        assert_eq!(config.logger.level, "info");
        assert!(matches!(config.cors, Some(CorsConfig::AllowList(origins)) if origins.len() == 1));
    }
}
