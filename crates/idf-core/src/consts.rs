pub const DOT_IDF_SETTINGS_CONFIG: &str = "./.idf/configs/Settings.toml";
pub const DOT_IDF_ENVIRONMENT_CONFIG: &str = "./.idf/configs/Environment.toml";

/// Environment variable pointing at the ESP-IDF installation.
pub const IDF_PATH: &str = "IDF_PATH";

/// Version name that selects a repository checkout instead of a release archive.
pub const MASTER_VERSION: &str = "master";

pub const ESP_IDF_REPOSITORY: &str = "https://github.com/espressif/esp-idf.git";
/// Directory name of a repository checkout with respect to the destination directory.
pub const ESP_IDF_CHECKOUT_DIR: &str = "esp-idf";

pub const IDF_VERSIONS_URL: &str = "https://dl.espressif.com/dl/esp-idf/idf_versions.txt";
/// Release archive location. `{version}` is replaced with the version name.
pub const IDF_RELEASE_URL: &str = "https://github.com/espressif/esp-idf/releases/download/{version}/esp-idf-{version}.zip";

pub const DOWNLOAD_BUFFER_SIZE: usize = 4096;

pub const INSTALL_TOOLS_COMMAND: &str = "install-tools";

pub const IDF_INSTALLER_VERSION: &str = "0.1.0";
pub const IDF_INSTALLER_NAME: &str = "idf-installer";
