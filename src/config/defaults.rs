//! Default configuration values

/// File name of the project descriptor at the project root
pub const PROJECT_FILE: &str = "omniforge.toml";

/// Directory holding component descriptors, relative to the project root
pub const COMPONENTS_DIR: &str = "components";

/// Directory holding patch files, relative to the components directory
pub const PATCHES_DIR: &str = "patches";

/// Directory holding template files, relative to the components directory
pub const TEMPLATES_DIR: &str = "templates";

/// Working tree for component sources, relative to the project root
pub const BUILD_SRC_DIR: &str = "build/src";

/// Pristine copies of fetched sources, relative to the project root
pub const BUILD_PRISTINE_DIR: &str = "build/pristine";

/// Build report written after every run, relative to the project root
pub const BUILD_REPORT_FILE: &str = "build/report.json";

/// Version manifest file name, written into the install root after a
/// fully successful run
pub const VERSION_MANIFEST_FILE: &str = "version-manifest.json";

/// Directories created under the install root before the first build
pub const INSTALL_SKELETON: [&str; 2] = ["bin", "embedded"];

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// External tool used to apply patch files
pub const PATCH_TOOL: &str = "patch";

/// Base version used when no version environment is set
pub const FALLBACK_BUILD_VERSION: &str = "1.0.0";

/// Iteration paired with the fallback build version
pub const FALLBACK_BUILD_ITERATION: u32 = 1;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
