/// Name used for directories, cache keys and log output.
pub const APP_NAME: &str = "setup-sdl";

/// Separator placed between the entries of the canonical state string.
pub const STATE_DELIMITER: &str = "##";

/// Maximum number of releases requested from the release listing.
pub const RELEASE_LIST_LIMIT: u32 = 1000;

/// Base URL of the GitHub REST API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Ninja release installed by the `ninja` input.
pub const NINJA_VERSION: &str = "1.12.1";

/// Where ninja release archives are downloaded from.
pub const NINJA_RELEASES_URL: &str = "https://github.com/ninja-build/ninja/releases/download";
