//config
pub const CONFIG_ALREADY_INITIALIZED: &str = "Comments config already initialized";
pub const CONFIG_NOT_INITIALIZED: &str = "Comments config not initialized";
pub const CONFIG_READ_FAILED: &str = "Failed to read comments config";
pub const CONFIG_PARSE_FAILED: &str = "Failed to parse comments config";

//http
pub const HTTP_CLIENT_BUILD_FAILED: &str = "Failed to build HTTP client";
pub const COMMENTS_FETCH_FAILED: &str = "Failed to fetch comments by timeline";

//server
pub const LISTENER_BIND_FAILED: &str = "Failed to bind listener";
pub const SERVER_FAILED: &str = "Comments server error";
