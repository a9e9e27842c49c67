use std::time::Duration;

// canonical environment variables
pub const SCW_ACCESS_KEY: &str = "SCW_ACCESS_KEY";
pub const SCW_SECRET_KEY: &str = "SCW_SECRET_KEY";
pub const SCW_DEFAULT_PROJECT_ID: &str = "SCW_DEFAULT_PROJECT_ID";
pub const SCW_DEFAULT_REGION: &str = "SCW_DEFAULT_REGION";
pub const SCW_DEFAULT_ZONE: &str = "SCW_DEFAULT_ZONE";
pub const SCW_API_URL: &str = "SCW_API_URL";
pub const SCW_CONFIG_PATH: &str = "SCW_CONFIG_PATH";
pub const SCW_PROFILE: &str = "SCW_PROFILE";

// deprecated environment variables, still honored
pub const SCW_TOKEN: &str = "SCW_TOKEN";
pub const SCW_ORGANIZATION: &str = "SCW_ORGANIZATION";
pub const SCW_REGION: &str = "SCW_REGION";

/// Must be set to the configured project id for sweepers to run.
pub const SCW_SWEEP_TEST_ACCOUNT: &str = "SCW_SWEEP_TEST_ACCOUNT";

pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

pub const DEFAULT_WAIT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Names of test leftovers a sweeper is allowed to delete.
pub const SWEEPABLE_NAME_PREFIXES: &[&str] = &["tf-test-", "test-"];
