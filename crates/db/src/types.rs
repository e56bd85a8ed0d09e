use webextract_core::Credentials;

/// Input for registering a host and its log directories.
#[derive(Debug, Clone, Default)]
pub struct NewTarget {
    pub host: String,
    pub username: String,
    pub credentials: Credentials,
    pub directories: Vec<String>,
}
