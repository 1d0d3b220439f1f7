//! Storage key constants.

/// Keys of the persisted session record.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Serialized user (JSON)
    pub const USER: &'static str = "user";

    /// Every session key, access token first.
    pub const SESSION_KEYS: [&'static str; 3] = [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::USER];
}
