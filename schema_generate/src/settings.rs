//! Settings for Go code generation.

/// Package name used when none is configured.
pub const DEFAULT_PACKAGE_NAME: &str = "main";

/// Settings that control code generation behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSettings {
    /// Name in the emitted `package` clause.
    ///
    /// **Default: `main`.** Only the package clause depends on it; the
    /// generated types are the same for every package name.
    pub package_name: String,
}

impl GenerateSettings {
    #[must_use]
    pub fn with_package_name(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
        }
    }
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self::with_package_name(DEFAULT_PACKAGE_NAME)
    }
}
