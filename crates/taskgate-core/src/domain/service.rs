//! Service numbers and the resource keys they resolve to.
//!
//! # 命名規約
//! - 2001..=2004: fixed script names
//! - 2005: `MySQL_login_<user>.sh`, parameterized by the 5th request field

use std::fmt;

use crate::error::Rejection;

/// Identifier of the script a task runs; the unit of mutual exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The fixed service table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    UserSetup,
    DirPerms,
    SystemMonitor,
    FileAudit,
    MySqlLogin,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::UserSetup,
        Service::DirPerms,
        Service::SystemMonitor,
        Service::FileAudit,
        Service::MySqlLogin,
    ];

    pub fn from_number(number: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == number)
    }

    pub fn number(self) -> i32 {
        match self {
            Service::UserSetup => 2001,
            Service::DirPerms => 2002,
            Service::SystemMonitor => 2003,
            Service::FileAudit => 2004,
            Service::MySqlLogin => 2005,
        }
    }

    /// Build the resource key for this service.
    ///
    /// `extra` is only consulted for the parameterized service, where it must
    /// be a bare file-name fragment.
    pub fn resource_key(self, extra: Option<&str>) -> Result<ResourceKey, Rejection> {
        let name = match self {
            Service::UserSetup => "user_setup.sh",
            Service::DirPerms => "dir_perms.sh",
            Service::SystemMonitor => "system_monitor.sh",
            Service::FileAudit => "file_audit.sh",
            Service::MySqlLogin => {
                let user = extra.ok_or(Rejection::MissingUserName)?;
                if !is_safe_fragment(user) {
                    return Err(Rejection::InvalidUserName(user.to_string()));
                }
                return Ok(ResourceKey::new(format!("MySQL_login_{user}.sh")));
            }
        };
        Ok(ResourceKey::new(name))
    }
}

/// The suffix ends up in a path under the script directory, so it must not
/// be able to leave it.
fn is_safe_fragment(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '\\']) && !s.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2001, "user_setup.sh")]
    #[case(2002, "dir_perms.sh")]
    #[case(2003, "system_monitor.sh")]
    #[case(2004, "file_audit.sh")]
    fn fixed_services_resolve(#[case] number: i32, #[case] expected: &str) {
        let service = Service::from_number(number).unwrap();
        assert_eq!(service.resource_key(None).unwrap().as_str(), expected);
    }

    #[test]
    fn fixed_services_ignore_extra() {
        let key = Service::UserSetup.resource_key(Some("whatever")).unwrap();
        assert_eq!(key.as_str(), "user_setup.sh");
    }

    #[test]
    fn mysql_login_key_carries_the_user() {
        let service = Service::from_number(2005).unwrap();
        let key = service.resource_key(Some("alice")).unwrap();
        assert_eq!(key.as_str(), "MySQL_login_alice.sh");
    }

    #[test]
    fn mysql_login_without_user_is_rejected() {
        let err = Service::MySqlLogin.resource_key(None).unwrap_err();
        assert!(matches!(err, Rejection::MissingUserName));
    }

    #[rstest]
    #[case("../etc")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("")]
    fn mysql_login_rejects_path_like_users(#[case] user: &str) {
        let err = Service::MySqlLogin.resource_key(Some(user)).unwrap_err();
        assert!(matches!(err, Rejection::InvalidUserName(_)));
    }

    #[rstest]
    #[case(2000)]
    #[case(2006)]
    #[case(0)]
    #[case(-2001)]
    fn unknown_numbers_do_not_resolve(#[case] number: i32) {
        assert_eq!(Service::from_number(number), None);
    }
}
