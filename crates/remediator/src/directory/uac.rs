//! Active Directory `userAccountControl` bit field.
//!
//! Only the bits this tool reads or writes get named constants; every other
//! bit is carried through untouched when the value is written back.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserAccountControl(u32);

impl UserAccountControl {
    pub const ACCOUNTDISABLE: u32 = 0x0002;
    pub const PASSWD_CANT_CHANGE: u32 = 0x0040;
    pub const NORMAL_ACCOUNT: u32 = 0x0200;
    pub const DONT_EXPIRE_PASSWORD: u32 = 0x1_0000;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn password_never_expires(self) -> bool {
        self.0 & Self::DONT_EXPIRE_PASSWORD != 0
    }

    pub fn cannot_change_password(self) -> bool {
        self.0 & Self::PASSWD_CANT_CHANGE != 0
    }

    pub fn is_disabled(self) -> bool {
        self.0 & Self::ACCOUNTDISABLE != 0
    }

    /// Clear both password-policy exemptions, keeping all other bits.
    #[must_use]
    pub fn with_password_policy_enforced(self) -> Self {
        Self(self.0 & !(Self::DONT_EXPIRE_PASSWORD | Self::PASSWD_CANT_CHANGE))
    }
}

impl Default for UserAccountControl {
    fn default() -> Self {
        Self(Self::NORMAL_ACCOUNT)
    }
}

impl From<u32> for UserAccountControl {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<UserAccountControl> for u32 {
    fn from(uac: UserAccountControl) -> Self {
        uac.0
    }
}

impl fmt::Display for UserAccountControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
