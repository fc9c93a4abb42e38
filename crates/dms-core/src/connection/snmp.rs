// ── SNMP connections ──
//
// SNMPv1 and SNMPv2 share one shape (communities over UDP). SNMPv3 swaps the
// communities for a user-based security configuration, or a reference to a
// credential-library entry.

use std::fmt;

use dms_api::messages::{ElementPortInfo, SnmpV3PortInfo};
use secrecy::{ExposeSecret, SecretString};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::DmsError;
use crate::tracked::assign;

use super::ip::IpSettings;
use super::{PortField, PortWriteContext};

pub const DEFAULT_SNMP_PORT: u16 = 161;
pub const DEFAULT_GET_COMMUNITY: &str = "public";
pub const DEFAULT_SET_COMMUNITY: &str = "private";

// ── Communities (v1 / v2) ───────────────────────────────────────────

/// Community-based SNMP connection (SNMPv1 or SNMPv2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpCommunityConnection {
    ip: IpSettings,
    get_community: String,
    set_community: String,
}

impl SnmpCommunityConnection {
    /// New connection polling `polling_ip` on UDP port 161 with the
    /// default communities.
    pub fn new(polling_ip: &str) -> Result<Self, DmsError> {
        Ok(Self {
            ip: IpSettings::new(polling_ip, Some(DEFAULT_SNMP_PORT))?,
            get_community: DEFAULT_GET_COMMUNITY.into(),
            set_community: DEFAULT_SET_COMMUNITY.into(),
        })
    }

    pub(crate) fn from_port(info: &ElementPortInfo) -> Self {
        Self {
            ip: IpSettings::from_port(info),
            get_community: info.get_community.clone(),
            set_community: info.set_community.clone(),
        }
    }

    pub fn ip(&self) -> &IpSettings {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpSettings {
        &mut self.ip
    }

    pub fn get_community(&self) -> &str {
        &self.get_community
    }

    pub fn set_community(&self) -> &str {
        &self.set_community
    }

    pub fn set_get_community(&mut self, community: impl Into<String>) {
        assign(
            &mut self.get_community,
            community.into(),
            &mut self.ip.changes,
            PortField::GetCommunity,
        );
    }

    pub fn set_set_community(&mut self, community: impl Into<String>) {
        assign(
            &mut self.set_community,
            community.into(),
            &mut self.ip.changes,
            PortField::SetCommunity,
        );
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.ip.changes.any()
    }

    pub(crate) fn write_changed(&self, info: &mut ElementPortInfo) {
        self.ip.write_changed(info);
        if self.ip.changes.contains(&PortField::GetCommunity) {
            info.get_community = self.get_community.clone();
        }
        if self.ip.changes.contains(&PortField::SetCommunity) {
            info.set_community = self.set_community.clone();
        }
    }

    pub(crate) fn write_all(&self, info: &mut ElementPortInfo) {
        self.ip.write_all(info);
        info.get_community = self.get_community.clone();
        info.set_community = self.set_community.clone();
    }
}

// ── SNMPv3 security ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SnmpV3SecurityLevel {
    #[strum(serialize = "noAuthNoPriv")]
    NoAuthNoPriv,
    #[strum(serialize = "authNoPriv")]
    AuthNoPriv,
    #[strum(serialize = "authPriv")]
    AuthPriv,
}

/// Authentication algorithm of an SNMPv3 user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SnmpV3AuthAlgorithm {
    #[strum(serialize = "md5")]
    Md5,
    #[strum(to_string = "sha1", serialize = "sha")]
    Sha1,
    #[strum(serialize = "sha224")]
    Sha224,
    #[strum(serialize = "sha256")]
    Sha256,
    #[strum(serialize = "sha384")]
    Sha384,
    #[strum(serialize = "sha512")]
    Sha512,
}

/// Privacy (encryption) algorithm of an SNMPv3 user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SnmpV3EncryptionAlgorithm {
    #[strum(serialize = "des")]
    Des,
    #[strum(to_string = "aes128", serialize = "aes")]
    Aes128,
    #[strum(serialize = "aes192")]
    Aes192,
    #[strum(serialize = "aes256")]
    Aes256,
}

fn secret_eq(a: &SecretString, b: &SecretString) -> bool {
    a.expose_secret() == b.expose_secret()
}

/// User-based SNMPv3 security: user name, optional authentication and
/// optional privacy. Privacy requires authentication.
#[derive(Clone)]
pub struct SnmpV3SecurityConfig {
    username: String,
    auth: Option<(SnmpV3AuthAlgorithm, SecretString)>,
    privacy: Option<(SnmpV3EncryptionAlgorithm, SecretString)>,
}

impl fmt::Debug for SnmpV3SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnmpV3SecurityConfig")
            .field("username", &self.username)
            .field("level", &self.level())
            .field("auth", &self.auth_algorithm())
            .field("privacy", &self.encryption_algorithm())
            .finish_non_exhaustive()
    }
}

impl PartialEq for SnmpV3SecurityConfig {
    fn eq(&self, other: &Self) -> bool {
        let auth_eq = match (&self.auth, &other.auth) {
            (None, None) => true,
            (Some((a, pa)), Some((b, pb))) => a == b && secret_eq(pa, pb),
            _ => false,
        };
        let priv_eq = match (&self.privacy, &other.privacy) {
            (None, None) => true,
            (Some((a, pa)), Some((b, pb))) => a == b && secret_eq(pa, pb),
            _ => false,
        };
        self.username == other.username && auth_eq && priv_eq
    }
}

impl Eq for SnmpV3SecurityConfig {}

impl SnmpV3SecurityConfig {
    /// Build a configuration for an explicit security level. The supplied
    /// algorithms must match the level exactly.
    pub fn new(
        level: SnmpV3SecurityLevel,
        username: &str,
        auth: Option<(SnmpV3AuthAlgorithm, SecretString)>,
        privacy: Option<(SnmpV3EncryptionAlgorithm, SecretString)>,
    ) -> Result<Self, DmsError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DmsError::invalid("username", "must not be empty"));
        }

        match (level, &auth, &privacy) {
            (SnmpV3SecurityLevel::NoAuthNoPriv, None, None)
            | (SnmpV3SecurityLevel::AuthNoPriv, Some(_), None)
            | (SnmpV3SecurityLevel::AuthPriv, Some(_), Some(_)) => {}
            _ => {
                return Err(DmsError::incorrect(format!(
                    "security level {level} does not allow authentication {} with privacy {}",
                    auth.as_ref().map_or("none".to_string(), |(a, _)| a.to_string()),
                    privacy.as_ref().map_or("none".to_string(), |(p, _)| p.to_string()),
                )));
            }
        }

        if auth.as_ref().is_some_and(|(_, p)| p.expose_secret().is_empty()) {
            return Err(DmsError::invalid("authPassword", "must not be empty"));
        }
        if privacy.as_ref().is_some_and(|(_, p)| p.expose_secret().is_empty()) {
            return Err(DmsError::invalid("privPassword", "must not be empty"));
        }

        Ok(Self {
            username: username.to_owned(),
            auth,
            privacy,
        })
    }

    pub fn no_auth_no_priv(username: &str) -> Result<Self, DmsError> {
        Self::new(SnmpV3SecurityLevel::NoAuthNoPriv, username, None, None)
    }

    pub fn auth_no_priv(
        username: &str,
        algorithm: SnmpV3AuthAlgorithm,
        password: SecretString,
    ) -> Result<Self, DmsError> {
        Self::new(
            SnmpV3SecurityLevel::AuthNoPriv,
            username,
            Some((algorithm, password)),
            None,
        )
    }

    pub fn auth_priv(
        username: &str,
        auth: SnmpV3AuthAlgorithm,
        auth_password: SecretString,
        encryption: SnmpV3EncryptionAlgorithm,
        encryption_password: SecretString,
    ) -> Result<Self, DmsError> {
        Self::new(
            SnmpV3SecurityLevel::AuthPriv,
            username,
            Some((auth, auth_password)),
            Some((encryption, encryption_password)),
        )
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn level(&self) -> SnmpV3SecurityLevel {
        match (&self.auth, &self.privacy) {
            (Some(_), Some(_)) => SnmpV3SecurityLevel::AuthPriv,
            (Some(_), None) => SnmpV3SecurityLevel::AuthNoPriv,
            (None, _) => SnmpV3SecurityLevel::NoAuthNoPriv,
        }
    }

    pub fn auth_algorithm(&self) -> Option<SnmpV3AuthAlgorithm> {
        self.auth.as_ref().map(|(a, _)| *a)
    }

    pub fn encryption_algorithm(&self) -> Option<SnmpV3EncryptionAlgorithm> {
        self.privacy.as_ref().map(|(p, _)| *p)
    }

    /// Rebuild from a port record. Agents may withhold passwords, so only
    /// the level/algorithm pairing is checked.
    fn from_port(info: &ElementPortInfo) -> Result<Self, DmsError> {
        let raw = info.snmp_v3.clone().unwrap_or_default();
        let username = if raw.username.is_empty() {
            info.get_community.clone()
        } else {
            raw.username
        };

        let level: SnmpV3SecurityLevel = if raw.security_level.is_empty() {
            SnmpV3SecurityLevel::NoAuthNoPriv
        } else {
            raw.security_level.parse().map_err(|_| {
                DmsError::incorrect(format!(
                    "unknown SNMPv3 security level '{}' on port {}",
                    raw.security_level, info.port_index
                ))
            })?
        };

        let auth = match level {
            SnmpV3SecurityLevel::NoAuthNoPriv => None,
            _ => {
                let algorithm = raw.auth_algorithm.parse().map_err(|_| {
                    DmsError::incorrect(format!(
                        "unknown SNMPv3 authentication algorithm '{}' on port {}",
                        raw.auth_algorithm, info.port_index
                    ))
                })?;
                Some((algorithm, SecretString::from(raw.auth_password)))
            }
        };
        let privacy = match level {
            SnmpV3SecurityLevel::AuthPriv => {
                let algorithm = raw.priv_algorithm.parse().map_err(|_| {
                    DmsError::incorrect(format!(
                        "unknown SNMPv3 encryption algorithm '{}' on port {}",
                        raw.priv_algorithm, info.port_index
                    ))
                })?;
                Some((algorithm, SecretString::from(raw.priv_password)))
            }
            _ => None,
        };

        Ok(Self {
            username,
            auth,
            privacy,
        })
    }

    fn write(&self, info: &mut ElementPortInfo, ctx: &PortWriteContext<'_>) -> Result<(), DmsError> {
        let auth_password = match &self.auth {
            Some((_, p)) => ctx.encoder.encode(p)?,
            None => String::new(),
        };
        let priv_password = match &self.privacy {
            Some((_, p)) => ctx.encoder.encode(p)?,
            None => String::new(),
        };

        if ctx.legacy_snmpv3 {
            // Older agents read the user from the GET slot and the privacy
            // password from the SET slot.
            info.get_community = self.username.clone();
            info.set_community = priv_password.clone();
        } else {
            info.get_community.clear();
            info.set_community.clear();
        }

        info.library_credentials = None;
        info.snmp_v3 = Some(SnmpV3PortInfo {
            username: self.username.clone(),
            security_level: self.level().to_string(),
            auth_algorithm: self
                .auth_algorithm()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            auth_password,
            priv_algorithm: self
                .encryption_algorithm()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            priv_password,
        });
        Ok(())
    }
}

/// Where an SNMPv3 connection takes its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpV3Security {
    /// Credentials configured on the connection itself.
    Config(SnmpV3SecurityConfig),
    /// An entry of the system credential library.
    CredentialLibrary(Uuid),
}

// ── SNMPv3 connection ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpV3Connection {
    ip: IpSettings,
    security: SnmpV3Security,
}

impl SnmpV3Connection {
    pub fn new(polling_ip: &str, security: SnmpV3Security) -> Result<Self, DmsError> {
        Ok(Self {
            ip: IpSettings::new(polling_ip, Some(DEFAULT_SNMP_PORT))?,
            security,
        })
    }

    pub(crate) fn from_port(info: &ElementPortInfo) -> Result<Self, DmsError> {
        let security = match info.library_credentials {
            Some(id) => SnmpV3Security::CredentialLibrary(id),
            None => SnmpV3Security::Config(SnmpV3SecurityConfig::from_port(info)?),
        };
        Ok(Self {
            ip: IpSettings::from_port(info),
            security,
        })
    }

    pub fn ip(&self) -> &IpSettings {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpSettings {
        &mut self.ip
    }

    pub fn security(&self) -> &SnmpV3Security {
        &self.security
    }

    pub fn set_security(&mut self, security: SnmpV3Security) {
        assign(&mut self.security, security, &mut self.ip.changes, PortField::Security);
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.ip.changes.any()
    }

    fn write_security(
        &self,
        info: &mut ElementPortInfo,
        ctx: &PortWriteContext<'_>,
    ) -> Result<(), DmsError> {
        match &self.security {
            SnmpV3Security::Config(config) => config.write(info, ctx),
            SnmpV3Security::CredentialLibrary(id) => {
                info.library_credentials = Some(*id);
                info.snmp_v3 = None;
                info.get_community.clear();
                info.set_community.clear();
                Ok(())
            }
        }
    }

    pub(crate) fn write_changed(
        &self,
        info: &mut ElementPortInfo,
        ctx: &PortWriteContext<'_>,
    ) -> Result<(), DmsError> {
        self.ip.write_changed(info);
        if self.ip.changes.contains(&PortField::Security) {
            self.write_security(info, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn write_all(
        &self,
        info: &mut ElementPortInfo,
        ctx: &PortWriteContext<'_>,
    ) -> Result<(), DmsError> {
        self.ip.write_all(info);
        self.write_security(info, ctx)
    }
}
