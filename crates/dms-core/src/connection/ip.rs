// Fields shared by every connection that polls a device over IP.

use std::time::Duration;

use dms_api::messages::ElementPortInfo;

use crate::error::DmsError;
use crate::tracked::{ChangeSet, assign};

use super::PortField;

pub const DEFAULT_RETRIES: i32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

const MIN_TIMEOUT: Duration = Duration::from_millis(10);
const MAX_TIMEOUT: Duration = Duration::from_millis(120_000);
const MAX_RETRIES: i32 = 10;
const MAX_ELAPSED_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn from_millis(ms: i32) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

pub(crate) fn to_millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

fn check_polling_ip(ip: &str) -> Result<String, DmsError> {
    let ip = ip.trim();
    if ip.is_empty() {
        return Err(DmsError::invalid("pollingIp", "must not be empty"));
    }
    Ok(ip.to_owned())
}

fn check_port(port: u16) -> Result<(), DmsError> {
    if port == 0 {
        return Err(DmsError::out_of_range("ipPort", "must be between 1 and 65535"));
    }
    Ok(())
}

/// Host, port, bus address and timing of an IP-based connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpSettings {
    polling_ip: String,
    ip_port: Option<u16>,
    bus_address: String,
    retries: i32,
    timeout: Duration,
    elapsed_timeout: Duration,
    pub(crate) changes: ChangeSet<PortField>,
}

impl IpSettings {
    pub(crate) fn new(polling_ip: &str, ip_port: Option<u16>) -> Result<Self, DmsError> {
        if let Some(port) = ip_port {
            check_port(port)?;
        }
        Ok(Self {
            polling_ip: check_polling_ip(polling_ip)?,
            ip_port,
            bus_address: String::new(),
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            elapsed_timeout: Duration::ZERO,
            changes: ChangeSet::new(),
        })
    }

    pub(crate) fn from_port(info: &ElementPortInfo) -> Self {
        Self {
            polling_ip: info.polling_ip.clone(),
            ip_port: info.ip_port,
            bus_address: info.bus_address.clone(),
            retries: info.retries,
            timeout: from_millis(info.timeout_ms),
            elapsed_timeout: from_millis(info.elapsed_timeout_ms),
            changes: ChangeSet::new(),
        }
    }

    pub fn polling_ip(&self) -> &str {
        &self.polling_ip
    }

    pub fn ip_port(&self) -> Option<u16> {
        self.ip_port
    }

    pub fn bus_address(&self) -> &str {
        &self.bus_address
    }

    pub fn retries(&self) -> i32 {
        self.retries
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed_timeout(&self) -> Duration {
        self.elapsed_timeout
    }

    pub fn set_polling_ip(&mut self, polling_ip: &str) -> Result<(), DmsError> {
        let ip = check_polling_ip(polling_ip)?;
        assign(&mut self.polling_ip, ip, &mut self.changes, PortField::PollingIp);
        Ok(())
    }

    pub fn set_ip_port(&mut self, port: u16) -> Result<(), DmsError> {
        check_port(port)?;
        assign(&mut self.ip_port, Some(port), &mut self.changes, PortField::IpPort);
        Ok(())
    }

    pub fn set_bus_address(&mut self, bus_address: impl Into<String>) {
        assign(
            &mut self.bus_address,
            bus_address.into(),
            &mut self.changes,
            PortField::BusAddress,
        );
    }

    /// Retries per poll, `0..=10`.
    pub fn set_retries(&mut self, retries: i32) -> Result<(), DmsError> {
        if !(0..=MAX_RETRIES).contains(&retries) {
            return Err(DmsError::out_of_range(
                "retries",
                format!("{retries} is outside 0..={MAX_RETRIES}"),
            ));
        }
        assign(&mut self.retries, retries, &mut self.changes, PortField::Retries);
        Ok(())
    }

    /// Time to wait for a reply, 10 ms to 120 s.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), DmsError> {
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(DmsError::out_of_range(
                "timeout",
                format!("{} ms is outside 10..=120000 ms", timeout.as_millis()),
            ));
        }
        assign(&mut self.timeout, timeout, &mut self.changes, PortField::Timeout);
        Ok(())
    }

    /// Time after which the element goes into timeout, at most 120 s.
    pub fn set_elapsed_timeout(&mut self, elapsed: Duration) -> Result<(), DmsError> {
        if elapsed > MAX_ELAPSED_TIMEOUT {
            return Err(DmsError::out_of_range(
                "elapsedTimeout",
                format!("{} s exceeds 120 s", elapsed.as_secs()),
            ));
        }
        assign(
            &mut self.elapsed_timeout,
            elapsed,
            &mut self.changes,
            PortField::ElapsedTimeout,
        );
        Ok(())
    }

    pub(crate) fn write_changed(&self, info: &mut ElementPortInfo) {
        for field in self.changes.iter() {
            match field {
                PortField::PollingIp => info.polling_ip = self.polling_ip.clone(),
                PortField::IpPort => info.ip_port = self.ip_port,
                PortField::BusAddress => info.bus_address = self.bus_address.clone(),
                PortField::Retries => info.retries = self.retries,
                PortField::Timeout => info.timeout_ms = to_millis(self.timeout),
                PortField::ElapsedTimeout => {
                    info.elapsed_timeout_ms = to_millis(self.elapsed_timeout);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn write_all(&self, info: &mut ElementPortInfo) {
        info.polling_ip = self.polling_ip.clone();
        info.ip_port = self.ip_port;
        info.bus_address = self.bus_address.clone();
        info.retries = self.retries;
        info.timeout_ms = to_millis(self.timeout);
        info.elapsed_timeout_ms = to_millis(self.elapsed_timeout);
    }
}
