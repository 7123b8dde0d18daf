//! # Device Discovery
//!
//! Picks the sensor's port out of the system's serial ports by matching a
//! human-readable description against configured substrings.

use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::debug;

/// A serial port as seen by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Path or name used to open the port
    pub name: String,

    /// Product / manufacturer string for USB ports, otherwise the name
    pub description: String,
}

impl PortCandidate {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Whether the description contains any of `patterns` (case-sensitive)
    pub fn matches(&self, patterns: &[String]) -> bool {
        patterns
            .iter()
            .any(|pattern| self.description.contains(pattern.as_str()))
    }
}

impl From<&SerialPortInfo> for PortCandidate {
    fn from(info: &SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let parts: Vec<&str> = [usb.product.as_deref(), usb.manufacturer.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.is_empty() {
                    info.port_name.clone()
                } else {
                    parts.join(" ")
                }
            }
            _ => info.port_name.clone(),
        };

        Self::new(info.port_name.clone(), description)
    }
}

/// First candidate whose description matches one of `patterns`
///
/// Candidates are tried in enumeration order.
pub fn find_matching_port<'a>(
    candidates: &'a [PortCandidate],
    patterns: &[String],
) -> Option<&'a PortCandidate> {
    candidates.iter().find(|candidate| {
        let matched = candidate.matches(patterns);
        debug!(
            "Found serial port: {} ({}){}",
            candidate.name,
            candidate.description,
            if matched { " - match" } else { "" }
        );
        matched
    })
}

/// Enumerate the system's serial ports
pub fn list_candidates() -> tokio_serial::Result<Vec<PortCandidate>> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports.iter().map(PortCandidate::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_patterns() -> Vec<String> {
        vec!["Arduino".to_string(), "CH340".to_string()]
    }

    #[test]
    fn test_matches_arduino_description() {
        let candidates = vec![
            PortCandidate::new("/dev/ttyS0", "/dev/ttyS0"),
            PortCandidate::new("/dev/ttyACM0", "Arduino Uno Arduino (www.arduino.cc)"),
        ];

        let port = find_matching_port(&candidates, &default_patterns()).unwrap();
        assert_eq!(port.name, "/dev/ttyACM0");
    }

    #[test]
    fn test_matches_ch340_clone() {
        let candidates = vec![PortCandidate::new("COM3", "USB-SERIAL CH340")];
        let port = find_matching_port(&candidates, &default_patterns()).unwrap();
        assert_eq!(port.name, "COM3");
    }

    #[test]
    fn test_first_match_wins() {
        let candidates = vec![
            PortCandidate::new("/dev/ttyUSB0", "USB2.0-Serial CH340"),
            PortCandidate::new("/dev/ttyACM0", "Arduino Mega"),
        ];
        let port = find_matching_port(&candidates, &default_patterns()).unwrap();
        assert_eq!(port.name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_no_match() {
        let candidates = vec![
            PortCandidate::new("/dev/ttyUSB0", "CP2102 USB to UART Bridge"),
            PortCandidate::new("/dev/ttyS0", "/dev/ttyS0"),
        ];
        assert!(find_matching_port(&candidates, &default_patterns()).is_none());
        assert!(find_matching_port(&[], &default_patterns()).is_none());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let candidate = PortCandidate::new("/dev/ttyACM0", "arduino uno");
        assert!(!candidate.matches(&default_patterns()));
    }

    #[test]
    fn test_custom_patterns() {
        let candidate = PortCandidate::new("/dev/ttyUSB0", "CP2102 USB to UART Bridge");
        assert!(candidate.matches(&["CP210".to_string()]));
    }

    // Lists real ports; skipped in CI
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_list_real_ports() {
        match list_candidates() {
            Ok(candidates) => {
                for c in candidates {
                    println!("{} - {}", c.name, c.description);
                }
            }
            Err(e) => println!("Port enumeration unavailable: {}", e),
        }
    }
}
