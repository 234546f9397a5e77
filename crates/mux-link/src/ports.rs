//! Serial port enumeration

use serialport::{available_ports, SerialPortType};
use tracing::info;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB product string
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product.clone(),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                product: None,
            },
        }
    }
}

/// Enumerate the serial ports a MUX controller could be attached to
pub fn list_ports() -> Result<Vec<SerialPortInfo>, serialport::Error> {
    let ports: Vec<_> = available_ports()?
        .into_iter()
        .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type))
        .collect();

    if ports.is_empty() {
        info!("no serial ports found");
    } else {
        info!("found {} serial port(s)", ports.len());
        for port in &ports {
            let desc = port.product.as_deref().unwrap_or("Unknown");
            info!("  {} - {}", port.port, desc);
        }
    }

    Ok(ports)
}
