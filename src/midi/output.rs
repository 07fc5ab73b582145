use super::sink::MidirSink;
use crate::error::{Error, Result};
use log::{error, info};
use midir::MidiOutput;

const CLIENT_NAME: &str = "midiclockctl-output";
const CONNECTION_NAME: &str = "midiclockctl-output-conn";

/// Names of all MIDI output ports currently available.
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("midiclockctl-port-lister")?;
    let port_names = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();
    Ok(port_names)
}

/// Checks that `device_name` matches one of `devices`, listing the
/// alternatives otherwise.
pub fn validate_device(device_name: &str, devices: &[String]) -> std::result::Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Connects to the first port whose name contains `device_name`, or to the
/// first available port when no name is given.
pub fn connect_output(device_name: Option<&str>) -> Result<MidirSink> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let out_ports = midi_out.ports();

    let port = match device_name {
        Some(name) => {
            info!("Attempting to connect to MIDI device: {}", name);
            out_ports
                .iter()
                .find(|p| midi_out.port_name(p).unwrap_or_default().contains(name))
                .ok_or_else(|| {
                    error!("MIDI output device '{}' not found", name);
                    Error::Midi(format!("output device '{}' not found", name))
                })?
        }
        None => {
            info!("No device specified, connecting to first available MIDI output");
            out_ports
                .first()
                .ok_or_else(|| Error::Midi("no MIDI output ports available".to_string()))?
        }
    };

    let port_name = midi_out.port_name(port)?;
    info!("Connecting to MIDI output port: {}", port_name);
    let connection = midi_out.connect(port, CONNECTION_NAME)?;
    Ok(MidirSink::new(port_name, connection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<String> {
        vec!["USB MIDI Interface".to_string(), "Virtual Port 1".to_string()]
    }

    #[test]
    fn test_valid_device_matches_substring() {
        assert!(validate_device("USB MIDI", &devices()).is_ok());
    }

    #[test]
    fn test_invalid_device_lists_alternatives() {
        let err = validate_device("Nonexistent Device", &devices()).unwrap_err();
        assert!(err.contains("Nonexistent Device"));
        assert!(err.contains("  - Virtual Port 1"));
    }
}
