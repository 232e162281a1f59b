use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

use crate::DeviceError;

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Finds the named input device, or the host default when no name is given.
pub fn get_or_default_input(device_name: Option<&str>) -> Result<Device, DeviceError> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| DeviceError::NoDevice("host has no default input device".to_string()));
    };

    let input_devices = host
        .input_devices()
        .map_err(|e| DeviceError::Denied(e.to_string()))?;
    for in_device in input_devices {
        if in_device.name().is_ok_and(|name| name == target) {
            return Ok(in_device);
        }
    }
    Err(DeviceError::NoDevice(format!("no input device named {target:?}")))
}

/// One line per input device, the default one marked.
pub fn get_available_inputs() -> Result<String, DeviceError> {
    let host = get_host();
    let default_device = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();
    let input_devices = host
        .input_devices()
        .map_err(|e| DeviceError::Denied(e.to_string()))?;

    let mut device_names: Vec<String> = Vec::new();
    for in_device in input_devices {
        let Ok(d_name) = in_device.name() else {
            continue;
        };
        let mut d = match in_device.default_input_config() {
            Ok(d_cfg) => format!(
                " * {}({}ch, {}hz)",
                d_name,
                d_cfg.channels(),
                d_cfg.sample_rate().0
            ),
            Err(_) => format!(" * {} (no default config)", d_name),
        };
        if d_name == default_device {
            d.push_str(" [default]");
        }
        device_names.push(d);
    }
    Ok(device_names.join("\n"))
}
