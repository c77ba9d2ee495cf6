//! Output device enumeration (CPAL)
//!
//! Lists devices from every available host together with the speaker
//! layouts they can take in F32, and resolves a configured device name.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{HostId, SampleFormat};

use crate::types::{SpeakerLayout, SAMPLING_RATES};

use super::error::{AudioError, AudioResult};

/// Get a human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

/// An output device and what the mixer can do with it
#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub name: String,
    /// Host backend name (e.g., "ALSA", "JACK")
    pub host: String,
    /// Whether this is the default device of its host
    pub is_default: bool,
    /// Layouts offered with F32 samples
    pub layouts: Vec<SpeakerLayout>,
    /// Tabled sampling rates inside some F32 range
    pub sample_rates: Vec<u32>,
}

impl std::fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)
    }
}

/// Enumerate output devices from all hosts
pub fn output_devices() -> AudioResult<Vec<OutputDevice>> {
    let mut all_devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };

        let default_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        let devices = match host.output_devices() {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate devices for {:?}: {}", host_id, e);
                continue;
            }
        };

        for device in devices {
            let Ok(name) = device.name() else { continue };
            let Ok(configs) = device.supported_output_configs() else { continue };

            let mut layouts = Vec::new();
            let mut sample_rates = Vec::new();
            for config in configs.filter(|c| c.sample_format() == SampleFormat::F32) {
                if let Some(layout) = SpeakerLayout::from_channels(config.channels() as usize) {
                    if !layouts.contains(&layout) {
                        layouts.push(layout);
                    }
                }
                for (rate, _) in SAMPLING_RATES {
                    if rate >= config.min_sample_rate().0
                        && rate <= config.max_sample_rate().0
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            layouts.sort_by_key(|l| l.channels());
            sample_rates.sort_unstable();

            all_devices.push(OutputDevice {
                is_default: default_name.as_ref() == Some(&name),
                name,
                host: host_name(host_id),
                layouts,
                sample_rates,
            });
        }
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices);
    }
    log::debug!("Found {} output devices", all_devices.len());
    Ok(all_devices)
}

/// Resolve a device by name, or the default host's default device
///
/// Named devices are looked up on the default host first, then on every
/// other host.
pub fn find_output_device(name: Option<&str>) -> AudioResult<cpal::Device> {
    let Some(name) = name else {
        return cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoDevices);
    };

    let default_id = cpal::default_host().id();
    let hosts = std::iter::once(default_id)
        .chain(cpal::available_hosts().into_iter().filter(|id| *id != default_id));

    for host_id in hosts {
        let Ok(host) = cpal::host_from_id(host_id) else { continue };
        let Ok(mut devices) = host.output_devices() else { continue };
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}
