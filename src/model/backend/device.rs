use candle_core::Device;
use tracing::{debug, info, warn};

type Probe = fn() -> candle_core::Result<Device>;

/// Accelerators compiled into this build, in preference order.
fn accelerators() -> Vec<(&'static str, Probe)> {
    let mut probes: Vec<(&'static str, Probe)> = Vec::new();
    #[cfg(feature = "metal")]
    probes.push(("metal", || Device::new_metal(0)));
    #[cfg(feature = "cuda")]
    probes.push(("cuda", || Device::new_cuda(0)));
    probes
}

/// Picks the first accelerator that opens, falling back to CPU.
pub fn select_device() -> Device {
    let probes = accelerators();
    if probes.is_empty() {
        debug!("No accelerator compiled in, using CPU tensors");
        return Device::Cpu;
    }

    let mut failures = Vec::with_capacity(probes.len());
    for (name, probe) in probes {
        match probe() {
            Ok(device) => {
                info!(accelerator = name, "Using accelerator for centroid assignment");
                return device;
            }
            Err(e) => {
                warn!(accelerator = name, error = %e, "Accelerator unavailable");
                failures.push(format!("{name}: {e}"));
            }
        }
    }

    warn!(reason = %failures.join("; "), "Falling back to CPU tensors");
    Device::Cpu
}
