use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::{Error, Result};

/// The default adapter and the device/queue requested from it.
pub struct Gpu {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or(Error::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("texprobe"),
                    required_limits: adapter.limits(),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let gpu = Self {
            adapter,
            device,
            queue,
        };
        info!("using adapter {}", gpu.adapter_summary());

        Ok(gpu)
    }

    pub fn adapter_summary(&self) -> String {
        let info = self.adapter.get_info();
        format!("{} ({:?})", info.name, info.backend)
    }
}

/// Resolves once everything submitted to `queue` so far has finished
/// executing. Blocks for as long as the gpu takes; there is no timeout.
pub async fn wait_for_submitted_work(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
    let (sender, receiver) = oneshot::channel();
    queue.on_submitted_work_done(move || {
        let _ = sender.send(());
    });

    device.poll(wgpu::Maintain::Wait);
    receiver.await.map_err(|_| Error::SignalDropped)?;
    debug!("queue drained");

    Ok(())
}
