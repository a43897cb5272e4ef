use crate::canvas::Canvas;
use crate::config::AppConfig;
use crate::controller::{self, DEVICE_PLUGIN};
use crate::device::DmfDevice;
use crate::events::{AppEvent, EventBus};
use crate::experiment_log::{self, ExperimentLog};
use crate::grid::{ChannelStateProvider, ProtocolGrid, StepOptionsProvider};
use crate::protocol::Protocol;
use crate::view::{DeviceView, RenderPlan};
use tracing::{debug, warn};

/// Everything a handler may read or mutate, passed explicitly.
pub struct AppContext {
    pub config: AppConfig,
    pub device: DmfDevice,
    pub protocol: Protocol,
    pub experiment_log: ExperimentLog,
    pub view: DeviceView,
    pub grid: ProtocolGrid,
    pub bus: EventBus,
    pub providers: Vec<Box<dyn StepOptionsProvider>>,
    pub last_electrode_clicked: Option<usize>,
}

impl AppContext {
    pub fn new(config: AppConfig, device: DmfDevice, protocol: Protocol) -> Self {
        let mut view = DeviceView::default();
        view.overlay_opacity = config.overlay_opacity;
        view.fit_device(config.widget_size(), &device);

        let log_dir = device.name.as_deref().map(|n| config.log_directory(n));
        let experiment_log = ExperimentLog::new(log_dir);

        let mut ctx = Self {
            config,
            device,
            protocol,
            experiment_log,
            view,
            grid: ProtocolGrid::default(),
            bus: EventBus::new(),
            providers: vec![Box::new(ChannelStateProvider)],
            last_electrode_clicked: None,
        };
        controller::get_step_options(&mut ctx);
        ctx.refresh_grid();
        ctx
    }

    /// Adds a step options plugin; all of its fields start out visible.
    pub fn register_provider(&mut self, provider: Box<dyn StepOptionsProvider>) {
        self.grid.enable_fields(provider.as_ref());
        self.providers.push(provider);
        self.refresh_grid();
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
        controller::get_step_options(self);
        self.refresh_grid();
        self.bus.emit(AppEvent::StepRun);
    }

    fn refresh_grid(&mut self) {
        if let Err(e) = self.grid.update_grid(&self.protocol, &self.providers) {
            warn!("protocol grid refresh failed: {}", e);
        }
    }

    /// Recolours and repaints the device from the current step's state.
    pub fn redraw(&mut self, canvas: &mut dyn Canvas) -> RenderPlan {
        let states = controller::get_step_options(self).state_of_channels.clone();
        self.view
            .update(&self.device, &states, canvas, &mut self.bus)
    }

    /// Runs the built-in reactions for every queued event until the queue is
    /// empty. Returns the events in the order they were handled.
    pub fn process_events(&mut self, canvas: &mut dyn Canvas) -> Vec<AppEvent> {
        let mut handled = Vec::new();
        while let Some(event) = self.bus.pop() {
            debug!("dispatch {:?}", event);
            match &event {
                AppEvent::StepOptionsChanged { plugin, step } => {
                    if let Err(e) = self.grid.on_step_options_changed(
                        plugin,
                        *step,
                        &self.protocol,
                        &self.providers,
                    ) {
                        warn!("grid refresh for {} step {}: {}", plugin, step, e);
                    }
                    if plugin == DEVICE_PLUGIN && *step == self.protocol.current_step_number() {
                        self.redraw(canvas);
                    }
                }
                AppEvent::StepRun => {
                    self.redraw(canvas);
                }
                AppEvent::DeviceChanged { .. } => {
                    self.view
                        .fit_device(self.config.widget_size(), &self.device);
                    experiment_log::on_device_changed(self);
                    controller::notify_step_options_changed(self);
                }
                _ => {}
            }
            handled.push(event);
        }
        handled
    }
}
