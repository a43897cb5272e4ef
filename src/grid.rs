use crate::channels::{ChannelStates, MAX_CHANNEL};
use crate::controller::DEVICE_PLUGIN;
use crate::error::{MdResult, MicrodropError};
use crate::events::{AppEvent, EventBus};
use crate::protocol::{DeviceOptions, Protocol, StepValues};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Plugin name → enabled field names.
pub type FieldFilter = BTreeMap<String, BTreeSet<String>>;

/// A plugin that keeps per-step parameters the protocol grid can show and edit.
pub trait StepOptionsProvider {
    fn name(&self) -> &str;
    fn fields(&self) -> Vec<String>;
    fn get_step_values(&self, protocol: &Protocol, step: usize) -> MdResult<StepValues>;
    fn set_step_values(
        &self,
        protocol: &mut Protocol,
        step: usize,
        values: &StepValues,
    ) -> MdResult<()>;
}

fn step_out_of_range(step: usize) -> MicrodropError {
    MicrodropError::NotFound(format!("step {}", step))
}

// --- DEVICE CHANNEL STATES ---

pub struct ChannelStateProvider;

impl ChannelStateProvider {
    pub const FIELD: &'static str = "state_of_channels";
}

impl StepOptionsProvider for ChannelStateProvider {
    fn name(&self) -> &str {
        DEVICE_PLUGIN
    }

    fn fields(&self) -> Vec<String> {
        vec![Self::FIELD.to_string()]
    }

    fn get_step_values(&self, protocol: &Protocol, step: usize) -> MdResult<StepValues> {
        let step = protocol.step(step).ok_or_else(|| step_out_of_range(step))?;
        let levels = step
            .device_options
            .as_ref()
            .map(|o| o.state_of_channels.as_slice().to_vec())
            .unwrap_or_default();
        let mut values = StepValues::new();
        values.insert(Self::FIELD.to_string(), serde_json::to_value(levels)?);
        Ok(values)
    }

    fn set_step_values(
        &self,
        protocol: &mut Protocol,
        step: usize,
        values: &StepValues,
    ) -> MdResult<()> {
        let Some(raw) = values.get(Self::FIELD) else {
            return Ok(());
        };
        let levels: Vec<u8> = serde_json::from_value(raw.clone())
            .map_err(|_| MicrodropError::validation("Channel states must be a list of levels."))?;
        if levels.len() > MAX_CHANNEL + 1 {
            return Err(MicrodropError::validation(format!(
                "Channel states cover at most {} channels.",
                MAX_CHANNEL + 1
            )));
        }
        let step = protocol
            .step_mut(step)
            .ok_or_else(|| step_out_of_range(step))?;
        let options = step.device_options.get_or_insert_with(DeviceOptions::default);
        let mut next = ChannelStates::from_levels(levels);
        next.grow_to(options.state_of_channels.len());
        options.state_of_channels = next;
        Ok(())
    }
}

// --- GENERIC FORM PLUGINS ---

/// Plugin whose step data is a flat set of typed fields with defaults.
#[derive(Debug, Clone)]
pub struct StepFieldsPlugin {
    name: String,
    defaults: StepValues,
}

pub const CONTROL_BOARD_PLUGIN: &str = "wheelerlab.dmf_control_board_1.2";

impl StepFieldsPlugin {
    pub fn new(name: impl Into<String>, defaults: StepValues) -> Self {
        Self {
            name: name.into(),
            defaults,
        }
    }

    /// Control board step parameters: duration (ms), voltage (VRMS), frequency (Hz).
    pub fn control_board() -> Self {
        let mut defaults = StepValues::new();
        defaults.insert("duration".into(), Value::from(100));
        defaults.insert("voltage".into(), Value::from(100));
        defaults.insert("frequency".into(), Value::from(10_000));
        Self::new(CONTROL_BOARD_PLUGIN, defaults)
    }

    fn check_type(&self, field: &str, value: &Value) -> MdResult<()> {
        let expected = self.defaults.get(field).ok_or_else(|| {
            MicrodropError::validation(format!("{} has no field '{}'", self.name, field))
        })?;
        let same = matches!(
            (expected, value),
            (Value::Number(_), Value::Number(_))
                | (Value::String(_), Value::String(_))
                | (Value::Bool(_), Value::Bool(_))
        );
        if same {
            Ok(())
        } else {
            Err(MicrodropError::validation(format!(
                "Invalid value for {}: {}",
                field, value
            )))
        }
    }
}

impl StepOptionsProvider for StepFieldsPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> Vec<String> {
        self.defaults.keys().cloned().collect()
    }

    fn get_step_values(&self, protocol: &Protocol, step: usize) -> MdResult<StepValues> {
        let step = protocol.step(step).ok_or_else(|| step_out_of_range(step))?;
        let mut values = self.defaults.clone();
        if let Some(stored) = step.get_data(&self.name) {
            for (k, v) in stored {
                values.insert(k.clone(), v.clone());
            }
        }
        Ok(values)
    }

    fn set_step_values(
        &self,
        protocol: &mut Protocol,
        step: usize,
        values: &StepValues,
    ) -> MdResult<()> {
        // Validate everything before touching the step.
        for (k, v) in values {
            self.check_type(k, v)?;
        }
        let mut merged = self.get_step_values(protocol, step)?;
        merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        protocol
            .step_mut(step)
            .ok_or_else(|| step_out_of_range(step))?
            .set_data(self.name.clone(), merged);
        Ok(())
    }
}

// --- GRID ---

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub step_number: usize,
    /// Plugin name → visible field values.
    pub cells: BTreeMap<String, StepValues>,
}

/// Spreadsheet mirror of the protocol: one row per step, one column per
/// enabled plugin field.
#[derive(Debug, Clone, Default)]
pub struct ProtocolGrid {
    enabled_fields: Option<FieldFilter>,
    rows: Vec<GridRow>,
}

fn find_provider<'a>(
    providers: &'a [Box<dyn StepOptionsProvider>],
    plugin: &str,
) -> MdResult<&'a dyn StepOptionsProvider> {
    providers
        .iter()
        .find(|p| p.name() == plugin)
        .map(|p| p.as_ref())
        .ok_or_else(|| MicrodropError::NotFound(format!("plugin {}", plugin)))
}

fn write_cell(
    provider: &dyn StepOptionsProvider,
    row: usize,
    field: &str,
    value: Value,
    protocol: &mut Protocol,
) -> MdResult<()> {
    let mut values = provider.get_step_values(protocol, row)?;
    values.insert(field.to_string(), value);
    provider.set_step_values(protocol, row, &values)
}

impl ProtocolGrid {
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn enabled_fields(&self) -> Option<&FieldFilter> {
        self.enabled_fields.as_ref()
    }

    pub fn set_fields_filter(
        &mut self,
        filter: FieldFilter,
        protocol: &Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
    ) -> MdResult<()> {
        debug!("set_fields_filter: {:?}", filter);
        self.enabled_fields = Some(filter);
        self.update_grid(protocol, providers)
    }

    /// Shows every field of `provider`. A grid without a filter already
    /// shows everything.
    pub fn enable_fields(&mut self, provider: &dyn StepOptionsProvider) {
        if let Some(filter) = self.enabled_fields.as_mut() {
            filter
                .entry(provider.name().to_string())
                .or_default()
                .extend(provider.fields());
        }
    }

    /// Column headers as `(plugin, field)` in display order.
    pub fn columns(&self) -> Vec<(String, String)> {
        self.enabled_fields
            .iter()
            .flatten()
            .flat_map(|(plugin, fields)| fields.iter().map(move |f| (plugin.clone(), f.clone())))
            .collect()
    }

    fn visible_values(&self, plugin: &str, values: StepValues) -> StepValues {
        let enabled = self.enabled_fields.as_ref().and_then(|f| f.get(plugin));
        values
            .into_iter()
            .filter(|(k, _)| enabled.is_some_and(|set| set.contains(k)))
            .collect()
    }

    fn build_row(
        &self,
        step: usize,
        protocol: &Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
    ) -> MdResult<GridRow> {
        let mut cells = BTreeMap::new();
        for p in providers {
            if self
                .enabled_fields
                .as_ref()
                .is_some_and(|f| f.contains_key(p.name()))
            {
                let values = p.get_step_values(protocol, step)?;
                cells.insert(p.name().to_string(), self.visible_values(p.name(), values));
            }
        }
        Ok(GridRow {
            step_number: step,
            cells,
        })
    }

    /// Rebuilds every row. With no filter set, all fields of all providers
    /// are enabled.
    pub fn update_grid(
        &mut self,
        protocol: &Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
    ) -> MdResult<()> {
        if self.enabled_fields.is_none() {
            self.enabled_fields = Some(
                providers
                    .iter()
                    .map(|p| (p.name().to_string(), p.fields().into_iter().collect()))
                    .collect(),
            );
        }
        let rows = (0..protocol.len())
            .map(|i| self.build_row(i, protocol, providers))
            .collect::<MdResult<Vec<_>>>()?;
        debug!("protocol grid rebuilt: {} rows", rows.len());
        self.rows = rows;
        Ok(())
    }

    /// Re-reads one plugin's cells for one step.
    pub fn on_step_options_changed(
        &mut self,
        plugin: &str,
        step: usize,
        protocol: &Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
    ) -> MdResult<()> {
        if self.rows.len() != protocol.len() {
            return self.update_grid(protocol, providers);
        }
        let provider = find_provider(providers, plugin)?;
        let values = provider.get_step_values(protocol, step)?;
        let visible = self.visible_values(plugin, values);
        if let Some(row) = self.rows.get_mut(step) {
            if row.cells.contains_key(plugin) {
                row.cells.insert(plugin.to_string(), visible);
            }
        }
        Ok(())
    }

    /// A cell was edited: push the row's values for that plugin back into the
    /// protocol and announce the change.
    #[allow(clippy::too_many_arguments)]
    pub fn on_row_changed(
        &mut self,
        row: usize,
        plugin: &str,
        field: &str,
        value: Value,
        protocol: &mut Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
        bus: &mut EventBus,
    ) -> MdResult<()> {
        self.on_rows_changed(&[row], plugin, field, value, protocol, providers, bus)
    }

    /// Same edit applied to several rows. Either every row takes the value or
    /// the protocol is left as it was.
    #[allow(clippy::too_many_arguments)]
    pub fn on_rows_changed(
        &mut self,
        rows: &[usize],
        plugin: &str,
        field: &str,
        value: Value,
        protocol: &mut Protocol,
        providers: &[Box<dyn StepOptionsProvider>],
        bus: &mut EventBus,
    ) -> MdResult<()> {
        let provider = find_provider(providers, plugin)?;

        let mut staged = protocol.clone();
        for &row in rows {
            if let Err(e) = write_cell(provider, row, field, value.clone(), &mut staged) {
                bus.report(e.to_string());
                return Err(e);
            }
        }
        *protocol = staged;

        for &row in rows {
            bus.emit(AppEvent::StepOptionsChanged {
                plugin: plugin.to_string(),
                step: row,
            });
            self.on_step_options_changed(plugin, row, protocol, providers)?;
        }
        Ok(())
    }

    /// Selecting exactly one row other than the current step jumps to it.
    pub fn on_selection_changed(
        &self,
        selected: &[usize],
        protocol: &mut Protocol,
        bus: &mut EventBus,
    ) -> MdResult<bool> {
        let [row] = selected else {
            return Ok(false);
        };
        if *row == protocol.current_step_number() {
            return Ok(false);
        }
        debug!("selected row {}", row);
        protocol.goto_step(*row)?;
        bus.emit(AppEvent::StepRun);
        Ok(true)
    }

    pub fn selected_step(&self, protocol: &Protocol) -> usize {
        protocol.current_step_number()
    }
}
