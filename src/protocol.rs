use crate::channels::ChannelStates;
use crate::error::{MdResult, MicrodropError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Field name → value for one plugin on one step.
pub type StepValues = BTreeMap<String, serde_json::Value>;

/// File name of the protocol dump inside a device or experiment directory.
pub const PROTOCOL_FILE: &str = "protocol";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOptions {
    pub state_of_channels: ChannelStates,
}

impl DeviceOptions {
    pub fn with_channel_count(count: usize) -> Self {
        Self {
            state_of_channels: ChannelStates::zeros(count),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub device_options: Option<DeviceOptions>,

    #[serde(default)]
    pub plugin_data: BTreeMap<String, StepValues>,
}

impl Step {
    pub fn get_data(&self, plugin: &str) -> Option<&StepValues> {
        self.plugin_data.get(plugin)
    }

    pub fn set_data(&mut self, plugin: impl Into<String>, values: StepValues) {
        self.plugin_data.insert(plugin.into(), values);
    }

    /// First plugin whose name starts with `prefix`.
    pub fn plugin_name_lookup(&self, prefix: &str) -> Option<&str> {
        self.plugin_data
            .keys()
            .find(|name| name.starts_with(prefix))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub name: Option<String>,
    steps: Vec<Step>,
    #[serde(default)]
    current_step_number: usize,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            name: None,
            steps: vec![Step::default()],
            current_step_number: 0,
        }
    }
}

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn step(&self, n: usize) -> Option<&Step> {
        self.steps.get(n)
    }

    pub fn step_mut(&mut self, n: usize) -> Option<&mut Step> {
        self.steps.get_mut(n)
    }

    pub fn current_step_number(&self) -> usize {
        self.current_step_number
    }

    pub fn current_step(&self) -> &Step {
        &self.steps[self.current_step_number]
    }

    pub fn current_step_mut(&mut self) -> &mut Step {
        &mut self.steps[self.current_step_number]
    }

    pub fn goto_step(&mut self, n: usize) -> MdResult<()> {
        if n >= self.steps.len() {
            return Err(MicrodropError::validation(format!(
                "Step {} is out of range (protocol has {} steps)",
                n,
                self.steps.len()
            )));
        }
        self.current_step_number = n;
        Ok(())
    }

    /// Inserts a copy of the current step after it and makes it current.
    pub fn add_step(&mut self) -> usize {
        let copy = self.current_step().clone();
        let at = self.current_step_number + 1;
        self.steps.insert(at, copy);
        self.current_step_number = at;
        at
    }

    /// Removes step `n`. The last remaining step is replaced by a blank one.
    pub fn delete_step(&mut self, n: usize) -> MdResult<()> {
        if n >= self.steps.len() {
            return Err(MicrodropError::validation(format!(
                "Step {} is out of range",
                n
            )));
        }
        self.steps.remove(n);
        if self.steps.is_empty() {
            self.steps.push(Step::default());
        }
        if self.current_step_number >= self.steps.len() {
            self.current_step_number = self.steps.len() - 1;
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> MdResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MicrodropError::NotFound(format!("protocol file '{}': {}", path.display(), e))
        })?;
        let mut protocol: Protocol = serde_json::from_str(&content)?;
        if protocol.steps.is_empty() {
            protocol.steps.push(Step::default());
        }
        if protocol.current_step_number >= protocol.steps.len() {
            protocol.current_step_number = 0;
        }
        Ok(protocol)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> MdResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("💾 Saved protocol ({} steps) to {}", self.len(), path.display());
        Ok(())
    }
}
