use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest channel id a device may reference.
pub const MAX_CHANNEL: usize = u16::MAX as usize;

/// Activation level of every channel, indexed by channel id.
///
/// The array only ever grows. All growth goes through [`ChannelStates::grow_to`],
/// so existing entries keep their position and new entries start at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelStates {
    levels: Vec<u8>,
}

impl ChannelStates {
    pub fn zeros(len: usize) -> Self {
        Self {
            levels: vec![0; len],
        }
    }

    pub fn from_levels(levels: Vec<u8>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.levels
    }

    /// Zero-pads up to `len` entries, capped at `MAX_CHANNEL + 1`. Never shrinks.
    pub fn grow_to(&mut self, len: usize) {
        let len = len.min(MAX_CHANNEL + 1);
        if len > self.levels.len() {
            self.levels.resize(len, 0);
        }
    }

    /// Level of `channel`; channels past the end read as off.
    pub fn get(&self, channel: usize) -> u8 {
        self.levels.get(channel).copied().unwrap_or(0)
    }

    pub fn is_on(&self, channel: usize) -> bool {
        self.get(channel) > 0
    }

    /// Writes past `MAX_CHANNEL` are dropped.
    pub fn set(&mut self, channel: usize, level: u8) {
        let Some(len) = channel.checked_add(1).filter(|&n| n <= MAX_CHANNEL + 1) else {
            warn!("channel {} is out of range, ignored", channel);
            return;
        };
        self.grow_to(len);
        self.levels[channel] = level;
    }

    /// On becomes 0, anything else becomes 1. Returns the new level.
    pub fn toggle(&mut self, channel: usize) -> u8 {
        let next = if self.is_on(channel) { 0 } else { 1 };
        self.set(channel, next);
        self.get(channel)
    }

    pub fn active_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l > 0)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_normalizes_positive_levels() {
        let mut s = ChannelStates::from_levels(vec![0, 7]);
        assert_eq!(s.toggle(1), 0);
        assert_eq!(s.toggle(1), 1);
    }

    #[test]
    fn test_grow_never_shrinks() {
        let mut s = ChannelStates::from_levels(vec![1, 0, 1]);
        s.grow_to(2);
        assert_eq!(s.as_slice(), &[1, 0, 1]);
        s.grow_to(5);
        assert_eq!(s.as_slice(), &[1, 0, 1, 0, 0]);
    }

    #[test]
    fn test_out_of_range_reads_off_and_writes_grow() {
        let mut s = ChannelStates::zeros(2);
        assert_eq!(s.get(9), 0);
        s.set(4, 1);
        assert_eq!(s.len(), 5);
        assert_eq!(s.active_channels().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_channels_past_the_limit_are_ignored() {
        let mut s = ChannelStates::zeros(2);
        s.set(usize::MAX, 1);
        assert_eq!(s.toggle(MAX_CHANNEL + 1), 0);
        s.grow_to(usize::MAX);
        assert_eq!(s.len(), MAX_CHANNEL + 1);
        s.set(MAX_CHANNEL, 1);
        assert!(s.is_on(MAX_CHANNEL));
    }
}
