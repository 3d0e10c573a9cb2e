//! Per-sensor debounce engine
//!
//! Owns one [`Channel`] per electrode and a [`SampleSource`] to feed them. Nothing here
//! knows about time: debouncing is counted in calls to [`TouchEngine::update`], so the
//! caller is expected to run it at a steady rate.

use crate::channel::Channel;
use crate::{Polarity, SampleSource, TouchConfig, CHANNEL_MASK, DEFAULT_TOUCH_CONFIG, MAX_CHANNELS};

pub struct TouchEngine<S> {
    source: S,
    device_id: u8,
    active: u16,
    alpha: f32,
    polarity: Polarity,
    channels: [Channel; MAX_CHANNELS],
}

impl<S: SampleSource> TouchEngine<S> {
    /// Create an engine with the default configuration for every channel in `active_mask`
    pub fn new(source: S, device_id: u8, active_mask: u16) -> Self {
        Self::with_config(source, device_id, active_mask, &DEFAULT_TOUCH_CONFIG)
    }

    /// Create an engine, seeding each active channel with one sample from `source`
    pub fn with_config(mut source: S, device_id: u8, active_mask: u16, config: &TouchConfig) -> Self {
        let active = active_mask & CHANNEL_MASK;
        let mut channels = [Channel::default(); MAX_CHANNELS];

        for i in 0..MAX_CHANNELS {
            if active & (1 << i) != 0 {
                let seed = source.read(i as u8);
                channels[i] = Channel::new(config, seed);
                trace!("dev {:#04x} ch{} seeded at {}", device_id, i, channels[i].value);
            }
        }

        Self {
            source,
            device_id,
            active,
            alpha: config.alpha,
            polarity: config.polarity,
            channels,
        }
    }

    /// Sample and debounce every active channel once
    ///
    /// Returns a bitmask of the channels which changed state in this cycle
    pub fn update(&mut self) -> u16 {
        let mut changed = 0;

        for i in 0..MAX_CHANNELS {
            if self.active & (1 << i) == 0 {
                continue;
            }

            let raw = self.source.read(i as u8);
            let channel = &mut self.channels[i];
            let flipped = channel.push(raw, self.alpha, self.polarity);
            trace!(
                "dev {:#04x} ch{} raw {} val {} thr {} cnt {}",
                self.device_id, i, raw, channel.value, channel.threshold, channel.counter
            );
            if let Some(state) = flipped {
                debug!(
                    "dev {:#04x} ch{} -> {:?} (val {} thr {})",
                    self.device_id, i, state, channel.value, channel.threshold
                );
                changed |= 1 << i;
            }
        }

        changed
    }

    /// Confirmed state of `channel`. Inactive or out of range channels are never touched.
    pub fn is_touched(&self, channel: u8) -> bool {
        self.channel(channel).map_or(false, |c| c.touched())
    }

    /// Bitmask of all currently touched channels
    pub fn touched_mask(&self) -> u16 {
        self.active_channels()
            .filter(|(_, c)| c.touched())
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    pub fn set_touch_margin(&mut self, channel: u8, margin: u16) {
        let polarity = self.polarity;
        if let Some(c) = self.channel_mut(channel) {
            c.touch_margin = margin;
            c.rearm(polarity);
        }
    }

    pub fn set_release_margin(&mut self, channel: u8, margin: u16) {
        let polarity = self.polarity;
        if let Some(c) = self.channel_mut(channel) {
            c.release_margin = margin;
            c.rearm(polarity);
        }
    }

    pub fn set_sensor_min_value(&mut self, channel: u8, value: u16) {
        if let Some(c) = self.channel_mut(channel) {
            c.min_value = value;
        }
    }

    pub fn set_sensor_max_value(&mut self, channel: u8, value: u16) {
        if let Some(c) = self.channel_mut(channel) {
            c.max_value = value;
        }
    }

    pub fn set_touch_confirm_count(&mut self, channel: u8, count: u16) {
        if let Some(c) = self.channel_mut(channel) {
            c.touch_confirm = count;
        }
    }

    pub fn set_release_confirm_count(&mut self, channel: u8, count: u16) {
        if let Some(c) = self.channel_mut(channel) {
            c.release_confirm = count;
        }
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn active_mask(&self) -> u16 {
        self.active
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn is_active(&self, channel: u8) -> bool {
        (channel as usize) < MAX_CHANNELS && self.active & (1 << channel) != 0
    }

    pub fn channel(&self, channel: u8) -> Option<&Channel> {
        if self.is_active(channel) {
            Some(&self.channels[channel as usize])
        } else {
            None
        }
    }

    fn channel_mut(&mut self, channel: u8) -> Option<&mut Channel> {
        if self.is_active(channel) {
            Some(&mut self.channels[channel as usize])
        } else {
            None
        }
    }

    /// Active channels in ascending index order
    pub fn active_channels(&self) -> impl Iterator<Item = (u8, &Channel)> + '_ {
        let active = self.active;
        self.channels
            .iter()
            .enumerate()
            .filter(move |(i, _)| active & (1 << i) != 0)
            .map(|(i, c)| (i as u8, c))
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the engine, handing back the sample source
    pub fn release(self) -> S {
        self.source
    }
}
