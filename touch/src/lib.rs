#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

pub mod channel;
pub mod engine;
pub mod mpr121;
pub mod report;

pub use engine::TouchEngine;

/// Number of electrodes a single controller can drive
pub const MAX_CHANNELS: usize = 12;
/// Bits of the active channel mask which map onto real electrodes
pub const CHANNEL_MASK: u16 = (1 << MAX_CHANNELS) - 1;

/// Confirmed state of a single channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TouchState {
    #[default]
    Released,
    Touched,
}

impl TouchState {
    pub fn touched(&self) -> bool {
        *self == TouchState::Touched
    }

    pub fn toggled(&self) -> Self {
        match self {
            TouchState::Released => TouchState::Touched,
            TouchState::Touched => TouchState::Released,
        }
    }
}

/// Which way the sensor reading moves when an electrode is touched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Readings drop on touch (MPR121 filtered data behaves this way)
    #[default]
    FallOnTouch,
    /// Readings rise on touch
    RiseOnTouch,
}

/// Configuration applied to every active channel at construction
#[derive(Clone, Copy, Debug)]
pub struct TouchConfig {
    /// Smoothing coefficient. Closer to 1.0 follows new samples faster but lets more noise
    /// through; closer to 0.0 is smoother but slower to react.
    pub alpha: f32,
    pub polarity: Polarity,
    /// Lower clamp for the smoothed reading
    pub min_value: u16,
    /// Upper clamp for the smoothed reading
    pub max_value: u16,
    /// Distance from the smoothed reading to the threshold while released. Should be larger
    /// than `release_margin` to bias against false touches.
    pub touch_margin: u16,
    /// Distance from the smoothed reading to the threshold while touched
    pub release_margin: u16,
    /// A touch is confirmed once the condition held for more than this many updates
    pub touch_confirm: u16,
    /// A release is confirmed once the condition held for more than this many updates
    pub release_confirm: u16,
}

impl TouchConfig {
    pub const fn default() -> Self {
        Self {
            alpha: 0.6,
            polarity: Polarity::FallOnTouch,
            min_value: 600,
            max_value: 710,
            touch_margin: 30,
            release_margin: 20,
            touch_confirm: 15,
            release_confirm: 15,
        }
    }
}

pub const DEFAULT_TOUCH_CONFIG: TouchConfig = TouchConfig::default();

/// Provides the latest raw reading for a channel.
///
/// The engine calls this once per active channel per update and assumes it always yields
/// a value; recovering from acquisition failures is the provider's business.
pub trait SampleSource {
    fn read(&mut self, channel: u8) -> u16;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn read(&mut self, channel: u8) -> u16 {
        (**self).read(channel)
    }
}

/// Adapts a closure into a [`SampleSource`]
pub struct FnSource<F>(pub F);

impl<F: FnMut(u8) -> u16> SampleSource for FnSource<F> {
    fn read(&mut self, channel: u8) -> u16 {
        (self.0)(channel)
    }
}
