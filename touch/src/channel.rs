use crate::{Polarity, TouchConfig, TouchState, DEFAULT_TOUCH_CONFIG};

/// Debounce state for a single electrode
#[derive(Clone, Copy, Debug)]
pub struct Channel {
    /// Smoothed reading, kept within `[min_value, max_value]`
    pub value: f32,
    /// Last raw sample pushed
    pub raw: u16,
    /// Crossing this flips the condition counter; which side counts depends on `state`
    pub threshold: f32,
    pub state: TouchState,
    /// Consecutive updates for which the flip condition held
    pub counter: u16,
    pub min_value: u16,
    pub max_value: u16,
    pub touch_margin: u16,
    pub release_margin: u16,
    pub touch_confirm: u16,
    pub release_confirm: u16,
}

/// Clamp a reading into the sensor range. A range with `min > max` yields `min`.
fn constrain(value: f32, min: u16, max: u16) -> f32 {
    let min = min as f32;
    let max = max as f32;
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

impl Channel {
    /// Seed a released channel from its first sample
    pub fn new(config: &TouchConfig, seed: u16) -> Self {
        let mut channel = Self {
            value: constrain(seed as f32, config.min_value, config.max_value),
            raw: seed,
            threshold: 0.0,
            state: TouchState::Released,
            counter: 0,
            min_value: config.min_value,
            max_value: config.max_value,
            touch_margin: config.touch_margin,
            release_margin: config.release_margin,
            touch_confirm: config.touch_confirm,
            release_confirm: config.release_confirm,
        };
        channel.rearm(config.polarity);
        channel
    }

    pub fn touched(&self) -> bool {
        self.state.touched()
    }

    /// Place the threshold a margin away from the current reading, on the side the next
    /// transition will come from.
    pub fn rearm(&mut self, polarity: Polarity) {
        let touch = self.touch_margin as f32;
        let release = self.release_margin as f32;

        self.threshold = match (self.state, polarity) {
            (TouchState::Released, Polarity::FallOnTouch) => self.value - touch,
            (TouchState::Touched, Polarity::FallOnTouch) => self.value + release,
            (TouchState::Released, Polarity::RiseOnTouch) => self.value + touch,
            (TouchState::Touched, Polarity::RiseOnTouch) => self.value - release,
        };
    }

    /// True when the reading is on the far side of the threshold for the current state
    fn trending(&self, polarity: Polarity) -> bool {
        match (self.state, polarity) {
            (TouchState::Released, Polarity::FallOnTouch)
            | (TouchState::Touched, Polarity::RiseOnTouch) => self.value < self.threshold,
            (TouchState::Touched, Polarity::FallOnTouch)
            | (TouchState::Released, Polarity::RiseOnTouch) => self.value > self.threshold,
        }
    }

    /// Process a new raw sample for this channel
    ///
    /// Returns the new state if this sample confirmed a transition
    pub fn push(&mut self, raw: u16, alpha: f32, polarity: Polarity) -> Option<TouchState> {
        self.raw = raw;
        self.value = constrain(
            alpha * raw as f32 + (1.0 - alpha) * self.value,
            self.min_value,
            self.max_value,
        );

        if self.trending(polarity) {
            self.counter = self.counter.saturating_add(1);
        } else {
            self.counter = 0;
        }

        let confirm = match self.state {
            TouchState::Released => self.touch_confirm,
            TouchState::Touched => self.release_confirm,
        };

        if self.counter > confirm {
            self.state = self.state.toggled();
            self.counter = 0;
            self.rearm(polarity);
            Some(self.state)
        } else {
            None
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(&DEFAULT_TOUCH_CONFIG, DEFAULT_TOUCH_CONFIG.max_value)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    const ALPHA: f32 = DEFAULT_TOUCH_CONFIG.alpha;
    const FALL: Polarity = Polarity::FallOnTouch;

    #[test]
    pub fn test_seed_is_clamped() {
        let c = Channel::new(&DEFAULT_TOUCH_CONFIG, 900);
        assert_eq!(c.value, 710.0);
        assert_eq!(c.threshold, 680.0);
        assert_eq!(c.raw, 900);

        let c = Channel::new(&DEFAULT_TOUCH_CONFIG, 10);
        assert_eq!(c.value, 600.0);
        assert_eq!(c.threshold, 570.0);
        assert_eq!(c.state, TouchState::Released);
        assert_eq!(c.counter, 0);
    }

    #[test]
    pub fn test_inverted_range_does_not_panic() {
        let mut c = Channel::new(&DEFAULT_TOUCH_CONFIG, 650);
        c.min_value = 700;
        c.max_value = 650;
        c.push(680, ALPHA, FALL);
        assert_eq!(c.value, 700.0);
    }

    #[test]
    pub fn test_touch_needs_confirm_plus_one() {
        let mut c = Channel::new(&DEFAULT_TOUCH_CONFIG, 700);

        for _ in 0..DEFAULT_TOUCH_CONFIG.touch_confirm {
            assert_eq!(c.push(600, ALPHA, FALL), None);
            assert!(!c.touched());
        }

        assert_eq!(c.push(600, ALPHA, FALL), Some(TouchState::Touched));
        assert!(c.touched());
        assert_eq!(c.counter, 0);
        assert!((c.threshold - (c.value + 20.0)).abs() < 1e-3);
    }

    #[test]
    pub fn test_counter_resets_on_miss() {
        let mut c = Channel::new(&DEFAULT_TOUCH_CONFIG, 700);
        c.touch_confirm = 2;

        c.push(600, ALPHA, FALL);
        c.push(600, ALPHA, FALL);
        assert_eq!(c.counter, 2);

        // Back above the threshold
        c.push(710, ALPHA, FALL);
        c.push(710, ALPHA, FALL);
        assert_eq!(c.counter, 0);
        assert!(!c.touched());
    }

    #[test]
    pub fn test_rearm_follows_state() {
        let mut c = Channel::new(&DEFAULT_TOUCH_CONFIG, 650);
        c.touch_margin = 40;
        c.rearm(FALL);
        assert_eq!(c.threshold, 610.0);

        c.state = TouchState::Touched;
        c.rearm(FALL);
        assert_eq!(c.threshold, 670.0);

        c.rearm(Polarity::RiseOnTouch);
        assert_eq!(c.threshold, 630.0);

        c.state = TouchState::Released;
        c.rearm(Polarity::RiseOnTouch);
        assert_eq!(c.threshold, 690.0);
    }

    #[test]
    pub fn test_rising_polarity() {
        let config = TouchConfig {
            polarity: Polarity::RiseOnTouch,
            ..DEFAULT_TOUCH_CONFIG
        };
        let mut c = Channel::new(&config, 610);
        assert_eq!(c.threshold, 640.0);

        // A falling reading must not count towards a touch
        for _ in 0..32 {
            assert_eq!(c.push(600, config.alpha, config.polarity), None);
        }

        let mut flipped = 0;
        for _ in 0..config.touch_confirm + 1 {
            if c.push(700, config.alpha, config.polarity).is_some() {
                flipped += 1;
            }
        }
        assert_eq!(flipped, 1);
        assert!(c.touched());
        assert!((c.threshold - (c.value - 20.0)).abs() < 1e-3);
    }
}
