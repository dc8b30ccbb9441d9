//! Main loop: wait for a debounced button press, identify, show the result.

use crate::config::TesterConfig;
use crate::dispatcher::{DispatchReport, Dispatcher, Identification};
use crate::hal::{Delay, GpioBank, TextDisplay, Trigger};
use tracing::{debug, info};

pub struct Tester<G: GpioBank, Dp: TextDisplay, T: Trigger, D: Delay> {
    gpio: G,
    display: Dp,
    trigger: T,
    delay: D,
    config: TesterConfig,
    dispatcher: Dispatcher,
    /// Cleared after a run, set again once the button is seen released
    armed: bool,
    last_report: Option<DispatchReport>,
}

impl<G: GpioBank, Dp: TextDisplay, T: Trigger, D: Delay> Tester<G, Dp, T, D> {
    pub fn new(gpio: G, display: Dp, trigger: T, delay: D, config: TesterConfig) -> Self {
        Tester {
            gpio,
            display,
            trigger,
            delay,
            config,
            dispatcher: Dispatcher::new(),
            armed: true,
            last_report: None,
        }
    }

    /// One pass of the main loop. Returns the identification if a test ran.
    pub fn poll(&mut self) -> Option<Identification> {
        if !self.trigger.is_active() {
            self.armed = true;
            return None;
        }
        if !self.armed {
            return None;
        }

        self.delay.wait(self.config.debounce());
        if !self.trigger.is_active() {
            debug!("button bounce ignored");
            return None;
        }
        self.armed = false;

        info!("test started");
        self.display.clear();
        let report = self.dispatcher.run(&mut self.gpio, &mut self.delay, self.config.settle());
        let result = report.result;
        self.display.write(result.display_text());
        self.last_report = Some(report);
        Some(result)
    }

    /// Poll forever with the idle interval between passes.
    pub fn run_forever(&mut self) -> ! {
        loop {
            self.poll();
            self.delay.wait(self.config.poll());
        }
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    pub fn display(&self) -> &Dp {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Dp {
        &mut self.display
    }

    pub fn trigger_mut(&mut self) -> &mut T {
        &mut self.trigger
    }

    /// Report of the most recent run
    pub fn last_report(&self) -> Option<&DispatchReport> {
        self.last_report.as_ref()
    }

    pub fn into_parts(self) -> (G, Dp, T, D) {
        (self.gpio, self.display, self.trigger, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::{Sn74ls260, Sn74s138};
    use crate::hal::Level;
    use crate::lcd::CharLcd;
    use crate::model::ChipModel;
    use crate::socket::ZifSocket;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Plays back a list of samples, then repeats the last one
    struct Script {
        samples: VecDeque<bool>,
        last: bool,
    }

    impl Script {
        fn new(samples: &[bool]) -> Self {
            Script { samples: samples.iter().copied().collect(), last: false }
        }
    }

    impl Trigger for Script {
        fn is_active(&mut self) -> bool {
            if let Some(s) = self.samples.pop_front() {
                self.last = s;
            }
            self.last
        }
    }

    #[derive(Default)]
    struct NoDelay {
        waits: Vec<Duration>,
    }

    impl Delay for NoDelay {
        fn wait(&mut self, d: Duration) {
            self.waits.push(d);
        }
    }

    fn tester(socket: ZifSocket, script: &[bool]) -> Tester<ZifSocket, CharLcd, Script, NoDelay> {
        Tester::new(
            socket,
            CharLcd::new(),
            Script::new(script),
            NoDelay::default(),
            TesterConfig::default(),
        )
    }

    #[test]
    fn test_press_identifies_138() {
        let mut t = tester(ZifSocket::with_device(Box::new(Sn74s138), Level::High), &[true, true]);
        assert_eq!(t.poll(), Some(Identification::Identified(ChipModel::Sn74s138n)));
        assert_eq!(t.display().line(0), "SN74S138N");
        let (_, _, _, delay) = t.into_parts();
        assert_eq!(delay.waits[0], Duration::from_millis(50));
        assert_eq!(delay.waits.len(), 1 + 8);
    }

    #[test]
    fn test_bounce_is_ignored() {
        let mut t = tester(ZifSocket::with_device(Box::new(Sn74s138), Level::High), &[true, false]);
        assert_eq!(t.poll(), None);
        assert!(t.last_report().is_none());
        assert_eq!(t.display().line(0), "");
    }

    #[test]
    fn test_held_button_fires_once() {
        let script = [true, true, true, true, false, true, true];
        let mut t = tester(ZifSocket::new(Level::High), &script);
        assert_eq!(t.poll(), Some(Identification::Unidentified));
        assert_eq!(t.display().line(0), "NO MATCH");
        // Still held
        assert_eq!(t.poll(), None);
        assert_eq!(t.poll(), None);
        // Released, pressed again
        assert_eq!(t.poll(), None);
        assert_eq!(t.poll(), Some(Identification::Unidentified));
    }

    #[test]
    fn test_display_cleared_between_runs() {
        let socket = ZifSocket::with_device(Box::new(Sn74ls260), Level::High);
        let mut t = tester(socket, &[true, true, false, true, true]);
        assert_eq!(t.poll(), Some(Identification::Identified(ChipModel::Sn74260)));
        assert_eq!(t.display().line(0), "SN74LS260");
        t.gpio_mut().remove();
        assert_eq!(t.poll(), None);
        assert_eq!(t.poll(), Some(Identification::Unidentified));
        assert_eq!(t.display().line(0), "NO MATCH");
        let report = t.last_report().map(|r| r.reports.len());
        assert_eq!(report, Some(3));
    }
}
