//! Controller → effect engine → PWM pipeline with mock pins.

use kombi::app::events::AppEvent;
use kombi::config::{Breakpoint, ConfigRecord, DIMMER_COUNT, PWM_PERIOD};
use kombi::drivers::pwm::PwmDriver;
use kombi::effects::DutyCycles;
use kombi::shared::Shared;

use super::mock_hw::{MockPin, exchange, idle_pass, load_frame, started};

/// Flat colour at every RPM, dimmer off, starter window 300..600.
fn steady_record() -> ConfigRecord {
    let mut rec = ConfigRecord::default();
    rec.breakpoints[0] = Breakpoint::new(0, 40, 0, 100);
    rec.active_dimmer = DIMMER_COUNT as u8;
    rec.dimmer_enabled = false;
    rec.starter_on_rpm = 300;
    rec.starter_off_rpm = 600;
    rec.filter_step = 1;
    rec
}

fn advance(shared: &Shared, n: u32) {
    for _ in 0..n {
        shared.ticks.advance();
    }
}

#[test]
fn demo_profile_at_standstill_is_blue() {
    let (mut ctl, shared, mut sink) = started();

    let out = exchange(&mut ctl, &shared, b"dete", &mut sink);
    assert_eq!(out, b"s0es0e");
    assert_eq!(ctl.effects().breakpoint(), 0);
    assert_eq!(shared.duties.pending().colours(), [0, 0, 100]);
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::Promoted { .. })));
}

#[test]
fn starter_follows_hysteresis_band() {
    let (mut ctl, shared, mut sink) = started();
    let mut input = load_frame(&steady_record());
    input.extend_from_slice(b"te");
    exchange(&mut ctl, &shared, &input, &mut sink);

    let mut starter_at = |rpm: u16| {
        shared.rpm.preset(rpm);
        idle_pass(&mut ctl, &shared, &mut sink).starter
    };
    assert_eq!(starter_at(0), PWM_PERIOD);
    assert_eq!(starter_at(450), PWM_PERIOD, "inside the band: hold");
    assert_eq!(starter_at(600), 0);
    assert_eq!(starter_at(450), 0, "inside the band: hold");
    assert_eq!(starter_at(300), PWM_PERIOD);

    let flips: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StarterChanged { enabled, rpm } => Some((*enabled, *rpm)),
            _ => None,
        })
        .collect();
    assert_eq!(flips.last(), Some(&(true, 300)));
    assert!(flips.contains(&(false, 600)));
}

#[test]
fn pwm_outputs_follow_published_duties() {
    let (mut ctl, shared, mut sink) = started();
    let mut input = load_frame(&steady_record());
    input.extend_from_slice(b"te");
    exchange(&mut ctl, &shared, &input, &mut sink);

    shared.rpm.preset(0);
    let duties = idle_pass(&mut ctl, &shared, &mut sink);
    assert_eq!(
        duties,
        DutyCycles {
            red: 40,
            green: 0,
            blue: 100,
            starter: PWM_PERIOD,
        }
    );

    let mut pwm = PwmDriver::new(
        [MockPin::default(), MockPin::default(), MockPin::default()],
        [MockPin::default(), MockPin::default()],
    );
    // First rollover latches the duties.
    for _ in 0..=PWM_PERIOD {
        shared.on_tick(&mut pwm);
    }
    assert_eq!(pwm.committed(), duties);
    let levels = |pwm: &PwmDriver<MockPin>| pwm.colour_pins().each_ref().map(|p| p.high);
    assert_eq!(levels(&pwm), [true, false, true]);
    assert!(pwm.starter_pins().iter().all(|p| p.high));

    for _ in 0..39 {
        shared.on_tick(&mut pwm);
    }
    assert_eq!(levels(&pwm), [true, false, true]);
    shared.on_tick(&mut pwm);
    assert_eq!(levels(&pwm), [false, false, true], "red ends at its duty");
}

#[test]
fn check_interval_walks_breakpoints_and_detects_signal_loss() {
    let (mut ctl, shared, mut sink) = started();
    exchange(&mut ctl, &shared, b"dete", &mut sink);
    shared.rpm.preset(700);

    advance(&shared, 1001);
    idle_pass(&mut ctl, &shared, &mut sink);
    assert_eq!(ctl.effects().breakpoint(), 1);
    assert!(sink.contains(&AppEvent::DimmerChanged { to: None, rpm: 700 }));

    advance(&shared, 1001);
    let duties = idle_pass(&mut ctl, &shared, &mut sink);
    assert_eq!(ctl.effects().breakpoint(), 2);
    assert_eq!(duties.colours(), [0, 50, 50]);
    assert!(!sink.contains(&AppEvent::SignalLost));

    advance(&shared, 1001);
    idle_pass(&mut ctl, &shared, &mut sink);
    assert!(sink.contains(&AppEvent::SignalLost));
    assert_eq!(shared.rpm.target(), 0);
    assert_eq!(ctl.effects().breakpoint(), 2);

    let steps: Vec<_> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::BreakpointChanged { .. }))
        .collect();
    assert_eq!(steps.len(), 2);
}

#[test]
fn blank_storage_boots_dark() {
    let (mut ctl, shared, mut sink) = started();
    assert_eq!(sink.events.first(), Some(&AppEvent::StorageLoaded));
    assert_eq!(sink.events.last(), Some(&AppEvent::Started));

    // Erased cells clamp to "past the last breakpoint".
    assert_eq!(ctl.effects().breakpoint(), 10);
    assert_eq!(ctl.effects().dimmer(), None);
    let duties = idle_pass(&mut ctl, &shared, &mut sink);
    assert_eq!(duties.colours(), [0, 0, 0]);
}
