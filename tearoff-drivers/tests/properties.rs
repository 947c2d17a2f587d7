use embedded_hal::delay::DelayNs;
use proptest::prelude::*;

use tearoff_core::traits::{AxisDriver, Clock};
use tearoff_drivers::{AxisCommand, SimClock, VirtualTilt, MAX_RECORDED_WAITS, MAX_TRACE};

proptest! {
    #[test]
    fn free_axis_lands_on_sum_of_moves(
        start in -10_000i32..10_000,
        moves in prop::collection::vec(-5_000i32..5_000, 0..MAX_TRACE),
    ) {
        let mut tilt = VirtualTilt::new(start);
        for &steps in &moves {
            tilt.move_relative(steps).unwrap();
        }

        let expected = start + moves.iter().sum::<i32>();
        prop_assert_eq!(tilt.position().unwrap(), expected);
        prop_assert_eq!(tilt.motion_count(), moves.len());
        prop_assert!(!tilt.query_stall().unwrap());
    }

    #[test]
    fn obstructed_axis_never_passes_obstruction(
        floor in 0i32..2_000,
        ceiling in 3_000i32..6_000,
        targets in prop::collection::vec(-1_000i32..8_000, 1..32),
    ) {
        let mut tilt = VirtualTilt::new(2_500);
        tilt.obstruct_at(floor);
        tilt.obstruct_above(ceiling);

        let mut blocked = false;
        for &target in &targets {
            tilt.move_absolute(target).unwrap();
            blocked |= target < floor || target > ceiling;

            let position = tilt.position().unwrap();
            prop_assert!(position >= floor && position <= ceiling);
        }

        prop_assert_eq!(tilt.query_stall().unwrap(), blocked);
        prop_assert!(matches!(tilt.trace().last(), Some(AxisCommand::QueryStall)));
    }

    #[test]
    fn clock_time_is_sum_of_waits(
        waits in prop::collection::vec(0u32..10_000, 0..MAX_RECORDED_WAITS),
        advance in 0u32..1_000,
    ) {
        let clock = SimClock::new();
        let mut delay = &clock;
        for &ms in &waits {
            delay.delay_ms(ms);
        }
        clock.advance_ms(advance);

        let total = waits.iter().map(|&ms| ms as u64).sum::<u64>();
        let recorded = clock.waits();
        prop_assert_eq!(recorded.as_slice(), waits.as_slice());
        prop_assert_eq!(clock.total_wait_ms(), total);
        prop_assert_eq!(clock.now_ms(), total + advance as u64);
    }
}
