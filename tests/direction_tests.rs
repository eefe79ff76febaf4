//! Queue and cycle-volume behaviour of a single direction

use rand::rngs::StdRng;
use rand::SeedableRng;
use traffic_controller::simulation::{Direction, SimError, SWITCH_OVER_COST};

fn north() -> Direction {
    Direction::new("North", vec![8.0, 6.0, 5.0, 2.0, 1.0], 3.0).unwrap()
}

fn queue(direction: &Direction) -> Vec<f64> {
    direction.waiting_times().iter().copied().collect()
}

#[test]
fn test_cycle_volume_empty_queue_is_zero() {
    let direction = Direction::new("X", vec![], 0.0).unwrap();
    assert_eq!(direction.cycle_volume(), 0);
}

#[test]
fn test_cycle_volume_drains_half_of_total_wait() {
    // total 22, target 11: removing 8 then 6 leaves 8 <= 11
    assert_eq!(north().cycle_volume(), 2);
}

#[test]
fn test_cycle_volume_respects_cycle_size() {
    let direction = north().with_cycle_size(0.1).unwrap();
    // target floor(2.2) = 2: 22 -> 14 -> 8 -> 3 -> 1
    assert_eq!(direction.cycle_volume(), 4);

    let direction = north().with_cycle_size(0.9).unwrap();
    // target floor(19.8) = 19: 22 -> 14
    assert_eq!(direction.cycle_volume(), 1);
}

#[test]
fn test_cycle_volume_within_queue_bounds() {
    let queues = vec![
        vec![0.0],
        vec![0.0, 0.0, 0.0],
        vec![1.0],
        vec![0.1, 0.1, 0.1],
        vec![3.0, 2.0, 2.0, 1.0, 0.0],
        vec![11.0, 10.0, 9.0, 9.0, 6.0, 5.0, 4.0, 4.0, 2.0, 1.0],
        vec![0.0, 0.0, 100.0],
    ];

    for waiting_times in queues {
        for cycle_size in [0.01, 0.25, 0.5, 0.75, 0.99] {
            let direction = Direction::new("X", waiting_times.clone(), 1.0)
                .unwrap()
                .with_cycle_size(cycle_size)
                .unwrap();
            let volume = direction.cycle_volume();
            assert!(
                volume >= 1 && volume <= waiting_times.len(),
                "volume {} out of range for {:?} at cycle size {}",
                volume,
                waiting_times,
                cycle_size
            );
        }
    }
}

#[test]
fn test_cycle_releases_front_of_queue() {
    let mut direction = north();
    let volume = direction.cycle_volume();

    let elapsed = direction.cycle(1.5, false).unwrap();

    assert_eq!(direction.len(), 5 - volume);
    assert_eq!(queue(&direction), vec![5.0, 2.0, 1.0]);
    assert_eq!(elapsed, volume as f64 * 1.5 + SWITCH_OVER_COST);
}

#[test]
fn test_cycle_does_not_touch_remaining_waits() {
    let mut direction = Direction::new("East", vec![3.0, 2.0, 2.0, 1.0, 0.0], 2.0).unwrap();
    direction.cycle(1.0, false).unwrap();
    for time in direction.waiting_times() {
        assert!([2.0, 1.0, 0.0].contains(time));
    }
}

#[test]
fn test_cycle_empty_queue_only_costs_switch_over() {
    let mut direction = Direction::new("X", vec![], 4.0).unwrap();
    let elapsed = direction.cycle(1.0, false).unwrap();
    assert_eq!(elapsed, SWITCH_OVER_COST);
    assert!(direction.is_empty());
}

#[test]
fn test_cycle_rejects_negative_pass_duration() {
    let mut direction = north();
    let result = direction.cycle(-1.0, false);
    assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    assert_eq!(direction.len(), 5);
}

#[test]
fn test_add_waiting_time() {
    let mut direction = north();
    direction.add_waiting_time(3.0).unwrap();
    assert_eq!(queue(&direction), vec![11.0, 9.0, 8.0, 5.0, 4.0]);

    direction.add_waiting_time(0.0).unwrap();
    assert_eq!(queue(&direction), vec![11.0, 9.0, 8.0, 5.0, 4.0]);
}

#[test]
fn test_add_waiting_time_rejects_invalid_delta() {
    let mut direction = north();
    for delta in [-1.0, -0.5, f64::NAN, f64::INFINITY] {
        let result = direction.add_waiting_time(delta);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }
    assert_eq!(queue(&direction), vec![8.0, 6.0, 5.0, 2.0, 1.0]);
}

#[test]
fn test_add_vehicles() {
    let mut direction = Direction::new("direction_1", vec![], 3.0).unwrap();
    direction.add_vehicles(3).unwrap();
    assert_eq!(direction.len(), 3);
    assert!(direction.waiting_times().iter().all(|&t| t == 0.0));

    direction.add_vehicles(0).unwrap();
    assert_eq!(direction.len(), 3);

    direction.add_vehicles(2).unwrap();
    assert_eq!(direction.len(), 5);
}

#[test]
fn test_add_random_vehicles_appends_zeroed_pod() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut direction = north();

    let mut expected = 5;
    for _ in 0..20 {
        let arrived = direction.add_random_vehicles(&mut rng).unwrap();
        expected += arrived;
        assert_eq!(direction.len(), expected);
    }

    // The original five keep their waits; everything after them is new
    assert!(direction.waiting_times().iter().skip(5).all(|&t| t == 0.0));
}

#[test]
fn test_add_random_vehicles_is_reproducible() {
    let mut first = north();
    let mut second = north();
    let mut rng_a = StdRng::seed_from_u64(3);
    let mut rng_b = StdRng::seed_from_u64(3);

    for _ in 0..10 {
        assert_eq!(
            first.add_random_vehicles(&mut rng_a).unwrap(),
            second.add_random_vehicles(&mut rng_b).unwrap()
        );
    }
}

#[test]
fn test_add_random_vehicles_centres_on_average_flow() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut direction = Direction::new("busy", vec![], 20.0).unwrap();

    let draws = 500;
    let total: usize = (0..draws)
        .map(|_| direction.add_random_vehicles(&mut rng).unwrap())
        .sum();

    // floor of Normal(20, 1) averages about 19.5
    let mean = total as f64 / draws as f64;
    assert!(mean > 18.5 && mean < 20.5, "mean arrivals {}", mean);
}

#[test]
fn test_cycle_size() {
    let mut direction = Direction::new("direction_1", vec![], 3.0).unwrap();
    direction.set_cycle_size(0.1).unwrap();
    assert_eq!(direction.cycle_size(), 0.1);

    for invalid in [1.0, 0.0, -1.0, 2.0, f64::NAN] {
        let result = direction.set_cycle_size(invalid);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
        assert_eq!(direction.cycle_size(), 0.1);
    }
}

#[test]
fn test_new_rejects_invalid_values() {
    assert!(matches!(
        Direction::new("bad", vec![1.0, -2.0], 1.0),
        Err(SimError::InvalidArgument(_))
    ));
    assert!(matches!(
        Direction::new("bad", vec![1.0], -1.0),
        Err(SimError::InvalidArgument(_))
    ));

    let mut direction = north();
    assert!(direction.set_avg_flow(-3.0).is_err());
    assert_eq!(direction.avg_flow(), 3.0);
}

#[test]
fn test_rename() {
    let mut direction = north();
    direction.rename("Northbound");
    assert_eq!(direction.name(), "Northbound");
}

#[test]
fn test_cycle_rejects_overflowing_duration() {
    let mut direction = north();
    let result = direction.cycle(1e308, false);
    assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    assert_eq!(queue(&direction), vec![8.0, 6.0, 5.0, 2.0, 1.0]);
}

#[test]
fn test_real_time_cycle_rejects_unsleepable_duration() {
    let mut direction = Direction::new("X", vec![5.0, 1.0], 0.0).unwrap();
    let result = direction.cycle(1e20, true);
    assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    assert_eq!(queue(&direction), vec![5.0, 1.0]);

    // Without sleeping the same duration is fine
    assert_eq!(direction.cycle(1e20, false).unwrap(), 1e20 + SWITCH_OVER_COST);
}

#[test]
fn test_add_waiting_time_rejects_overflow() {
    let mut direction = Direction::new("X", vec![1.0, f64::MAX], 0.0).unwrap();
    let result = direction.add_waiting_time(f64::MAX);
    assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    assert_eq!(queue(&direction), vec![1.0, f64::MAX]);
}

#[test]
fn test_oversized_arrivals_are_rejected() {
    let mut direction = Direction::new("X", vec![], 1e20).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let result = direction.add_random_vehicles(&mut rng);
    assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    assert!(direction.is_empty());

    assert!(matches!(
        direction.add_vehicles(usize::MAX),
        Err(SimError::InvalidArgument(_))
    ));
    assert!(direction.is_empty());
}
