//! Rate limiter tests
//!
//! The limiter is pure in-memory state; these run against real wall-clock
//! sleeps with windows short enough to keep the suite fast.

use std::thread::sleep;
use std::time::Duration;

use uuid::Uuid;

use reel::app::rate_limiter::RateLimiter;

#[test]
fn second_acquire_inside_the_window_is_rejected() {
    let limiter = RateLimiter::new(Duration::from_millis(100), Duration::from_secs(1));
    let (actor, video) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(limiter.try_acquire(actor, video));
    assert!(!limiter.try_acquire(actor, video));
}

#[test]
fn acquires_spaced_beyond_the_window_both_pass() {
    let limiter = RateLimiter::new(Duration::from_millis(50), Duration::from_secs(1));
    let (actor, video) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(limiter.try_acquire(actor, video));
    sleep(Duration::from_millis(70));
    assert!(limiter.try_acquire(actor, video));
}

#[test]
fn a_rejection_does_not_extend_the_window() {
    let limiter = RateLimiter::new(Duration::from_millis(100), Duration::from_secs(1));
    let (actor, video) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(limiter.try_acquire(actor, video));
    sleep(Duration::from_millis(60));
    // Rejected, but it must not reset the clock...
    assert!(!limiter.try_acquire(actor, video));
    sleep(Duration::from_millis(60));
    // ...so 120ms after the pass, the window has elapsed.
    assert!(limiter.try_acquire(actor, video));
}

#[test]
fn keys_throttle_independently() {
    let limiter = RateLimiter::new(Duration::from_millis(200), Duration::from_secs(1));
    let actor_a = Uuid::new_v4();
    let actor_b = Uuid::new_v4();
    let video_x = Uuid::new_v4();
    let video_y = Uuid::new_v4();

    assert!(limiter.try_acquire(actor_a, video_x));
    // Same actor, different resource; same resource, different actor.
    assert!(limiter.try_acquire(actor_a, video_y));
    assert!(limiter.try_acquire(actor_b, video_x));
    // The original pair is still inside its window.
    assert!(!limiter.try_acquire(actor_a, video_x));
}

#[test]
fn sweep_drops_only_entries_past_retention() {
    let limiter = RateLimiter::new(Duration::from_millis(10), Duration::from_millis(80));
    let stale_actor = Uuid::new_v4();
    let fresh_actor = Uuid::new_v4();
    let video = Uuid::new_v4();

    assert!(limiter.try_acquire(stale_actor, video));
    assert!(limiter.try_acquire(fresh_actor, video));
    assert_eq!(limiter.len(), 2);

    sleep(Duration::from_millis(50));
    // Refresh one key; the other ages past retention.
    assert!(limiter.try_acquire(fresh_actor, video));
    sleep(Duration::from_millis(50));

    let removed = limiter.sweep();
    assert_eq!(removed, 1);
    assert_eq!(limiter.len(), 1);

    // The surviving key is still subject to its own window bookkeeping.
    assert!(limiter.try_acquire(stale_actor, video));
}

#[test]
fn starts_empty_and_sweeping_nothing_removes_nothing() {
    let limiter = RateLimiter::new(Duration::from_millis(10), Duration::from_millis(50));
    assert!(limiter.is_empty());
    assert_eq!(limiter.sweep(), 0);
}
