pub mod limiter_sweep;
