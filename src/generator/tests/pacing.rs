use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::profile::ArrivalRateTuple;

use super::super::{batch_size, default_mean_wait_ms, effective_mean_wait_ms, post_batch_sleep_ms};

#[test]
fn default_mean_wait_is_tenth_of_first_interval_capped_at_ten() -> Result<(), String> {
    let cases = [(1.0, 10), (0.05, 5), (0.001, 1), (30.0, 10)];
    for (first_time, expected) in cases {
        let mean = default_mean_wait_ms(ArrivalRateTuple::new(first_time, 10.0));
        if mean != expected {
            return Err(format!("Expected {} ms for {} s, got {}", expected, first_time, mean));
        }
    }
    Ok(())
}

#[test]
fn low_rates_stretch_the_mean_wait() -> Result<(), String> {
    let stretched = effective_mean_wait_ms(10, 1000, 0, 5);
    if stretched != 166 {
        return Err(format!("Expected 166 ms, got {}", stretched));
    }
    let single = effective_mean_wait_ms(10, 1000, 0, 1);
    if single != 10 {
        return Err(format!("Single arrival should keep default, got {}", single));
    }
    let high = effective_mean_wait_ms(10, 1000, 0, 500);
    if high != 10 {
        return Err(format!("High rate should keep default, got {}", high));
    }
    let late = effective_mean_wait_ms(10, 1000, 1200, 5);
    if late != 1 {
        return Err(format!("Past deadline should floor at 1 ms, got {}", late));
    }
    Ok(())
}

#[test]
fn batch_takes_everything_near_the_deadline() -> Result<(), String> {
    if batch_size(1000, 995, 10, 37) != 37 {
        return Err("Expected final push".to_owned());
    }
    if batch_size(1000, 1100, 10, 4) != 4 {
        return Err("Expected final push past deadline".to_owned());
    }
    let partial = batch_size(1000, 0, 10, 250);
    if partial != 2 {
        return Err(format!("Expected 250 / 100 ticks = 2, got {}", partial));
    }
    Ok(())
}

#[test]
fn batches_add_up_to_the_target_rate() -> Result<(), String> {
    for rate in [0_u64, 1, 2, 7, 49, 50, 123, 1000, 4321] {
        let target_ms = 1000;
        let mut current_ms = 0;
        let mean = effective_mean_wait_ms(10, target_ms, current_ms, rate);
        let mut remaining = rate;
        let mut dispatched = 0;
        let mut ticks = 0;
        while remaining > 0 {
            let size = batch_size(target_ms, current_ms, mean, remaining);
            if size > remaining {
                return Err(format!("Batch {} exceeds remaining {}", size, remaining));
            }
            remaining -= size;
            dispatched += size;
            current_ms += mean;
            ticks += 1;
            if ticks > 10_000 {
                return Err(format!("Rate {} never converged", rate));
            }
        }
        if dispatched != rate {
            return Err(format!("Dispatched {} for rate {}", dispatched, rate));
        }
    }
    Ok(())
}

#[test]
fn randomized_sleep_stays_within_bounds() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(5);
    for mean in [1_i64, 2, 10, 166, 1000] {
        let lower = mean / 2;
        let upper = mean + mean / 2;
        for _ in 0..2000 {
            let sleep = post_batch_sleep_ms(mean, &mut rng, true);
            let sleep = i64::try_from(sleep).map_err(|err| err.to_string())?;
            if sleep < lower || sleep > upper {
                return Err(format!("Sleep {} outside [{}, {}]", sleep, lower, upper));
            }
        }
    }
    Ok(())
}

#[test]
fn fixed_sleep_equals_mean() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(1);
    if post_batch_sleep_ms(42, &mut rng, false) != 42 {
        return Err("Expected the mean without randomization".to_owned());
    }
    Ok(())
}
