use crate::{
    rule::run_rules::RunRulesUseCase, shared::usecase::execute,
    task::send_due_notifications::SendDueNotificationsUseCase,
};
use booking_rules_infra::BookingRulesContext;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant};

/// Seconds until `secs_before_min` seconds before the next full minute
pub fn get_start_delay(now_ts: i64, secs_before_min: i64) -> i64 {
    let secs_to_next_minute = 60 - now_ts % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Periodically executes the date rules. Needs to be started on a
/// `tokio::task::LocalSet`.
pub fn start_rules_job_scheduler(ctx: BookingRulesContext) {
    tokio::task::spawn_local(async move {
        let mut interval = interval(Duration::from_secs(
            ctx.config.rules_job_interval_secs.max(1),
        ));
        loop {
            interval.tick().await;

            let _ = execute(RunRulesUseCase, &ctx).await;
        }
    });
}

/// Sends the due notifications, aligned to full minutes. Needs to be
/// started on a `tokio::task::LocalSet`.
pub fn start_send_notifications_job(ctx: BookingRulesContext) {
    tokio::task::spawn_local(async move {
        let now = ctx.sys.get_timestamp();
        let secs_to_next_run = get_start_delay(now, 0);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run as u64);

        sleep_until(start).await;
        let mut interval = interval(Duration::from_secs(
            ctx.config.notifications_job_interval_secs.max(1),
        ));
        loop {
            interval.tick().await;

            let _ = execute(SendDueNotificationsUseCase, &ctx).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_delay_works() {
        assert_eq!(get_start_delay(50, 5), 5);
        assert_eq!(get_start_delay(50, 10), 60);
        assert_eq!(get_start_delay(50, 15), 55);
        assert_eq!(get_start_delay(60, 60), 60);
        assert_eq!(get_start_delay(60, 10), 50);
        assert_eq!(get_start_delay(59, 0), 1);
        assert_eq!(get_start_delay(59, 1), 60);
    }
}
