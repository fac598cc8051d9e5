#[cfg(test)]
mod cron_utils_tests {
    use syncer_dispatcher::cron_utils::*;

    use chrono::{Datelike, Local, TimeZone, Timelike, Utc, Weekday};

    #[test]
    fn test_cron_schedule_creation() {
        assert!(CronSchedule::new("0 0 0 * * *").is_ok());
        assert!(CronSchedule::new("0 30 2 * * *").is_ok());
        assert!(CronSchedule::new("invalid").is_err());
        assert!(CronSchedule::new("").is_err());
    }

    #[test]
    fn test_invalid_cron_error() {
        let err = CronSchedule::new("0 0 0 32 * *").unwrap_err();
        assert!(err.is_fatal_to_process());
        assert!(err.to_string().contains("0 0 0 32 * *"));
    }

    #[test]
    fn test_five_field_expression() {
        assert_eq!(normalize_expression("30 2 * * *"), "0 30 2 * * *");
        assert_eq!(normalize_expression(" 0 0 * * * * "), "0 0 * * * *");

        let schedule = CronSchedule::new("30 2 * * *").unwrap();
        assert_eq!(schedule.expression(), "30 2 * * *");

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let next = schedule.next_execution_time(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 2, 30, 0).unwrap());
    }

    #[test]
    fn test_unix_weekdays() {
        // 2024-01-06 是周六
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();

        let weekdays = CronSchedule::new("0 8 * * 1-5").unwrap();
        let next = weekdays.next_execution_time(saturday).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.hour(), 8);

        for expr in ["0 8 * * 0", "0 8 * * 7"] {
            let sunday = CronSchedule::new(expr).unwrap();
            let next = sunday.next_execution_time(saturday).unwrap();
            assert_eq!(next.weekday(), Weekday::Sun, "{expr}");
        }

        let weekend = CronSchedule::new("0 8 * * 6-7").unwrap();
        let upcoming = weekend.upcoming_times(saturday, 2);
        assert_eq!(upcoming[0].weekday(), Weekday::Sat);
        assert_eq!(upcoming[1].weekday(), Weekday::Sun);

        let named = CronSchedule::new("0 8 * * MON-FRI").unwrap();
        assert_eq!(
            named.next_execution_time(saturday).unwrap().weekday(),
            Weekday::Mon
        );
    }

    #[test]
    fn test_unix_weekday_ranges_ending_on_sunday() {
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let weekdays = |expr: &str, count: usize| -> Vec<Weekday> {
            CronSchedule::new(expr)
                .unwrap()
                .upcoming_times(saturday, count)
                .iter()
                .map(|time| time.weekday())
                .collect()
        };

        assert_eq!(normalize_expression("0 3 * * 5-7/2"), "0 0 3 * * 1,6");
        assert_eq!(
            weekdays("0 3 * * 5-7/2", 4),
            vec![Weekday::Sun, Weekday::Fri, Weekday::Sun, Weekday::Fri]
        );

        assert_eq!(normalize_expression("0 3 * * 7-7"), "0 0 3 * * 1");
        assert_eq!(weekdays("0 3 * * 7-7", 2), vec![Weekday::Sun, Weekday::Sun]);

        assert_eq!(normalize_expression("0 3 * * 0-7/3"), "0 0 3 * * 1,4,7");
        assert_eq!(
            weekdays("0 3 * * 0-7/3", 3),
            vec![Weekday::Sat, Weekday::Sun, Weekday::Wed]
        );

        assert_eq!(normalize_expression("0 3 * * 5-7"), "0 0 3 * * 1,6,7");
        assert_eq!(normalize_expression("0 3 * * 1-5"), "0 0 3 * * 2,3,4,5,6");
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        assert_eq!(
            expand_expression("0 3 1 * 1"),
            vec!["0 0 3 1 * *".to_string(), "0 0 3 * * 2".to_string()]
        );
        assert_eq!(expand_expression("0 3 * * 1"), vec!["0 0 3 * * 2".to_string()]);
        assert_eq!(expand_expression("0 0 3 1 * MON"), vec!["0 0 3 1 * MON".to_string()]);

        // 2024-01-01 是周一，之后的触发是每个周一和每月 1 日
        let schedule = CronSchedule::new("0 3 1 * 1").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let upcoming = schedule.upcoming_times(from, 6);
        let days: Vec<(u32, u32)> = upcoming.iter().map(|t| (t.month(), t.day())).collect();
        assert_eq!(days, vec![(1, 8), (1, 15), (1, 22), (1, 29), (2, 1), (2, 5)]);
        assert!(upcoming.iter().all(|t| t.hour() == 3 && t.minute() == 0));
        assert_eq!(
            schedule.next_execution_time(from).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_execution_time_is_strictly_after() {
        let schedule = CronSchedule::new("0 0 * * * *").unwrap();
        let on_the_hour = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let next = schedule.next_execution_time(on_the_hour).unwrap();
        assert_eq!(next.hour(), 13);
    }

    #[test]
    fn test_upcoming_times() {
        let schedule = CronSchedule::new("0 0 * * * *").unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        let upcoming = schedule.upcoming_times(now, 3);

        assert_eq!(upcoming.len(), 3);
        assert_eq!(upcoming[0].hour(), 13);
        assert_eq!(upcoming[1].hour(), 14);
        assert_eq!(upcoming[2].hour(), 15);
    }

    #[test]
    fn test_local_time_schedule() {
        let schedule = CronSchedule::with_local_time("30 2 * * *", true).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let next = schedule.next_execution_time(now).unwrap().with_timezone(&Local);
        assert_eq!(next.hour(), 2);
        assert_eq!(next.minute(), 30);
        assert!(next > Local.from_utc_datetime(&now.naive_utc()));
    }

    #[test]
    fn test_accepted_expressions() {
        assert!(CronSchedule::new("0 */5 * * * *").is_ok());
        assert!(CronSchedule::new("*/15 * * * *").is_ok());
        assert!(CronSchedule::new("0 0 9-17 * * MON-FRI").is_ok());
        assert!(CronSchedule::new("0 3 * * 7-7").is_ok());
        assert!(CronSchedule::new("0 3 32 * 1").is_err());
    }
}
