//! Reminder scheduler domain logic — spec §4.10.
//!
//! Owns the pure per-tick behavior (claim a due reminder, notify, and
//! materialize the next occurrence of a recurring event); the ticker loop
//! itself lives in the queue crate and calls [`ReminderService::process_due`]
//! on an interval. Reminders are strictly local-only and never federated.

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppResult, IdGenerator};
use fedevents_db::entities::{
    event::{self, RecurrencePattern},
    notification::NotificationType,
    reminder::{self, ReminderStatus},
};
use fedevents_db::repositories::{EventRepository, ReminderRepository};
use sea_orm::Set;
use std::sync::Arc;

use crate::services::notification::NotificationService;

/// Reminder scheduler service.
#[derive(Clone)]
pub struct ReminderService {
    reminder_repo: ReminderRepository,
    event_repo: EventRepository,
    notifications: NotificationService,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    id_gen: IdGenerator,
}

impl ReminderService {
    #[must_use]
    pub fn new(
        reminder_repo: ReminderRepository,
        event_repo: EventRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            reminder_repo,
            event_repo,
            notifications,
            broadcaster: None,
            id_gen: IdGenerator::new(),
        }
    }

    pub fn set_broadcaster(&mut self, broadcaster: Arc<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    /// Process up to `limit` due reminders as of `now`. Returns the number
    /// actually fired (claims lost to a racing ticker are skipped, not
    /// counted).
    pub async fn process_due(&self, now: chrono::DateTime<chrono::Utc>, limit: u64) -> AppResult<u64> {
        let due = self.reminder_repo.find_due(now, limit).await?;
        let mut fired = 0;
        for reminder in due {
            if self.fire_one(&reminder).await? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Claim and fire a single reminder, returning whether this call won
    /// the claim race.
    async fn fire_one(&self, reminder: &reminder::Model) -> AppResult<bool> {
        if !self.reminder_repo.claim(&reminder.id).await? {
            return Ok(false);
        }

        let Some(event) = self.event_repo.find_by_id(&reminder.event_id).await? else {
            return Ok(true);
        };

        self.notifications
            .create(
                &reminder.user_id,
                None,
                NotificationType::Reminder,
                "Upcoming event".to_string(),
                format!("\"{}\" starts soon", event.title),
                Some(serde_json::json!({ "eventId": event.id, "reminderId": reminder.id })),
            )
            .await?;

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::NotificationCreated,
                reminder.user_id.clone(),
                serde_json::json!({ "eventId": event.id, "reminderId": reminder.id }),
            ));
        }

        if let Some(pattern) = event.recurrence_pattern.clone() {
            self.materialize_next_occurrence(&event, &pattern, reminder.minutes_before_start)
                .await?;
        }

        Ok(true)
    }

    /// Compute and persist the next recurring reminder for `event`, if the
    /// next occurrence still falls on or before `recurrence_end_date`.
    async fn materialize_next_occurrence(
        &self,
        event: &event::Model,
        pattern: &RecurrencePattern,
        minutes_before_start: i32,
    ) -> AppResult<()> {
        let next_start = Self::next_occurrence(event.start_time.with_timezone(&chrono::Utc), pattern);

        if let Some(end) = event.recurrence_end_date
            && next_start > end.with_timezone(&chrono::Utc)
        {
            return Ok(());
        }

        let mut active: event::ActiveModel = event.clone().into();
        let duration = event
            .end_time
            .map(|end| end.with_timezone(&chrono::Utc) - event.start_time.with_timezone(&chrono::Utc));
        active.start_time = Set(next_start.into());
        active.end_time = Set(duration.map(|d| (next_start + d).into()));
        self.event_repo.update(active).await?;

        let remind_at = next_start - chrono::Duration::minutes(i64::from(minutes_before_start));
        let model = reminder::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(event.user_id.clone()),
            event_id: Set(event.id.clone()),
            remind_at: Set(remind_at.into()),
            minutes_before_start: Set(minutes_before_start),
            status: Set(ReminderStatus::Pending),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.reminder_repo.create(model).await?;
        Ok(())
    }

    /// Advance `start` by one occurrence of `pattern`, using calendar
    /// arithmetic for monthly/yearly so e.g. Jan 31 monthly lands on the
    /// last valid day rather than overflowing into the following month.
    #[must_use]
    fn next_occurrence(
        start: chrono::DateTime<chrono::Utc>,
        pattern: &RecurrencePattern,
    ) -> chrono::DateTime<chrono::Utc> {
        use chrono::Datelike;

        match pattern {
            RecurrencePattern::Daily => start + chrono::Duration::days(1),
            RecurrencePattern::Weekly => start + chrono::Duration::days(7),
            RecurrencePattern::Monthly => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                Self::with_year_month_clamped(start, year, month)
            }
            RecurrencePattern::Yearly => Self::with_year_month_clamped(start, start.year() + 1, start.month()),
        }
    }

    fn with_year_month_clamped(
        start: chrono::DateTime<chrono::Utc>,
        year: i32,
        month: u32,
    ) -> chrono::DateTime<chrono::Utc> {
        use chrono::{Datelike, TimeZone, Timelike};

        let days_in_month = Self::days_in_month(year, month);
        let day = start.day().min(days_in_month);
        chrono::Utc
            .with_ymd_and_hms(year, month, day, start.hour(), start.minute(), start.second())
            .single()
            .unwrap_or(start)
    }

    fn days_in_month(year: i32, month: u32) -> u32 {
        use chrono::{Datelike, NaiveDate};
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map_or(28, |d| d.day())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn daily_advances_one_day() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        let next = ReminderService::next_occurrence(start, &RecurrencePattern::Daily);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 16, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_clamps_to_shorter_month() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let next = ReminderService::next_occurrence(start, &RecurrencePattern::Monthly);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn yearly_advances_one_calendar_year() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let next = ReminderService::next_occurrence(start, &RecurrencePattern::Yearly);
        assert_eq!(next, Utc.with_ymd_and_hms(2027, 3, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_advances_seven_days() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let next = ReminderService::next_occurrence(start, &RecurrencePattern::Weekly);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 8, 9, 0, 0).unwrap());
    }
}
