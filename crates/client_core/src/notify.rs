//! Dismissible, auto-expiring notifications.

use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let notice = Notice {
            id: self.next_id,
            level,
            message: message.into(),
            expires_at: Instant::now() + self.ttl,
        };
        self.next_id += 1;
        self.notices.push(notice.clone());
        notice
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    /// Drops every notice whose deadline has passed and returns their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<u64> {
        let mut expired = Vec::new();
        self.notices.retain(|notice| {
            let keep = notice.expires_at > now;
            if !keep {
                expired.push(notice.id);
            }
            keep
        });
        expired
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_get_increasing_ids() {
        let mut board = NoticeBoard::default();
        let first = board.push(NoticeLevel::Info, "one");
        let second = board.push(NoticeLevel::Danger, "two");
        assert!(second.id > first.id);
        assert_eq!(board.active().len(), 2);
    }

    #[test]
    fn dismiss_removes_only_that_notice() {
        let mut board = NoticeBoard::default();
        let first = board.push(NoticeLevel::Info, "one");
        board.push(NoticeLevel::Success, "two");
        assert!(board.dismiss(first.id));
        assert!(!board.dismiss(first.id));
        assert_eq!(board.active().len(), 1);
        assert_eq!(board.active()[0].message, "two");
    }

    #[test]
    fn expire_drops_past_deadlines() {
        let mut board = NoticeBoard::new(Duration::from_secs(5));
        let notice = board.push(NoticeLevel::Warning, "slow");
        assert!(board.expire(Instant::now()).is_empty());
        let expired = board.expire(notice.expires_at + Duration::from_millis(1));
        assert_eq!(expired, vec![notice.id]);
        assert!(board.active().is_empty());
    }
}
