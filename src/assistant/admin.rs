//! Administrator helpers: the allow-list and the stats report.

use std::collections::HashSet;

use teloxide::types::UserId;

pub struct Admins {
    ids: HashSet<UserId>,
}

impl Admins {
    pub fn new(ids: HashSet<UserId>) -> Self {
        Self { ids }
    }

    pub fn contains(&self, user_id: i64) -> bool {
        u64::try_from(user_id).is_ok_and(|id| self.ids.contains(&UserId(id)))
    }
}

pub fn stats_report(counters: &[(String, u64)]) -> String {
    let mut lines = vec!["<b>Статистика бота:</b>\n".to_string()];
    lines.extend(counters.iter().map(|(event, count)| format!("{event}: {count}")));
    lines.join("\n")
}

pub fn broadcast_summary(delivered: usize, failed: usize) -> String {
    format!("✅ {delivered} доставлено, ❌ {failed} не удалось")
}
